use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::shared::constants::{DEFAULT_MIN_NEIGHBORS, DEFAULT_SCALE_FACTOR};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DetectionParamsError {
    #[error("scale factor must be a finite value greater than 1.0, got {0}")]
    ScaleFactor(f64),
    #[error("max face size ({max}) is smaller than min face size ({min})")]
    SizeRange { min: u32, max: u32 },
}

/// Tunables trading recall against false positives.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionParams {
    /// Ratio between successive scanning window sizes.
    pub scale_factor: f64,
    /// Overlapping candidates required before a region is accepted.
    /// Zero disables grouping and returns every raw candidate.
    pub min_neighbors: u32,
    /// Smallest window side (pixels) worth scanning.
    pub min_face_size: u32,
    /// Largest window side (pixels); `None` means bounded by the image.
    pub max_face_size: Option<u32>,
}

impl Default for DetectionParams {
    fn default() -> Self {
        Self {
            scale_factor: DEFAULT_SCALE_FACTOR,
            min_neighbors: DEFAULT_MIN_NEIGHBORS,
            min_face_size: 0,
            max_face_size: None,
        }
    }
}

impl DetectionParams {
    pub fn validate(&self) -> Result<(), DetectionParamsError> {
        if !self.scale_factor.is_finite() || self.scale_factor <= 1.0 {
            return Err(DetectionParamsError::ScaleFactor(self.scale_factor));
        }
        if let Some(max) = self.max_face_size {
            if max < self.min_face_size {
                return Err(DetectionParamsError::SizeRange {
                    min: self.min_face_size,
                    max,
                });
            }
        }
        Ok(())
    }
}
