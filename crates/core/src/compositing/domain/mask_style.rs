use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::shared::constants::{EYE_MASK_TOKEN, FACE_MASK_TOKEN};
use crate::shared::face_box::FaceBox;

use super::placement::Placement;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown mask style {0:?} (expected \"mask_eye\" or \"mask_face\")")]
pub struct UnknownStyle(pub String);

/// Overlay style chosen by a user.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MaskStyle {
    #[serde(rename = "mask_eye")]
    EyeMask,
    #[default]
    #[serde(rename = "mask_face")]
    FaceMask,
}

impl MaskStyle {
    pub const ALL: [MaskStyle; 2] = [MaskStyle::EyeMask, MaskStyle::FaceMask];

    /// Wire token used by the chat layer's callback data.
    pub fn token(self) -> &'static str {
        match self {
            MaskStyle::EyeMask => EYE_MASK_TOKEN,
            MaskStyle::FaceMask => FACE_MASK_TOKEN,
        }
    }

    /// Where the resized mask lands for a given face.
    pub fn placement(self, face: &FaceBox) -> Placement {
        match self {
            MaskStyle::EyeMask => Placement::eye_band(face),
            MaskStyle::FaceMask => Placement::full(face),
        }
    }
}

impl FromStr for MaskStyle {
    type Err = UnknownStyle;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            EYE_MASK_TOKEN => Ok(MaskStyle::EyeMask),
            FACE_MASK_TOKEN => Ok(MaskStyle::FaceMask),
            other => Err(UnknownStyle(other.to_string())),
        }
    }
}

impl fmt::Display for MaskStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}
