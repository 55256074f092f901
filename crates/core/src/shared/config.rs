use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::compositing::domain::resize_filter::ResizeFilter;
use crate::detection::domain::detection_params::{DetectionParams, DetectionParamsError};
use crate::imaging::domain::image_encoder::OutputFormat;
use crate::shared::constants::{
    APP_DIR_NAME, DEFAULT_ASSET_DIR, DEFAULT_JPEG_QUALITY, EYE_MASK_FILENAME, FACE_MASK_FILENAME,
};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("config {path} is malformed: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid detection settings: {0}")]
    Detection(#[from] DetectionParamsError),
    #[error("jpeg_quality must be 1-100, got {0}")]
    JpegQuality(u8),
    #[error("workers must be at least 1")]
    Workers,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetsConfig {
    pub dir: PathBuf,
    pub eye_mask: String,
    pub face_mask: String,
}

impl AssetsConfig {
    pub fn eye_mask_path(&self) -> PathBuf {
        self.dir.join(&self.eye_mask)
    }

    pub fn face_mask_path(&self) -> PathBuf {
        self.dir.join(&self.face_mask)
    }
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(DEFAULT_ASSET_DIR),
            eye_mask: EYE_MASK_FILENAME.to_string(),
            face_mask: FACE_MASK_FILENAME.to_string(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    #[default]
    Jpeg,
    Png,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputKind,
    pub jpeg_quality: u8,
}

impl OutputConfig {
    pub fn output_format(&self) -> OutputFormat {
        match self.format {
            OutputKind::Jpeg => OutputFormat::Jpeg {
                quality: self.jpeg_quality,
            },
            OutputKind::Png => OutputFormat::Png,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputKind::Jpeg,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

/// Settings for a masking service instance. Every field is optional in
/// the JSON file.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaskerConfig {
    pub detection: DetectionParams,
    pub assets: AssetsConfig,
    /// Explicit cascade XML; resolved through the model cache when unset.
    pub cascade_path: Option<PathBuf>,
    pub output: OutputConfig,
    pub resize_filter: ResizeFilter,
    /// Worker threads for batch processing; defaults to available cores.
    pub workers: Option<usize>,
}

impl MaskerConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Loads `explicit` if given, otherwise the platform default location.
    /// A missing default file yields the built-in defaults; a missing
    /// explicit file is an error.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let Some(path) = Self::default_path() else {
            return Ok(Self::default());
        };
        match Self::load(&path) {
            Err(ConfigError::Read { source, .. }) if source.kind() == ErrorKind::NotFound => {
                Ok(Self::default())
            }
            other => other,
        }
    }

    /// Platform config location, e.g. `~/.config/FaceMask/config.json`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_DIR_NAME).join("config.json"))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.detection.validate()?;
        if !(1..=100).contains(&self.output.jpeg_quality) {
            return Err(ConfigError::JpegQuality(self.output.jpeg_quality));
        }
        if self.workers == Some(0) {
            return Err(ConfigError::Workers);
        }
        Ok(())
    }

    pub fn worker_count(&self) -> usize {
        self.workers.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }
}
