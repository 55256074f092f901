use std::path::PathBuf;

use thiserror::Error;

use crate::compositing::domain::mask_style::MaskStyle;

use super::user_id::UserId;

#[derive(Error, Debug)]
pub enum PreferenceError {
    #[error("failed to read preferences {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write preferences {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("preferences file {path} is malformed: {source}")]
    Format {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Last style each user chose. Only the most recent choice is kept.
///
/// Shared between concurrent requests; implementations synchronize
/// internally and the last writer wins.
pub trait PreferenceStore: Send + Sync {
    /// `None` when the user never chose a style.
    fn style_for(&self, user: UserId) -> Option<MaskStyle>;

    fn set_style(&self, user: UserId, style: MaskStyle);
}
