use thiserror::Error;

use crate::shared::face_box::FaceBox;
use crate::shared::raster::RasterImage;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LocateError {
    #[error("invalid image: {0}")]
    InvalidImage(String),
}

/// Domain interface for finding faces in a decoded photo.
///
/// Implementations are pure over their input and loaded model, so one
/// instance is shared by every worker (`&self`, `Sync`). Boxes come back in
/// the detector's native scan order; callers act on the first one only.
/// No faces is `Ok(vec![])`, not an error.
pub trait FaceLocator: Send + Sync {
    fn locate(&self, image: &RasterImage) -> Result<Vec<FaceBox>, LocateError>;
}
