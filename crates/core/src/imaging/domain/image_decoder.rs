use thiserror::Error;

use crate::shared::raster::RasterImage;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("photo data is empty")]
    Empty,
    #[error("photo could not be decoded: {0}")]
    Malformed(String),
    #[error("photo has zero area ({width}x{height})")]
    ZeroArea { width: u32, height: u32 },
}

/// Turns encoded photo bytes into a raster.
pub trait ImageDecoder: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<RasterImage, DecodeError>;
}
