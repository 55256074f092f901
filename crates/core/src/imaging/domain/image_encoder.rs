use thiserror::Error;

use crate::shared::constants::DEFAULT_JPEG_QUALITY;
use crate::shared::raster::RasterImage;

#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("JPEG quality must be 1-100, got {0}")]
    InvalidQuality(u8),
    #[error("failed to encode {format}: {source}")]
    Image {
        format: &'static str,
        #[source]
        source: image::ImageError,
    },
}

/// Container format of the returned photo.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Jpeg { quality: u8 },
    Png,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg { .. } => "jpg",
            OutputFormat::Png => "png",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg { .. } => "JPEG",
            OutputFormat::Png => "PNG",
        }
    }
}

impl Default for OutputFormat {
    fn default() -> Self {
        OutputFormat::Jpeg {
            quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

/// Serializes a raster into an encoded photo buffer.
pub trait ImageEncoder: Send + Sync {
    fn encode(&self, image: &RasterImage, format: OutputFormat) -> Result<Vec<u8>, EncodeError>;
}
