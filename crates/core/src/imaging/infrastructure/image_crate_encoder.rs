use std::borrow::Cow;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder as _};

use crate::imaging::domain::image_encoder::{EncodeError, ImageEncoder, OutputFormat};
use crate::shared::raster::RasterImage;

/// Encodes rasters with the `image` crate's JPEG and PNG codecs.
///
/// JPEG has no alpha, so an RGBA raster is flattened to its color
/// channels first. PNG keeps alpha.
pub struct ImageCrateEncoder;

impl ImageCrateEncoder {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ImageCrateEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageEncoder for ImageCrateEncoder {
    fn encode(&self, image: &RasterImage, format: OutputFormat) -> Result<Vec<u8>, EncodeError> {
        let (w, h) = (image.width(), image.height());
        let mut buf = Vec::new();
        let wrap = |source| EncodeError::Image {
            format: format.name(),
            source,
        };

        match format {
            OutputFormat::Jpeg { quality } => {
                if !(1..=100).contains(&quality) {
                    return Err(EncodeError::InvalidQuality(quality));
                }
                let rgb = color_only(image);
                JpegEncoder::new_with_quality(&mut buf, quality)
                    .write_image(&rgb, w, h, ExtendedColorType::Rgb8)
                    .map_err(wrap)?;
            }
            OutputFormat::Png => {
                let color = if image.has_alpha() {
                    ExtendedColorType::Rgba8
                } else {
                    ExtendedColorType::Rgb8
                };
                PngEncoder::new(&mut buf)
                    .write_image(image.data(), w, h, color)
                    .map_err(wrap)?;
            }
        }
        Ok(buf)
    }
}

fn color_only(image: &RasterImage) -> Cow<'_, [u8]> {
    if image.has_alpha() {
        Cow::Owned(
            image
                .data()
                .chunks_exact(4)
                .flat_map(|px| [px[0], px[1], px[2]])
                .collect(),
        )
    } else {
        Cow::Borrowed(image.data())
    }
}
