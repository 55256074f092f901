use image::{ColorType, DynamicImage, RgbaImage};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("mask image has no alpha channel (color type {0:?})")]
pub struct NoAlphaChannel(pub ColorType);

/// Overlay image with a per-pixel alpha channel.
///
/// Construction refuses images whose color type lacks alpha, so every
/// value can be blended without further checks.
#[derive(Clone, Debug)]
pub struct MaskAsset {
    pixels: RgbaImage,
}

impl MaskAsset {
    pub fn from_image(image: DynamicImage) -> Result<Self, NoAlphaChannel> {
        let color = image.color();
        if !color.has_alpha() {
            return Err(NoAlphaChannel(color));
        }
        Ok(Self {
            pixels: image.into_rgba8(),
        })
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba};

    #[test]
    fn test_accepts_rgba() {
        let img = RgbaImage::from_pixel(4, 3, Rgba([1, 2, 3, 4]));
        let asset = MaskAsset::from_image(DynamicImage::ImageRgba8(img)).unwrap();
        assert_eq!((asset.width(), asset.height()), (4, 3));
        assert_eq!(asset.pixels().get_pixel(0, 0).0, [1, 2, 3, 4]);
    }

    #[test]
    fn test_accepts_luma_alpha() {
        let img = image::GrayAlphaImage::from_pixel(2, 2, image::LumaA([9, 200]));
        let asset = MaskAsset::from_image(DynamicImage::ImageLumaA8(img)).unwrap();
        assert_eq!(asset.pixels().get_pixel(1, 1).0, [9, 9, 9, 200]);
    }

    #[test]
    fn test_rejects_rgb() {
        let img = RgbImage::from_pixel(2, 2, Rgb([0, 0, 0]));
        let err = MaskAsset::from_image(DynamicImage::ImageRgb8(img)).unwrap_err();
        assert_eq!(err, NoAlphaChannel(ColorType::Rgb8));
    }
}
