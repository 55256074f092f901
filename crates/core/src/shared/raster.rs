use image::{DynamicImage, RgbImage, RgbaImage};
use ndarray::{ArrayView3, ArrayViewMut3};

/// A decoded photo: contiguous RGB or RGBA bytes in row-major order.
///
/// Color channels always come first; a fourth channel, when present, is
/// the image's own alpha and is never touched by compositing.
#[derive(Clone, Debug, PartialEq)]
pub struct RasterImage {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
}

impl RasterImage {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8) -> Self {
        debug_assert!(
            channels == 3 || channels == 4,
            "raster must have 3 or 4 channels"
        );
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
        }
    }

    /// Solid-color RGB raster, mostly useful for fixtures.
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let data = rgb
            .iter()
            .copied()
            .cycle()
            .take((width as usize) * (height as usize) * 3)
            .collect();
        Self::new(data, width, height, 3)
    }

    pub fn from_rgb(image: RgbImage) -> Self {
        let (width, height) = image.dimensions();
        Self::new(image.into_raw(), width, height, 3)
    }

    pub fn from_rgba(image: RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self::new(image.into_raw(), width, height, 4)
    }

    /// Keeps an existing alpha channel, otherwise normalizes to 8-bit RGB.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        if image.color().has_alpha() {
            Self::from_rgba(image.into_rgba8())
        } else {
            Self::from_rgb(image.into_rgb8())
        }
    }

    pub fn into_dynamic(self) -> DynamicImage {
        let Self {
            data,
            width,
            height,
            channels,
        } = self;
        let image = if channels == 4 {
            RgbaImage::from_raw(width, height, data).map(DynamicImage::ImageRgba8)
        } else {
            RgbImage::from_raw(width, height, data).map(DynamicImage::ImageRgb8)
        };
        image.expect("RasterImage data length must match dimensions")
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn has_alpha(&self) -> bool {
        self.channels == 4
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Color of the pixel at `(x, y)`, ignoring alpha.
    pub fn rgb_at(&self, x: u32, y: u32) -> [u8; 3] {
        let idx = ((y as usize) * (self.width as usize) + x as usize) * self.channels as usize;
        [self.data[idx], self.data[idx + 1], self.data[idx + 2]]
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("RasterImage data length must match dimensions")
    }

    pub fn as_ndarray_mut(&mut self) -> ArrayViewMut3<'_, u8> {
        ArrayViewMut3::from_shape(self.shape(), &mut self.data)
            .expect("RasterImage data length must match dimensions")
    }

    fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construction_and_accessors() {
        let data = vec![0u8; 12]; // 2x2x3
        let raster = RasterImage::new(data.clone(), 2, 2, 3);
        assert_eq!(raster.width(), 2);
        assert_eq!(raster.height(), 2);
        assert_eq!(raster.channels(), 3);
        assert!(!raster.has_alpha());
        assert_eq!(raster.data(), &data[..]);
    }

    #[test]
    #[should_panic(expected = "data length must equal width * height * channels")]
    fn test_mismatched_data_length_panics_in_debug() {
        RasterImage::new(vec![0u8; 10], 2, 2, 3);
    }

    #[test]
    fn test_filled_sets_every_pixel() {
        let raster = RasterImage::filled(3, 2, [10, 20, 30]);
        assert_eq!(raster.data().len(), 18);
        assert_eq!(raster.rgb_at(0, 0), [10, 20, 30]);
        assert_eq!(raster.rgb_at(2, 1), [10, 20, 30]);
    }

    #[test]
    fn test_zero_dimension_is_empty() {
        assert!(RasterImage::new(Vec::new(), 0, 5, 3).is_empty());
        assert!(RasterImage::new(Vec::new(), 5, 0, 3).is_empty());
        assert!(!RasterImage::filled(1, 1, [0, 0, 0]).is_empty());
    }

    #[test]
    fn test_from_dynamic_keeps_alpha() {
        let rgba = RgbaImage::from_pixel(4, 3, image::Rgba([1, 2, 3, 4]));
        let raster = RasterImage::from_dynamic(DynamicImage::ImageRgba8(rgba));
        assert_eq!(raster.channels(), 4);
        assert_eq!(&raster.data()[..4], &[1, 2, 3, 4]);
    }

    #[test]
    fn test_from_dynamic_converts_luma_to_rgb() {
        let gray = image::GrayImage::from_pixel(2, 2, image::Luma([77]));
        let raster = RasterImage::from_dynamic(DynamicImage::ImageLuma8(gray));
        assert_eq!(raster.channels(), 3);
        assert_eq!(raster.rgb_at(1, 1), [77, 77, 77]);
    }

    #[test]
    fn test_into_dynamic_preserves_pixels() {
        let raster = RasterImage::filled(5, 4, [50, 100, 200]);
        let rgb = raster.into_dynamic().into_rgb8();
        assert_eq!(rgb.dimensions(), (5, 4));
        assert_eq!(rgb.get_pixel(4, 3).0, [50, 100, 200]);
    }

    #[test]
    fn test_as_ndarray_shape() {
        let raster = RasterImage::new(vec![0u8; 32], 4, 2, 4);
        assert_eq!(raster.as_ndarray().shape(), &[2, 4, 4]); // (height, width, channels)
    }

    #[test]
    fn test_as_ndarray_mut_modification() {
        let mut raster = RasterImage::new(vec![0u8; 12], 2, 2, 3);
        {
            let mut arr = raster.as_ndarray_mut();
            arr[[1, 0, 2]] = 128; // row=1, col=0, B channel
        }
        assert_eq!(raster.rgb_at(0, 1), [0, 0, 128]);
    }
}
