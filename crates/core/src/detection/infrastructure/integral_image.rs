use image::GrayImage;

/// Summed-area tables of pixel values and squared pixel values.
///
/// Both tables are `(width + 1) x (height + 1)` with a zero first row and
/// column, so any rectangle sum costs four lookups.
pub struct IntegralImage {
    width: u32,
    height: u32,
    sum: Vec<u64>,
    sq_sum: Vec<u64>,
}

impl IntegralImage {
    pub fn new(gray: &GrayImage) -> Self {
        let (width, height) = gray.dimensions();
        let stride = width as usize + 1;
        let mut sum = vec![0u64; stride * (height as usize + 1)];
        let mut sq_sum = vec![0u64; sum.len()];

        for (y, row) in gray.rows().enumerate() {
            let mut row_sum = 0u64;
            let mut row_sq = 0u64;
            for (x, pixel) in row.enumerate() {
                let v = pixel.0[0] as u64;
                row_sum += v;
                row_sq += v * v;
                let idx = (y + 1) * stride + x + 1;
                sum[idx] = sum[idx - stride] + row_sum;
                sq_sum[idx] = sq_sum[idx - stride] + row_sq;
            }
        }

        Self {
            width,
            height,
            sum,
            sq_sum,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Sum of pixels in `[x, x + w) x [y, y + h)`. The rectangle must lie inside the image.
    pub fn rect_sum(&self, x: u32, y: u32, w: u32, h: u32) -> u64 {
        Self::lookup(&self.sum, self.stride(), x, y, w, h)
    }

    /// Sum of squared pixels over the same rectangle convention as [`Self::rect_sum`].
    pub fn rect_sq_sum(&self, x: u32, y: u32, w: u32, h: u32) -> u64 {
        Self::lookup(&self.sq_sum, self.stride(), x, y, w, h)
    }

    fn stride(&self) -> usize {
        self.width as usize + 1
    }

    fn lookup(table: &[u64], stride: usize, x: u32, y: u32, w: u32, h: u32) -> u64 {
        let (x0, y0) = (x as usize, y as usize);
        let (x1, y1) = (x0 + w as usize, y0 + h as usize);
        table[y1 * stride + x1] + table[y0 * stride + x0]
            - table[y0 * stride + x1]
            - table[y1 * stride + x0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(width: u32, height: u32) -> GrayImage {
        GrayImage::from_fn(width, height, |x, y| image::Luma([(x + y * width) as u8]))
    }

    fn brute_sum(gray: &GrayImage, x: u32, y: u32, w: u32, h: u32) -> (u64, u64) {
        let mut s = 0;
        let mut sq = 0;
        for yy in y..y + h {
            for xx in x..x + w {
                let v = gray.get_pixel(xx, yy).0[0] as u64;
                s += v;
                sq += v * v;
            }
        }
        (s, sq)
    }

    #[test]
    fn test_full_image_sum() {
        let gray = GrayImage::from_pixel(4, 3, image::Luma([2]));
        let integral = IntegralImage::new(&gray);
        assert_eq!(integral.rect_sum(0, 0, 4, 3), 24);
        assert_eq!(integral.rect_sq_sum(0, 0, 4, 3), 48);
    }

    #[test]
    fn test_sub_rectangles_match_brute_force() {
        let gray = ramp(7, 5);
        let integral = IntegralImage::new(&gray);
        for &(x, y, w, h) in &[(0, 0, 1, 1), (2, 1, 3, 2), (6, 4, 1, 1), (1, 0, 6, 5)] {
            assert_eq!(
                (integral.rect_sum(x, y, w, h), integral.rect_sq_sum(x, y, w, h)),
                brute_sum(&gray, x, y, w, h),
                "rect ({x}, {y}, {w}, {h})"
            );
        }
    }

    #[test]
    fn test_empty_rectangle_is_zero() {
        let integral = IntegralImage::new(&ramp(3, 3));
        assert_eq!(integral.rect_sum(1, 1, 0, 2), 0);
    }

    #[test]
    fn test_dimensions() {
        let integral = IntegralImage::new(&ramp(9, 4));
        assert_eq!((integral.width(), integral.height()), (9, 4));
    }
}
