//! Multi-scale sliding-window face locator over a boosted Haar cascade.
//!
//! The image is converted to BT.601 luma and scanned across a pyramid of
//! downscaled copies. Each level gets its own integral image, and windows
//! are tested at the model's native size. Raw hits are mapped back to
//! full-resolution coordinates and merged with [`group_rectangles`].

use std::borrow::Cow;
use std::sync::Arc;

use image::imageops::{self, FilterType};
use image::GrayImage;

use crate::detection::domain::detection_params::{DetectionParams, DetectionParamsError};
use crate::detection::domain::face_locator::{FaceLocator, LocateError};
use crate::shared::constants::GROUPING_EPS;
use crate::shared::face_box::FaceBox;
use crate::shared::raster::RasterImage;

use super::cascade_model::{CascadeModel, Verdict};
use super::integral_image::IntegralImage;
use super::rect_grouper::group_rectangles;

/// Pyramid levels above this scale are scanned with a 1 px step.
const FINE_STEP_SCALE: f64 = 2.0;

pub struct HaarCascadeLocator {
    model: Arc<CascadeModel>,
    params: DetectionParams,
}

impl HaarCascadeLocator {
    pub fn new(
        model: Arc<CascadeModel>,
        params: DetectionParams,
    ) -> Result<Self, DetectionParamsError> {
        params.validate()?;
        Ok(Self { model, params })
    }

    /// Every window the cascade accepts, before grouping.
    pub fn candidates(&self, image: &RasterImage) -> Result<Vec<FaceBox>, LocateError> {
        if image.is_empty() {
            return Err(LocateError::InvalidImage(format!(
                "zero-area image ({}x{})",
                image.width(),
                image.height()
            )));
        }
        let gray = to_luma(image);
        Ok(self.scan(&gray))
    }

    fn scan(&self, gray: &GrayImage) -> Vec<FaceBox> {
        let (img_w, img_h) = gray.dimensions();
        let (win_w, win_h) = self.model.window_size();
        let (max_w, max_h) = match self.params.max_face_size {
            Some(side) => (side.min(img_w), side.min(img_h)),
            None => (img_w, img_h),
        };
        let min_side = self.params.min_face_size;

        let mut candidates = Vec::new();
        let mut factor = 1.0_f64;
        loop {
            let window_w = (win_w as f64 * factor).round() as u32;
            let window_h = (win_h as f64 * factor).round() as u32;
            if window_w > max_w || window_h > max_h {
                break;
            }
            let scaled_w = (img_w as f64 / factor).round() as u32;
            let scaled_h = (img_h as f64 / factor).round() as u32;
            // A level no larger than the window has no scan positions.
            if scaled_w <= win_w || scaled_h <= win_h {
                break;
            }
            if window_w >= min_side && window_h >= min_side {
                let level = if (scaled_w, scaled_h) == (img_w, img_h) {
                    Cow::Borrowed(gray)
                } else {
                    Cow::Owned(imageops::resize(gray, scaled_w, scaled_h, FilterType::Triangle))
                };
                self.scan_level(&level, factor, (window_w, window_h), &mut candidates);
            }
            factor *= self.params.scale_factor;
        }

        log::debug!("Cascade scan produced {} raw candidates", candidates.len());
        candidates
    }

    fn scan_level(
        &self,
        level: &GrayImage,
        factor: f64,
        (window_w, window_h): (u32, u32),
        out: &mut Vec<FaceBox>,
    ) {
        let integral = IntegralImage::new(level);
        let (win_w, win_h) = self.model.window_size();
        let step = if factor > FINE_STEP_SCALE { 1 } else { 2 };
        // Window origins run over [0, level - window), exclusive.
        let (end_x, end_y) = (integral.width() - win_w, integral.height() - win_h);

        let mut y = 0;
        while y < end_y {
            let mut x = 0;
            while x < end_x {
                match self.model.evaluate(&integral, x, y) {
                    Verdict::Accepted => out.push(FaceBox::new(
                        (x as f64 * factor).round() as i32,
                        (y as f64 * factor).round() as i32,
                        window_w as i32,
                        window_h as i32,
                    )),
                    // Failing the very first stage means the neighbourhood is
                    // flat too; skip an extra step.
                    Verdict::RejectedAt(0) => x += step,
                    Verdict::RejectedAt(_) => {}
                }
                x += step;
            }
            y += step;
        }
    }
}

impl FaceLocator for HaarCascadeLocator {
    fn locate(&self, image: &RasterImage) -> Result<Vec<FaceBox>, LocateError> {
        let candidates = self.candidates(image)?;
        Ok(group_rectangles(
            &candidates,
            self.params.min_neighbors,
            GROUPING_EPS,
        ))
    }
}

/// BT.601 luma in 14-bit fixed point; any alpha channel is ignored.
fn to_luma(image: &RasterImage) -> GrayImage {
    let channels = image.channels() as usize;
    let luma: Vec<u8> = image
        .data()
        .chunks_exact(channels)
        .map(|px| {
            let (r, g, b) = (px[0] as u32, px[1] as u32, px[2] as u32);
            ((r * 4899 + g * 9617 + b * 1868 + 8192) >> 14) as u8
        })
        .collect();
    GrayImage::from_raw(image.width(), image.height(), luma)
        .expect("luma buffer length must match dimensions")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::infrastructure::cascade_model::tests::CENTER_SPOT_CASCADE;

    fn model() -> Arc<CascadeModel> {
        Arc::new(CascadeModel::from_xml(CENTER_SPOT_CASCADE).unwrap())
    }

    fn locator(params: DetectionParams) -> HaarCascadeLocator {
        HaarCascadeLocator::new(model(), params).unwrap()
    }

    /// 80x80 dark image with a bright 12x12 block at (34..46, 34..46).
    fn spot_image() -> RasterImage {
        let mut image = RasterImage::filled(80, 80, [0, 0, 0]);
        let width = image.width() as usize;
        let data = image.data_mut();
        for y in 34..46 {
            for x in 34..46 {
                let idx = (y * width + x) * 3;
                data[idx..idx + 3].copy_from_slice(&[255, 255, 255]);
            }
        }
        image
    }

    fn contains(b: &FaceBox, x: i32, y: i32) -> bool {
        b.x <= x && x < b.right() && b.y <= y && y < b.bottom()
    }

    #[test]
    fn test_finds_planted_spot() {
        let boxes = locator(DetectionParams::default())
            .locate(&spot_image())
            .unwrap();
        assert!(!boxes.is_empty());
        assert!(boxes.iter().any(|b| contains(b, 40, 40)), "{boxes:?}");
    }

    #[test]
    fn test_raw_candidates_surround_spot() {
        let raw = locator(DetectionParams::default())
            .candidates(&spot_image())
            .unwrap();
        // Native scale, row y = 28: x walks 0, 4, .., 20 (first-stage
        // rejections double the step), then fires from 24 through 34.
        for x in [24, 26, 28, 30, 32, 34] {
            assert!(raw.contains(&FaceBox::new(x, 28, 24, 24)), "missing x={x}");
        }
        assert!(!raw.contains(&FaceBox::new(20, 28, 24, 24)));
        assert!(!raw.contains(&FaceBox::new(22, 28, 24, 24)));
        assert!(!raw.contains(&FaceBox::new(36, 28, 24, 24)));
    }

    #[test]
    fn test_image_the_size_of_the_window_is_not_scanned() {
        // The spot sits exactly where the cascade fires on a single window,
        // but a level equal to the window size has no scan positions.
        let mut image = RasterImage::filled(24, 24, [0, 0, 0]);
        let data = image.data_mut();
        for y in 6..18 {
            for x in 6..18 {
                let idx = (y * 24 + x) * 3;
                data[idx..idx + 3].copy_from_slice(&[255, 255, 255]);
            }
        }
        let raw = locator(DetectionParams {
            min_neighbors: 0,
            ..DetectionParams::default()
        })
        .candidates(&image)
        .unwrap();
        assert!(raw.is_empty(), "{raw:?}");
    }

    #[test]
    fn test_scan_stops_before_last_origin() {
        let raw = locator(DetectionParams {
            max_face_size: Some(24),
            min_neighbors: 0,
            ..DetectionParams::default()
        })
        .candidates(&spot_image())
        .unwrap();
        assert!(!raw.is_empty());
        assert!(raw.iter().all(|b| b.x < 56 && b.y < 56), "{raw:?}");
    }

    #[test]
    fn test_uniform_image_has_no_faces() {
        let params = DetectionParams {
            min_neighbors: 0,
            ..DetectionParams::default()
        };
        let image = RasterImage::filled(64, 48, [128, 128, 128]);
        assert!(locator(params).locate(&image).unwrap().is_empty());
    }

    #[test]
    fn test_impossible_neighbor_count_yields_nothing() {
        let params = DetectionParams {
            min_neighbors: 1000,
            ..DetectionParams::default()
        };
        assert!(locator(params).locate(&spot_image()).unwrap().is_empty());
    }

    #[test]
    fn test_min_face_size_larger_than_image_scans_nothing() {
        let params = DetectionParams {
            min_face_size: 100,
            min_neighbors: 0,
            ..DetectionParams::default()
        };
        assert!(locator(params).locate(&spot_image()).unwrap().is_empty());
    }

    #[test]
    fn test_max_face_size_limits_window() {
        let params = DetectionParams {
            max_face_size: Some(24),
            min_neighbors: 0,
            ..DetectionParams::default()
        };
        let raw = locator(params).locate(&spot_image()).unwrap();
        assert!(!raw.is_empty());
        assert!(raw.iter().all(|b| b.width == 24 && b.height == 24));
    }

    #[test]
    fn test_repeated_runs_are_identical() {
        let locator = locator(DetectionParams::default());
        let image = spot_image();
        let first = locator.locate(&image).unwrap();
        let second = locator.locate(&image).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_zero_area_image_is_invalid() {
        let image = RasterImage::new(Vec::new(), 0, 0, 3);
        let err = locator(DetectionParams::default())
            .locate(&image)
            .unwrap_err();
        assert!(matches!(err, LocateError::InvalidImage(_)));
    }

    #[test]
    fn test_rgba_input_ignores_alpha() {
        let rgb = spot_image();
        let rgba_data: Vec<u8> = rgb
            .data()
            .chunks_exact(3)
            .flat_map(|px| [px[0], px[1], px[2], 7])
            .collect();
        let rgba = RasterImage::new(rgba_data, 80, 80, 4);
        let locator = locator(DetectionParams::default());
        assert_eq!(locator.locate(&rgba).unwrap(), locator.locate(&rgb).unwrap());
    }

    #[test]
    fn test_rejects_invalid_params() {
        let params = DetectionParams {
            scale_factor: 1.0,
            ..DetectionParams::default()
        };
        assert!(HaarCascadeLocator::new(model(), params).is_err());
    }

    #[test]
    fn test_luma_weights() {
        let image = RasterImage::new(vec![255, 0, 0, 0, 255, 0, 0, 0, 255, 255, 255, 255], 4, 1, 3);
        let luma = to_luma(&image);
        assert_eq!(luma.as_raw(), &vec![76, 150, 29, 255]);
    }
}
