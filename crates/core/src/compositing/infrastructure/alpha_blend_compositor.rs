use std::borrow::Cow;

use image::{imageops, RgbaImage};
use ndarray::{s, ArrayView3, Axis, Zip};

use crate::compositing::domain::mask_asset::MaskAsset;
use crate::compositing::domain::mask_compositor::{Composition, MaskCompositor, SkipReason};
use crate::compositing::domain::mask_style::MaskStyle;
use crate::compositing::domain::resize_filter::ResizeFilter;
use crate::shared::face_box::FaceBox;
use crate::shared::raster::RasterImage;

/// Straight-alpha "over" compositing on the CPU.
///
/// The mask is resized to the style's placement (alpha included) and each
/// color channel becomes `a * mask + (1 - a) * base`, rounded to nearest.
/// A base alpha channel, if present, is never written.
pub struct AlphaBlendCompositor {
    filter: ResizeFilter,
}

impl AlphaBlendCompositor {
    pub fn new(filter: ResizeFilter) -> Self {
        Self { filter }
    }

    fn resized<'a>(&self, asset: &'a MaskAsset, width: u32, height: u32) -> Cow<'a, RgbaImage> {
        if asset.pixels().dimensions() == (width, height) {
            Cow::Borrowed(asset.pixels())
        } else {
            Cow::Owned(imageops::resize(
                asset.pixels(),
                width,
                height,
                self.filter.filter_type(),
            ))
        }
    }
}

impl Default for AlphaBlendCompositor {
    fn default() -> Self {
        Self::new(ResizeFilter::default())
    }
}

impl MaskCompositor for AlphaBlendCompositor {
    fn composite(
        &self,
        mut image: RasterImage,
        face: &FaceBox,
        style: MaskStyle,
        asset: &MaskAsset,
    ) -> Composition {
        let placement = style.placement(face);

        if placement.is_empty() {
            log::warn!("Skipping face {face}: {style} placement is empty");
            return Composition::Skipped {
                image,
                reason: SkipReason::EmptyRegion,
            };
        }
        if !placement.fits_within(image.width(), image.height()) {
            log::warn!(
                "Skipping face {face}: {style} mask at {} exceeds {}x{} image",
                placement.as_face_box(),
                image.width(),
                image.height()
            );
            return Composition::Skipped {
                image,
                reason: SkipReason::RegionOutOfBounds,
            };
        }

        let mask = self.resized(asset, placement.width, placement.height);
        blend_into(&mut image, &mask, placement.x as usize, placement.y as usize);

        Composition::Applied {
            image,
            region: placement.as_face_box(),
        }
    }
}

/// Blends `mask` over `image` with its top-left corner at `(x0, y0)`.
/// The caller guarantees the mask fits.
fn blend_into(image: &mut RasterImage, mask: &RgbaImage, x0: usize, y0: usize) {
    let (w, h) = (mask.width() as usize, mask.height() as usize);
    let mask = ArrayView3::from_shape((h, w, 4), mask.as_raw().as_slice())
        .expect("RGBA buffer length must match dimensions");

    let mut base = image.as_ndarray_mut();
    let mut region = base.slice_mut(s![y0..y0 + h, x0..x0 + w, ..]);

    Zip::from(region.lanes_mut(Axis(2)))
        .and(mask.lanes(Axis(2)))
        .for_each(|mut dst, src| {
            let alpha = src[3] as u32;
            for c in 0..3 {
                dst[c] = blend_channel(src[c], dst[c], alpha);
            }
        });
}

#[inline]
fn blend_channel(mask: u8, base: u8, alpha: u32) -> u8 {
    let weighted = alpha * mask as u32 + (255 - alpha) * base as u32;
    ((weighted + 127) / 255).min(255) as u8
}
