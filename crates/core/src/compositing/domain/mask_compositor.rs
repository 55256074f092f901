use crate::shared::face_box::FaceBox;
use crate::shared::raster::RasterImage;

use super::mask_asset::MaskAsset;
use super::mask_style::MaskStyle;

/// Why a face was left untouched.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// The placed mask would extend past the image edge.
    RegionOutOfBounds,
    /// The placement has zero width or height.
    EmptyRegion,
}

/// Result of compositing onto one face. Both variants hand the image back.
#[derive(Debug)]
pub enum Composition {
    Applied { image: RasterImage, region: FaceBox },
    Skipped { image: RasterImage, reason: SkipReason },
}

impl Composition {
    pub fn into_image(self) -> RasterImage {
        match self {
            Composition::Applied { image, .. } | Composition::Skipped { image, .. } => image,
        }
    }
}

/// Blends a mask onto one face of an image.
///
/// Takes ownership of the image and returns it, modified or not, inside
/// the [`Composition`].
pub trait MaskCompositor: Send + Sync {
    fn composite(
        &self,
        image: RasterImage,
        face: &FaceBox,
        style: MaskStyle,
        asset: &MaskAsset,
    ) -> Composition;
}
