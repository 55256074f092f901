use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::compositing::domain::asset_catalog::{AssetCatalog, AssetError};
use crate::compositing::domain::mask_asset::MaskAsset;
use crate::compositing::domain::mask_style::MaskStyle;
use crate::shared::constants::{EYE_MASK_FILENAME, FACE_MASK_FILENAME};

/// Mask overlays read from disk once, at construction.
///
/// A style whose file cannot be loaded stays unavailable for the lifetime
/// of the catalog; requests for it return the load error.
pub struct FileMaskCatalog {
    entries: HashMap<MaskStyle, Result<Arc<MaskAsset>, AssetError>>,
}

impl FileMaskCatalog {
    pub fn load(eye_mask: &Path, face_mask: &Path) -> Self {
        let entries = [(MaskStyle::EyeMask, eye_mask), (MaskStyle::FaceMask, face_mask)]
            .into_iter()
            .map(|(style, path)| {
                let entry = load_asset(path).map(Arc::new);
                match &entry {
                    Ok(asset) => log::info!(
                        "Loaded {style} overlay {} ({}x{})",
                        path.display(),
                        asset.width(),
                        asset.height()
                    ),
                    Err(e) => log::error!("{e}"),
                }
                (style, entry)
            })
            .collect();
        Self { entries }
    }

    /// Loads `mask_eye.png` and `mask_face.png` from `dir`.
    pub fn from_dir(dir: &Path) -> Self {
        Self::load(&dir.join(EYE_MASK_FILENAME), &dir.join(FACE_MASK_FILENAME))
    }

    pub fn available_styles(&self) -> Vec<MaskStyle> {
        MaskStyle::ALL
            .into_iter()
            .filter(|s| matches!(self.entries.get(s), Some(Ok(_))))
            .collect()
    }
}

impl AssetCatalog for FileMaskCatalog {
    fn asset(&self, style: MaskStyle) -> Result<Arc<MaskAsset>, AssetError> {
        let entry = self.entries.get(&style).cloned().unwrap_or_else(|| {
            Err(AssetError::Missing {
                path: PathBuf::new(),
                reason: format!("no overlay registered for {style}"),
            })
        });
        if let Err(e) = &entry {
            log::error!("Requested {style} overlay is unavailable: {e}");
        }
        entry
    }
}

fn load_asset(path: &Path) -> Result<MaskAsset, AssetError> {
    let image = image::open(path).map_err(|e| AssetError::Missing {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    MaskAsset::from_image(image).map_err(|source| AssetError::Invalid {
        path: path.to_path_buf(),
        source,
    })
}
