use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use super::mask_asset::{MaskAsset, NoAlphaChannel};
use super::mask_style::MaskStyle;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssetError {
    #[error("overlay asset unavailable: {path}: {reason}")]
    Missing { path: PathBuf, reason: String },
    #[error("overlay asset {path} is invalid: {source}")]
    Invalid {
        path: PathBuf,
        #[source]
        source: NoAlphaChannel,
    },
}

/// Read-only catalog of mask overlays, one per style.
pub trait AssetCatalog: Send + Sync {
    fn asset(&self, style: MaskStyle) -> Result<Arc<MaskAsset>, AssetError>;
}
