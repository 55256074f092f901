pub mod asset_catalog;
pub mod mask_asset;
pub mod mask_compositor;
pub mod mask_style;
pub mod placement;
pub mod resize_filter;
