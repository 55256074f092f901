pub mod alpha_blend_compositor;
pub mod file_mask_catalog;
