pub mod image_crate_decoder;
pub mod image_crate_encoder;
