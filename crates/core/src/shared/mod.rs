pub mod config;
pub mod constants;
pub mod face_box;
pub mod model_resolver;
pub mod raster;
