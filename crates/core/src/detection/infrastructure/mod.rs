pub mod cascade_model;
pub mod haar_cascade_locator;
pub mod integral_image;
mod math;
pub mod rect_grouper;
