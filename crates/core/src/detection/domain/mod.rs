pub mod detection_params;
pub mod face_locator;
