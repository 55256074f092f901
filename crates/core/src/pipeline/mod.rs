pub mod infrastructure;
pub mod mask_photo_use_case;
pub mod mask_status;
pub mod photo_executor;
pub mod pipeline_logger;
