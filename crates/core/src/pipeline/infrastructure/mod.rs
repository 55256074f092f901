pub mod threaded_photo_executor;
