pub mod in_memory_preference_store;
pub mod json_file_preference_store;
