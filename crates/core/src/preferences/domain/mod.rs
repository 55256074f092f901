pub mod preference_store;
pub mod user_id;
