pub mod compositing;
pub mod detection;
pub mod imaging;
pub mod pipeline;
pub mod preferences;
pub mod shared;
