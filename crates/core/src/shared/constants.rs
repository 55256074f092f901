pub const CASCADE_MODEL_NAME: &str = "haarcascade_frontalface_default.xml";
pub const CASCADE_MODEL_URL: &str =
    "https://raw.githubusercontent.com/opencv/opencv/4.x/data/haarcascades/haarcascade_frontalface_default.xml";

/// Window size ratio between successive pyramid levels.
pub const DEFAULT_SCALE_FACTOR: f64 = 1.3;

/// Overlapping candidates a region needs before it counts as a face.
pub const DEFAULT_MIN_NEIGHBORS: u32 = 5;

/// Similarity tolerance used when grouping candidate windows.
pub const GROUPING_EPS: f64 = 0.2;

pub const EYE_MASK_TOKEN: &str = "mask_eye";
pub const FACE_MASK_TOKEN: &str = "mask_face";

pub const EYE_MASK_FILENAME: &str = "mask_eye.png";
pub const FACE_MASK_FILENAME: &str = "mask_face.png";
pub const DEFAULT_ASSET_DIR: &str = "assets";

pub const DEFAULT_JPEG_QUALITY: u8 = 95;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];

/// Directory name used under the platform cache/config roots.
pub const APP_DIR_NAME: &str = "FaceMask";
