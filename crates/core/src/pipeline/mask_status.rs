use std::fmt;

/// User-facing result of one photo request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MaskStatus {
    Success,
    NoFaceDetected,
    AssetUnavailable,
    DecodeFailed,
}

impl MaskStatus {
    pub const ALL: [MaskStatus; 4] = [
        MaskStatus::Success,
        MaskStatus::NoFaceDetected,
        MaskStatus::AssetUnavailable,
        MaskStatus::DecodeFailed,
    ];

    /// Reply text for the chat layer.
    pub fn user_message(self) -> &'static str {
        match self {
            MaskStatus::Success => "Mask applied!",
            MaskStatus::NoFaceDetected => "No face detected, try a clearer photo.",
            MaskStatus::AssetUnavailable => {
                "Something went wrong on our side, please try again later."
            }
            MaskStatus::DecodeFailed => "Could not read the photo, please send it again.",
        }
    }

    pub fn is_success(self) -> bool {
        self == MaskStatus::Success
    }
}

impl fmt::Display for MaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MaskStatus::Success => "success",
            MaskStatus::NoFaceDetected => "no_face_detected",
            MaskStatus::AssetUnavailable => "asset_unavailable",
            MaskStatus::DecodeFailed => "decode_failed",
        };
        f.write_str(name)
    }
}
