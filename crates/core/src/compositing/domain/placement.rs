use crate::shared::face_box::FaceBox;

/// Destination rectangle of a resized mask within the base image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Placement {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Placement {
    /// Covers the whole face box.
    pub fn full(face: &FaceBox) -> Self {
        Self {
            x: face.x,
            y: face.y,
            width: face.width.max(0) as u32,
            height: face.height.max(0) as u32,
        }
    }

    /// Horizontal band over the upper-middle half of the face box.
    pub fn eye_band(face: &FaceBox) -> Self {
        let height = face.height.max(0);
        Self {
            x: face.x,
            y: face.y + height / 4,
            width: face.width.max(0) as u32,
            height: (height / 2) as u32,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// True when clamping to a `width x height` image leaves the rectangle
    /// unchanged.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        let (x0, y0) = (self.x as i64, self.y as i64);
        let (x1, y1) = (x0 + self.width as i64, y0 + self.height as i64);
        x0 >= 0 && y0 >= 0 && x1 <= width as i64 && y1 <= height as i64
    }

    pub fn as_face_box(&self) -> FaceBox {
        FaceBox::new(self.x, self.y, self.width as i32, self.height as i32)
    }
}
