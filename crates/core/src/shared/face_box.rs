use std::fmt;

/// Axis-aligned face bounding box in pixel coordinates, top-left origin.
///
/// Boxes carry no identity beyond their position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FaceBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl FaceBox {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    pub fn area(&self) -> i64 {
        self.width.max(0) as i64 * self.height.max(0) as i64
    }

    /// True when `self` lies within `other` grown by `(dx, dy)` on every side.
    pub fn is_inside(&self, other: &FaceBox, dx: i32, dy: i32) -> bool {
        self.x >= other.x - dx
            && self.y >= other.y - dy
            && self.right() <= other.right() + dx
            && self.bottom() <= other.bottom() + dy
    }
}

impl fmt::Display for FaceBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "x={} y={} w={} h={}",
            self.x, self.y, self.width, self.height
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_edges() {
        let b = FaceBox::new(10, 20, 100, 80);
        assert_eq!(b.right(), 110);
        assert_eq!(b.bottom(), 100);
        assert_eq!(b.area(), 8000);
    }

    #[test]
    fn test_negative_size_has_zero_area() {
        assert_eq!(FaceBox::new(0, 0, -5, 10).area(), 0);
    }

    #[rstest]
    #[case::fully_inside(FaceBox::new(10, 10, 20, 20), 0, true)]
    #[case::touching_edges(FaceBox::new(0, 0, 100, 100), 0, true)]
    #[case::spills_right(FaceBox::new(90, 10, 20, 20), 0, false)]
    #[case::spills_within_slack(FaceBox::new(90, 10, 20, 20), 10, true)]
    fn test_is_inside(#[case] inner: FaceBox, #[case] slack: i32, #[case] expected: bool) {
        let outer = FaceBox::new(0, 0, 100, 100);
        assert_eq!(inner.is_inside(&outer, slack, slack), expected);
    }

    #[test]
    fn test_display() {
        assert_eq!(FaceBox::new(1, 2, 3, 4).to_string(), "x=1 y=2 w=3 h=4");
    }
}
