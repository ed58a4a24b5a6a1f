use serde::Serialize;

/// A face candidate as reported by a detector, in source-image pixels.
///
/// Coordinates are not clamped: detectors may report boxes that extend
/// past the image edges.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub confidence: f32,
}

impl BoundingBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32, confidence: f32) -> Self {
        Self {
            x1,
            y1,
            x2,
            y2,
            confidence,
        }
    }

    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    /// Truncates to integers and clips each axis to the image bounds.
    ///
    /// Always satisfies `0 <= x1 <= x2 <= width` and `0 <= y1 <= y2 <= height`.
    /// A box lying entirely outside the image collapses to zero area.
    pub fn clip_to(&self, width: u32, height: u32) -> CropRect {
        let (x1, x2) = clip_axis(self.x1, self.x2, width);
        let (y1, y2) = clip_axis(self.y1, self.y2, height);
        CropRect { x1, y1, x2, y2 }
    }

    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let ix1 = self.x1.max(other.x1);
        let iy1 = self.y1.max(other.y1);
        let ix2 = self.x2.min(other.x2);
        let iy2 = self.y2.min(other.y2);

        let inter = (ix2 - ix1).max(0.0) * (iy2 - iy1).max(0.0);
        if inter == 0.0 {
            return 0.0;
        }
        let area_a = self.width() * self.height();
        let area_b = other.width() * other.height();
        inter / (area_a + area_b - inter)
    }
}

fn clip_axis(lo: f32, hi: f32, limit: u32) -> (u32, u32) {
    let limit = i64::from(limit);
    // `as` truncates toward zero and saturates NaN to 0.
    let lo = (lo as i64).clamp(0, limit);
    let hi = (hi as i64).clamp(0, limit);
    (lo as u32, hi.max(lo) as u32)
}

/// Integer crop window inside an image, already clipped to its bounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct CropRect {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

impl CropRect {
    pub fn width(&self) -> u32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> u32 {
        self.y2 - self.y1
    }

    pub fn area(&self) -> u64 {
        u64::from(self.width()) * u64::from(self.height())
    }

    pub fn is_empty(&self) -> bool {
        self.area() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    fn bbox(x1: f32, y1: f32, x2: f32, y2: f32) -> BoundingBox {
        BoundingBox::new(x1, y1, x2, y2, 0.95)
    }

    fn rect(x1: u32, y1: u32, x2: u32, y2: u32) -> CropRect {
        CropRect { x1, y1, x2, y2 }
    }

    // ── Clipping ─────────────────────────────────────────────────────

    #[rstest]
    #[case::inside(bbox(50.0, 50.0, 150.0, 150.0), rect(50, 50, 150, 150))]
    #[case::truncates_fractions(bbox(10.9, 20.2, 30.7, 40.99), rect(10, 20, 30, 40))]
    #[case::negative_origin(bbox(-15.0, -3.5, 40.0, 60.0), rect(0, 0, 40, 60))]
    #[case::overflows_far_edge(bbox(150.0, 180.0, 260.0, 400.0), rect(150, 180, 200, 200))]
    #[case::entirely_right_below(bbox(250.0, 250.0, 300.0, 300.0), rect(200, 200, 200, 200))]
    #[case::entirely_left_above(bbox(-90.0, -90.0, -10.0, -10.0), rect(0, 0, 0, 0))]
    #[case::inverted_box(bbox(120.0, 80.0, 60.0, 90.0), rect(120, 80, 120, 90))]
    fn test_clip_to(#[case] input: BoundingBox, #[case] expected: CropRect) {
        assert_eq!(input.clip_to(200, 200), expected);
    }

    #[test]
    fn test_clip_handles_nan() {
        let r = bbox(f32::NAN, 10.0, 50.0, f32::NAN).clip_to(100, 100);
        assert_eq!(r.x1, 0);
        assert!(r.y2 >= r.y1);
    }

    #[rstest]
    #[case(-1e9, -1e9, 1e9, 1e9)]
    #[case(0.0, 0.0, 0.0, 0.0)]
    #[case(63.2, 400.0, 10.0, -5.0)]
    #[case(199.999, 199.999, 200.001, 200.001)]
    fn test_clip_invariant_holds(#[case] x1: f32, #[case] y1: f32, #[case] x2: f32, #[case] y2: f32) {
        let (w, h) = (200, 120);
        let r = bbox(x1, y1, x2, y2).clip_to(w, h);
        assert!(r.x1 <= r.x2 && r.x2 <= w);
        assert!(r.y1 <= r.y2 && r.y2 <= h);
    }

    // ── CropRect ─────────────────────────────────────────────────────

    #[test]
    fn test_crop_rect_dimensions() {
        let r = rect(10, 20, 110, 70);
        assert_eq!(r.width(), 100);
        assert_eq!(r.height(), 50);
        assert_eq!(r.area(), 5000);
        assert!(!r.is_empty());
    }

    #[rstest]
    #[case::zero_width(rect(5, 5, 5, 50))]
    #[case::zero_height(rect(5, 5, 50, 5))]
    fn test_crop_rect_empty(#[case] r: CropRect) {
        assert!(r.is_empty());
    }

    // ── IoU ──────────────────────────────────────────────────────────

    #[test]
    fn test_iou_identical() {
        let a = bbox(10.0, 10.0, 110.0, 110.0);
        assert_relative_eq!(a.iou(&a), 1.0);
    }

    #[test]
    fn test_iou_partial_overlap() {
        // intersection 50x100 = 5000, union 15000
        let a = bbox(0.0, 0.0, 100.0, 100.0);
        let b = bbox(50.0, 0.0, 150.0, 100.0);
        assert_relative_eq!(a.iou(&b), 5000.0 / 15000.0);
    }

    #[test]
    fn test_iou_disjoint() {
        let a = bbox(0.0, 0.0, 50.0, 50.0);
        let b = bbox(50.0, 0.0, 100.0, 50.0);
        assert_relative_eq!(a.iou(&b), 0.0);
    }
}
