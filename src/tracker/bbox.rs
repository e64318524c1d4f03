use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box in pixel coordinates.
///
/// Stored in TLBR form (top-left x, top-left y, bottom-right x, bottom-right y),
/// which is what the detector emits. A box whose corners are inverted is treated
/// as having zero width or height.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[i32; 4]", into = "[i32; 4]")]
pub struct BoundingBox {
    /// Top-left x coordinate
    pub x1: i32,
    /// Top-left y coordinate
    pub y1: i32,
    /// Bottom-right x coordinate
    pub x2: i32,
    /// Bottom-right y coordinate
    pub y2: i32,
}

impl BoundingBox {
    /// Create a box from TLBR corners.
    #[inline]
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Create a box from top-left coordinates and dimensions (TLWH format).
    #[inline]
    pub fn from_tlwh(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x1: x,
            y1: y,
            x2: x.saturating_add(width),
            y2: y.saturating_add(height),
        }
    }

    /// Convert to TLBR format: (x1, y1, x2, y2).
    #[inline]
    pub fn to_tlbr(&self) -> [i32; 4] {
        [self.x1, self.y1, self.x2, self.y2]
    }

    #[inline]
    pub fn width(&self) -> i64 {
        (i64::from(self.x2) - i64::from(self.x1)).max(0)
    }

    #[inline]
    pub fn height(&self) -> i64 {
        (i64::from(self.y2) - i64::from(self.y1)).max(0)
    }

    /// Get the center point of the bounding box.
    #[inline]
    pub fn center(&self) -> (f32, f32) {
        (
            (self.x1 as f32 + self.x2 as f32) / 2.0,
            (self.y1 as f32 + self.y2 as f32) / 2.0,
        )
    }

    /// Get the area of the bounding box.
    #[inline]
    pub fn area(&self) -> i64 {
        self.width() * self.height()
    }

    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.area() == 0
    }

    /// Calculate Intersection over Union (IoU) with another bounding box.
    ///
    /// Returns 0 for disjoint boxes and whenever the union is empty, so a
    /// zero-area box never overlaps anything.
    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let x1 = i64::from(self.x1.max(other.x1));
        let y1 = i64::from(self.y1.max(other.y1));
        let x2 = i64::from(self.x2.min(other.x2));
        let y2 = i64::from(self.y2.min(other.y2));

        if x2 <= x1 || y2 <= y1 {
            return 0.0;
        }

        let inter_area = (x2 - x1) * (y2 - y1);
        let union_area = self.area() + other.area() - inter_area;

        if union_area > 0 {
            (inter_area as f64 / union_area as f64) as f32
        } else {
            0.0
        }
    }
}

impl From<[i32; 4]> for BoundingBox {
    fn from([x1, y1, x2, y2]: [i32; 4]) -> Self {
        Self::new(x1, y1, x2, y2)
    }
}

impl From<BoundingBox> for [i32; 4] {
    fn from(bbox: BoundingBox) -> Self {
        bbox.to_tlbr()
    }
}

/// Calculate IoU matrix between two sets of bounding boxes.
///
/// Returns a matrix of shape (M, N) where M is the length of `boxes_a`
/// and N is the length of `boxes_b`.
pub fn iou_matrix(boxes_a: &[BoundingBox], boxes_b: &[BoundingBox]) -> Array2<f32> {
    let mut ious = Array2::zeros((boxes_a.len(), boxes_b.len()));
    for (i, a) in boxes_a.iter().enumerate() {
        for (j, b) in boxes_b.iter().enumerate() {
            ious[[i, j]] = a.iou(b);
        }
    }
    ious
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_box_dimensions() {
        let bbox = BoundingBox::new(10, 20, 40, 60);
        assert_eq!(bbox.width(), 30);
        assert_eq!(bbox.height(), 40);
        assert_eq!(bbox.area(), 1200);
        assert_eq!(bbox.center(), (25.0, 40.0));
        assert_eq!(BoundingBox::from_tlwh(10, 20, 30, 40), bbox);
    }

    #[test]
    fn test_from_tlwh_saturates() {
        let bbox = BoundingBox::from_tlwh(i32::MAX - 5, i32::MIN, 100, -100);
        assert_eq!(bbox.to_tlbr(), [i32::MAX - 5, i32::MIN, i32::MAX, i32::MIN]);
        assert_eq!(bbox.width(), 5);
        assert_eq!(bbox.height(), 0);
    }

    #[test]
    fn test_inverted_box_has_no_area() {
        let bbox = BoundingBox::new(50, 50, 10, 10);
        assert_eq!(bbox.area(), 0);
        assert!(bbox.is_degenerate());
    }

    #[test]
    fn test_iou() {
        let a = BoundingBox::new(0, 0, 10, 10);
        let b = BoundingBox::new(5, 5, 15, 15);

        // Intersection: 5x5 = 25
        // Union: 100 + 100 - 25 = 175
        let iou = a.iou(&b);
        assert!((iou - 25.0 / 175.0).abs() < 1e-6);
    }

    #[test]
    fn test_iou_is_symmetric() {
        let a = BoundingBox::new(0, 0, 30, 20);
        let b = BoundingBox::new(12, 4, 50, 44);
        assert_eq!(a.iou(&b), b.iou(&a));
    }

    #[test]
    fn test_iou_no_overlap() {
        let a = BoundingBox::new(10, 10, 50, 50);
        let b = BoundingBox::new(60, 60, 100, 100);
        assert_eq!(a.iou(&b), 0.0);
    }

    #[test]
    fn test_iou_touching_edges() {
        let a = BoundingBox::new(0, 0, 10, 10);
        let b = BoundingBox::new(10, 0, 20, 10);
        assert_eq!(a.iou(&b), 0.0);
    }

    #[test]
    fn test_iou_same_box() {
        let a = BoundingBox::new(10, 10, 50, 50);
        assert_eq!(a.iou(&a), 1.0);
    }

    #[test]
    fn test_iou_zero_area() {
        let point = BoundingBox::new(5, 5, 5, 5);
        let line = BoundingBox::new(0, 5, 10, 5);
        let full = BoundingBox::new(0, 0, 10, 10);
        assert_eq!(point.iou(&point), 0.0);
        assert_eq!(line.iou(&full), 0.0);
        assert_eq!(full.iou(&point), 0.0);
    }

    #[test]
    fn test_iou_matrix_shape() {
        let a = [BoundingBox::new(0, 0, 10, 10), BoundingBox::new(100, 100, 110, 110)];
        let b = [BoundingBox::new(0, 0, 10, 10)];
        let ious = iou_matrix(&a, &b);
        assert_eq!(ious.dim(), (2, 1));
        assert_eq!(ious[[0, 0]], 1.0);
        assert_eq!(ious[[1, 0]], 0.0);
    }

    #[test]
    fn test_serde_as_corner_array() {
        let bbox: BoundingBox = serde_json::from_str("[10, 10, 50, 50]").unwrap();
        assert_eq!(bbox, BoundingBox::new(10, 10, 50, 50));
        assert_eq!(serde_json::to_string(&bbox).unwrap(), "[10,10,50,50]");
    }
}
