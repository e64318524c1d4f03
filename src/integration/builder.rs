//! Builder for creating Detection objects from various input formats.

use crate::tracker::{BoundingBox, Detection};

/// Builder for creating `Detection` objects from various input formats.
#[derive(Debug, Clone, Default)]
pub struct DetectionBuilder {
    label: String,
    x1: i32,
    y1: i32,
    x2: i32,
    y2: i32,
    confidence: f32,
}

impl DetectionBuilder {
    /// Create a new detection builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the detector class name.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Set bounding box in TLBR format (x1, y1, x2, y2).
    pub fn tlbr(mut self, x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        self.x1 = x1;
        self.y1 = y1;
        self.x2 = x2;
        self.y2 = y2;
        self
    }

    /// Set bounding box in XYWH format (center_x, center_y, width, height).
    pub fn xywh(mut self, cx: i32, cy: i32, w: i32, h: i32) -> Self {
        self.x1 = cx.saturating_sub(w / 2);
        self.y1 = cy.saturating_sub(h / 2);
        self.x2 = self.x1.saturating_add(w);
        self.y2 = self.y1.saturating_add(h);
        self
    }

    /// Set bounding box in TLWH format (left, top, width, height).
    pub fn tlwh(mut self, l: i32, t: i32, w: i32, h: i32) -> Self {
        let bbox = BoundingBox::from_tlwh(l, t, w, h);
        [self.x1, self.y1, self.x2, self.y2] = bbox.to_tlbr();
        self
    }

    /// Set the confidence score.
    pub fn confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence;
        self
    }

    /// Build the final `Detection`.
    pub fn build(self) -> Detection {
        Detection::from_box(
            self.label,
            BoundingBox::new(self.x1, self.y1, self.x2, self.y2),
            self.confidence,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detection_builder() {
        let det = DetectionBuilder::new()
            .label("apple")
            .tlbr(10, 20, 50, 80)
            .confidence(0.95)
            .build();

        assert_eq!(det.label, "apple");
        assert_eq!(det.bbox, BoundingBox::new(10, 20, 50, 80));
        assert_eq!(det.confidence, 0.95);
    }

    #[test]
    fn test_box_formats_agree() {
        let tlwh = DetectionBuilder::new().tlwh(10, 20, 40, 60).build();
        let xywh = DetectionBuilder::new().xywh(30, 50, 40, 60).build();
        assert_eq!(tlwh.bbox, BoundingBox::new(10, 20, 50, 80));
        assert_eq!(xywh.bbox, tlwh.bbox);
    }

    #[test]
    fn test_extreme_coordinates_clamp() {
        let det = DetectionBuilder::new().xywh(i32::MIN, i32::MAX, 10, 10).build();
        assert_eq!(det.bbox, BoundingBox::new(i32::MIN, i32::MAX - 5, i32::MIN + 10, i32::MAX));

        let det = DetectionBuilder::new().tlwh(i32::MAX, 0, i32::MAX, 4).build();
        assert_eq!(det.bbox, BoundingBox::new(i32::MAX, 0, i32::MAX, 4));
        assert_eq!(det.bbox.area(), 0);
    }
}
