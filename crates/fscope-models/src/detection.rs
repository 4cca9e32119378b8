//! Per-frame object detections.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// An axis-aligned bounding box in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BBox {
    /// X coordinate of the top-left corner
    pub x: f64,
    /// Y coordinate of the top-left corner
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Center point of the box.
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// Intersection over union with another box. Returns 0.0 when the
    /// boxes are disjoint or either is degenerate.
    pub fn iou(&self, other: &BBox) -> f64 {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = (self.x + self.width).min(other.x + other.width);
        let y2 = (self.y + self.height).min(other.y + other.height);

        if x2 <= x1 || y2 <= y1 {
            return 0.0;
        }

        let intersection = (x2 - x1) * (y2 - y1);
        let union = self.area() + other.area() - intersection;
        if union <= 0.0 {
            return 0.0;
        }
        intersection / union
    }

    /// Euclidean distance between the centers of two boxes.
    pub fn center_distance(&self, other: &BBox) -> f64 {
        let (cx1, cy1) = self.center();
        let (cx2, cy2) = other.center();
        ((cx1 - cx2).powi(2) + (cy1 - cy2).powi(2)).sqrt()
    }
}

/// A single object detection reported by the detector for one frame.
///
/// The wire shape (`class`, `confidence`, `bbox{x,y,width,height}`) is a
/// compatibility surface and must not change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Detection {
    /// Index of the frame this detection belongs to
    pub frame_index: u64,

    /// Detector vocabulary label (e.g. "person", "bowl")
    #[serde(rename = "class")]
    pub class_label: String,

    /// Detection confidence in [0, 1]
    pub confidence: f64,

    /// Bounding box in pixel coordinates
    pub bbox: BBox,
}

impl Detection {
    pub fn new(frame_index: u64, class_label: impl Into<String>, confidence: f64, bbox: BBox) -> Self {
        Self {
            frame_index,
            class_label: class_label.into(),
            confidence,
            bbox,
        }
    }
}

/// A detection annotated with the semantic products it verifies.
///
/// `matched_products` is empty for detections that matched no product
/// keyword; such detections are retained and still count toward raw
/// per-class statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VerifiedDetection {
    #[serde(flatten)]
    pub detection: Detection,

    /// Names of the products this detection was attributed to
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub matched_products: Vec<String>,
}

impl VerifiedDetection {
    /// Whether this detection verified at least one product.
    pub fn is_verified(&self) -> bool {
        !self.matched_products.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iou_identical() {
        let b = BBox::new(10.0, 10.0, 50.0, 50.0);
        assert!((b.iou(&b) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_iou_disjoint() {
        let a = BBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BBox::new(100.0, 100.0, 10.0, 10.0);
        assert_eq!(a.iou(&b), 0.0);
    }

    #[test]
    fn test_iou_half_overlap() {
        let a = BBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BBox::new(5.0, 0.0, 10.0, 10.0);
        // intersection 50, union 150
        assert!((a.iou(&b) - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_detection_wire_shape() {
        let det = Detection::new(3, "bowl", 0.9, BBox::new(1.0, 2.0, 3.0, 4.0));
        let json = serde_json::to_string(&det).unwrap();
        assert!(json.contains("\"class\":\"bowl\""));
        assert!(json.contains("\"width\":3.0"));
    }
}
