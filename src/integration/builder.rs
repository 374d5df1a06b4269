//! Detection construction from the box layouts detectors commonly emit.

use crate::tracker::{Detection, Rect};

/// Assembles a `Detection` field by field.
///
/// The last box setter called wins.
#[derive(Debug, Clone, Default)]
pub struct DetectionBuilder {
    bbox: Rect,
    score: f32,
    class_id: Option<u32>,
}

impl DetectionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Corners: left, top, right, bottom.
    pub fn tlbr(mut self, x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        self.bbox = Rect::from_tlbr(x1, y1, x2, y2);
        self
    }

    /// Center and size, as YOLO-style heads report.
    pub fn xywh(mut self, cx: f32, cy: f32, w: f32, h: f32) -> Self {
        self.bbox = Rect::new(cx - w / 2.0, cy - h / 2.0, w, h);
        self
    }

    /// Top-left corner and size, as COCO and VIA store boxes.
    pub fn tlwh(mut self, x: f32, y: f32, w: f32, h: f32) -> Self {
        self.bbox = Rect::new(x, y, w, h);
        self
    }

    pub fn score(mut self, score: f32) -> Self {
        self.score = score;
        self
    }

    pub fn class_id(mut self, class_id: u32) -> Self {
        self.class_id = Some(class_id);
        self
    }

    pub fn build(self) -> Detection {
        Detection {
            bbox: self.bbox,
            score: self.score,
            class_id: self.class_id,
        }
    }
}
