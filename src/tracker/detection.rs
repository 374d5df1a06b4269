//! Tracker inputs and outputs.

use crate::tracker::rect::Rect;

/// Detection input for the tracker.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// Bounding box of the detected object
    pub bbox: Rect,
    /// Detection confidence score
    pub score: f32,
    /// Class label predicted by the detector, if any
    pub class_id: Option<u32>,
}

impl Detection {
    /// Create a detection from TLBR coordinates.
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32, score: f32) -> Self {
        Self {
            bbox: Rect::from_tlbr(x1, y1, x2, y2),
            score,
            class_id: None,
        }
    }
}

/// A bounding box emitted by the tracker for the current frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackedBox {
    pub bbox: Rect,
    /// Identifier stable across frames for the same object
    pub track_id: u64,
}

impl TrackedBox {
    /// Corners of the tracked box: left, top, right, bottom.
    pub fn to_tlbr(&self) -> [f32; 4] {
        self.bbox.to_tlbr()
    }
}
