//! Comparison of tracker output against ground-truth tracks.

use std::collections::HashMap;

use serde::Serialize;

use crate::tracker::TrackedBox;
use crate::via::GroundTruthBox;

/// Result of matching one frame's tracked boxes to its ground truth.
///
/// Indices refer to the slices passed to [`match_frame`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameMatch {
    /// (ground truth index, tracked index, IoU)
    pub matches: Vec<(usize, usize, f32)>,
    pub missed_gt: Vec<usize>,
    pub false_tracks: Vec<usize>,
}

/// Greedily pair ground-truth and tracked boxes by decreasing IoU.
///
/// Only pairs with IoU at or above `iou_threshold` are matched, and every box
/// takes part in at most one pair.
pub fn match_frame(gt: &[GroundTruthBox], tracked: &[TrackedBox], iou_threshold: f32) -> FrameMatch {
    let mut candidates = Vec::new();
    for (g, gt_box) in gt.iter().enumerate() {
        for (t, trk) in tracked.iter().enumerate() {
            let iou = gt_box.bbox.iou(&trk.bbox);
            if iou >= iou_threshold && iou > 0.0 {
                candidates.push((g, t, iou));
            }
        }
    }
    candidates.sort_by(|a, b| b.2.total_cmp(&a.2));

    let mut gt_used = vec![false; gt.len()];
    let mut trk_used = vec![false; tracked.len()];
    let mut matches = Vec::new();
    for (g, t, iou) in candidates {
        if gt_used[g] || trk_used[t] {
            continue;
        }
        gt_used[g] = true;
        trk_used[t] = true;
        matches.push((g, t, iou));
    }

    FrameMatch {
        matches,
        missed_gt: (0..gt.len()).filter(|&g| !gt_used[g]).collect(),
        false_tracks: (0..tracked.len()).filter(|&t| !trk_used[t]).collect(),
    }
}

/// Running tally of tracking quality over a clip.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TrackingSummary {
    pub frames: u32,
    pub gt_boxes: usize,
    pub matches: usize,
    pub misses: usize,
    pub false_positives: usize,
    pub id_switches: usize,
    #[serde(skip)]
    iou_sum: f64,
    #[serde(skip)]
    last_assignment: HashMap<u64, u64>,
}

impl TrackingSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one frame into the tally.
    pub fn record(
        &mut self,
        gt: &[GroundTruthBox],
        tracked: &[TrackedBox],
        frame_match: &FrameMatch,
    ) {
        self.frames += 1;
        self.gt_boxes += gt.len();
        self.matches += frame_match.matches.len();
        self.misses += frame_match.missed_gt.len();
        self.false_positives += frame_match.false_tracks.len();

        for &(g, t, iou) in &frame_match.matches {
            self.iou_sum += iou as f64;
            let gt_id = gt[g].track_id;
            let track_id = tracked[t].track_id;
            if let Some(previous) = self.last_assignment.insert(gt_id, track_id) {
                if previous != track_id {
                    self.id_switches += 1;
                }
            }
        }
    }

    /// Multiple Object Tracking Accuracy, `None` without ground truth.
    pub fn mota(&self) -> Option<f64> {
        if self.gt_boxes == 0 {
            return None;
        }
        let errors = (self.misses + self.false_positives + self.id_switches) as f64;
        Some(1.0 - errors / self.gt_boxes as f64)
    }

    /// Mean IoU over matched pairs, `None` without matches.
    pub fn mean_iou(&self) -> Option<f64> {
        (self.matches > 0).then(|| self.iou_sum / self.matches as f64)
    }
}
