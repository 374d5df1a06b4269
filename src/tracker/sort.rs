//! SORT: Simple Online and Realtime Tracking.

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::tracker::box_tracker::KalmanBoxTracker;
use crate::tracker::detection::{Detection, TrackedBox};
use crate::tracker::matching::{self, Association};
use crate::tracker::rect::Rect;

/// Configuration for the SORT tracker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SortConfig {
    /// Maximum number of frames to keep alive a track without associated detections.
    pub max_age: u32,
    /// Minimum number of associated detections before a track is reported.
    pub min_hits: u32,
    /// Minimum IoU for a detection to be associated with a track.
    pub iou_threshold: f32,
}

impl Default for SortConfig {
    fn default() -> Self {
        Self {
            max_age: 1,
            min_hits: 3,
            iou_threshold: 0.3,
        }
    }
}

pub struct Sort {
    config: SortConfig,
    /// Live tracklets in creation order
    trackers: Vec<KalmanBoxTracker>,
    frame_count: u32,
    next_id: u64,
}

impl Sort {
    pub fn new(config: SortConfig) -> Self {
        Self {
            config,
            trackers: Vec::new(),
            frame_count: 0,
            next_id: 1,
        }
    }

    pub fn config(&self) -> &SortConfig {
        &self.config
    }

    /// Number of frames passed to [`Sort::update`] so far.
    pub fn frame_count(&self) -> u32 {
        self.frame_count
    }

    /// Number of live tracklets, including unconfirmed ones.
    pub fn num_tracklets(&self) -> usize {
        self.trackers.len()
    }

    /// Drop all tracklets and restart frame and id counting.
    pub fn reset(&mut self) {
        self.trackers.clear();
        self.frame_count = 0;
        self.next_id = 1;
    }

    /// Advance the tracker by one frame.
    ///
    /// Must be called once per frame, also for frames without detections.
    /// Returns the boxes of confirmed tracks updated in this frame, newest
    /// track first.
    pub fn update(&mut self, detections: &[Detection]) -> Result<Vec<TrackedBox>> {
        self.frame_count += 1;

        // Step 1: Predict, dropping tracklets whose state diverged
        let mut predicted = Vec::with_capacity(self.trackers.len());
        self.trackers.retain_mut(|trk| {
            let bbox = trk.predict();
            if bbox.is_finite() {
                predicted.push(bbox);
                true
            } else {
                debug!("Dropping track {} with non-finite prediction", trk.id);
                false
            }
        });

        // Step 2: Associate detections with predicted boxes
        let det_rects: Vec<Rect> = detections
            .iter()
            .map(|d| d.bbox)
            .filter(|bbox| {
                let valid = bbox.is_valid();
                if !valid {
                    debug!("Ignoring degenerate detection {:?}", bbox);
                }
                valid
            })
            .collect();
        let Association {
            matches,
            unmatched_detections,
            ..
        } = matching::associate_detections_to_trackers(
            &det_rects,
            &predicted,
            self.config.iou_threshold,
        )?;

        // Step 3: Update matched tracklets
        let mut broken = Vec::new();
        for (idet, itrk) in matches {
            let trk = &mut self.trackers[itrk];
            if let Err(e) = trk.update(det_rects[idet]) {
                warn!("Removing track {}: {}", trk.id, e);
                broken.push(itrk);
            }
        }
        if !broken.is_empty() {
            let mut idx = 0;
            self.trackers.retain(|_| {
                let keep = !broken.contains(&idx);
                idx += 1;
                keep
            });
        }

        // Step 4: Start tracklets for unmatched detections
        for idet in unmatched_detections {
            self.trackers
                .push(KalmanBoxTracker::new(self.next_id, det_rects[idet]));
            self.next_id += 1;
        }

        // Step 5: Report confirmed tracks and remove dead ones
        let warming_up = self.frame_count <= self.config.min_hits;
        let mut tracked = Vec::new();
        for trk in self.trackers.iter().rev() {
            if trk.time_since_update < 1 && (trk.hit_streak >= self.config.min_hits || warming_up)
            {
                let bbox = trk.state();
                if bbox.is_finite() {
                    tracked.push(TrackedBox {
                        bbox,
                        track_id: trk.id,
                    });
                }
            }
        }
        let max_age = self.config.max_age;
        self.trackers.retain(|trk| trk.time_since_update <= max_age);

        debug!(
            "Frame {}: {} detections, {} tracks reported, {} alive",
            self.frame_count,
            detections.len(),
            tracked.len(),
            self.trackers.len()
        );

        Ok(tracked)
    }
}

impl Default for Sort {
    fn default() -> Self {
        Self::new(SortConfig::default())
    }
}
