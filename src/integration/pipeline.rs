//! TrackerPipeline for combining detection with tracking.

use crate::error::{Error, Result};
use crate::tracker::{Sort, SortConfig, TrackedBox};
use crate::video::Frame;

use super::{DetectionSource, IntoDetections, filter_by_score};

/// Default minimum detection score forwarded to the tracker.
pub const DEFAULT_SCORE_THRESHOLD: f32 = 0.1;

/// A combined tracker that bundles detection inference with SORT.
///
/// Detections are thresholded on score before they reach the tracker.
pub struct TrackerPipeline<D: DetectionSource> {
    detector: D,
    tracker: Sort,
    score_threshold: f32,
}

impl<D: DetectionSource> TrackerPipeline<D>
where
    Error: From<D::Error>,
{
    /// Create a new tracking pipeline with the given detector and tracker config.
    pub fn new(detector: D, config: SortConfig, score_threshold: f32) -> Self {
        Self {
            detector,
            tracker: Sort::new(config),
            score_threshold,
        }
    }

    /// Create a new tracking pipeline with default tracker configuration.
    pub fn with_default_config(detector: D) -> Self {
        Self::new(detector, SortConfig::default(), DEFAULT_SCORE_THRESHOLD)
    }

    /// Process a single frame and return the confirmed tracks.
    ///
    /// Frames must be fed in order, one call per frame.
    pub fn process_frame(&mut self, frame: &Frame) -> Result<Vec<TrackedBox>> {
        let detections = self.detector.detect(frame)?;
        self.process_detections(detections)
    }

    /// Advance the tracker with detections computed outside the pipeline.
    pub fn process_detections<I: IntoDetections>(&mut self, detections: I) -> Result<Vec<TrackedBox>> {
        let detections = filter_by_score(detections.into_detections(), self.score_threshold);
        self.tracker.update(&detections)
    }

    /// Get a reference to the underlying tracker.
    pub fn tracker(&self) -> &Sort {
        &self.tracker
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::Detection;
    use image::RgbImage;

    struct MockDetector {
        detections: Vec<Detection>,
    }

    impl DetectionSource for MockDetector {
        type Error = Error;

        fn detect(&mut self, _frame: &Frame) -> Result<Vec<Detection>> {
            Ok(self.detections.clone())
        }
    }

    struct FailingDetector;

    impl DetectionSource for FailingDetector {
        type Error = Error;

        fn detect(&mut self, _frame: &Frame) -> Result<Vec<Detection>> {
            Err(Error::detector("model exploded"))
        }
    }

    fn frame(number: u32) -> Frame {
        Frame::new(number, RgbImage::new(64, 64))
    }

    #[test]
    fn test_tracker_pipeline() {
        let detector = MockDetector {
            detections: vec![
                Detection::new(10.0, 20.0, 50.0, 80.0, 0.9),
                Detection::new(100.0, 20.0, 150.0, 80.0, 0.05),
            ],
        };

        let mut pipeline = TrackerPipeline::with_default_config(detector);
        for n in 1..=5 {
            let tracks = pipeline.process_frame(&frame(n)).unwrap();
            // The low-score detection never reaches the tracker.
            assert_eq!(tracks.len(), 1);
            assert_eq!(tracks[0].track_id, 1);
        }
        assert_eq!(pipeline.tracker().num_tracklets(), 1);
    }

    #[test]
    fn test_process_detections_skips_detector() {
        let mut pipeline = TrackerPipeline::with_default_config(FailingDetector);
        let tracks = pipeline
            .process_detections(vec![Detection::new(0.0, 0.0, 10.0, 10.0, 0.5)])
            .unwrap();
        assert_eq!(tracks.len(), 1);
        assert_eq!(pipeline.tracker().frame_count(), 1);
    }

    #[test]
    fn test_detector_error_propagates() {
        let mut pipeline = TrackerPipeline::with_default_config(FailingDetector);
        assert!(matches!(
            pipeline.process_frame(&frame(1)),
            Err(Error::Detector(_))
        ));
    }
}
