//! The seam between detectors and the tracker.

use crate::error::Error;
use crate::tracker::Detection;
use crate::video::Frame;

/// Anything that turns a frame into detections: a neural network, a replayed
/// detections file, a test double.
///
/// ```ignore
/// use crabtrack_rs::{Detection, DetectionSource, Frame};
///
/// struct EveryFrameTheSameCrab;
///
/// impl DetectionSource for EveryFrameTheSameCrab {
///     type Error = std::convert::Infallible;
///
///     fn detect(&mut self, _frame: &Frame) -> Result<Vec<Detection>, Self::Error> {
///         Ok(vec![Detection::new(10.0, 10.0, 60.0, 40.0, 0.9)])
///     }
/// }
/// ```
pub trait DetectionSource {
    type Error;

    /// Detections found in `frame`, in frame pixel coordinates.
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, Self::Error>;
}

impl<T: DetectionSource + ?Sized> DetectionSource for Box<T> {
    type Error = T::Error;

    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, Self::Error> {
        (**self).detect(frame)
    }
}

/// Model output that can be handed straight to the tracker.
pub trait IntoDetections {
    fn into_detections(self) -> Vec<Detection>;
}

impl IntoDetections for Vec<Detection> {
    fn into_detections(self) -> Vec<Detection> {
        self
    }
}

/// Channel order of the tensor handed to a model.
///
/// Models trained on frames captured with OpenCV expect BGR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelOrder {
    #[default]
    Rgb,
    Bgr,
}

impl ChannelOrder {
    /// RGB pixel index feeding each tensor channel.
    pub fn source_channels(self) -> [usize; 3] {
        match self {
            Self::Rgb => [0, 1, 2],
            Self::Bgr => [2, 1, 0],
        }
    }
}

impl std::str::FromStr for ChannelOrder {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s.to_ascii_lowercase().as_str() {
            "rgb" => Ok(Self::Rgb),
            "bgr" => Ok(Self::Bgr),
            other => Err(Error::config(format!("unknown channel order {:?}", other))),
        }
    }
}

/// Keep only detections scoring strictly above `score_threshold`.
///
/// Boxes without a positive, finite size are dropped as well.
pub fn filter_by_score(detections: Vec<Detection>, score_threshold: f32) -> Vec<Detection> {
    detections
        .into_iter()
        .filter(|d| d.score > score_threshold && d.bbox.is_valid())
        .collect()
}
