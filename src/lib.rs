//! Detection-driven multi-object tracking of crabs in video.
//!
//! Frames are read from a video (or a directory of images), passed through a
//! [`DetectionSource`], and linked into tracks with [`Sort`]. Tracks can be
//! exported as VIA CSV rows with the matching frame images, rendered into an
//! annotated video, and scored against ground-truth tracks.

pub mod coco;
pub mod draw;
pub mod error;
pub mod evaluation;
pub mod inference;
pub mod integration;
pub mod tracker;
pub mod via;
pub mod video;

pub use error::{Error, Result};
pub use inference::{DetectorInference, InferenceConfig, RunSummary};
pub use integration::{DetectionBuilder, DetectionSource, DetectionsFile, TrackerPipeline};
pub use tracker::{Detection, Rect, Sort, SortConfig, TrackedBox};
pub use video::{Frame, FrameSink, FrameSource};
