//! Integration module for connecting object detection backends with SORT.
//!
//! This module provides traits and utilities for plugging detectors (offline
//! detection files, Burn models, ONNX Runtime sessions) into the tracker.

mod builder;
mod detections_file;
mod detector;
mod pipeline;

pub use builder::DetectionBuilder;
pub use detections_file::DetectionsFile;
pub use detector::{ChannelOrder, DetectionSource, IntoDetections, filter_by_score};
pub use pipeline::{DEFAULT_SCORE_THRESHOLD, TrackerPipeline};

#[cfg(feature = "burn-backend")]
mod burn_backend;

#[cfg(feature = "burn-backend")]
pub use burn_backend::{BurnDetector, BurnDetectorError, BurnModel, RawDetection};

#[cfg(feature = "onnx")]
mod onnx_backend;

#[cfg(feature = "onnx")]
pub use onnx_backend::{Accelerator, OnnxDetector};
