//! Error type shared by the tracking, video and annotation modules.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Error opening video source {path}: {reason}")]
    VideoOpen { path: PathBuf, reason: String },

    #[error("Failed to read frame {frame}: {reason}")]
    VideoRead { frame: u32, reason: String },

    #[error("Failed to write video frame {frame}: {reason}")]
    VideoWrite { frame: u32, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Malformed ground truth at line {line}: {reason}")]
    GroundTruth { line: u64, reason: String },

    #[error("Malformed COCO dataset: {0}")]
    Coco(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Innovation covariance is singular")]
    SingularMatrix,

    #[error("Linear assignment failed: {0}")]
    Assignment(String),

    #[error("Detector error: {0}")]
    Detector(String),
}

impl Error {
    pub fn video_open<P: Into<PathBuf>, S: Into<String>>(path: P, reason: S) -> Self {
        Self::VideoOpen {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    pub fn detector<S: Into<String>>(msg: S) -> Self {
        Self::Detector(msg.into())
    }
}
