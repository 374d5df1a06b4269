//! ONNX Runtime backend for exported torchvision-style detectors.
//!
//! The model takes one `[1, 3, H, W]` float image in [0, 1] and returns
//! `boxes [N, 4]` (TLBR pixels), `labels [N]` and `scores [N]`, in that order.

use std::path::Path;

use log::{info, warn};
use ndarray::{Array, IxDyn};
use ort::{
    session::{Session, builder::GraphOptimizationLevel},
    value::TensorRef,
};

use super::{ChannelOrder, DetectionBuilder, DetectionSource};
use crate::error::{Error, Result};
use crate::tracker::Detection;
use crate::video::Frame;

/// Device the model runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accelerator {
    Cpu,
    Gpu,
}

impl std::str::FromStr for Accelerator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "cpu" => Ok(Self::Cpu),
            "gpu" | "cuda" => Ok(Self::Gpu),
            other => Err(Error::config(format!("unknown accelerator {:?}", other))),
        }
    }
}

pub struct OnnxDetector {
    session: Session,
    channel_order: ChannelOrder,
}

impl OnnxDetector {
    pub fn load(model_path: &Path, accelerator: Accelerator) -> Result<Self> {
        info!("Loading detector {}", model_path.display());

        let session = match accelerator {
            Accelerator::Cpu => cpu_session(model_path)?,
            Accelerator::Gpu => gpu_session(model_path).or_else(|e| {
                warn!("{}, using CPU", e);
                cpu_session(model_path)
            })?,
        };

        Ok(Self {
            session,
            channel_order: ChannelOrder::default(),
        })
    }

    /// Set the channel order the model was trained with.
    pub fn with_channel_order(mut self, order: ChannelOrder) -> Self {
        self.channel_order = order;
        self
    }

    /// Convert a frame to a `[1, 3, H, W]` tensor scaled to [0, 1].
    fn preprocess(frame: &Frame, order: ChannelOrder) -> Array<f32, IxDyn> {
        let (width, height) = frame.image.dimensions();
        let channels = order.source_channels();
        let mut input = Array::zeros((1, 3, height as usize, width as usize));
        for (x, y, pixel) in frame.image.enumerate_pixels() {
            for (c, &src) in channels.iter().enumerate() {
                input[[0, c, y as usize, x as usize]] = pixel[src] as f32 / 255.0;
            }
        }
        input.into_dyn()
    }
}

fn cpu_session(model_path: &Path) -> Result<Session> {
    Session::builder()
        .map_err(|e| Error::detector(e.to_string()))?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(|e| Error::detector(e.to_string()))?
        .commit_from_file(model_path)
        .map_err(|e| Error::detector(format!("Failed to load model: {}", e)))
}

#[cfg(feature = "cuda")]
fn gpu_session(model_path: &Path) -> Result<Session> {
    use ort::execution_providers::CUDAExecutionProvider;

    info!("Attempting to use CUDA backend...");
    Session::builder()
        .map_err(|e| Error::detector(e.to_string()))?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(|e| Error::detector(e.to_string()))?
        .with_execution_providers([CUDAExecutionProvider::default().build()])
        .map_err(|e| Error::detector(format!("CUDA provider failed: {}", e)))?
        .commit_from_file(model_path)
        .map_err(|e| Error::detector(format!("Failed to load model with CUDA: {}", e)))
}

#[cfg(not(feature = "cuda"))]
fn gpu_session(_model_path: &Path) -> Result<Session> {
    Err(Error::detector("built without the `cuda` feature"))
}

impl DetectionSource for OnnxDetector {
    type Error = Error;

    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>> {
        let input = Self::preprocess(frame, self.channel_order);
        let tensor = TensorRef::from_array_view(&input).map_err(|e| Error::detector(e.to_string()))?;

        let outputs = self
            .session
            .run(ort::inputs![tensor])
            .map_err(|e| Error::detector(e.to_string()))?;
        if outputs.len() < 3 {
            return Err(Error::detector(format!(
                "expected boxes, labels and scores outputs, got {}",
                outputs.len()
            )));
        }

        let boxes = outputs[0]
            .try_extract_array::<f32>()
            .map_err(|e| Error::detector(e.to_string()))?;
        let labels = outputs[1]
            .try_extract_array::<i64>()
            .map_err(|e| Error::detector(e.to_string()))?;
        let scores = outputs[2]
            .try_extract_array::<f32>()
            .map_err(|e| Error::detector(e.to_string()))?;

        let n = scores.len();
        if boxes.len() != n * 4 || labels.len() != n {
            return Err(Error::detector(format!(
                "inconsistent output shapes: boxes {:?}, labels {:?}, scores {:?}",
                boxes.shape(),
                labels.shape(),
                scores.shape()
            )));
        }

        let boxes: Vec<f32> = boxes.iter().copied().collect();
        let detections = scores
            .iter()
            .zip(labels.iter())
            .enumerate()
            .map(|(i, (&score, &label))| {
                let b = &boxes[i * 4..i * 4 + 4];
                DetectionBuilder::new()
                    .tlbr(b[0], b[1], b[2], b[3])
                    .score(score)
                    .class_id(label.max(0) as u32)
                    .build()
            })
            .collect();
        Ok(detections)
    }
}
