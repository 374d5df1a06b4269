//! Detectors written with Burn.
//!
//! A model only has to map a normalised frame tensor to boxes; `BurnDetector`
//! handles tensor conversion and box layout.
//!
//! ```ignore
//! use burn::backend::NdArray;
//! use crabtrack_rs::integration::{BurnDetector, BurnModel, ChannelOrder, RawDetection};
//!
//! impl BurnModel<NdArray> for CrabNet {
//!     fn forward(&self, frame: burn::tensor::Tensor<NdArray, 4>) -> Vec<RawDetection> {
//!         self.head(self.backbone(frame))
//!     }
//! }
//!
//! let detector = BurnDetector::new(CrabNet::load("crabnet.mpk")?, Default::default())
//!     .with_channel_order(ChannelOrder::Bgr);
//! ```

use burn::prelude::*;
use burn::tensor::Tensor;
use image::RgbImage;
use thiserror::Error;

use super::{ChannelOrder, DetectionBuilder, DetectionSource};
use crate::tracker::Detection;
use crate::video::Frame;

#[derive(Debug, Clone, Error)]
pub enum BurnDetectorError {
    /// Frame has a zero dimension.
    #[error("Invalid input dimensions: {width}x{height}")]
    InvalidInputDimensions { width: u32, height: u32 },
    #[error("Inference error: {0}")]
    InferenceError(String),
}

impl From<BurnDetectorError> for crate::error::Error {
    fn from(e: BurnDetectorError) -> Self {
        crate::error::Error::Detector(e.to_string())
    }
}

/// One box predicted by a model, in frame pixels.
#[derive(Debug, Clone)]
pub struct RawDetection {
    /// Corners, or center and size when [`BurnModel::bbox_is_xywh`] holds
    pub bbox: [f32; 4],
    pub score: f32,
    pub class_id: Option<u32>,
}

/// A detection network on backend `B`.
pub trait BurnModel<B: Backend>: Send + Sync {
    /// Detect on one `[1, 3, H, W]` frame with values in [0, 1].
    ///
    /// Boxes are returned after the model's own score filtering and NMS.
    fn forward(&self, input: Tensor<B, 4>) -> Vec<RawDetection>;

    fn bbox_is_xywh(&self) -> bool {
        false
    }
}

/// Runs a [`BurnModel`] on frames.
pub struct BurnDetector<B: Backend, M: BurnModel<B>> {
    model: M,
    device: B::Device,
    channel_order: ChannelOrder,
}

impl<B: Backend, M: BurnModel<B>> BurnDetector<B, M> {
    pub fn new(model: M, device: B::Device) -> Self {
        Self {
            model,
            device,
            channel_order: ChannelOrder::default(),
        }
    }

    /// Set the channel order the model was trained with.
    pub fn with_channel_order(mut self, order: ChannelOrder) -> Self {
        self.channel_order = order;
        self
    }

    /// Convert a frame to a `[1, 3, H, W]` tensor scaled to [0, 1].
    pub fn preprocess(&self, image: &RgbImage) -> Result<Tensor<B, 4>, BurnDetectorError> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(BurnDetectorError::InvalidInputDimensions { width, height });
        }

        let channels = self.channel_order.source_channels();

        // HWC interleaved pixels to planar CHW.
        let plane = (width * height) as usize;
        let mut data = vec![0.0f32; 3 * plane];
        for (i, pixel) in image.pixels().enumerate() {
            for (c, &src) in channels.iter().enumerate() {
                data[c * plane + i] = pixel[src] as f32 / 255.0;
            }
        }

        let tensor = Tensor::<B, 1>::from_floats(data.as_slice(), &self.device).reshape([
            1,
            3,
            height as usize,
            width as usize,
        ]);
        Ok(tensor)
    }

    fn postprocess(&self, raw: Vec<RawDetection>) -> Vec<Detection> {
        raw.into_iter()
            .map(|d| {
                let mut builder = DetectionBuilder::new().score(d.score);
                if let Some(class_id) = d.class_id {
                    builder = builder.class_id(class_id);
                }
                let builder = if self.model.bbox_is_xywh() {
                    builder.xywh(d.bbox[0], d.bbox[1], d.bbox[2], d.bbox[3])
                } else {
                    builder.tlbr(d.bbox[0], d.bbox[1], d.bbox[2], d.bbox[3])
                };
                builder.build()
            })
            .collect()
    }
}

impl<B: Backend, M: BurnModel<B>> DetectionSource for BurnDetector<B, M> {
    type Error = BurnDetectorError;

    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, Self::Error> {
        let tensor = self.preprocess(&frame.image)?;
        Ok(self.postprocess(self.model.forward(tensor)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use image::Rgb;

    struct BrightestPixelModel;

    impl BurnModel<NdArray> for BrightestPixelModel {
        fn forward(&self, input: Tensor<NdArray, 4>) -> Vec<RawDetection> {
            let [_, _, h, w] = input.dims();
            let red: f32 = input
                .clone()
                .slice([0..1, 0..1, 0..h, 0..w])
                .sum()
                .into_scalar();
            vec![RawDetection {
                bbox: [0.0, 0.0, w as f32, h as f32],
                score: red / (h * w) as f32,
                class_id: Some(1),
            }]
        }
    }

    #[test]
    fn test_channel_order() {
        let frame = Frame::new(1, RgbImage::from_pixel(4, 2, Rgb([255, 0, 0])));

        let mut rgb = BurnDetector::new(BrightestPixelModel, Default::default());
        let dets = rgb.detect(&frame).unwrap();
        assert!((dets[0].score - 1.0).abs() < 1e-6);
        assert_eq!(dets[0].bbox.to_tlbr(), [0.0, 0.0, 4.0, 2.0]);

        let mut bgr = BurnDetector::new(BrightestPixelModel, Default::default())
            .with_channel_order(ChannelOrder::Bgr);
        let dets = bgr.detect(&frame).unwrap();
        assert!(dets[0].score.abs() < 1e-6);
    }
}
