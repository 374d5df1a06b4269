use image::RgbImage;

use crate::error::Result;

/// A decoded video frame.
#[derive(Debug, Clone)]
pub struct Frame {
    /// 1-based position of the frame in its source
    pub number: u32,
    pub image: RgbImage,
}

impl Frame {
    pub fn new(number: u32, image: RgbImage) -> Self {
        Self { number, image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Number of bytes in the decoded frame (height x width x channels).
    pub fn byte_size(&self) -> usize {
        self.image.as_raw().len()
    }
}

/// Sequential source of frames.
pub trait FrameSource {
    fn width(&self) -> u32;

    fn height(&self) -> u32;

    fn fps(&self) -> f64;

    /// Read the next frame, `Ok(None)` once the source is exhausted.
    fn next_frame(&mut self) -> Result<Option<Frame>>;
}

/// Destination for rendered frames.
pub trait FrameSink {
    fn write_frame(&mut self, frame_number: u32, image: &RgbImage) -> Result<()>;

    /// Flush and close the sink.
    fn finish(self: Box<Self>) -> Result<()>;
}
