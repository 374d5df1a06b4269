//! Frame acquisition and annotated video output.
//!
//! Frames come either from a directory of still images or, with the `opencv`
//! feature, from any container OpenCV can decode. Output video needs the
//! `opencv` feature as well.

#[cfg(feature = "opencv")]
mod capture;
mod frame;
mod image_sequence;

use std::path::Path;

#[cfg(feature = "opencv")]
pub use capture::{CaptureReader, CaptureWriter};
pub use frame::{Frame, FrameSink, FrameSource};
pub use image_sequence::ImageSequence;

use crate::error::{Error, Result};

/// Open a frame source for `path`.
///
/// Directories are read as image sequences played back at `fps`; anything
/// else is decoded with OpenCV at its native frame rate.
pub fn open_source(path: &Path, fps: f64) -> Result<Box<dyn FrameSource>> {
    if !path.exists() {
        return Err(Error::video_open(path, "no such file or directory"));
    }
    if path.is_dir() {
        return Ok(Box::new(ImageSequence::open(path, fps)?));
    }

    #[cfg(feature = "opencv")]
    {
        Ok(Box::new(CaptureReader::open(path)?))
    }
    #[cfg(not(feature = "opencv"))]
    {
        Err(Error::video_open(
            path,
            "video files need the `opencv` feature; pass a directory of frames instead",
        ))
    }
}

/// Create the annotated output video at `path`.
pub fn create_sink(path: &Path, width: u32, height: u32, fps: f64) -> Result<Box<dyn FrameSink>> {
    #[cfg(feature = "opencv")]
    {
        Ok(Box::new(CaptureWriter::create(path, width, height, fps)?))
    }
    #[cfg(not(feature = "opencv"))]
    {
        let _ = (width, height, fps);
        Err(Error::VideoWrite {
            frame: 0,
            reason: format!(
                "cannot write {} without the `opencv` feature",
                path.display()
            ),
        })
    }
}
