use std::path::{Path, PathBuf};

use image::RgbImage;
use log::{info, warn};
use opencv::{
    core::{CV_8UC3, Mat, Scalar, Size},
    imgproc::{COLOR_BGR2RGB, COLOR_RGB2BGR, cvt_color_def},
    prelude::*,
    videoio::{CAP_ANY, CAP_PROP_FPS, CAP_PROP_FRAME_HEIGHT, CAP_PROP_FRAME_WIDTH, VideoCapture, VideoWriter},
};

use super::{Frame, FrameSink, FrameSource};
use crate::error::{Error, Result};

/// Frame rate assumed when the container does not report a usable one.
const FALLBACK_FPS: f64 = 25.0;

fn usable_fps(reported: f64) -> Option<f64> {
    (reported.is_finite() && reported > 0.0).then_some(reported)
}

fn path_str(path: &Path) -> std::result::Result<&str, String> {
    path.to_str()
        .ok_or_else(|| format!("path is not valid UTF-8: {}", path.display()))
}

/// BGR `Mat` from OpenCV into an owned RGB image.
fn bgr_to_rgb_image(mat: &Mat) -> std::result::Result<RgbImage, String> {
    let mut rgb = Mat::default();
    cvt_color_def(mat, &mut rgb, COLOR_BGR2RGB)
        .map_err(|e| format!("Failed to convert BGR to RGB: {}", e))?;
    let data = rgb
        .data_bytes()
        .map_err(|e| format!("Failed to get image data: {}", e))?
        .to_vec();
    RgbImage::from_vec(mat.cols() as u32, mat.rows() as u32, data)
        .ok_or_else(|| "Failed to create RgbImage".to_string())
}

fn rgb_image_to_bgr(image: &RgbImage) -> opencv::Result<Mat> {
    let mut rgb = Mat::new_rows_cols_with_default(
        image.height() as i32,
        image.width() as i32,
        CV_8UC3,
        Scalar::all(0.0),
    )?;
    rgb.data_bytes_mut()?.copy_from_slice(image.as_raw());
    let mut bgr = Mat::default();
    cvt_color_def(&rgb, &mut bgr, COLOR_RGB2BGR)?;
    Ok(bgr)
}

/// Video file decoded with OpenCV's `VideoCapture`.
pub struct CaptureReader {
    cap: VideoCapture,
    mat: Mat,
    width: u32,
    height: u32,
    fps: f64,
    frames_read: u32,
}

impl CaptureReader {
    pub fn open(path: &Path) -> Result<Self> {
        let file = path_str(path).map_err(|reason| Error::video_open(path, reason))?;
        let cap = VideoCapture::from_file(file, CAP_ANY)
            .map_err(|e| Error::video_open(path, format!("Failed to open video file: {}", e)))?;
        let opened = cap
            .is_opened()
            .map_err(|e| Error::video_open(path, format!("Video file check failed: {}", e)))?;
        if !opened {
            return Err(Error::video_open(path, "not a readable video"));
        }

        let width = cap.get(CAP_PROP_FRAME_WIDTH).unwrap_or(0.0) as u32;
        let height = cap.get(CAP_PROP_FRAME_HEIGHT).unwrap_or(0.0) as u32;
        let reported = cap.get(CAP_PROP_FPS).unwrap_or(0.0);
        let fps = usable_fps(reported).unwrap_or_else(|| {
            warn!(
                "Video {} reports an invalid frame rate ({}), assuming {}",
                path.display(),
                reported,
                FALLBACK_FPS
            );
            FALLBACK_FPS
        });

        info!("Opened video {} ({}x{} @ {:.2} fps)", path.display(), width, height, fps);

        Ok(Self {
            cap,
            mat: Mat::default(),
            width,
            height,
            fps,
            frames_read: 0,
        })
    }
}

impl FrameSource for CaptureReader {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn fps(&self) -> f64 {
        self.fps
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        let number = self.frames_read + 1;
        let read = self.cap.read(&mut self.mat).map_err(|e| Error::VideoRead {
            frame: number,
            reason: e.to_string(),
        })?;
        if !read || self.mat.empty() {
            return Ok(None);
        }

        let image = bgr_to_rgb_image(&self.mat).map_err(|reason| Error::VideoRead {
            frame: number,
            reason,
        })?;
        self.frames_read = number;
        Ok(Some(Frame::new(number, image)))
    }
}

/// H.264 mp4 encoder backed by OpenCV's `VideoWriter`.
pub struct CaptureWriter {
    path: PathBuf,
    writer: VideoWriter,
    width: u32,
    height: u32,
}

impl CaptureWriter {
    pub fn create(path: &Path, width: u32, height: u32, fps: f64) -> Result<Self> {
        let open_failed = |reason: String| Error::VideoWrite { frame: 0, reason };

        let file = path_str(path).map_err(open_failed)?;
        let fourcc = VideoWriter::fourcc('a', 'v', 'c', '1')
            .map_err(|e| open_failed(e.to_string()))?;
        let writer = VideoWriter::new(
            file,
            fourcc,
            fps,
            Size::new(width as i32, height as i32),
            true,
        )
        .map_err(|e| open_failed(format!("Failed to create video writer: {}", e)))?;
        if !writer.is_opened().map_err(|e| open_failed(e.to_string()))? {
            return Err(open_failed(format!(
                "Failed to open video writer for {}",
                path.display()
            )));
        }

        info!("Writing video to {}", path.display());
        Ok(Self {
            path: path.to_path_buf(),
            writer,
            width,
            height,
        })
    }
}

impl FrameSink for CaptureWriter {
    fn write_frame(&mut self, frame_number: u32, image: &RgbImage) -> Result<()> {
        if image.dimensions() != (self.width, self.height) {
            return Err(Error::VideoWrite {
                frame: frame_number,
                reason: format!(
                    "frame is {}x{}, writer expects {}x{}",
                    image.width(),
                    image.height(),
                    self.width,
                    self.height
                ),
            });
        }
        let write_failed = |e: opencv::Error| Error::VideoWrite {
            frame: frame_number,
            reason: e.to_string(),
        };
        let bgr = rgb_image_to_bgr(image).map_err(write_failed)?;
        self.writer.write(&bgr).map_err(write_failed)
    }

    fn finish(mut self: Box<Self>) -> Result<()> {
        self.writer.release().map_err(|e| Error::VideoWrite {
            frame: 0,
            reason: format!("Failed to close {}: {}", self.path.display(), e),
        })
    }
}
