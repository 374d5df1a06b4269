use std::path::{Path, PathBuf};

use log::info;

use super::{Frame, FrameSource};
use crate::error::{Error, Result};

const FRAME_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp"];

/// Frames stored as individual image files in one directory, ordered by file name.
#[derive(Debug)]
pub struct ImageSequence {
    paths: Vec<PathBuf>,
    cursor: usize,
    width: u32,
    height: u32,
    fps: f64,
}

impl ImageSequence {
    pub fn open(dir: &Path, fps: f64) -> Result<Self> {
        let entries = std::fs::read_dir(dir).map_err(|e| Error::video_open(dir, e.to_string()))?;

        let mut paths = Vec::new();
        for entry in entries {
            let path = entry?.path();
            let is_frame = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| FRAME_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                .unwrap_or(false);
            if is_frame && path.is_file() {
                paths.push(path);
            }
        }
        paths.sort();

        let first = paths
            .first()
            .ok_or_else(|| Error::video_open(dir, "directory contains no image frames"))?;
        let (width, height) =
            image::image_dimensions(first).map_err(|e| Error::video_open(first, e.to_string()))?;

        info!(
            "Opened image sequence {} ({} frames, {}x{})",
            dir.display(),
            paths.len(),
            width,
            height
        );

        Ok(Self {
            paths,
            cursor: 0,
            width,
            height,
            fps,
        })
    }

    /// Number of frames in the sequence.
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl FrameSource for ImageSequence {
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
        let Some(path) = self.paths.get(self.cursor) else {
            return Ok(None);
        };
        self.cursor += 1;
        let number = self.cursor as u32;

        let image = image::open(path)?.to_rgb8();
        if image.dimensions() != (self.width, self.height) {
            return Err(Error::VideoRead {
                frame: number,
                reason: format!(
                    "{} is {}x{}, expected {}x{}",
                    path.display(),
                    image.width(),
                    image.height(),
                    self.width,
                    self.height
                ),
            });
        }
        Ok(Some(Frame::new(number, image)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn test_reads_frames_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        for (name, value) in [("b.png", 20u8), ("a.png", 10), ("c.png", 30)] {
            RgbImage::from_pixel(8, 6, Rgb([value, 0, 0]))
                .save(dir.path().join(name))
                .unwrap();
        }
        std::fs::write(dir.path().join("notes.txt"), "not a frame").unwrap();

        let mut seq = ImageSequence::open(dir.path(), 25.0).unwrap();
        assert_eq!(seq.len(), 3);
        assert_eq!((seq.width(), seq.height()), (8, 6));

        let mut values = Vec::new();
        while let Some(frame) = seq.next_frame().unwrap() {
            values.push((frame.number, frame.image.get_pixel(0, 0)[0]));
        }
        assert_eq!(values, vec![(1, 10), (2, 20), (3, 30)]);
    }

    #[test]
    fn test_empty_directory_is_open_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            ImageSequence::open(dir.path(), 25.0),
            Err(Error::VideoOpen { .. })
        ));
    }

    #[test]
    fn test_mismatched_frame_size() {
        let dir = tempfile::tempdir().unwrap();
        RgbImage::new(8, 6).save(dir.path().join("0001.png")).unwrap();
        RgbImage::new(4, 4).save(dir.path().join("0002.png")).unwrap();

        let mut seq = ImageSequence::open(dir.path(), 25.0).unwrap();
        assert!(seq.next_frame().unwrap().is_some());
        assert!(matches!(
            seq.next_frame(),
            Err(Error::VideoRead { frame: 2, .. })
        ));
    }
}
