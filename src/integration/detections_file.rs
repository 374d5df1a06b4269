//! Replays detections computed offline, one CSV row per box.
//!
//! ```text
//! frame,x1,y1,x2,y2,score,label
//! 1,104.2,88.0,150.7,131.9,0.93,1
//! ```

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use log::info;
use serde::Deserialize;

use super::{DetectionBuilder, DetectionSource};
use crate::error::Result;
use crate::tracker::Detection;
use crate::video::Frame;

#[derive(Debug, Deserialize)]
struct DetectionRow {
    frame: u32,
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
    score: f32,
    #[serde(default)]
    label: Option<u32>,
}

/// `DetectionSource` backed by precomputed per-frame detections.
#[derive(Debug, Default)]
pub struct DetectionsFile {
    by_frame: HashMap<u32, Vec<Detection>>,
}

impl DetectionsFile {
    pub fn open(path: &Path) -> Result<Self> {
        let source = Self::from_reader(std::fs::File::open(path)?)?;
        info!(
            "Loaded detections for {} frames from {}",
            source.num_frames(),
            path.display()
        );
        Ok(source)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let mut by_frame: HashMap<u32, Vec<Detection>> = HashMap::new();
        for row in reader.deserialize() {
            let row: DetectionRow = row?;
            let mut builder = DetectionBuilder::new()
                .tlbr(row.x1, row.y1, row.x2, row.y2)
                .score(row.score);
            if let Some(label) = row.label {
                builder = builder.class_id(label);
            }
            by_frame.entry(row.frame).or_default().push(builder.build());
        }
        Ok(Self { by_frame })
    }

    /// Number of frames with at least one detection.
    pub fn num_frames(&self) -> usize {
        self.by_frame.len()
    }
}

impl DetectionSource for DetectionsFile {
    type Error = crate::error::Error;

    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>> {
        Ok(self.by_frame.get(&frame.number).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    #[test]
    fn test_replays_by_frame_number() {
        let csv = "frame,x1,y1,x2,y2,score,label\n\
                   1, 10, 10, 20, 20, 0.9, 1\n\
                   1, 30, 30, 40, 40, 0.4,\n\
                   3, 11, 11, 21, 21, 0.8, 1\n";
        let mut source = DetectionsFile::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(source.num_frames(), 2);

        let frame = |n| Frame::new(n, RgbImage::new(4, 4));
        let first = source.detect(&frame(1)).unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].class_id, Some(1));
        assert_eq!(first[1].class_id, None);
        assert!(source.detect(&frame(2)).unwrap().is_empty());
        assert_eq!(source.detect(&frame(3)).unwrap().len(), 1);
    }

    #[test]
    fn test_bad_row_is_error() {
        let csv = "frame,x1,y1,x2,y2,score,label\n1,a,10,20,20,0.9,1\n";
        assert!(DetectionsFile::from_reader(csv.as_bytes()).is_err());
    }
}
