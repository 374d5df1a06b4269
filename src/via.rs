//! Track export and ground-truth import in the VGG Image Annotator (VIA) CSV schema.
//!
//! Every row holds one rectangular region on one frame. The track identifier
//! lives in the region attributes as `{"track":<id>}`.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use log::debug;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::tracker::{Rect, TrackedBox};

pub const VIA_HEADER: [&str; 7] = [
    "filename",
    "file_size",
    "file_attributes",
    "region_count",
    "region_id",
    "region_shape_attributes",
    "region_attributes",
];

/// Clip identifier written into `file_attributes`.
const CLIP_ID: u32 = 123;

/// Name of the exported frame image for `frame_number` of a video.
pub fn frame_file_name(video_stem: &str, frame_number: u32) -> String {
    format!("{}_frame_{:08}.png", video_stem, frame_number)
}

/// Frame number encoded after the last `_` of an annotated file name.
pub fn frame_number_from_file_name(filename: &str) -> Option<u32> {
    let tail = filename.rsplit('_').next()?;
    let stem = tail.split('.').next()?;
    stem.parse().ok()
}

/// Writes tracked boxes as VIA CSV rows.
pub struct ViaCsvWriter<W: Write> {
    writer: csv::Writer<W>,
    rows_written: usize,
}

impl ViaCsvWriter<File> {
    /// Create the CSV file (and its parent directory) and write the header.
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::from_writer(File::create(path)?)
    }
}

impl<W: Write> ViaCsvWriter<W> {
    pub fn from_writer(inner: W) -> Result<Self> {
        let mut writer = csv::Writer::from_writer(inner);
        writer.write_record(VIA_HEADER)?;
        Ok(Self {
            writer,
            rows_written: 0,
        })
    }

    /// Append one row for a tracked box on the frame stored as `frame_name`.
    pub fn write_box(
        &mut self,
        frame_name: &str,
        frame_byte_size: usize,
        tracked: &TrackedBox,
    ) -> Result<()> {
        let [xmin, ymin, xmax, ymax] = tracked.to_tlbr();
        let width = (xmax - xmin) as i64;
        let height = (ymax - ymin) as i64;

        let file_size = frame_byte_size.to_string();
        let file_attributes = format!("{{\"clip\":{}}}", CLIP_ID);
        let shape = format!(
            "{{\"name\":\"rect\",\"x\":{},\"y\":{},\"width\":{},\"height\":{}}}",
            xmin, ymin, width, height
        );
        let region = format!("{{\"track\":{}}}", tracked.track_id);

        self.writer.write_record([
            frame_name,
            file_size.as_str(),
            file_attributes.as_str(),
            "1",
            "0",
            shape.as_str(),
            region.as_str(),
        ])?;
        self.rows_written += 1;
        Ok(())
    }

    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    /// Flush and hand back the underlying writer.
    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| Error::Io(std::io::Error::other(e.to_string())))
    }
}

/// One annotated box of a ground-truth track.
#[derive(Debug, Clone, PartialEq)]
pub struct GroundTruthBox {
    pub filename: String,
    pub frame_number: u32,
    pub bbox: Rect,
    pub track_id: u64,
}

#[derive(Debug, Deserialize)]
struct ShapeAttributes {
    x: f32,
    y: f32,
    width: f32,
    height: f32,
}

/// VIA stores attribute values as strings unless edited programmatically.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TrackValue {
    Number(u64),
    Text(String),
}

#[derive(Debug, Deserialize)]
struct RegionAttributes {
    track: TrackValue,
}

/// Read ground-truth boxes from a VIA CSV file.
pub fn read_ground_truth(path: &Path) -> Result<Vec<GroundTruthBox>> {
    read_ground_truth_from(File::open(path)?)
}

/// Read ground-truth boxes from any VIA CSV stream.
///
/// Rows without a region (`{}` shape attributes) are skipped.
pub fn read_ground_truth_from<R: Read>(reader: R) -> Result<Vec<GroundTruthBox>> {
    let mut reader = csv::Reader::from_reader(reader);
    let mut boxes = Vec::new();

    for record in reader.records() {
        let record = record?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        let malformed = |reason: String| Error::GroundTruth { line, reason };

        let field = |idx: usize| {
            record
                .get(idx)
                .ok_or_else(|| malformed(format!("missing column {}", VIA_HEADER[idx])))
        };

        let filename = field(0)?;
        let shape_raw = field(5)?;
        if shape_raw.trim() == "{}" {
            debug!("Skipping region-less row for {}", filename);
            continue;
        }

        let shape: ShapeAttributes = serde_json::from_str(shape_raw)
            .map_err(|e| malformed(format!("region_shape_attributes: {}", e)))?;
        let region: RegionAttributes = serde_json::from_str(field(6)?)
            .map_err(|e| malformed(format!("region_attributes: {}", e)))?;

        let track_id = match region.track {
            TrackValue::Number(id) => id,
            TrackValue::Text(text) => text
                .trim()
                .parse()
                .map_err(|_| malformed(format!("track id {:?} is not an integer", text)))?,
        };
        let frame_number = frame_number_from_file_name(filename)
            .ok_or_else(|| malformed(format!("no frame number in {:?}", filename)))?;

        boxes.push(GroundTruthBox {
            filename: filename.to_string(),
            frame_number,
            bbox: Rect::new(shape.x, shape.y, shape.width, shape.height),
            track_id,
        });
    }

    Ok(boxes)
}

/// Ground-truth boxes annotated on `frame_number`.
pub fn ground_truth_for_frame(gt: &[GroundTruthBox], frame_number: u32) -> Vec<GroundTruthBox> {
    gt.iter()
        .filter(|b| b.frame_number == frame_number)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_names() {
        assert_eq!(frame_file_name("clip_A", 7), "clip_A_frame_00000007.png");
        assert_eq!(
            frame_number_from_file_name("clip_A_frame_00000007.png"),
            Some(7)
        );
        assert_eq!(frame_number_from_file_name("no_number.png"), None);
    }

    #[test]
    fn test_write_rows() {
        let mut writer = ViaCsvWriter::from_writer(Vec::new()).unwrap();
        let tracked = TrackedBox {
            bbox: Rect::from_tlbr(10.5, 20.0, 40.9, 60.0),
            track_id: 4,
        };
        writer
            .write_box("vid_frame_00000001.png", 6220800, &tracked)
            .unwrap();
        assert_eq!(writer.rows_written(), 1);

        let out = String::from_utf8(writer.into_inner().unwrap()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(
            lines[0],
            "filename,file_size,file_attributes,region_count,region_id,region_shape_attributes,region_attributes"
        );
        assert_eq!(
            lines[1],
            r#"vid_frame_00000001.png,6220800,"{""clip"":123}",1,0,"{""name"":""rect"",""x"":10.5,""y"":20,""width"":30,""height"":40}","{""track"":4}""#
        );
    }

    #[test]
    fn test_written_rows_read_back_as_ground_truth() {
        let mut writer = ViaCsvWriter::from_writer(Vec::new()).unwrap();
        for (frame, id) in [(1u32, 1u64), (1, 2), (2, 1)] {
            let tracked = TrackedBox {
                bbox: Rect::new(5.0, 6.0, 20.0, 30.0),
                track_id: id,
            };
            writer
                .write_box(&frame_file_name("vid", frame), 100, &tracked)
                .unwrap();
        }
        let bytes = writer.into_inner().unwrap();

        let gt = read_ground_truth_from(bytes.as_slice()).unwrap();
        assert_eq!(gt.len(), 3);
        assert_eq!(gt[2].frame_number, 2);
        assert_eq!(gt[2].track_id, 1);
        assert_eq!(gt[0].bbox, Rect::new(5.0, 6.0, 20.0, 30.0));
        assert_eq!(ground_truth_for_frame(&gt, 1).len(), 2);
    }

    #[test]
    fn test_string_track_ids_and_empty_regions() {
        let csv = "filename,file_size,file_attributes,region_count,region_id,region_shape_attributes,region_attributes\n\
                   a_00000003.png,10,{},0,0,{},{}\n\
                   a_00000004.png,10,{},1,0,\"{\"\"name\"\":\"\"rect\"\",\"\"x\"\":1,\"\"y\"\":2,\"\"width\"\":3,\"\"height\"\":4}\",\"{\"\"track\"\":\"\"12\"\"}\"\n";
        let gt = read_ground_truth_from(csv.as_bytes()).unwrap();
        assert_eq!(gt.len(), 1);
        assert_eq!(gt[0].frame_number, 4);
        assert_eq!(gt[0].track_id, 12);
    }

    #[test]
    fn test_malformed_row_reports_line() {
        let csv = "filename,file_size,file_attributes,region_count,region_id,region_shape_attributes,region_attributes\n\
                   a_00000001.png,10,{},1,0,\"{\"\"x\"\":1}\",\"{\"\"track\"\":1}\"\n";
        match read_ground_truth_from(csv.as_bytes()) {
            Err(Error::GroundTruth { line, .. }) => assert_eq!(line, 2),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
