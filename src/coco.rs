//! Summary statistics for COCO-format annotation files.
//!
//! Image file names are expected to follow `<video>_<frame>.<ext>`, which is
//! how extracted frames are named for labelling.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Deserialize)]
pub struct CocoImage {
    pub id: u64,
    pub file_name: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CocoAnnotation {
    pub id: u64,
    pub image_id: u64,
    /// [x, y, width, height]
    #[serde(default)]
    pub bbox: Option<[f32; 4]>,
    #[serde(default)]
    pub category_id: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CocoCategory {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CocoDataset {
    pub images: Vec<CocoImage>,
    pub annotations: Vec<CocoAnnotation>,
    #[serde(default)]
    pub categories: Vec<CocoCategory>,
}

impl CocoDataset {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read(path)?;
        Ok(serde_json::from_slice(&raw)?)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VideoSummary {
    pub images: usize,
    pub annotations: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CocoSummary {
    pub n_images: usize,
    pub n_annotations: usize,
    /// Annotation count per image id, including images without annotations
    pub annotations_per_image: BTreeMap<u64, usize>,
    /// Frame number parsed from the image of each annotation, in annotation order
    pub frame_number_per_annotation: Vec<Option<u32>>,
    pub per_video: BTreeMap<String, VideoSummary>,
}

/// Video name: the file name up to its last `_`.
fn video_name(file_name: &str) -> &str {
    file_name
        .rsplit_once('_')
        .map(|(video, _)| video)
        .unwrap_or(file_name)
}

/// Frame number: the file name after its last `_`, without extension.
fn frame_number(file_name: &str) -> Option<u32> {
    let (_, tail) = file_name.rsplit_once('_')?;
    tail.split('.').next()?.parse().ok()
}

pub fn summarize(dataset: &CocoDataset) -> Result<CocoSummary> {
    let names: HashMap<u64, &str> = dataset
        .images
        .iter()
        .map(|im| (im.id, im.file_name.as_str()))
        .collect();

    let mut annotations_per_image: BTreeMap<u64, usize> =
        dataset.images.iter().map(|im| (im.id, 0)).collect();
    let mut per_video: BTreeMap<String, VideoSummary> = BTreeMap::new();
    for im in &dataset.images {
        per_video
            .entry(video_name(&im.file_name).to_string())
            .or_default()
            .images += 1;
    }

    let mut frame_number_per_annotation = Vec::with_capacity(dataset.annotations.len());
    for ann in &dataset.annotations {
        let name = names.get(&ann.image_id).ok_or_else(|| {
            Error::Coco(format!(
                "annotation {} refers to unknown image {}",
                ann.id, ann.image_id
            ))
        })?;
        *annotations_per_image.entry(ann.image_id).or_insert(0) += 1;
        per_video
            .entry(video_name(name).to_string())
            .or_default()
            .annotations += 1;
        frame_number_per_annotation.push(frame_number(name));
    }

    Ok(CocoSummary {
        n_images: dataset.images.len(),
        n_annotations: dataset.annotations.len(),
        annotations_per_image,
        frame_number_per_annotation,
        per_video,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const DATASET: &str = r#"{
        "images": [
            {"id": 1, "file_name": "NINJAV_S001_S001_T003_frame_000050.png"},
            {"id": 2, "file_name": "NINJAV_S001_S001_T003_frame_000100.png"},
            {"id": 3, "file_name": "09.08.2023-Day2_frame_000010.png"}
        ],
        "annotations": [
            {"id": 1, "image_id": 1, "bbox": [1, 2, 3, 4], "category_id": 1},
            {"id": 2, "image_id": 1},
            {"id": 3, "image_id": 2}
        ],
        "categories": [{"id": 1, "name": "crab"}]
    }"#;

    #[test]
    fn test_summarize() {
        let dataset: CocoDataset = serde_json::from_str(DATASET).unwrap();
        let summary = summarize(&dataset).unwrap();

        assert_eq!(summary.n_images, 3);
        assert_eq!(summary.n_annotations, 3);
        assert_eq!(summary.annotations_per_image[&1], 2);
        assert_eq!(summary.annotations_per_image[&3], 0);
        assert_eq!(
            summary.frame_number_per_annotation,
            vec![Some(50), Some(50), Some(100)]
        );

        let video = &summary.per_video["NINJAV_S001_S001_T003_frame"];
        assert_eq!(video.images, 2);
        assert_eq!(video.annotations, 3);
        assert_eq!(summary.per_video["09.08.2023-Day2_frame"].annotations, 0);
    }

    #[test]
    fn test_unknown_image_id() {
        let dataset: CocoDataset = serde_json::from_str(
            r#"{"images": [], "annotations": [{"id": 9, "image_id": 4}]}"#,
        )
        .unwrap();
        assert!(matches!(summarize(&dataset), Err(Error::Coco(_))));
    }
}
