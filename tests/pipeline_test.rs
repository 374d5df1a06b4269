use std::cell::Cell;
use std::path::Path;
use std::rc::Rc;

use image::{Rgb, RgbImage};

use crabtrack_rs::via::{frame_file_name, read_ground_truth};
use crabtrack_rs::video::ImageSequence;
use crabtrack_rs::{DetectionsFile, DetectorInference, FrameSink, InferenceConfig, Result};

const N_FRAMES: u32 = 6;

/// Write a short clip with one bright square drifting right, plus its detections.
fn write_clip(frames_dir: &Path, detections_path: &Path) {
    std::fs::create_dir_all(frames_dir).unwrap();
    let mut rows = String::from("frame,x1,y1,x2,y2,score,label\n");
    for n in 1..=N_FRAMES {
        let x = 10 + 2 * n;
        let mut image = RgbImage::new(64, 48);
        for dx in 0..20 {
            for dy in 0..20 {
                image.put_pixel(x + dx, 10 + dy, Rgb([200, 120, 40]));
            }
        }
        image.save(frames_dir.join(format!("{:04}.png", n))).unwrap();

        rows.push_str(&format!("{},{},10,{},30,0.92,1\n", n, x, x + 20));
        // Below the score threshold, never tracked
        rows.push_str(&format!("{},40,30,60,46,0.05,1\n", n));
    }
    std::fs::write(detections_path, rows).unwrap();
}

#[test]
fn test_csv_rows_match_tracked_boxes() {
    let dir = tempfile::tempdir().unwrap();
    let frames_dir = dir.path().join("clip");
    let detections_path = dir.path().join("detections.csv");
    write_clip(&frames_dir, &detections_path);

    let out = dir.path().join("out");
    let config = InferenceConfig {
        video_path: frames_dir.clone(),
        output_dir: out.clone(),
        save_csv_and_frames: true,
        ..Default::default()
    };
    let inference = DetectorInference::new(config).unwrap();
    let summary = inference
        .run(DetectionsFile::open(&detections_path).unwrap())
        .unwrap();

    assert_eq!(summary.frames_read, N_FRAMES);
    assert_eq!(summary.tracked_boxes, N_FRAMES as usize);
    assert_eq!(summary.csv_rows, summary.tracked_boxes);

    let rows = read_ground_truth(&out.join("tracking_output/tracking_output.csv")).unwrap();
    assert_eq!(rows.len(), summary.csv_rows);
    for (row, n) in rows.iter().zip(1..) {
        assert_eq!(row.track_id, 1);
        assert_eq!(row.frame_number, n);
        assert_eq!(row.filename, frame_file_name("clip", n));
        assert!(out.join("tracking_output").join(&row.filename).is_file());
    }
}

#[test]
fn test_max_frames_to_read() {
    let dir = tempfile::tempdir().unwrap();
    let frames_dir = dir.path().join("clip");
    let detections_path = dir.path().join("detections.csv");
    write_clip(&frames_dir, &detections_path);

    let config = InferenceConfig {
        video_path: frames_dir,
        output_dir: dir.path().join("out"),
        max_frames_to_read: Some(2),
        ..Default::default()
    };
    let summary = DetectorInference::new(config)
        .unwrap()
        .run(DetectionsFile::open(&detections_path).unwrap())
        .unwrap();
    assert_eq!(summary.frames_read, 2);
    assert_eq!(summary.csv_rows, 0);
}

#[derive(Default)]
struct CountingSink {
    written: Rc<Cell<u32>>,
}

impl FrameSink for CountingSink {
    fn write_frame(&mut self, _frame_number: u32, image: &RgbImage) -> Result<()> {
        assert_eq!(image.dimensions(), (64, 48));
        self.written.set(self.written.get() + 1);
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

#[test]
fn test_scoring_against_own_output() {
    let dir = tempfile::tempdir().unwrap();
    let frames_dir = dir.path().join("clip");
    let detections_path = dir.path().join("detections.csv");
    write_clip(&frames_dir, &detections_path);

    // First pass exports the tracks, second pass scores against them.
    let out = dir.path().join("out");
    let export = InferenceConfig {
        video_path: frames_dir.clone(),
        output_dir: out.clone(),
        save_csv_and_frames: true,
        ..Default::default()
    };
    DetectorInference::new(export)
        .unwrap()
        .run(DetectionsFile::open(&detections_path).unwrap())
        .unwrap();

    let scored = InferenceConfig {
        video_path: frames_dir.clone(),
        output_dir: out.clone(),
        gt_path: Some(out.join("tracking_output/tracking_output.csv")),
        ..Default::default()
    };
    assert!(scored.writes_video());

    let sink = CountingSink::default();
    let written = sink.written.clone();
    let mut source = ImageSequence::open(&frames_dir, 25.0).unwrap();
    let summary = DetectorInference::new(scored)
        .unwrap()
        .run_with(
            &mut source,
            DetectionsFile::open(&detections_path).unwrap(),
            Some(Box::new(sink)),
        )
        .unwrap();

    assert_eq!(written.get(), N_FRAMES);
    let evaluation = summary.evaluation.unwrap();
    assert_eq!(evaluation.gt_boxes, N_FRAMES as usize);
    assert_eq!(evaluation.matches, N_FRAMES as usize);
    assert_eq!(evaluation.id_switches, 0);
    assert_eq!(evaluation.mota(), Some(1.0));
}
