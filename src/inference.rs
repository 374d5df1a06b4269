//! Frame-by-frame detection, tracking and export over one video.

use std::fs::File;
use std::path::{Path, PathBuf};

use log::{debug, error, info};
use serde::{Deserialize, Serialize};

use crate::draw::{draw_gt_tracking, draw_tracked_boxes};
use crate::error::{Error, Result};
use crate::evaluation::{TrackingSummary, match_frame};
use crate::integration::{DEFAULT_SCORE_THRESHOLD, DetectionSource, TrackerPipeline};
use crate::tracker::{SortConfig, TrackedBox};
use crate::via::{ViaCsvWriter, frame_file_name, ground_truth_for_frame, read_ground_truth};
use crate::video::{Frame, FrameSink, FrameSource, create_sink, open_source};

/// Directory (under the output directory) holding the CSV and exported frames.
pub const TRACKING_OUTPUT_DIR: &str = "tracking_output";

const TRACKING_CSV_NAME: &str = "tracking_output.csv";

/// IoU at which a tracked box counts as finding a ground-truth box.
const EVALUATION_IOU_THRESHOLD: f32 = 0.5;

/// Settings of one tracking run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// Video file, or a directory of frame images
    pub video_path: PathBuf,
    pub output_dir: PathBuf,
    /// Detections scoring at or below this never reach the tracker
    pub score_threshold: f32,
    pub sort: SortConfig,
    pub save_video: bool,
    pub save_csv_and_frames: bool,
    pub max_frames_to_read: Option<u32>,
    /// VIA CSV with ground-truth tracks to overlay and score against
    pub gt_path: Option<PathBuf>,
    /// Playback rate of image directories
    pub fps: f64,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            video_path: PathBuf::new(),
            output_dir: PathBuf::from("."),
            score_threshold: DEFAULT_SCORE_THRESHOLD,
            sort: SortConfig {
                max_age: 1,
                min_hits: 3,
                iou_threshold: 0.1,
            },
            save_video: false,
            save_csv_and_frames: false,
            max_frames_to_read: None,
            gt_path: None,
            fps: 25.0,
        }
    }
}

impl InferenceConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.score_threshold) {
            return Err(Error::config(format!(
                "score threshold {} is outside [0, 1]",
                self.score_threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.sort.iou_threshold) {
            return Err(Error::config(format!(
                "IoU threshold {} is outside [0, 1]",
                self.sort.iou_threshold
            )));
        }
        if !self.fps.is_finite() || self.fps <= 0.0 {
            return Err(Error::config(format!(
                "fps must be positive and finite, got {}",
                self.fps
            )));
        }
        Ok(())
    }

    /// File name of the video without its extension.
    pub fn video_stem(&self) -> String {
        self.video_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "video".to_string())
    }

    pub fn tracking_output_dir(&self) -> PathBuf {
        self.output_dir.join(TRACKING_OUTPUT_DIR)
    }

    pub fn csv_path(&self) -> PathBuf {
        self.tracking_output_dir().join(TRACKING_CSV_NAME)
    }

    pub fn output_video_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("{}_output_video.mp4", self.video_stem()))
    }

    /// Maximum number of frames to process. Zero means no limit.
    pub fn frame_limit(&self) -> Option<u32> {
        self.max_frames_to_read.filter(|&max| max > 0)
    }

    /// Whether an annotated video is written.
    pub fn writes_video(&self) -> bool {
        self.save_video || self.gt_path.is_some()
    }
}

/// Totals of a finished run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub frames_read: u32,
    pub tracked_boxes: usize,
    pub csv_rows: usize,
    /// Present when the run was scored against ground truth
    pub evaluation: Option<TrackingSummary>,
}

/// Runs a detector and SORT over every frame of a video.
pub struct DetectorInference {
    config: InferenceConfig,
}

impl DetectorInference {
    pub fn new(config: InferenceConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &InferenceConfig {
        &self.config
    }

    /// Open the configured source and output video, then track every frame.
    pub fn run<D>(&self, detector: D) -> Result<RunSummary>
    where
        D: DetectionSource,
        Error: From<D::Error>,
    {
        let mut source = open_source(&self.config.video_path, self.config.fps)?;
        let sink: Option<Box<dyn FrameSink>> = if self.config.writes_video() {
            std::fs::create_dir_all(&self.config.output_dir)?;
            Some(create_sink(
                &self.config.output_video_path(),
                source.width(),
                source.height(),
                source.fps(),
            )?)
        } else {
            None
        };

        self.run_with(source.as_mut(), detector, sink)
    }

    /// Track every frame of `source`, writing annotated frames to `sink`.
    pub fn run_with<S, D>(
        &self,
        source: &mut S,
        detector: D,
        mut sink: Option<Box<dyn FrameSink>>,
    ) -> Result<RunSummary>
    where
        S: FrameSource + ?Sized,
        D: DetectionSource,
        Error: From<D::Error>,
    {
        let config = &self.config;
        let stem = config.video_stem();
        let mut pipeline = TrackerPipeline::new(detector, config.sort, config.score_threshold);

        let mut csv = if config.save_csv_and_frames {
            let path = config.csv_path();
            info!("Writing tracks to {}", path.display());
            Some(ViaCsvWriter::create(&path)?)
        } else {
            None
        };

        let ground_truth = match &config.gt_path {
            Some(path) => {
                let gt = read_ground_truth(path)?;
                info!("Loaded {} ground-truth boxes from {}", gt.len(), path.display());
                Some(gt)
            }
            None => None,
        };

        let mut summary = RunSummary {
            evaluation: ground_truth.as_ref().map(|_| TrackingSummary::new()),
            ..Default::default()
        };

        loop {
            let frame_number = summary.frames_read + 1;
            if config.frame_limit().is_some_and(|max| frame_number > max) {
                info!("Reached the limit of {} frames", frame_number - 1);
                break;
            }

            let Some(frame) = source.next_frame()? else {
                info!("No frame read at frame {}, end of video", frame_number);
                break;
            };
            summary.frames_read += 1;

            let tracked = pipeline.process_frame(&frame)?;
            debug!("Frame {}: {} tracked boxes", frame.number, tracked.len());
            summary.tracked_boxes += tracked.len();

            if let Some(csv) = csv.as_mut() {
                self.export_frame(csv, &stem, &frame, &tracked)?;
            }

            // Ground truth of this frame, matched against the tracked boxes
            let scored = ground_truth.as_ref().map(|gt| {
                let frame_gt = ground_truth_for_frame(gt, frame.number);
                let frame_match = match_frame(&frame_gt, &tracked, EVALUATION_IOU_THRESHOLD);
                (frame_gt, frame_match)
            });

            if let Some(sink) = sink.as_mut() {
                let mut annotated = frame.image.clone();
                match &scored {
                    Some((frame_gt, frame_match)) => {
                        draw_gt_tracking(&mut annotated, frame_gt, &tracked, frame_match, frame.number)
                    }
                    None => draw_tracked_boxes(&mut annotated, &tracked),
                }
                if let Err(e) = sink.write_frame(frame.number, &annotated) {
                    error!("Failed to write frame {} to the output video: {}", frame.number, e);
                    break;
                }
            }

            if let (Some((frame_gt, frame_match)), Some(evaluation)) =
                (&scored, summary.evaluation.as_mut())
            {
                evaluation.record(frame_gt, &tracked, frame_match);
            }
        }

        if let Some(mut csv) = csv {
            csv.flush()?;
            summary.csv_rows = csv.rows_written();
        }
        if let Some(sink) = sink {
            sink.finish()?;
        }

        info!(
            "Processed {} frames, {} tracked boxes, {} tracklets alive at the end",
            summary.frames_read,
            summary.tracked_boxes,
            pipeline.tracker().num_tracklets()
        );
        if let Some(evaluation) = &summary.evaluation {
            info!(
                "MOTA {:?}, mean IoU {:?}, {} id switches",
                evaluation.mota(),
                evaluation.mean_iou(),
                evaluation.id_switches
            );
        }
        Ok(summary)
    }

    /// Write the frame's CSV rows and save the frame image next to them.
    fn export_frame(
        &self,
        csv: &mut ViaCsvWriter<File>,
        stem: &str,
        frame: &Frame,
        tracked: &[TrackedBox],
    ) -> Result<()> {
        if tracked.is_empty() {
            return Ok(());
        }

        let frame_name = frame_file_name(stem, frame.number);
        let frame_path = self.config.tracking_output_dir().join(&frame_name);
        if let Err(e) = save_frame(&frame_path, frame) {
            error!("Failed to save {}, frame {}: {}", frame_name, frame.number, e);
            return Ok(());
        }

        for t in tracked {
            csv.write_box(&frame_name, frame.byte_size(), t)?;
        }
        Ok(())
    }
}

fn save_frame(path: &Path, frame: &Frame) -> Result<()> {
    frame.image.save(path)?;
    Ok(())
}
