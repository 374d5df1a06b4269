use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use log::{debug, info};

use crabtrack_rs::coco::{CocoDataset, summarize};
use crabtrack_rs::{DetectionSource, DetectionsFile, DetectorInference, InferenceConfig, SortConfig};

#[derive(Parser, Debug)]
#[command(name = "crabtrack", about = "Track crabs in video with a detector and SORT")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Detect and track every frame of a video.
    Track(TrackArgs),
    /// Print statistics of a COCO annotation file.
    CocoSummary {
        /// COCO JSON file
        path: PathBuf,
    },
}

#[derive(Args, Debug)]
struct TrackArgs {
    /// Video file, or a directory of frame images.
    #[arg(long)]
    video_path: PathBuf,
    /// Precomputed detections (CSV: frame,x1,y1,x2,y2,score,label).
    #[arg(long)]
    detections: Option<PathBuf>,
    /// Exported ONNX detector.
    #[cfg(feature = "onnx")]
    #[arg(long)]
    model: Option<PathBuf>,
    /// Write the video with tracked boxes drawn on every frame.
    #[arg(long)]
    save_video: bool,
    /// Directory receiving the output video and the tracking_output folder.
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,
    /// Write the tracks as VIA CSV along with the frame images.
    #[arg(long)]
    save_csv_and_frames: bool,
    /// Detections scoring at or below this are dropped.
    #[arg(long, default_value_t = 0.1)]
    score_threshold: f32,
    /// Minimum IoU between a detection and a track for them to match.
    #[arg(long, default_value_t = 0.1)]
    iou_threshold: f32,
    /// Frames a track survives without a matching detection.
    #[arg(long, default_value_t = 1)]
    max_age: u32,
    /// Matches needed before a new track is reported.
    #[arg(long, default_value_t = 3)]
    min_hits: u32,
    /// Stop after this many frames, 0 reads the whole video.
    #[arg(long)]
    max_frames_to_read: Option<u32>,
    /// VIA CSV with ground-truth tracks to overlay and score against.
    #[arg(long)]
    gt_path: Option<PathBuf>,
    /// Frame rate of image directories.
    #[arg(long, default_value_t = 25.0)]
    fps: f64,
    /// Device running the detector model (cpu or gpu).
    #[arg(long, default_value = "cpu")]
    accelerator: String,
    /// Channel order the model expects (rgb or bgr).
    #[cfg(feature = "onnx")]
    #[arg(long, default_value = "rgb")]
    channel_order: String,
}

impl TrackArgs {
    fn inference_config(&self) -> InferenceConfig {
        InferenceConfig {
            video_path: self.video_path.clone(),
            output_dir: self.output_dir.clone(),
            score_threshold: self.score_threshold,
            sort: SortConfig {
                max_age: self.max_age,
                min_hits: self.min_hits,
                iou_threshold: self.iou_threshold,
            },
            save_video: self.save_video,
            save_csv_and_frames: self.save_csv_and_frames,
            max_frames_to_read: self.max_frames_to_read,
            gt_path: self.gt_path.clone(),
            fps: self.fps,
        }
    }

    fn detector(&self) -> Result<Box<dyn DetectionSource<Error = crabtrack_rs::Error>>> {
        if let Some(path) = &self.detections {
            let file = DetectionsFile::open(path)
                .with_context(|| format!("Failed to load detections {}", path.display()))?;
            return Ok(Box::new(file));
        }

        #[cfg(feature = "onnx")]
        if let Some(path) = &self.model {
            use crabtrack_rs::integration::{Accelerator, ChannelOrder, OnnxDetector};

            let accelerator: Accelerator = self.accelerator.parse()?;
            let channel_order: ChannelOrder = self.channel_order.parse()?;
            let detector = OnnxDetector::load(path, accelerator)
                .with_context(|| format!("Failed to load model {}", path.display()))?
                .with_channel_order(channel_order);
            return Ok(Box::new(detector));
        }

        if self.accelerator != "cpu" {
            debug!("Accelerator {} is unused without a model", self.accelerator);
        }
        bail!("no detector given, pass --detections (or --model with the onnx feature)")
    }
}

fn track(args: TrackArgs) -> Result<()> {
    let config = args.inference_config();
    debug!("Config: {}", serde_json::to_string(&config)?);

    let inference = DetectorInference::new(config).context("Invalid tracking configuration")?;
    let detector = args.detector()?;

    info!("Tracking {}", args.video_path.display());
    let summary = inference
        .run(detector)
        .with_context(|| format!("Tracking failed on {}", args.video_path.display()))?;

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn coco_summary(path: PathBuf) -> Result<()> {
    let dataset = CocoDataset::load(&path)
        .with_context(|| format!("Failed to read COCO file {}", path.display()))?;
    let summary = summarize(&dataset)?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match Cli::parse().command {
        Command::Track(args) => track(args),
        Command::CocoSummary { path } => coco_summary(path),
    }
}
