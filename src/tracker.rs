mod box_tracker;
mod detection;
mod kalman_filter;
pub mod matching;
mod rect;
mod sort;

pub use box_tracker::KalmanBoxTracker;
pub use detection::{Detection, TrackedBox};
pub use kalman_filter::KalmanFilter;
pub use matching::{Association, associate_detections_to_trackers, linear_assignment};
pub use rect::{Rect, iou_batch};
pub use sort::{Sort, SortConfig};
