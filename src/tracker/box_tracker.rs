//! Single object tracklet driven by a constant-velocity Kalman filter.

use crate::error::Result;
use crate::tracker::kalman_filter::KalmanFilter;
use crate::tracker::rect::Rect;

/// Dimension of the tracklet state `[u, v, s, r, du, dv, ds]`.
const DIM_X: usize = 7;

/// Diagonal of the measurement noise covariance, uncertainties of (u, v, s, r).
const MEASUREMENT_NOISE: [f64; 4] = [1.0, 1.0, 10.0, 10.0];

/// Diagonal of the initial state covariance. Velocities are unobserved at
/// birth so they start with a much larger uncertainty.
const INITIAL_COVARIANCE: [f64; DIM_X] = [10.0, 10.0, 10.0, 10.0, 10000.0, 10000.0, 10000.0];

/// Diagonal of the process noise covariance, uncertainties of (u, v, s, r, du, dv, ds).
const PROCESS_NOISE: [f64; DIM_X] = [1.0, 1.0, 1.0, 1.0, 0.01, 0.01, 0.0001];

/// Internal state of an individual tracked object observed as a bounding box.
#[derive(Debug, Clone)]
pub struct KalmanBoxTracker {
    /// Track identifier, unique within the owning tracker
    pub id: u64,
    kf: KalmanFilter,
    /// Number of predict steps since creation
    pub age: u32,
    /// Number of matched detections
    pub hits: u32,
    /// Number of consecutive frames with a matched detection
    pub hit_streak: u32,
    /// Number of predict steps since the last matched detection
    pub time_since_update: u32,
}

impl KalmanBoxTracker {
    /// Start a tracklet from an initial detection box.
    pub fn new(id: u64, bbox: Rect) -> Self {
        let mut kf = KalmanFilter::new(DIM_X);

        // u, v and s move with constant velocity, r is held constant.
        for i in 0..3 {
            kf.f[[i, i + 4]] = 1.0;
        }
        for i in 0..DIM_X {
            kf.p[[i, i]] = INITIAL_COVARIANCE[i];
            kf.q[[i, i]] = PROCESS_NOISE[i];
        }
        for i in 0..4 {
            kf.r[[i, i]] = MEASUREMENT_NOISE[i];
        }

        let z = bbox.to_xysr();
        for i in 0..4 {
            kf.x[i] = z[i];
        }

        Self {
            id,
            kf,
            age: 0,
            hits: 0,
            hit_streak: 0,
            time_since_update: 0,
        }
    }

    /// Update the state with an observed box.
    pub fn update(&mut self, bbox: Rect) -> Result<()> {
        self.time_since_update = 0;
        self.hits += 1;
        self.hit_streak += 1;
        self.kf.update(bbox.to_xysr())
    }

    /// Advance the state one frame and return the predicted box.
    pub fn predict(&mut self) -> Rect {
        // Keep the predicted area from going negative.
        if self.kf.x[6] + self.kf.x[2] <= 0.0 {
            self.kf.x[6] = 0.0;
        }
        self.kf.predict();
        self.age += 1;

        if self.time_since_update > 0 {
            self.hit_streak = 0;
        }
        self.time_since_update += 1;

        self.state()
    }

    /// Current bounding box estimate.
    pub fn state(&self) -> Rect {
        let x = &self.kf.x;
        Rect::from_xysr(x[0], x[1], x[2], x[3])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_initial_state_matches_detection() {
        let bbox = Rect::from_tlbr(100.0, 50.0, 140.0, 80.0);
        let trk = KalmanBoxTracker::new(1, bbox);
        let state = trk.state();
        assert_abs_diff_eq!(state.x, 100.0, epsilon = 1e-3);
        assert_abs_diff_eq!(state.y, 50.0, epsilon = 1e-3);
        assert_abs_diff_eq!(state.width, 40.0, epsilon = 1e-3);
        assert_abs_diff_eq!(state.height, 30.0, epsilon = 1e-3);
    }

    #[test]
    fn test_counters() {
        let bbox = Rect::from_tlbr(0.0, 0.0, 10.0, 10.0);
        let mut trk = KalmanBoxTracker::new(1, bbox);

        trk.predict();
        trk.update(bbox).unwrap();
        assert_eq!(trk.hits, 1);
        assert_eq!(trk.hit_streak, 1);
        assert_eq!(trk.time_since_update, 0);

        trk.predict();
        trk.update(bbox).unwrap();
        assert_eq!(trk.hit_streak, 2);

        // Missed frame breaks the streak on the following predict.
        trk.predict();
        assert_eq!(trk.time_since_update, 1);
        assert_eq!(trk.hit_streak, 2);
        trk.predict();
        assert_eq!(trk.time_since_update, 2);
        assert_eq!(trk.hit_streak, 0);
        assert_eq!(trk.age, 4);
    }

    #[test]
    fn test_follows_moving_box() {
        let mut trk = KalmanBoxTracker::new(1, Rect::new(0.0, 0.0, 20.0, 20.0));
        for step in 1..=10 {
            trk.predict();
            trk.update(Rect::new(step as f32 * 5.0, 0.0, 20.0, 20.0)).unwrap();
        }
        let predicted = trk.predict();
        // Velocity has been learned, so the prediction leads the last detection.
        assert!(predicted.x > 50.0);
        assert!(predicted.x < 60.0);
    }
}
