//! Linear Kalman filter over ndarray matrices, with a nalgebra-based 4x4 inverse.

use ndarray::{Array1, Array2};

use crate::error::{Error, Result};

/// Number of measured quantities (center x, center y, area, aspect ratio).
pub const DIM_Z: usize = 4;

#[derive(Debug, Clone)]
pub struct KalmanFilter {
    /// State estimate
    pub x: Array1<f64>,
    /// State covariance
    pub p: Array2<f64>,
    /// State transition
    pub f: Array2<f64>,
    /// Measurement function
    pub h: Array2<f64>,
    /// Process noise
    pub q: Array2<f64>,
    /// Measurement noise
    pub r: Array2<f64>,
}

impl KalmanFilter {
    /// Create a filter with identity dynamics, a `[I | 0]` measurement function
    /// and identity covariances.
    pub fn new(dim_x: usize) -> Self {
        let mut h = Array2::zeros((DIM_Z, dim_x));
        for i in 0..DIM_Z {
            h[[i, i]] = 1.0;
        }

        Self {
            x: Array1::zeros(dim_x),
            p: Array2::eye(dim_x),
            f: Array2::eye(dim_x),
            h,
            q: Array2::eye(dim_x),
            r: Array2::eye(DIM_Z),
        }
    }

    pub fn predict(&mut self) {
        self.x = self.f.dot(&self.x);
        self.p = self.f.dot(&self.p).dot(&self.f.t()) + &self.q;
    }

    /// Fold a measurement into the state.
    ///
    /// The covariance is updated in Joseph form, which keeps it symmetric
    /// positive semi-definite.
    pub fn update(&mut self, measurement: [f64; DIM_Z]) -> Result<()> {
        let z = Array1::from_vec(measurement.to_vec());
        let innovation = z - self.h.dot(&self.x);

        let pht = self.p.dot(&self.h.t());
        let s = self.h.dot(&pht) + &self.r;
        let s_inv = invert_4x4(&s).ok_or(Error::SingularMatrix)?;

        let kalman_gain = pht.dot(&s_inv);
        self.x = &self.x + &kalman_gain.dot(&innovation);

        let dim_x = self.x.len();
        let i_kh = Array2::<f64>::eye(dim_x) - kalman_gain.dot(&self.h);
        self.p = i_kh.dot(&self.p).dot(&i_kh.t())
            + kalman_gain.dot(&self.r).dot(&kalman_gain.t());

        Ok(())
    }
}

/// Invert a 4x4 matrix using nalgebra (pure Rust), `None` when singular.
fn invert_4x4(m: &Array2<f64>) -> Option<Array2<f64>> {
    let mut nm = nalgebra::Matrix4::zeros();
    for i in 0..4 {
        for j in 0..4 {
            nm[(i, j)] = m[[i, j]];
        }
    }
    let inv = nm.try_inverse()?;
    let mut res = Array2::zeros((4, 4));
    for i in 0..4 {
        for j in 0..4 {
            res[[i, j]] = inv[(i, j)];
        }
    }
    Some(res)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_predict_constant_velocity() {
        let mut kf = KalmanFilter::new(7);
        kf.f[[0, 4]] = 1.0;
        kf.x[0] = 10.0;
        kf.x[4] = 2.0;
        kf.predict();
        assert_eq!(kf.x[0], 12.0);
        kf.predict();
        assert_eq!(kf.x[0], 14.0);
    }

    #[test]
    fn test_update_moves_toward_measurement() {
        let mut kf = KalmanFilter::new(7);
        kf.update([10.0, 10.0, 10.0, 10.0]).unwrap();
        // Equal prior and measurement variance: estimate lands halfway.
        assert_abs_diff_eq!(kf.x[0], 5.0, epsilon = 1e-9);
        assert_abs_diff_eq!(kf.p[[0, 0]], 0.5, epsilon = 1e-9);
    }

    #[test]
    fn test_singular_innovation() {
        let mut kf = KalmanFilter::new(7);
        kf.p = Array2::zeros((7, 7));
        kf.r = Array2::zeros((4, 4));
        assert!(matches!(
            kf.update([1.0, 1.0, 1.0, 1.0]),
            Err(Error::SingularMatrix)
        ));
    }
}
