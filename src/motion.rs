//! Per-track Kalman motion model.
//!
//! State is `[x, y, vx, vy, ax, ay]`. The observation model is identity:
//! callers assemble the observation vector from the latest measured position
//! plus the independently estimated velocity and acceleration. One
//! `predict`/`correct` cycle runs per frame; when no detection matched, the
//! coasting position is fed back as a synthetic observation so the filter
//! keeps its cadence without diverging.

use nalgebra as na;

use crate::error::Error;

#[derive(Debug, Clone)]
pub struct MotionModel {
    transition: na::Matrix6<f64>,
    process_noise: na::Matrix6<f64>,
    measurement_noise: na::Matrix6<f64>,
    state: na::Vector6<f64>,
    covariance: na::Matrix6<f64>,
}

/// Observation vector from a measured position and the caller's velocity and
/// acceleration estimates.
#[inline]
pub fn observation(
    pos: na::Point2<f64>,
    vel: na::Vector2<f64>,
    acc: na::Vector2<f64>,
) -> na::Vector6<f64> {
    na::Vector6::new(pos.x, pos.y, vel.x, vel.y, acc.x, acc.y)
}

impl MotionModel {
    /// Filter starting at `origin` with zero velocity and acceleration.
    ///
    /// `responsiveness` (sv) scales how strongly velocity folds into the
    /// predicted position; higher values adapt faster to behavioral change
    /// at the cost of noisier estimates. Degenerate noise diagonals are a
    /// configuration fault and are rejected here rather than surfacing as
    /// numeric instability mid-session: the initial covariance is zero
    /// (full confidence in the starting position, none in velocity or
    /// acceleration), so early corrections lean entirely on the noise
    /// configuration.
    pub fn new(
        origin: na::Point2<f64>,
        responsiveness: f64,
        process_noise: &[f64; 6],
        measurement_noise: &[f64; 6],
    ) -> Result<Self, Error> {
        if !(responsiveness.is_finite() && responsiveness > 0.0 && responsiveness < 1.0) {
            return Err(Error::Config(format!(
                "responsiveness must lie in (0, 1), got {responsiveness}"
            )));
        }
        if process_noise.iter().any(|&q| !q.is_finite() || q < 0.0) {
            return Err(Error::Config(
                "process noise diagonal must be finite and non-negative".into(),
            ));
        }
        if measurement_noise.iter().any(|&r| !r.is_finite() || r <= 0.0) {
            return Err(Error::Config(
                "measurement noise diagonal must be finite and positive".into(),
            ));
        }

        let sv = responsiveness;
        #[rustfmt::skip]
        let transition = na::Matrix6::new(
            1.0, 0.0,  sv, 0.0, 0.0, 0.0,
            0.0, 1.0, 0.0,  sv, 0.0, 0.0,
            0.0, 0.0, 1.0, 0.0, 1.0, 0.0,
            0.0, 0.0, 0.0, 1.0, 0.0, 1.0,
            0.0, 0.0, 0.0, 0.0, 1.0, 0.0,
            0.0, 0.0, 0.0, 0.0, 0.0, 1.0,
        );

        Ok(Self {
            transition,
            process_noise: na::Matrix6::from_diagonal(&na::Vector6::from_column_slice(
                process_noise,
            )),
            measurement_noise: na::Matrix6::from_diagonal(&na::Vector6::from_column_slice(
                measurement_noise,
            )),
            state: na::Vector6::new(origin.x, origin.y, 0.0, 0.0, 0.0, 0.0),
            covariance: na::Matrix6::zeros(),
        })
    }

    /// Advances the prior estimate one frame. Committed history is not
    /// touched; `correct` must follow before the next `predict`.
    pub fn predict(&mut self) {
        self.state = self.transition * self.state;
        self.covariance =
            self.transition * self.covariance * self.transition.transpose() + self.process_noise;
    }

    /// Standard Kalman correction against `observation`.
    pub fn correct(&mut self, observation: &na::Vector6<f64>) -> Result<(), Error> {
        let innovation = observation - self.state;
        // H = I, so S = P + R and K = P S^-1
        let s = self.covariance + self.measurement_noise;
        let s_inv = s.try_inverse().ok_or(Error::SingularInnovation)?;
        let gain = self.covariance * s_inv;

        self.state += gain * innovation;
        self.covariance = (na::Matrix6::identity() - gain) * self.covariance;

        Ok(())
    }

    #[inline]
    pub fn position(&self) -> na::Point2<f64> {
        na::Point2::new(self.state[0], self.state[1])
    }

    #[inline]
    pub fn velocity(&self) -> na::Vector2<f64> {
        na::Vector2::new(self.state[2], self.state[3])
    }

    #[inline]
    pub fn acceleration(&self) -> na::Vector2<f64> {
        na::Vector2::new(self.state[4], self.state[5])
    }

    #[inline]
    pub fn state(&self) -> &na::Vector6<f64> {
        &self.state
    }

    #[inline]
    pub fn covariance(&self) -> &na::Matrix6<f64> {
        &self.covariance
    }
}
