use nalgebra as na;

use crate::config::TrackerConfig;
use crate::error::Error;
use crate::motion::{self, MotionModel};
use crate::region::Region;
use crate::ring::RingBuffer;

/// One tracked subject: a stable identity plus its motion estimate.
///
/// Tracks are created once at engine initialization and live for the whole
/// session; identity is purely continuity-based. The engine owns every
/// track exclusively, so consumers only ever see the read-only accessors.
#[derive(Debug, Clone)]
pub struct Track {
    id: u32,
    position: na::Point2<f64>,
    velocity: na::Vector2<f64>,
    acceleration: na::Vector2<f64>,
    bounds: Region,
    lookback: usize,
    recent: RingBuffer<(f64, na::Point2<f64>)>,
    history: Vec<(f64, na::Point2<f64>)>,
    motion: MotionModel,
    last_timestamp: Option<f64>,
}

impl Track {
    pub(crate) fn new(
        id: u32,
        origin: na::Point2<f64>,
        bounds: Region,
        config: &TrackerConfig,
    ) -> Result<Self, Error> {
        let origin = bounds.clamp(origin);
        let motion = MotionModel::new(
            origin,
            config.responsiveness,
            &config.process_noise,
            &config.measurement_noise,
        )?;

        Ok(Self {
            id,
            position: origin,
            velocity: na::Vector2::zeros(),
            acceleration: na::Vector2::zeros(),
            bounds,
            lookback: config.velocity_lookback,
            recent: RingBuffer::with_capacity(config.ring_capacity),
            history: Vec::new(),
            motion,
            last_timestamp: None,
        })
    }

    /// Commits a measured position for this frame.
    ///
    /// The position is clamped into the track's region (independent per-axis
    /// clipping), recorded in history and the recent buffer, and the
    /// velocity is re-estimated against the position `lookback` frames back
    /// rather than a frame-to-frame delta, smoothing detector jitter. The
    /// motion model then runs its predict/correct cycle on the fresh state.
    pub fn update_location(&mut self, x: f64, y: f64, timestamp: f64) -> Result<(), Error> {
        let position = self.bounds.clamp(na::Point2::new(x, y));

        self.history.push((timestamp, position));
        self.recent.push((timestamp, position));

        let previous_velocity = self.velocity;
        let base = self
            .recent
            .lookback(self.lookback)
            .or_else(|| self.recent.oldest())
            .copied();
        if let Some((base_ts, base_pos)) = base {
            let dt = timestamp - base_ts;
            if dt > 0.0 {
                self.velocity = (position - base_pos) / dt;
            }
        }

        if let Some(last) = self.last_timestamp {
            let dt = timestamp - last;
            if dt > 0.0 {
                self.acceleration = (self.velocity - previous_velocity) / dt;
            }
        }

        self.position = position;
        self.last_timestamp = Some(timestamp);

        self.motion.predict();
        self.motion.correct(&motion::observation(
            self.position,
            self.velocity,
            self.acceleration,
        ))
    }

    /// Coasts one frame without a matched detection.
    ///
    /// The next position extrapolates the current one with the estimated
    /// velocity rather than taking the raw filter position, which recovers
    /// more smoothly from short occlusions. It then re-enters
    /// `update_location`, so history and the velocity estimate stay
    /// internally consistent and the filter keeps its predict/correct
    /// cadence on a synthetic observation.
    pub fn predict_trajectory(&mut self, dt: f64) -> Result<(), Error> {
        let next = self.position + self.velocity * dt;
        let timestamp = self.last_timestamp.map_or(dt, |t| t + dt);

        self.update_location(next.x, next.y, timestamp)
    }

    #[inline]
    pub fn id(&self) -> u32 {
        self.id
    }

    #[inline]
    pub fn position(&self) -> na::Point2<f64> {
        self.position
    }

    #[inline]
    pub fn velocity(&self) -> na::Vector2<f64> {
        self.velocity
    }

    #[inline]
    pub fn acceleration(&self) -> na::Vector2<f64> {
        self.acceleration
    }

    #[inline]
    pub fn bounds(&self) -> &Region {
        &self.bounds
    }

    /// Recent clamped positions with their timestamps, newest first.
    #[inline]
    pub fn recent_positions(&self) -> impl Iterator<Item = &(f64, na::Point2<f64>)> {
        self.recent.iter()
    }

    /// Full append-only position history, oldest first.
    #[inline]
    pub fn history(&self) -> &[(f64, na::Point2<f64>)] {
        &self.history
    }

    #[inline]
    pub fn last_timestamp(&self) -> Option<f64> {
        self.last_timestamp
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::region::Region;

    fn test_track() -> Track {
        let config = TrackerConfig::new(1, Region::frame(640.0, 480.0));
        Track::new(
            0,
            na::Point2::new(320.0, 240.0),
            config.bounds,
            &config,
        )
        .unwrap()
    }

    #[test]
    fn edge_positions_pass_unmodified() {
        let mut track = test_track();

        track.update_location(640.0, 0.0, 0.04).unwrap();
        assert_abs_diff_eq!(track.position().x, 640.0);
        assert_abs_diff_eq!(track.position().y, 0.0);
    }

    #[test]
    fn out_of_bounds_positions_clamp_to_the_edge() {
        let mut track = test_track();

        track.update_location(641.0, -1.0, 0.04).unwrap();
        assert_abs_diff_eq!(track.position().x, 640.0);
        assert_abs_diff_eq!(track.position().y, 0.0);
    }

    #[test]
    fn identical_updates_drive_velocity_to_zero() {
        let mut track = test_track();

        for i in 1..=20 {
            track.update_location(100.0, 100.0, i as f64 * 0.04).unwrap();
        }

        assert_abs_diff_eq!(track.velocity().norm(), 0.0, epsilon = 1e-12);

        // coasting from a standstill converges to the same position
        for _ in 0..5 {
            track.predict_trajectory(0.04).unwrap();
        }
        assert_abs_diff_eq!(track.position().x, 100.0, epsilon = 1e-9);
        assert_abs_diff_eq!(track.position().y, 100.0, epsilon = 1e-9);
    }

    #[test]
    fn velocity_uses_lookback_not_last_delta() {
        let mut track = test_track();

        // constant 10 px/frame motion along x at 25 fps
        for i in 1..=6 {
            track
                .update_location(100.0 + i as f64 * 10.0, 50.0, i as f64 * 0.04)
                .unwrap();
        }

        // (p_n - p_{n-3}) / (3 * 0.04) = 30 / 0.12 = 250 px/s
        assert_abs_diff_eq!(track.velocity().x, 250.0, epsilon = 1e-9);
        assert_abs_diff_eq!(track.velocity().y, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn coasting_stays_bounded_for_five_frames() {
        let mut track = test_track();

        for i in 1..=6 {
            track
                .update_location(200.0 + i as f64 * 4.0, 200.0, i as f64 * 0.04)
                .unwrap();
        }
        let speed_before = track.velocity().norm();

        for _ in 0..5 {
            track.predict_trajectory(0.04).unwrap();
        }

        assert!(track.bounds().contains(&track.position()));
        assert!(track.velocity().norm() <= speed_before * 1.5 + 1e-9);
        assert_eq!(track.history().len(), 11);
    }

    #[test]
    fn recent_buffer_respects_capacity() {
        let mut track = test_track();
        let capacity = TrackerConfig::new(1, Region::frame(640.0, 480.0)).ring_capacity;

        for i in 1..=40 {
            track.update_location(100.0, 100.0, i as f64 * 0.04).unwrap();
        }

        assert_eq!(track.recent_positions().count(), capacity);
        assert_eq!(track.history().len(), 40);
    }
}
