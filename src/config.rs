use serde_derive::{Deserialize, Serialize};

use crate::error::Error;
use crate::region::{ArenaLayout, Region};

pub const DEFAULT_STEADY_THRESHOLD: f64 = 80.0;
pub const DEFAULT_SNAP_IN_FRAMES: u32 = 10;
pub const DEFAULT_VELOCITY_LOOKBACK: usize = 3;
pub const DEFAULT_RING_CAPACITY: usize = 16;
pub const DEFAULT_FRAME_INTERVAL: f64 = 0.04;
pub const DEFAULT_RESPONSIVENESS: f64 = 0.5;
pub const DEFAULT_PROCESS_NOISE: [f64; 6] = [1.0, 1.0, 0.5, 0.5, 0.01, 0.01];
pub const DEFAULT_MEASUREMENT_NOISE: [f64; 6] = [1.0, 1.0, 8.0, 8.0, 32.0, 32.0];

/// Session-wide configuration, passed explicitly at engine construction.
///
/// `track_count` and `bounds` are required; every tuning field has a default
/// so partial config files deserialize.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TrackerConfig {
    /// Fixed number of tracks for the session.
    pub track_count: usize,
    /// Camera frame (or crop) the subjects live in.
    pub bounds: Region,
    #[serde(default)]
    pub layout: ArenaLayout,
    /// Enlarged distance tolerance for the first `snap_in_frames` frames.
    /// `None` means the frame diagonal.
    #[serde(default)]
    pub snap_in_threshold: Option<f64>,
    #[serde(default = "default_steady_threshold")]
    pub steady_threshold: f64,
    #[serde(default = "default_snap_in_frames")]
    pub snap_in_frames: u32,
    /// How many frames back the velocity estimate compares against.
    #[serde(default = "default_velocity_lookback")]
    pub velocity_lookback: usize,
    /// Capacity of the recent-position buffer kept per track.
    #[serde(default = "default_ring_capacity")]
    pub ring_capacity: usize,
    /// Fallback frame spacing in seconds, used before the first timestamps
    /// arrive.
    #[serde(default = "default_frame_interval")]
    pub frame_interval: f64,
    #[serde(default = "default_process_noise")]
    pub process_noise: [f64; 6],
    #[serde(default = "default_measurement_noise")]
    pub measurement_noise: [f64; 6],
    /// Kalman responsiveness coefficient sv, in (0, 1).
    #[serde(default = "default_responsiveness")]
    pub responsiveness: f64,
}

fn default_steady_threshold() -> f64 {
    DEFAULT_STEADY_THRESHOLD
}

fn default_snap_in_frames() -> u32 {
    DEFAULT_SNAP_IN_FRAMES
}

fn default_velocity_lookback() -> usize {
    DEFAULT_VELOCITY_LOOKBACK
}

fn default_ring_capacity() -> usize {
    DEFAULT_RING_CAPACITY
}

fn default_frame_interval() -> f64 {
    DEFAULT_FRAME_INTERVAL
}

fn default_process_noise() -> [f64; 6] {
    DEFAULT_PROCESS_NOISE
}

fn default_measurement_noise() -> [f64; 6] {
    DEFAULT_MEASUREMENT_NOISE
}

fn default_responsiveness() -> f64 {
    DEFAULT_RESPONSIVENESS
}

impl TrackerConfig {
    /// `track_count` tracks over `bounds`, all tuning fields at defaults.
    pub fn new(track_count: usize, bounds: Region) -> Self {
        Self {
            track_count,
            bounds,
            layout: ArenaLayout::default(),
            snap_in_threshold: None,
            steady_threshold: DEFAULT_STEADY_THRESHOLD,
            snap_in_frames: DEFAULT_SNAP_IN_FRAMES,
            velocity_lookback: DEFAULT_VELOCITY_LOOKBACK,
            ring_capacity: DEFAULT_RING_CAPACITY,
            frame_interval: DEFAULT_FRAME_INTERVAL,
            process_noise: DEFAULT_PROCESS_NOISE,
            measurement_noise: DEFAULT_MEASUREMENT_NOISE,
            responsiveness: DEFAULT_RESPONSIVENESS,
        }
    }

    /// Active snap-in threshold: configured value or the frame diagonal.
    #[inline]
    pub fn snap_in(&self) -> f64 {
        self.snap_in_threshold
            .unwrap_or_else(|| self.bounds.diagonal())
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.track_count == 0 {
            return Err(Error::Config("track count must be positive".into()));
        }
        if self.bounds.is_degenerate() {
            return Err(Error::Config(format!(
                "degenerate frame bounds: {:?}",
                self.bounds
            )));
        }
        if let ArenaLayout::Grid { rows, cols } = self.layout {
            if rows == 0 || cols == 0 {
                return Err(Error::Config(format!(
                    "grid layout needs at least one cell, got {rows}x{cols}"
                )));
            }
        }
        if let Some(t) = self.snap_in_threshold {
            if !t.is_finite() || t <= 0.0 {
                return Err(Error::Config(format!("bad snap-in threshold {t}")));
            }
        }
        if !self.steady_threshold.is_finite() || self.steady_threshold <= 0.0 {
            return Err(Error::Config(format!(
                "bad steady-state threshold {}",
                self.steady_threshold
            )));
        }
        if self.velocity_lookback == 0 {
            return Err(Error::Config("velocity lookback must be at least 1".into()));
        }
        if self.ring_capacity <= self.velocity_lookback {
            return Err(Error::Config(format!(
                "ring capacity {} cannot hold a lookback of {}",
                self.ring_capacity, self.velocity_lookback
            )));
        }
        if !self.frame_interval.is_finite() || self.frame_interval <= 0.0 {
            return Err(Error::Config(format!(
                "bad frame interval {}",
                self.frame_interval
            )));
        }
        // noise diagonals and responsiveness are re-checked by MotionModel,
        // which owns their numeric contract

        Ok(())
    }
}
