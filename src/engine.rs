use nalgebra as na;
use tracing::{debug, info, warn};

use crate::assignment::{self, CostMatrix, NON_ASSIGNMENT_COST};
use crate::config::TrackerConfig;
use crate::detection::Detection;
use crate::error::Error;
use crate::track::Track;
use crate::Detector;

/// Per-frame orchestration over a fixed set of tracks.
///
/// Strictly sequential: frame N depends only on frame N-1 state and the Nth
/// detection set. Not reentrant; the only suspension point is the call into
/// the external detector in [`TrackerEngine::track_frame`].
pub struct TrackerEngine {
    config: TrackerConfig,
    tracks: Vec<Track>,
    frame_index: u64,
    last_timestamp: Option<f64>,
}

impl TrackerEngine {
    /// Creates the fixed track set, distributed across the frame per the
    /// arena layout. Fails on invalid configuration; per-frame calls never
    /// revisit these checks.
    pub fn new(config: TrackerConfig) -> Result<Self, Error> {
        config.validate()?;

        let regions = config.layout.regions(&config.bounds, config.track_count);
        let seeds = config
            .layout
            .seed_positions(&config.bounds, config.track_count);

        let tracks = seeds
            .into_iter()
            .zip(regions)
            .enumerate()
            .map(|(id, (seed, region))| Track::new(id as u32, seed, region, &config))
            .collect::<Result<Vec<_>, _>>()?;

        info!(
            tracks = config.track_count,
            layout = ?config.layout,
            "tracker engine initialized"
        );

        Ok(Self {
            config,
            tracks,
            frame_index: 0,
            last_timestamp: None,
        })
    }

    /// Advances one frame.
    ///
    /// Detection counts of zero, fewer, or more than the track count are
    /// expected steady-state conditions: the cost matrix is padded square,
    /// the solver runs, and pairings over the active distance threshold are
    /// discarded even when globally optimal. Matched tracks take the
    /// detection center; everything else coasts. Surplus detections are
    /// dropped, never spawning tracks.
    pub fn step(&mut self, detections: &[Detection], timestamp: f64) -> Result<&[Track], Error> {
        if let Some(last) = self.last_timestamp {
            if timestamp <= last {
                // frames must arrive in order; behavior past this point is
                // best-effort
                warn!(timestamp, last, "non-monotonic frame timestamp");
            }
        }

        let threshold = self.active_threshold();

        if detections.is_empty() {
            debug!(frame = self.frame_index, "no detections, coasting all tracks");
            for i in 0..self.tracks.len() {
                self.coast(i, timestamp)?;
            }
            return Ok(self.finish_frame(timestamp));
        }

        let matrix = CostMatrix::padded(
            self.tracks.len(),
            detections.len(),
            NON_ASSIGNMENT_COST,
            |r, c| na::distance(&self.tracks[r].position(), &detections[c].center()),
        );

        // the engine builds this matrix itself, so a rejection here is a
        // bug upstream of the solver; the frame degrades to coasting
        let result = match assignment::solve(&matrix) {
            Ok(result) => Some(result),
            Err(err) => {
                warn!(frame = self.frame_index, %err, "assignment unsolvable");
                None
            }
        };

        for i in 0..self.tracks.len() {
            let matched = result.as_ref().and_then(|a| a.column(i)).and_then(|col| {
                let cost = matrix.get(i, col);
                if cost <= threshold {
                    Some(col)
                } else {
                    debug!(
                        track = self.tracks[i].id(),
                        cost, threshold, "pairing over threshold, coasting"
                    );
                    None
                }
            });

            match matched {
                Some(col) => {
                    let center = detections[col].center();
                    self.tracks[i].update_location(center.x, center.y, timestamp)?;
                }
                None => self.coast(i, timestamp)?,
            }
        }

        Ok(self.finish_frame(timestamp))
    }

    /// Obtains this frame's detections from the external detector, then
    /// advances via [`TrackerEngine::step`].
    pub fn track_frame<D: Detector>(
        &mut self,
        detector: &mut D,
        frame: &D::Frame,
        timestamp: f64,
    ) -> Result<&[Track], Error> {
        let detections = detector.detect(frame)?;
        self.step(&detections, timestamp)
    }

    /// Read-only view of the track set.
    #[inline]
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    #[inline]
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    #[inline]
    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Snap-in threshold for the first K frames, steady-state afterwards.
    fn active_threshold(&self) -> f64 {
        if self.frame_index < u64::from(self.config.snap_in_frames) {
            self.config.snap_in()
        } else {
            self.config.steady_threshold
        }
    }

    fn coast(&mut self, index: usize, timestamp: f64) -> Result<(), Error> {
        let track = &mut self.tracks[index];
        let dt = track
            .last_timestamp()
            .map(|t| timestamp - t)
            .filter(|dt| *dt > 0.0)
            .unwrap_or(self.config.frame_interval);

        track.predict_trajectory(dt)
    }

    fn finish_frame(&mut self, timestamp: f64) -> &[Track] {
        self.frame_index += 1;
        self.last_timestamp = Some(timestamp);
        &self.tracks
    }
}
