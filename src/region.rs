use nalgebra as na;
use serde_derive::{Deserialize, Serialize};

/// Axis-aligned rectangle bounding the legal positions of a track.
///
/// Clamping is independent per-axis min/max clipping; positions are never
/// reflected off an edge.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Region {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

impl Region {
    pub fn new(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Self {
        Self {
            xmin,
            ymin,
            xmax,
            ymax,
        }
    }

    /// Full frame of `width` x `height` pixels with the origin at (0, 0).
    pub fn frame(width: f64, height: f64) -> Self {
        Self::new(0.0, 0.0, width, height)
    }

    #[inline(always)]
    pub fn width(&self) -> f64 {
        self.xmax - self.xmin
    }

    #[inline(always)]
    pub fn height(&self) -> f64 {
        self.ymax - self.ymin
    }

    #[inline]
    pub fn diagonal(&self) -> f64 {
        self.width().hypot(self.height())
    }

    #[inline]
    pub fn center(&self) -> na::Point2<f64> {
        na::Point2::new(
            (self.xmin + self.xmax) / 2.0,
            (self.ymin + self.ymax) / 2.0,
        )
    }

    #[inline]
    pub fn clamp(&self, p: na::Point2<f64>) -> na::Point2<f64> {
        na::Point2::new(
            p.x.clamp(self.xmin, self.xmax),
            p.y.clamp(self.ymin, self.ymax),
        )
    }

    #[inline]
    pub fn contains(&self, p: &na::Point2<f64>) -> bool {
        p.x >= self.xmin && p.x <= self.xmax && p.y >= self.ymin && p.y <= self.ymax
    }

    pub fn is_degenerate(&self) -> bool {
        !(self.width() > 0.0 && self.height() > 0.0)
            || !self.xmin.is_finite()
            || !self.ymin.is_finite()
            || !self.xmax.is_finite()
            || !self.ymax.is_finite()
    }

    /// One cell of an even `rows` x `cols` split of this region.
    pub fn cell(&self, row: usize, col: usize, rows: usize, cols: usize) -> Region {
        let cw = self.width() / cols as f64;
        let ch = self.height() / rows as f64;
        let x = self.xmin + col as f64 * cw;
        let y = self.ymin + row as f64 * ch;

        Region::new(x, y, x + cw, y + ch)
    }
}

/// Bounded-region policy for a session.
///
/// Layouts differ only in where tracks start and which rectangle each track
/// clamps to, which is why they are a closed set of tagged configurations
/// rather than a trait.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub enum ArenaLayout {
    /// Every track ranges over the whole frame.
    #[default]
    Single,
    /// The frame is an even grid of plates; each track is confined to one
    /// cell, cycling through cells when tracks outnumber them.
    Grid { rows: usize, cols: usize },
}

impl ArenaLayout {
    /// Per-track clamp regions, one per track.
    pub fn regions(&self, frame: &Region, count: usize) -> Vec<Region> {
        match *self {
            ArenaLayout::Single => vec![*frame; count],
            ArenaLayout::Grid { rows, cols } => (0..count)
                .map(|i| {
                    let cell = i % (rows * cols);
                    frame.cell(cell / cols, cell % cols, rows, cols)
                })
                .collect(),
        }
    }

    /// Initial positions distributed across the frame so tracks converge
    /// quickly onto distinct subjects.
    pub fn seed_positions(&self, frame: &Region, count: usize) -> Vec<na::Point2<f64>> {
        match *self {
            ArenaLayout::Single => {
                let cols = (count as f64).sqrt().ceil().max(1.0) as usize;
                let rows = count.div_ceil(cols);

                (0..count)
                    .map(|i| frame.cell(i / cols, i % cols, rows, cols).center())
                    .collect()
            }
            ArenaLayout::Grid { .. } => self
                .regions(frame, count)
                .iter()
                .map(Region::center)
                .collect(),
        }
    }
}
