use nalgebra as na;
use serde_derive::{Deserialize, Serialize};

/// Contains (x,y) of the center and (width,height) of the detected box.
///
/// Detections are ephemeral: one frame's assignment consumes them and they
/// are discarded. Confidence filtering and duplicate suppression are the
/// detector's responsibility.
#[derive(Serialize, Deserialize, Debug, Clone, Copy)]
pub struct Detection {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
    #[serde(rename = "p")]
    pub confidence: f64,
}

impl Detection {
    pub fn new(x: f64, y: f64, w: f64, h: f64, confidence: f64) -> Self {
        Self {
            x,
            y,
            w,
            h,
            confidence,
        }
    }

    #[inline(always)]
    pub fn center(&self) -> na::Point2<f64> {
        na::Point2::new(self.x, self.y)
    }

    #[inline(always)]
    pub fn xmax(&self) -> f64 {
        self.x + self.w / 2.
    }

    #[inline(always)]
    pub fn ymax(&self) -> f64 {
        self.y + self.h / 2.
    }

    #[inline(always)]
    pub fn xmin(&self) -> f64 {
        self.x - self.w / 2.
    }

    #[inline(always)]
    pub fn ymin(&self) -> f64 {
        self.y - self.h / 2.
    }
}
