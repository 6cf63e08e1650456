pub mod camera;
pub mod lidar;

pub use camera::*;
pub use lidar::*;

use serde::{Deserialize, Serialize};

use crate::error::FusionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnavailableReason {
    /// No keypoint pair passed the distance checks.
    NoDistanceRatios,
    /// One of the two frames has no range points for the region.
    NoRangePoints,
    /// The region had no usable correspondences.
    NoCorrespondences,
}

/// Outcome of a time-to-collision estimate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TtcEstimate {
    /// Signed time in seconds. Negative values mean the object moves away.
    Seconds { value: f64 },
    /// The measurement did not change between the frames.
    NotClosing,
    Unavailable { reason: UnavailableReason },
}

impl TtcEstimate {
    pub fn seconds(&self) -> Option<f64> {
        match self {
            TtcEstimate::Seconds { value } => Some(*value),
            _ => None,
        }
    }

    /// Positive time to collision.
    pub fn is_collision_course(&self) -> bool {
        self.seconds().is_some_and(|s| s > 0.0)
    }

    /// Seconds, or NaN when there is no finite estimate.
    pub fn as_f64(&self) -> f64 {
        self.seconds().unwrap_or(f64::NAN)
    }

    pub(crate) fn from_ratio(numerator: f64, denominator: f64) -> TtcEstimate {
        if denominator == 0.0 {
            return TtcEstimate::NotClosing;
        }
        let value = numerator / denominator;
        if value.is_finite() {
            TtcEstimate::Seconds { value }
        } else {
            TtcEstimate::NotClosing
        }
    }
}

pub(crate) fn check_frame_interval(dt: f64) -> Result<(), FusionError> {
    if dt.is_finite() && dt > 0.0 {
        Ok(())
    } else {
        Err(FusionError::InvalidFrameInterval(dt))
    }
}
