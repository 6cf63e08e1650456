use serde::{Deserialize, Serialize};

use crate::types::{RangePoint, RegionId};

/// Top-view statistics of the range points assigned to one region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionSummary {
    pub id: RegionId,
    pub num_points: usize,
    /// Closest forward distance in metres.
    pub x_min: Option<f64>,
    /// Lateral extent `y_max - y_min` in metres.
    pub width: Option<f64>,
}

impl RegionSummary {
    pub fn from_points(id: RegionId, points: &[RangePoint]) -> RegionSummary {
        let x_min = points.iter().map(|p| p.x).reduce(f64::min);
        let y_min = points.iter().map(|p| p.y).reduce(f64::min);
        let y_max = points.iter().map(|p| p.y).reduce(f64::max);
        RegionSummary {
            id,
            num_points: points.len(),
            x_min,
            width: y_min.zip(y_max).map(|(lo, hi)| hi - lo),
        }
    }
}
