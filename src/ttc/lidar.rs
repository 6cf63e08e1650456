use super::{TtcEstimate, UnavailableReason, check_frame_interval};
use crate::config::LidarTtcConfig;
use crate::error::FusionError;
use crate::stats::KSmallest;
use crate::types::RangePoint;

/// Robust closest forward distance of a point set, `None` when it is empty.
pub fn near_range(points: &[RangePoint], config: &LidarTtcConfig) -> Result<Option<f64>, FusionError> {
    config.validate()?;
    let mut nearest = KSmallest::new(config.k);
    nearest.extend(points.iter().map(|p| p.x));
    if nearest.is_empty() {
        return Ok(None);
    }
    Ok(Some(nearest.reduce(config.reduction)?))
}

/// Time to collision from the closure of the nearest range between frames.
///
/// Constant velocity model: `ttc = d_curr * dt / (d_prev - d_curr)`. A receding
/// object yields a negative time.
pub fn estimate_ttc_from_range(
    prev_points: &[RangePoint],
    curr_points: &[RangePoint],
    frame_interval: f64,
    config: &LidarTtcConfig,
) -> Result<TtcEstimate, FusionError> {
    check_frame_interval(frame_interval)?;
    let (Some(prev_min), Some(curr_min)) = (
        near_range(prev_points, config)?,
        near_range(curr_points, config)?,
    ) else {
        return Ok(TtcEstimate::Unavailable {
            reason: UnavailableReason::NoRangePoints,
        });
    };
    log::debug!(
        "lidar ttc: near range {:.3} m -> {:.3} m ({:?})",
        prev_min,
        curr_min,
        config.reduction
    );
    Ok(TtcEstimate::from_ratio(
        curr_min * frame_interval,
        prev_min - curr_min,
    ))
}
