use super::{TtcEstimate, UnavailableReason, check_frame_interval};
use crate::config::CameraTtcConfig;
use crate::error::FusionError;
use crate::filter::check_indices;
use crate::stats::median_all;
use crate::types::{Correspondence, Keypoint};

/// Scale change `dist_curr / dist_prev` for every unordered pair of
/// correspondences whose distances pass the configured checks.
///
/// Inputs longer than `config.max_correspondences` are subsampled with a
/// fixed stride before the quadratic pair loop.
pub fn distance_ratios(
    prev_kpts: &[Keypoint],
    curr_kpts: &[Keypoint],
    matches: &[Correspondence],
    config: &CameraTtcConfig,
) -> Result<Vec<f64>, FusionError> {
    config.validate()?;
    check_indices(prev_kpts, curr_kpts, matches)?;

    let sampled: Vec<&Correspondence> = if matches.len() > config.max_correspondences {
        let stride = matches.len().div_ceil(config.max_correspondences);
        log::warn!(
            "{} correspondences exceed the cap of {}, keeping every {}th",
            matches.len(),
            config.max_correspondences,
            stride
        );
        matches.iter().step_by(stride).collect()
    } else {
        matches.iter().collect()
    };

    let mut ratios = Vec::new();
    for (i, outer) in sampled.iter().enumerate() {
        let outer_prev = &prev_kpts[outer.prev_idx];
        let outer_curr = &curr_kpts[outer.curr_idx];
        for inner in &sampled[i + 1..] {
            let dist_prev = outer_prev.distance(&prev_kpts[inner.prev_idx]);
            let dist_curr = outer_curr.distance(&curr_kpts[inner.curr_idx]);
            if dist_prev > config.min_prev_distance
                && dist_curr >= config.min_pair_distance
                && dist_curr <= config.max_pair_distance
            {
                ratios.push(dist_curr / dist_prev);
            }
        }
    }
    Ok(ratios)
}

/// Time to collision from the relative scale change of matched keypoints.
///
/// Uses the median distance ratio `r` of all accepted keypoint pairs and a
/// constant velocity model: `ttc = -dt / (1 - r)`.
pub fn estimate_ttc_from_keypoints(
    prev_kpts: &[Keypoint],
    curr_kpts: &[Keypoint],
    matches: &[Correspondence],
    frame_interval: f64,
    config: &CameraTtcConfig,
) -> Result<TtcEstimate, FusionError> {
    check_frame_interval(frame_interval)?;
    let ratios = distance_ratios(prev_kpts, curr_kpts, matches, config)?;
    if ratios.is_empty() {
        return Ok(TtcEstimate::Unavailable {
            reason: UnavailableReason::NoDistanceRatios,
        });
    }
    let median_ratio = median_all(&ratios)?;
    log::debug!(
        "camera ttc: {} ratios from {} correspondences, median ratio {:.5}",
        ratios.len(),
        matches.len(),
        median_ratio
    );
    Ok(TtcEstimate::from_ratio(-frame_interval, 1.0 - median_ratio))
}
