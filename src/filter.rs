//! Restricting keypoint correspondences to one tracked region.

use serde::{Deserialize, Serialize};

use crate::config::{FilterConfig, FilterStrategy};
use crate::error::FusionError;
use crate::stats::{Quartiles, quartiles};
use crate::types::{Correspondence, Keypoint, RegionId, TrackedRegion};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterOutcome {
    pub region: RegionId,
    /// Correspondences with both ends inside the widened region.
    pub candidates: usize,
    pub accepted: Vec<Correspondence>,
    /// Displacement statistics over the candidates.
    pub displacement: Quartiles,
    /// Inclusive acceptance band on the displacement.
    pub band: (f64, f64),
}

/// Checks that every correspondence indexes into both keypoint sequences.
pub fn check_indices(
    prev_kpts: &[Keypoint],
    curr_kpts: &[Keypoint],
    matches: &[Correspondence],
) -> Result<(), FusionError> {
    for m in matches {
        if m.prev_idx >= prev_kpts.len() {
            return Err(FusionError::InvalidKeypointIndex {
                frame: "previous",
                index: m.prev_idx,
                len: prev_kpts.len(),
            });
        }
        if m.curr_idx >= curr_kpts.len() {
            return Err(FusionError::InvalidKeypointIndex {
                frame: "current",
                index: m.curr_idx,
                len: curr_kpts.len(),
            });
        }
    }
    Ok(())
}

fn acceptance_band(strategy: FilterStrategy, q: &Quartiles) -> (f64, f64) {
    match strategy {
        FilterStrategy::MedianBand { range_factor } => (
            q.median - range_factor * q.median,
            q.median + range_factor * q.median,
        ),
        FilterStrategy::Iqr { iqr_factor } => (q.q1 - iqr_factor * q.iqr, q.q3 + iqr_factor * q.iqr),
    }
}

/// Keeps the correspondences of `region` whose pixel displacement is
/// consistent with the rest of the region.
///
/// Candidates must have both keypoints inside the region rectangle scaled by
/// `config.shrink_factor`. The acceptance band is derived from the candidates'
/// displacement distribution according to `config.strategy`.
pub fn filter_region_correspondences(
    region: &TrackedRegion,
    prev_kpts: &[Keypoint],
    curr_kpts: &[Keypoint],
    matches: &[Correspondence],
    config: &FilterConfig,
) -> Result<FilterOutcome, FusionError> {
    config.validate()?;
    check_indices(prev_kpts, curr_kpts, matches)?;

    let roi = region.roi.shrunk(config.shrink_factor);
    let (candidates, displacements): (Vec<Correspondence>, Vec<f64>) = matches
        .iter()
        .filter_map(|m| {
            let prev = &prev_kpts[m.prev_idx];
            let curr = &curr_kpts[m.curr_idx];
            if roi.contains_vec2(prev.pt) && roi.contains_vec2(curr.pt) {
                Some((*m, curr.distance(prev)))
            } else {
                None
            }
        })
        .unzip();

    if candidates.is_empty() {
        return Err(FusionError::InsufficientCorrespondences { region: region.id });
    }

    let displacement = quartiles(&displacements)?;
    let (lo, hi) = acceptance_band(config.strategy, &displacement);
    let accepted: Vec<Correspondence> = candidates
        .iter()
        .zip(&displacements)
        .filter(|(_, d)| **d >= lo && **d <= hi)
        .map(|(m, _)| *m)
        .collect();

    log::debug!(
        "region {}: {} candidates, {} accepted, median displacement {:.3} px, iqr {:.3} px",
        region.id,
        candidates.len(),
        accepted.len(),
        displacement.median,
        displacement.iqr
    );
    Ok(FilterOutcome {
        region: region.id,
        candidates: candidates.len(),
        accepted,
        displacement,
        band: (lo, hi),
    })
}
