//! Per frame pair composition of projection, association and both estimators.

use std::collections::BTreeMap;

use indicatif::ParallelProgressIterator;
use rayon::prelude::*;
use serde::Serialize;

use crate::association::{BoxAssociationMap, associate_bounding_boxes};
use crate::calibration::Calibration;
use crate::config::FusionConfig;
use crate::error::FusionError;
use crate::filter::filter_region_correspondences;
use crate::matching::DescriptorMatcher;
use crate::projector::{assign_points_to_regions, crop_range_points};
use crate::summary::RegionSummary;
use crate::ttc::{
    TtcEstimate, UnavailableReason, estimate_ttc_from_keypoints, estimate_ttc_from_range,
};
use crate::types::{Correspondence, Frame, RegionId, TrackedRegion};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionTtc {
    pub prev_id: RegionId,
    pub curr_id: RegionId,
    pub lidar: TtcEstimate,
    pub camera: TtcEstimate,
    pub accepted_correspondences: Vec<Correspondence>,
    pub summary: RegionSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionFailure {
    pub prev_id: RegionId,
    pub curr_id: RegionId,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FramePairResult {
    pub prev_index: usize,
    pub curr_index: usize,
    pub associations: BoxAssociationMap,
    pub regions: Vec<RegionTtc>,
    pub failures: Vec<RegionFailure>,
}

impl FramePairResult {
    /// Accepted correspondences keyed by current region id, ready for
    /// [`Frame::with_region_correspondences`].
    pub fn region_correspondences(&self) -> BTreeMap<RegionId, Vec<Correspondence>> {
        self.regions
            .iter()
            .map(|r| (r.curr_id, r.accepted_correspondences.clone()))
            .collect()
    }
}

/// Crops the frame's range points and attaches them to its regions.
pub fn prepare_frame(
    frame: &Frame,
    calibration: &Calibration,
    config: &FusionConfig,
) -> Result<Frame, FusionError> {
    let cropped = crop_range_points(&frame.range_points, &config.crop);
    let region_points = assign_points_to_regions(
        &frame.regions,
        &cropped,
        config.projection.shrink_factor,
        calibration,
    )?;
    log::trace!(
        "frame {}: {} of {} range points left after cropping",
        frame.index,
        cropped.len(),
        frame.range_points.len()
    );
    Ok(frame.with_region_points(region_points))
}

fn region_ttc(
    prev_region: &TrackedRegion,
    curr_region: &TrackedRegion,
    prev: &Frame,
    curr: &Frame,
    matches: &[Correspondence],
    config: &FusionConfig,
) -> Result<RegionTtc, FusionError> {
    let dt = config.frame_interval();
    let lidar = estimate_ttc_from_range(
        &prev_region.range_points,
        &curr_region.range_points,
        dt,
        &config.lidar,
    )?;

    let accepted = match filter_region_correspondences(
        curr_region,
        &prev.keypoints,
        &curr.keypoints,
        matches,
        &config.filter,
    ) {
        Ok(outcome) => outcome.accepted,
        Err(FusionError::InsufficientCorrespondences { .. }) => Vec::new(),
        Err(e) => return Err(e),
    };
    let camera = if accepted.is_empty() {
        TtcEstimate::Unavailable {
            reason: UnavailableReason::NoCorrespondences,
        }
    } else {
        estimate_ttc_from_keypoints(&prev.keypoints, &curr.keypoints, &accepted, dt, &config.camera)?
    };

    Ok(RegionTtc {
        prev_id: prev_region.id,
        curr_id: curr_region.id,
        lidar,
        camera,
        accepted_correspondences: accepted,
        summary: RegionSummary::from_points(curr_region.id, &curr_region.range_points),
    })
}

/// Runs association and both estimators on two frames prepared by
/// [`prepare_frame`]. A failing region is reported in `failures` and does not
/// affect the other regions.
pub fn process_prepared_pair(
    prev: &Frame,
    curr: &Frame,
    matches: &[Correspondence],
    config: &FusionConfig,
) -> Result<FramePairResult, FusionError> {
    config.validate()?;
    let associations = associate_bounding_boxes(matches, prev, curr)?;
    let pairs: Vec<(RegionId, RegionId)> = associations.iter().collect();

    let outcomes: Vec<(RegionId, RegionId, Result<RegionTtc, FusionError>)> = pairs
        .par_iter()
        .map(|&(prev_id, curr_id)| {
            let result = match (prev.region(prev_id), curr.region(curr_id)) {
                (Some(p), Some(c)) => region_ttc(p, c, prev, curr, matches, config),
                (None, _) => Err(FusionError::UnknownRegion(prev_id)),
                (_, None) => Err(FusionError::UnknownRegion(curr_id)),
            };
            (prev_id, curr_id, result)
        })
        .collect();

    let mut regions = Vec::new();
    let mut failures = Vec::new();
    for (prev_id, curr_id, result) in outcomes {
        match result {
            Ok(r) => regions.push(r),
            Err(e) => {
                log::warn!(
                    "frames {}->{}: region {}->{} skipped: {}",
                    prev.index,
                    curr.index,
                    prev_id,
                    curr_id,
                    e
                );
                failures.push(RegionFailure {
                    prev_id,
                    curr_id,
                    error: e.to_string(),
                });
            }
        }
    }
    regions.sort_by_key(|r| r.curr_id);

    Ok(FramePairResult {
        prev_index: prev.index,
        curr_index: curr.index,
        associations,
        regions,
        failures,
    })
}

/// Prepares both frames and processes them as a pair.
pub fn process_frame_pair(
    prev: &Frame,
    curr: &Frame,
    matches: &[Correspondence],
    calibration: &Calibration,
    config: &FusionConfig,
) -> Result<FramePairResult, FusionError> {
    config.validate()?;
    let prev = prepare_frame(prev, calibration, config)?;
    let curr = prepare_frame(curr, calibration, config)?;
    process_prepared_pair(&prev, &curr, matches, config)
}

/// Processes every consecutive pair of `frames`, matching descriptors with
/// `matcher`. Each element of the output belongs to one pair; a failed pair
/// does not stop the sequence.
pub fn process_sequence<M>(
    frames: &[Frame],
    matcher: &M,
    calibration: &Calibration,
    config: &FusionConfig,
) -> Result<Vec<Result<FramePairResult, FusionError>>, FusionError>
where
    M: DescriptorMatcher + Sync,
{
    config.validate()?;
    calibration.projection()?;
    let prepared: Vec<Result<Frame, FusionError>> = frames
        .par_iter()
        .map(|f| prepare_frame(f, calibration, config))
        .collect();

    let results = prepared
        .par_windows(2)
        .progress_count(frames.len().saturating_sub(1) as u64)
        .map(|pair| {
            let (prev, curr) = match (&pair[0], &pair[1]) {
                (Ok(p), Ok(c)) => (p, c),
                (Err(e), _) | (_, Err(e)) => return Err(e.clone()),
            };
            let matches = matcher.match_descriptors(&prev.descriptors, &curr.descriptors)?;
            process_prepared_pair(prev, curr, &matches, config)
        })
        .collect();
    Ok(results)
}
