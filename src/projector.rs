//! Attributing LiDAR returns to image regions.

use rayon::prelude::*;

use crate::calibration::Calibration;
use crate::config::{CropConfig, check_shrink_factor};
use crate::error::FusionError;
use crate::types::{RangePoint, Rect, RegionPoints, TrackedRegion};

/// Keeps the points inside the ego-lane box.
pub fn crop_range_points(points: &[RangePoint], crop: &CropConfig) -> Vec<RangePoint> {
    if !crop.enabled {
        return points.to_vec();
    }
    points
        .iter()
        .filter(|p| {
            p.x >= crop.min_x
                && p.x <= crop.max_x
                && p.y.abs() <= crop.max_abs_y
                && p.z >= crop.min_z
                && p.z <= crop.max_z
                && p.r >= crop.min_reflectivity
        })
        .copied()
        .collect()
}

/// Groups range points by the region their projection falls into.
///
/// Each region is first shrunk by `shrink_factor`. A point is kept only when it
/// lands inside exactly one shrunk region; points behind the camera or inside
/// several overlapping regions are dropped. Every region id is present in the
/// output, possibly with no points.
pub fn assign_points_to_regions(
    regions: &[TrackedRegion],
    points: &[RangePoint],
    shrink_factor: f64,
    calibration: &Calibration,
) -> Result<RegionPoints, FusionError> {
    check_shrink_factor("shrink_factor", shrink_factor)?;
    let projection = calibration.projection()?;
    let shrunk: Vec<Rect> = regions.iter().map(|r| r.roi.shrunk(shrink_factor)).collect();

    let owners: Vec<Option<usize>> = points
        .par_iter()
        .map(|point| {
            let px = projection.project(point)?;
            let mut enclosing = shrunk
                .iter()
                .enumerate()
                .filter(|(_, rect)| rect.contains(px.x, px.y))
                .map(|(i, _)| i);
            match (enclosing.next(), enclosing.next()) {
                (Some(i), None) => Some(i),
                _ => None,
            }
        })
        .collect();

    let mut region_points: RegionPoints = regions.iter().map(|r| (r.id, Vec::new())).collect();
    let mut dropped = 0usize;
    for (point, owner) in points.iter().zip(owners) {
        match owner {
            Some(i) => region_points.entry(regions[i].id).or_default().push(*point),
            None => dropped += 1,
        }
    }
    log::debug!(
        "assigned {} of {} range points to {} regions",
        points.len() - dropped,
        points.len(),
        regions.len()
    );
    Ok(region_points)
}
