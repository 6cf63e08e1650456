//! Matching tracked regions across consecutive frames.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::FusionError;
use crate::filter::check_indices;
use crate::types::{Correspondence, Frame, RegionId};

/// Votes per `(previous region, current region)` pair.
pub type VoteTable = BTreeMap<RegionId, BTreeMap<RegionId, usize>>;

/// One-to-one partial mapping from previous to current region ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BoxAssociationMap {
    pairs: BTreeMap<RegionId, RegionId>,
}

impl BoxAssociationMap {
    pub fn get(&self, prev: RegionId) -> Option<RegionId> {
        self.pairs.get(&prev).copied()
    }
    pub fn iter(&self) -> impl Iterator<Item = (RegionId, RegionId)> + '_ {
        self.pairs.iter().map(|(p, c)| (*p, *c))
    }
    pub fn len(&self) -> usize {
        self.pairs.len()
    }
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
    pub fn contains_previous(&self, prev: RegionId) -> bool {
        self.pairs.contains_key(&prev)
    }
    pub fn contains_current(&self, curr: RegionId) -> bool {
        self.pairs.values().any(|c| *c == curr)
    }
    pub fn to_btree_map(&self) -> BTreeMap<RegionId, RegionId> {
        self.pairs.clone()
    }
}

/// Counts, for every correspondence, one vote for each pair of regions that
/// contain its previous and its current keypoint.
pub fn vote_table(
    matches: &[Correspondence],
    prev_frame: &Frame,
    curr_frame: &Frame,
) -> Result<VoteTable, FusionError> {
    check_indices(&prev_frame.keypoints, &curr_frame.keypoints, matches)?;
    let mut votes = VoteTable::new();
    for m in matches {
        let prev_pt = prev_frame.keypoints[m.prev_idx].pt;
        let curr_pt = curr_frame.keypoints[m.curr_idx].pt;
        let curr_ids: Vec<RegionId> = curr_frame
            .regions
            .iter()
            .filter(|r| r.roi.contains_vec2(curr_pt))
            .map(|r| r.id)
            .collect();
        if curr_ids.is_empty() {
            continue;
        }
        for prev in prev_frame.regions.iter().filter(|r| r.roi.contains_vec2(prev_pt)) {
            let row = votes.entry(prev.id).or_default();
            for curr_id in &curr_ids {
                *row.entry(*curr_id).or_default() += 1;
            }
        }
    }
    Ok(votes)
}

/// Highest voted key; ties go to the lowest id.
fn best_by_votes(row: &BTreeMap<RegionId, usize>) -> Option<(RegionId, usize)> {
    row.iter().fold(None, |best, (id, votes)| match best {
        Some((_, best_votes)) if best_votes >= *votes => best,
        _ => Some((*id, *votes)),
    })
}

/// Associates regions of two frames by correspondence voting.
///
/// Every previous region nominates the current region it shares the most
/// votes with. Each current region then accepts only the nominating previous
/// region with the most votes, so the result is one-to-one. Ties are broken in
/// favour of the lowest region id in both steps. Regions without votes stay
/// unmatched.
pub fn associate_bounding_boxes(
    matches: &[Correspondence],
    prev_frame: &Frame,
    curr_frame: &Frame,
) -> Result<BoxAssociationMap, FusionError> {
    let votes = vote_table(matches, prev_frame, curr_frame)?;

    let mut nominations: BTreeMap<RegionId, BTreeMap<RegionId, usize>> = BTreeMap::new();
    for (prev_id, row) in &votes {
        if let Some((curr_id, count)) = best_by_votes(row) {
            nominations.entry(curr_id).or_default().insert(*prev_id, count);
        }
    }

    let pairs: BTreeMap<RegionId, RegionId> = nominations
        .iter()
        .filter_map(|(curr_id, suitors)| best_by_votes(suitors).map(|(prev_id, _)| (prev_id, *curr_id)))
        .collect();

    log::debug!(
        "associated {} of {} previous regions ({} current regions)",
        pairs.len(),
        prev_frame.regions.len(),
        curr_frame.regions.len()
    );
    Ok(BoxAssociationMap { pairs })
}
