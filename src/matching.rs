//! Descriptor matching between the previous and the current frame.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::FusionError;
use crate::types::{Correspondence, DescriptorTable};

/// Produces correspondences from two descriptor tables. Query rows come from
/// the previous frame, train rows from the current one.
pub trait DescriptorMatcher {
    fn match_descriptors(
        &self,
        prev: &DescriptorTable,
        curr: &DescriptorTable,
    ) -> Result<Vec<Correspondence>, FusionError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MatchSelector {
    NearestNeighbor,
    /// Keep the best match only if `best < ratio * second_best`.
    KnnRatio { ratio: f32 },
}

impl Default for MatchSelector {
    fn default() -> Self {
        MatchSelector::KnnRatio { ratio: 0.8 }
    }
}

pub fn hamming_distance(a: &[u8], b: &[u8]) -> u32 {
    a.iter().zip(b).map(|(x, y)| (x ^ y).count_ones()).sum()
}

pub fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum::<f32>().sqrt()
}

/// Exhaustive matcher: Hamming distance for binary descriptors, L2 otherwise.
#[derive(Debug, Clone, Default)]
pub struct BruteForceMatcher {
    pub selector: MatchSelector,
}

impl BruteForceMatcher {
    pub fn new(selector: MatchSelector) -> BruteForceMatcher {
        BruteForceMatcher { selector }
    }

    fn select(&self, query_idx: usize, distances: impl Iterator<Item = f32>) -> Option<Correspondence> {
        let mut best: Option<(usize, f32)> = None;
        let mut second = f32::INFINITY;
        for (train_idx, d) in distances.enumerate() {
            match best {
                Some((_, best_d)) if d >= best_d => second = second.min(d),
                Some((_, best_d)) => {
                    second = best_d;
                    best = Some((train_idx, d));
                }
                None => best = Some((train_idx, d)),
            }
        }
        let (train_idx, d) = best?;
        match self.selector {
            MatchSelector::NearestNeighbor => Some(Correspondence::new(query_idx, train_idx, d)),
            MatchSelector::KnnRatio { ratio } => {
                if second.is_finite() && d < ratio * second {
                    Some(Correspondence::new(query_idx, train_idx, d))
                } else {
                    None
                }
            }
        }
    }
}

impl DescriptorMatcher for BruteForceMatcher {
    fn match_descriptors(
        &self,
        prev: &DescriptorTable,
        curr: &DescriptorTable,
    ) -> Result<Vec<Correspondence>, FusionError> {
        let matches: Vec<Correspondence> = match (prev, curr) {
            (DescriptorTable::Binary(query), DescriptorTable::Binary(train)) => query
                .par_iter()
                .enumerate()
                .filter_map(|(i, q)| {
                    self.select(i, train.iter().map(|t| hamming_distance(q, t) as f32))
                })
                .collect(),
            (DescriptorTable::Float(query), DescriptorTable::Float(train)) => query
                .par_iter()
                .enumerate()
                .filter_map(|(i, q)| self.select(i, train.iter().map(|t| l2_distance(q, t))))
                .collect(),
            _ => return Err(FusionError::DescriptorKindMismatch),
        };
        log::debug!(
            "{} matches from {} x {} descriptors",
            matches.len(),
            prev.len(),
            curr.len()
        );
        Ok(matches)
    }
}
