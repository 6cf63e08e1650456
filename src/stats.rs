//! Order statistics used by the outlier tolerant estimators.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use serde::{Deserialize, Serialize};

use crate::error::StatsError;

/// Median of the inclusive range `[start, end]` of the sorted samples.
///
/// The input is copied and sorted as a whole before the range is taken, so a
/// sub-range addresses order statistics rather than input positions. Even
/// sized ranges yield the mean of the two central values.
pub fn median(samples: &[f64], start: usize, end: usize) -> Result<f64, StatsError> {
    if samples.is_empty() {
        return Err(StatsError::EmptySampleSet);
    }
    if start > end || end >= samples.len() {
        return Err(StatsError::InvalidRange {
            start,
            end,
            len: samples.len(),
        });
    }
    let sorted = sorted_copy(samples)?;
    Ok(median_of_sorted(&sorted[start..=end]))
}

/// Median over every sample.
pub fn median_all(samples: &[f64]) -> Result<f64, StatsError> {
    if samples.is_empty() {
        return Err(StatsError::EmptySampleSet);
    }
    median(samples, 0, samples.len() - 1)
}

fn sorted_copy(samples: &[f64]) -> Result<Vec<f64>, StatsError> {
    if samples.iter().any(|v| !v.is_finite()) {
        return Err(StatsError::NonFinite);
    }
    let mut sorted = samples.to_vec();
    sorted.sort_by(f64::total_cmp);
    Ok(sorted)
}

fn median_of_sorted(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    let mid = n / 2;
    if n % 2 == 1 {
        sorted[mid]
    } else {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quartiles {
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub iqr: f64,
}

/// Tukey hinges: medians of the lower and upper ⌊n/2⌋ sorted samples.
pub fn quartiles(samples: &[f64]) -> Result<Quartiles, StatsError> {
    if samples.is_empty() {
        return Err(StatsError::EmptySampleSet);
    }
    let sorted = sorted_copy(samples)?;
    let n = sorted.len();
    let median = median_of_sorted(&sorted);
    let (q1, q3) = if n == 1 {
        (median, median)
    } else {
        let half = n / 2;
        (
            median_of_sorted(&sorted[..half]),
            median_of_sorted(&sorted[n - half..]),
        )
    };
    Ok(Quartiles {
        q1,
        median,
        q3,
        iqr: q3 - q1,
    })
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct OrdF64(f64);

impl Eq for OrdF64 {}

impl PartialOrd for OrdF64 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OrdF64 {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Keeps the `k` smallest values of a stream in a bounded max-heap.
#[derive(Debug, Clone)]
pub struct KSmallest {
    k: usize,
    heap: BinaryHeap<OrdF64>,
    min: Option<f64>,
}

impl KSmallest {
    pub fn new(k: usize) -> KSmallest {
        KSmallest {
            k: k.max(1),
            heap: BinaryHeap::new(),
            min: None,
        }
    }

    /// Non-finite values are ignored.
    pub fn push(&mut self, value: f64) {
        if !value.is_finite() {
            return;
        }
        self.min = Some(self.min.map_or(value, |m| m.min(value)));
        self.heap.push(OrdF64(value));
        if self.heap.len() > self.k {
            self.heap.pop();
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn min(&self) -> Option<f64> {
        self.min
    }

    /// Retained values in ascending order.
    pub fn values(&self) -> Vec<f64> {
        let mut v: Vec<f64> = self.heap.iter().map(|x| x.0).collect();
        v.sort_by(f64::total_cmp);
        v
    }

    pub fn reduce(&self, reduction: NearReduction) -> Result<f64, StatsError> {
        match reduction {
            NearReduction::Minimum => self.min.ok_or(StatsError::EmptySampleSet),
            NearReduction::MedianOfNearest => {
                let v = self.values();
                if v.is_empty() {
                    return Err(StatsError::EmptySampleSet);
                }
                Ok(median_of_sorted(&v))
            }
        }
    }
}

impl Extend<f64> for KSmallest {
    fn extend<I: IntoIterator<Item = f64>>(&mut self, iter: I) {
        for v in iter {
            self.push(v);
        }
    }
}

/// How a set of forward distances is reduced to one near-range value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NearReduction {
    /// The smallest value, sensitive to single-point noise.
    #[default]
    Minimum,
    /// Median of the `k` smallest values.
    MedianOfNearest,
}

/// Single pass robust minimum over `values`.
pub fn robust_minimum<I>(values: I, k: usize, reduction: NearReduction) -> Result<f64, StatsError>
where
    I: IntoIterator<Item = f64>,
{
    let mut nearest = KSmallest::new(k);
    nearest.extend(values);
    nearest.reduce(reduction)
}
