use thiserror::Error;

use crate::types::RegionId;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StatsError {
    #[error("empty sample set")]
    EmptySampleSet,
    #[error("invalid sample range [{start}, {end}] for {len} samples")]
    InvalidRange {
        start: usize,
        end: usize,
        len: usize,
    },
    #[error("sample set contains a non-finite value")]
    NonFinite,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("invalid `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
        ConfigError::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Failures local to one frame pair or one region.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FusionError {
    #[error("{frame} keypoint index {index} out of range ({len} keypoints)")]
    InvalidKeypointIndex {
        frame: &'static str,
        index: usize,
        len: usize,
    },
    #[error("region {0} does not exist")]
    UnknownRegion(RegionId),
    #[error("frame interval must be positive and finite, got {0}")]
    InvalidFrameInterval(f64),
    #[error("malformed calibration: {0}")]
    MalformedCalibration(String),
    #[error("no correspondences inside region {region}")]
    InsufficientCorrespondences { region: RegionId },
    #[error("descriptor tables are of different kinds")]
    DescriptorKindMismatch,
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Stats(#[from] StatsError),
}

#[derive(Debug, Error)]
pub enum IoError {
    #[error("{path}: {source}")]
    File {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("bad glob pattern: {0}")]
    Pattern(#[from] glob::PatternError),
    #[error("time formatting: {0}")]
    Time(String),
}
