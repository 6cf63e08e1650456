use std::path::{Path, PathBuf};

use glob::glob;
use serde::{Serialize, de::DeserializeOwned};

use crate::config::FusionConfig;
use crate::error::{FusionError, IoError};
use crate::pipeline::FramePairResult;
use crate::types::Frame;

/// Serializes an object to a JSON file.
pub fn object_to_json<T: Serialize>(output_path: &str, object: &T) -> Result<(), IoError> {
    let j = serde_json::to_string_pretty(object).map_err(|source| IoError::Json {
        path: output_path.to_string(),
        source,
    })?;
    std::fs::write(output_path, j).map_err(|source| IoError::File {
        path: output_path.to_string(),
        source,
    })
}

/// Deserializes an object from a JSON file.
pub fn object_from_json<T: DeserializeOwned>(file_path: &str) -> Result<T, IoError> {
    let contents = std::fs::read_to_string(file_path).map_err(|source| IoError::File {
        path: file_path.to_string(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| IoError::Json {
        path: file_path.to_string(),
        source,
    })
}

/// Loads every `*.json` frame in `folder`, ordered by file name.
pub fn load_frames(folder: &str) -> Result<Vec<Frame>, IoError> {
    let pattern = format!("{}/*.json", folder.trim_end_matches('/'));
    let mut paths: Vec<PathBuf> = glob(&pattern)?.filter_map(Result::ok).collect();
    paths.sort();
    log::trace!("loading {} frames from {}", paths.len(), folder);
    paths
        .iter()
        .map(|p| object_from_json(&p.to_string_lossy()))
        .collect()
}

/// Writes frames as `{:06}.json` into `folder`.
pub fn save_frames(folder: &str, frames: &[Frame]) -> Result<(), IoError> {
    std::fs::create_dir_all(folder).map_err(|source| IoError::File {
        path: folder.to_string(),
        source,
    })?;
    for f in frames {
        let path = Path::new(folder).join(format!("{:06}.json", f.index));
        object_to_json(&path.to_string_lossy(), f)?;
    }
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct PairFailure {
    pub pair: usize,
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct SequenceReport {
    pub timestamp: String,
    pub config: FusionConfig,
    pub pairs: Vec<FramePairResult>,
    pub failed_pairs: Vec<PairFailure>,
}

impl SequenceReport {
    pub fn new(
        config: &FusionConfig,
        results: Vec<Result<FramePairResult, FusionError>>,
    ) -> Result<SequenceReport, IoError> {
        let now = time::OffsetDateTime::now_local().unwrap_or_else(|_| time::OffsetDateTime::now_utc());
        let timestamp = now
            .format(&time::format_description::well_known::Rfc3339)
            .map_err(|e| IoError::Time(e.to_string()))?;
        let mut pairs = Vec::new();
        let mut failed_pairs = Vec::new();
        for (i, r) in results.into_iter().enumerate() {
            match r {
                Ok(p) => pairs.push(p),
                Err(e) => failed_pairs.push(PairFailure {
                    pair: i,
                    error: e.to_string(),
                }),
            }
        }
        Ok(SequenceReport {
            timestamp,
            config: config.clone(),
            pairs,
            failed_pairs,
        })
    }
}

pub fn write_report(output_path: &str, report: &SequenceReport) -> Result<(), IoError> {
    object_to_json(output_path, report)
}
