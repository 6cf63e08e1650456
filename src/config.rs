use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::stats::NearReduction;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionConfig {
    /// Fraction of each box trimmed away before range points are assigned.
    pub shrink_factor: f64,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            shrink_factor: 0.10,
        }
    }
}

/// Ego-lane crop applied to raw range points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CropConfig {
    pub enabled: bool,
    pub min_x: f64,
    pub max_x: f64,
    pub max_abs_y: f64,
    pub min_z: f64,
    pub max_z: f64,
    pub min_reflectivity: f64,
}

impl Default for CropConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_x: 2.0,
            max_x: 20.0,
            max_abs_y: 2.0,
            min_z: -1.5,
            max_z: -0.9,
            min_reflectivity: 0.1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FilterStrategy {
    /// Accept displacements within `median ± range_factor * median`.
    MedianBand { range_factor: f64 },
    /// Accept displacements within `[q1 - f * iqr, q3 + f * iqr]`.
    Iqr { iqr_factor: f64 },
}

impl Default for FilterStrategy {
    fn default() -> Self {
        FilterStrategy::MedianBand { range_factor: 2.5 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Negative values grow the box; keypoints drift more than range returns.
    pub shrink_factor: f64,
    pub strategy: FilterStrategy,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            shrink_factor: -0.10,
            strategy: FilterStrategy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraTtcConfig {
    pub min_pair_distance: f64,
    pub max_pair_distance: f64,
    pub min_prev_distance: f64,
    /// Upper bound on correspondences fed to the quadratic pair loop.
    pub max_correspondences: usize,
}

impl Default for CameraTtcConfig {
    fn default() -> Self {
        Self {
            min_pair_distance: 100.0,
            max_pair_distance: 160.0,
            min_prev_distance: f64::EPSILON,
            max_correspondences: 2000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LidarTtcConfig {
    pub k: usize,
    pub reduction: NearReduction,
}

impl Default for LidarTtcConfig {
    fn default() -> Self {
        Self {
            k: 5,
            reduction: NearReduction::Minimum,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    pub frame_rate: f64,
    pub projection: ProjectionConfig,
    pub crop: CropConfig,
    pub filter: FilterConfig,
    pub camera: CameraTtcConfig,
    pub lidar: LidarTtcConfig,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            frame_rate: 10.0,
            projection: ProjectionConfig::default(),
            crop: CropConfig::default(),
            filter: FilterConfig::default(),
            camera: CameraTtcConfig::default(),
            lidar: LidarTtcConfig::default(),
        }
    }
}

fn finite(field: &'static str, v: f64) -> Result<(), ConfigError> {
    if v.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, format!("{} is not finite", v)))
    }
}

pub(crate) fn check_shrink_factor(field: &'static str, v: f64) -> Result<(), ConfigError> {
    finite(field, v)?;
    if v >= 1.0 {
        return Err(ConfigError::invalid(field, "must be below 1.0"));
    }
    Ok(())
}

impl FilterConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_shrink_factor("filter.shrink_factor", self.shrink_factor)?;
        match self.strategy {
            FilterStrategy::MedianBand { range_factor } => {
                finite("filter.strategy.range_factor", range_factor)?;
                if range_factor < 0.0 {
                    return Err(ConfigError::invalid(
                        "filter.strategy.range_factor",
                        "must not be negative",
                    ));
                }
            }
            FilterStrategy::Iqr { iqr_factor } => {
                finite("filter.strategy.iqr_factor", iqr_factor)?;
                if iqr_factor < 0.0 {
                    return Err(ConfigError::invalid(
                        "filter.strategy.iqr_factor",
                        "must not be negative",
                    ));
                }
            }
        }
        Ok(())
    }
}

impl CameraTtcConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        finite("camera.min_pair_distance", self.min_pair_distance)?;
        finite("camera.max_pair_distance", self.max_pair_distance)?;
        finite("camera.min_prev_distance", self.min_prev_distance)?;
        if self.min_pair_distance < 0.0 || self.min_pair_distance > self.max_pair_distance {
            return Err(ConfigError::invalid(
                "camera.min_pair_distance",
                format!(
                    "expected 0 <= {} <= max_pair_distance ({})",
                    self.min_pair_distance, self.max_pair_distance
                ),
            ));
        }
        if self.min_prev_distance < 0.0 {
            return Err(ConfigError::invalid(
                "camera.min_prev_distance",
                "must not be negative",
            ));
        }
        if self.max_correspondences < 2 {
            return Err(ConfigError::invalid(
                "camera.max_correspondences",
                "at least two correspondences are needed to form a pair",
            ));
        }
        Ok(())
    }
}

impl LidarTtcConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.k == 0 {
            return Err(ConfigError::invalid("lidar.k", "must be at least 1"));
        }
        Ok(())
    }
}

impl CropConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, v) in [
            ("crop.min_x", self.min_x),
            ("crop.max_x", self.max_x),
            ("crop.max_abs_y", self.max_abs_y),
            ("crop.min_z", self.min_z),
            ("crop.max_z", self.max_z),
            ("crop.min_reflectivity", self.min_reflectivity),
        ] {
            finite(field, v)?;
        }
        if self.min_x > self.max_x {
            return Err(ConfigError::invalid("crop.min_x", "greater than max_x"));
        }
        if self.min_z > self.max_z {
            return Err(ConfigError::invalid("crop.min_z", "greater than max_z"));
        }
        if self.max_abs_y < 0.0 {
            return Err(ConfigError::invalid("crop.max_abs_y", "must not be negative"));
        }
        Ok(())
    }
}

impl FusionConfig {
    pub fn frame_interval(&self) -> f64 {
        1.0 / self.frame_rate
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        finite("frame_rate", self.frame_rate)?;
        if self.frame_rate <= 0.0 {
            return Err(ConfigError::invalid("frame_rate", "must be positive"));
        }
        if !self.frame_interval().is_finite() {
            return Err(ConfigError::invalid(
                "frame_rate",
                format!("{} gives an infinite frame interval", self.frame_rate),
            ));
        }
        check_shrink_factor("projection.shrink_factor", self.projection.shrink_factor)?;
        self.crop.validate()?;
        self.filter.validate()?;
        self.camera.validate()?;
        self.lidar.validate()
    }
}
