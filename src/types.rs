use std::collections::BTreeMap;

use nalgebra as na;
use serde::{Deserialize, Serialize};

pub type RegionId = u32;

/// Range points grouped by the region they were assigned to.
pub type RegionPoints = BTreeMap<RegionId, Vec<RangePoint>>;

/// A single LiDAR return in the vehicle frame.
///
/// `x` points forward, `y` to the left and `z` up, all in metres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RangePoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    #[serde(default)]
    pub r: f64,
}

impl RangePoint {
    pub fn new(x: f64, y: f64, z: f64, r: f64) -> RangePoint {
        RangePoint { x, y, z, r }
    }
    pub fn to_homogeneous(&self) -> na::Vector4<f64> {
        na::Vector4::new(self.x, self.y, self.z, 1.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    pub pt: glam::Vec2,
    #[serde(default)]
    pub size: f32,
    #[serde(default)]
    pub angle: f32,
    #[serde(default)]
    pub response: f32,
    #[serde(default)]
    pub octave: i32,
}

impl Keypoint {
    pub fn new(x: f32, y: f32) -> Keypoint {
        Keypoint {
            pt: glam::Vec2::new(x, y),
            size: 1.0,
            angle: -1.0,
            response: 0.0,
            octave: 0,
        }
    }
    pub fn distance(&self, other: &Keypoint) -> f64 {
        self.pt.as_dvec2().distance(other.pt.as_dvec2())
    }
}

/// A keypoint match between the previous and the current frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Correspondence {
    pub prev_idx: usize,
    pub curr_idx: usize,
    /// Descriptor distance, lower is better.
    #[serde(default)]
    pub distance: f32,
}

impl Correspondence {
    pub fn new(prev_idx: usize, curr_idx: usize, distance: f32) -> Correspondence {
        Correspondence {
            prev_idx,
            curr_idx,
            distance,
        }
    }
}

/// Axis aligned rectangle in pixels. Containment is half-open on the far edges.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Rect {
        Rect {
            x,
            y,
            width,
            height,
        }
    }

    /// Scales width and height by `1 - factor` around the rectangle centre.
    /// A negative factor grows the rectangle.
    pub fn shrunk(&self, factor: f64) -> Rect {
        Rect {
            x: self.x + factor * self.width / 2.0,
            y: self.y + factor * self.height / 2.0,
            width: self.width * (1.0 - factor),
            height: self.height * (1.0 - factor),
        }
    }

    pub fn contains(&self, px: f64, py: f64) -> bool {
        px >= self.x && px < self.x + self.width && py >= self.y && py < self.y + self.height
    }

    pub fn contains_vec2(&self, p: glam::Vec2) -> bool {
        self.contains(p.x as f64, p.y as f64)
    }

    pub fn area(&self) -> f64 {
        self.width.max(0.0) * self.height.max(0.0)
    }
}

/// An object detection together with the measurements attributed to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedRegion {
    pub id: RegionId,
    pub roi: Rect,
    #[serde(default)]
    pub class_id: Option<u32>,
    #[serde(default)]
    pub confidence: f32,
    #[serde(default)]
    pub range_points: Vec<RangePoint>,
    /// Accepted matches, attached with [`Frame::with_region_correspondences`].
    #[serde(default)]
    pub correspondences: Vec<Correspondence>,
}

impl TrackedRegion {
    pub fn new(id: RegionId, roi: Rect) -> TrackedRegion {
        TrackedRegion {
            id,
            roi,
            class_id: None,
            confidence: 0.0,
            range_points: Vec::new(),
            correspondences: Vec::new(),
        }
    }
    pub fn with_class(mut self, class_id: u32, confidence: f32) -> TrackedRegion {
        self.class_id = Some(class_id);
        self.confidence = confidence;
        self
    }
}

/// Opaque per-frame descriptor rows, one per keypoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "rows", rename_all = "snake_case")]
pub enum DescriptorTable {
    Binary(Vec<Vec<u8>>),
    Float(Vec<Vec<f32>>),
}

impl DescriptorTable {
    pub fn len(&self) -> usize {
        match self {
            DescriptorTable::Binary(rows) => rows.len(),
            DescriptorTable::Float(rows) => rows.len(),
        }
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for DescriptorTable {
    fn default() -> Self {
        DescriptorTable::Binary(Vec::new())
    }
}

/// Everything observed at one time step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    #[serde(default)]
    pub index: usize,
    #[serde(default)]
    pub keypoints: Vec<Keypoint>,
    #[serde(default)]
    pub descriptors: DescriptorTable,
    #[serde(default)]
    pub regions: Vec<TrackedRegion>,
    #[serde(default)]
    pub range_points: Vec<RangePoint>,
}

impl Frame {
    pub fn region(&self, id: RegionId) -> Option<&TrackedRegion> {
        self.regions.iter().find(|r| r.id == id)
    }

    /// Returns a copy of the frame whose regions carry the given point groups.
    /// Regions without an entry end up with no points.
    pub fn with_region_points(&self, mut region_points: RegionPoints) -> Frame {
        let regions = self
            .regions
            .iter()
            .map(|region| TrackedRegion {
                range_points: region_points.remove(&region.id).unwrap_or_default(),
                ..region.clone()
            })
            .collect();
        Frame {
            regions,
            ..self.clone()
        }
    }

    /// Returns a copy of the frame whose regions carry the given accepted
    /// correspondences. Regions without an entry end up with none.
    pub fn with_region_correspondences(
        &self,
        mut region_matches: BTreeMap<RegionId, Vec<Correspondence>>,
    ) -> Frame {
        let regions = self
            .regions
            .iter()
            .map(|region| TrackedRegion {
                correspondences: region_matches.remove(&region.id).unwrap_or_default(),
                ..region.clone()
            })
            .collect();
        Frame {
            regions,
            ..self.clone()
        }
    }
}
