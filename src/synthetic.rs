//! Synthetic frame sequences of a lead vehicle approaching at constant speed.

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::calibration::{Calibration, Projection};
use crate::error::FusionError;
use crate::types::{DescriptorTable, Frame, Keypoint, RangePoint, Rect, TrackedRegion};

const DESCRIPTOR_BYTES: usize = 32;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub seed: u64,
    pub num_frames: usize,
    pub frame_rate: f64,
    /// Distance to the lead vehicle's rear in the first frame, metres.
    pub initial_distance: f64,
    pub closing_speed: f64,
    pub vehicle_width: f64,
    pub vehicle_height: f64,
    /// Height of the LiDAR above the road.
    pub sensor_height: f64,
    pub num_features: usize,
    pub num_range_points: usize,
    /// Uniform noise on the forward distance of range points, metres.
    pub range_noise: f64,
    /// Uniform noise on keypoint positions, pixels.
    pub pixel_noise: f64,
    /// Fraction of lead vehicle keypoints moved to a random spot in each frame.
    pub outlier_fraction: f64,
    /// Bits flipped per descriptor and frame.
    pub descriptor_noise_bits: usize,
    /// Distance to a vehicle in the neighbouring lane that keeps its distance.
    pub neighbour_distance: f64,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            num_frames: 10,
            frame_rate: 10.0,
            initial_distance: 10.0,
            closing_speed: 3.0,
            vehicle_width: 1.8,
            vehicle_height: 1.5,
            sensor_height: 1.73,
            num_features: 60,
            num_range_points: 150,
            range_noise: 0.01,
            pixel_noise: 0.3,
            outlier_fraction: 0.05,
            descriptor_noise_bits: 4,
            neighbour_distance: 20.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SyntheticSequence {
    pub calibration: Calibration,
    pub frames: Vec<Frame>,
    /// True time to collision for the pair ending in frame `k + 1`.
    pub ground_truth_ttc: Vec<f64>,
}

struct Feature {
    y: f64,
    z: f64,
    descriptor: [u8; DESCRIPTOR_BYTES],
}

struct Scene<'a> {
    config: &'a SceneConfig,
    projection: Projection,
    rng: ChaCha8Rng,
    lead: Vec<Feature>,
    neighbour: Vec<Feature>,
}

impl Scene<'_> {
    fn random_features(rng: &mut ChaCha8Rng, n: usize, config: &SceneConfig) -> Vec<Feature> {
        let half_w = config.vehicle_width / 2.0;
        let z_low = -config.sensor_height + 0.2;
        (0..n)
            .map(|_| {
                let mut descriptor = [0u8; DESCRIPTOR_BYTES];
                rng.fill(&mut descriptor[..]);
                Feature {
                    y: rng.random_range(-half_w..half_w),
                    z: rng.random_range(z_low..z_low + config.vehicle_height),
                    descriptor,
                }
            })
            .collect()
    }

    fn project(&self, x: f64, y: f64, z: f64) -> Option<(f64, f64)> {
        self.projection
            .project(&RangePoint::new(x, y, z, 0.0))
            .map(|p| (p.x, p.y))
    }

    /// Pixel bounds of a vehicle rear at distance `x` centred on lateral `y0`.
    fn outline(&self, x: f64, y0: f64) -> Option<Rect> {
        let half_w = self.config.vehicle_width / 2.0;
        let z_low = -self.config.sensor_height;
        let z_high = z_low + self.config.vehicle_height + 0.4;
        let (l, t) = self.project(x, y0 + half_w, z_high)?;
        let (r, b) = self.project(x, y0 - half_w, z_low)?;
        let margin = 4.0;
        Some(Rect::new(
            l - margin,
            t - margin,
            r - l + 2.0 * margin,
            b - t + 2.0 * margin,
        ))
    }

    fn noisy_descriptor(&mut self, base: &[u8; DESCRIPTOR_BYTES]) -> Vec<u8> {
        let mut d = base.to_vec();
        for _ in 0..self.config.descriptor_noise_bits {
            let bit = self.rng.random_range(0..DESCRIPTOR_BYTES * 8);
            d[bit / 8] ^= 1 << (bit % 8);
        }
        d
    }

    fn observe_features(
        &mut self,
        which_lead: bool,
        x: f64,
        y0: f64,
        roi: &Rect,
        out: &mut Vec<(Keypoint, Vec<u8>)>,
    ) {
        let n = if which_lead {
            self.lead.len()
        } else {
            self.neighbour.len()
        };
        for i in 0..n {
            let (fy, fz, base) = {
                let f = if which_lead { &self.lead[i] } else { &self.neighbour[i] };
                (f.y, f.z, f.descriptor)
            };
            let Some((u, v)) = self.project(x, y0 + fy, fz) else {
                continue;
            };
            let noise = self.config.pixel_noise;
            let outlier_p = self.config.outlier_fraction.clamp(0.0, 1.0);
            let (u, v) = if which_lead && self.rng.random_bool(outlier_p) {
                (
                    self.rng.random_range(roi.x..roi.x + roi.width),
                    self.rng.random_range(roi.y..roi.y + roi.height),
                )
            } else if noise > 0.0 {
                (
                    u + self.rng.random_range(-noise..noise),
                    v + self.rng.random_range(-noise..noise),
                )
            } else {
                (u, v)
            };
            let descriptor = self.noisy_descriptor(&base);
            out.push((Keypoint::new(u as f32, v as f32), descriptor));
        }
    }

    fn range_points(&mut self, x: f64, y0: f64, out: &mut Vec<RangePoint>) {
        let half_w = self.config.vehicle_width / 2.0;
        let z_low = -self.config.sensor_height + 0.25;
        for _ in 0..self.config.num_range_points {
            let noise = if self.config.range_noise > 0.0 {
                self.rng
                    .random_range(-self.config.range_noise..self.config.range_noise)
            } else {
                0.0
            };
            out.push(RangePoint::new(
                x + noise,
                y0 + self.rng.random_range(-half_w..half_w),
                self.rng.random_range(z_low..z_low + 0.5),
                self.rng.random_range(0.2..0.9),
            ));
        }
    }

    fn frame(&mut self, index: usize, lead_x: f64) -> Frame {
        let neighbour_y = 4.0;
        let neighbour_x = self.config.neighbour_distance;
        let mut regions = Vec::new();
        let mut observations = Vec::new();
        let mut range_points = Vec::new();

        // ids swap every other frame so they carry no meaning across frames
        let (lead_id, neighbour_id) = if index % 2 == 0 { (0, 1) } else { (1, 0) };

        if let Some(roi) = self.outline(lead_x, 0.0) {
            self.observe_features(true, lead_x, 0.0, &roi, &mut observations);
            regions.push(TrackedRegion::new(lead_id, roi).with_class(2, 0.9));
        }
        if let Some(roi) = self.outline(neighbour_x, neighbour_y) {
            self.observe_features(false, neighbour_x, neighbour_y, &roi, &mut observations);
            regions.push(TrackedRegion::new(neighbour_id, roi).with_class(2, 0.8));
        }
        regions.sort_by_key(|r| r.id);

        self.range_points(lead_x, 0.0, &mut range_points);
        self.range_points(neighbour_x, neighbour_y, &mut range_points);
        for _ in 0..self.config.num_range_points {
            range_points.push(RangePoint::new(
                self.rng.random_range(2.0..30.0),
                self.rng.random_range(-6.0..6.0),
                -self.config.sensor_height,
                self.rng.random_range(0.05..0.3),
            ));
        }

        observations.shuffle(&mut self.rng);
        let (keypoints, descriptors): (Vec<Keypoint>, Vec<Vec<u8>>) = observations.into_iter().unzip();
        Frame {
            index,
            keypoints,
            descriptors: DescriptorTable::Binary(descriptors),
            regions,
            range_points,
        }
    }
}

/// Generates a sequence seen through `calibration`.
pub fn generate_sequence(
    config: &SceneConfig,
    calibration: &Calibration,
) -> Result<SyntheticSequence, FusionError> {
    if !(config.frame_rate > 0.0) || !config.frame_rate.is_finite() {
        return Err(FusionError::InvalidFrameInterval(1.0 / config.frame_rate));
    }
    let projection = calibration.projection()?;
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let lead = Scene::random_features(&mut rng, config.num_features, config);
    let neighbour = Scene::random_features(&mut rng, config.num_features / 2, config);
    let mut scene = Scene {
        config,
        projection,
        rng,
        lead,
        neighbour,
    };

    let dt = 1.0 / config.frame_rate;
    let distance = |k: usize| config.initial_distance - config.closing_speed * dt * k as f64;
    let frames: Vec<Frame> = (0..config.num_frames)
        .map(|k| scene.frame(k, distance(k)))
        .collect();
    let ground_truth_ttc = (1..config.num_frames)
        .map(|k| distance(k) / config.closing_speed)
        .collect();
    Ok(SyntheticSequence {
        calibration: calibration.clone(),
        frames,
        ground_truth_ttc,
    })
}
