use nalgebra as na;
use serde::{Deserialize, Serialize};

use crate::error::FusionError;
use crate::types::RangePoint;

/// Sensor rig calibration, stored row-major.
///
/// A range point `X` (homogeneous, vehicle frame) lands in the image at
/// `p_rect * r_rect * rt * X`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    /// Intrinsics of the rectified camera.
    pub p_rect: [[f64; 4]; 3],
    /// Rectifying rotation, padded to 4x4.
    pub r_rect: [[f64; 4]; 4],
    /// LiDAR to camera extrinsics.
    pub rt: [[f64; 4]; 4],
}

impl Calibration {
    /// Calibration of the KITTI raw sequence 2011_09_26, camera 00.
    pub fn kitti() -> Calibration {
        Calibration {
            p_rect: [
                [7.215377e+02, 0.000000e+00, 6.095593e+02, 0.000000e+00],
                [0.000000e+00, 7.215377e+02, 1.728540e+02, 0.000000e+00],
                [0.000000e+00, 0.000000e+00, 1.000000e+00, 0.000000e+00],
            ],
            r_rect: [
                [9.999239e-01, 9.837760e-03, -7.445048e-03, 0.0],
                [-9.869795e-03, 9.999421e-01, -4.278459e-03, 0.0],
                [7.402527e-03, 4.351614e-03, 9.999631e-01, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
            rt: [
                [7.533745e-03, -9.999714e-01, -6.166020e-04, -4.069766e-03],
                [1.480249e-02, 7.280733e-04, -9.998902e-01, -7.631618e-02],
                [9.998621e-01, 7.523790e-03, 1.480755e-02, -2.717806e-01],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    /// Pinhole camera looking along the vehicle's forward axis with no offset.
    pub fn pinhole(focal: f64, cx: f64, cy: f64) -> Calibration {
        Calibration {
            p_rect: [
                [focal, 0.0, cx, 0.0],
                [0.0, focal, cy, 0.0],
                [0.0, 0.0, 1.0, 0.0],
            ],
            r_rect: [
                [1.0, 0.0, 0.0, 0.0],
                [0.0, 1.0, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
            // x forward, y left, z up -> x right, y down, z forward
            rt: [
                [0.0, -1.0, 0.0, 0.0],
                [0.0, 0.0, -1.0, 0.0],
                [1.0, 0.0, 0.0, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    /// Validates the matrices and composes them into one 3x4 projection.
    pub fn projection(&self) -> Result<Projection, FusionError> {
        let p_rect = na::Matrix3x4::from_row_slice(self.p_rect.as_flattened());
        let r_rect = na::Matrix4::from_row_slice(self.r_rect.as_flattened());
        let rt = na::Matrix4::from_row_slice(self.rt.as_flattened());

        if p_rect.iter().chain(r_rect.iter()).chain(rt.iter()).any(|v| !v.is_finite()) {
            return Err(FusionError::MalformedCalibration(
                "non-finite matrix entry".to_string(),
            ));
        }
        for (name, m) in [("r_rect", &r_rect), ("rt", &rt)] {
            if m.row(3) != na::RowVector4::new(0.0, 0.0, 0.0, 1.0) {
                return Err(FusionError::MalformedCalibration(format!(
                    "{} last row is not [0, 0, 0, 1]",
                    name
                )));
            }
        }
        let matrix = p_rect * r_rect * rt;
        if matrix.row(2).iter().all(|v| *v == 0.0) {
            return Err(FusionError::MalformedCalibration(
                "projection has an all-zero depth row".to_string(),
            ));
        }
        Ok(Projection { matrix })
    }
}

/// Composed `p_rect * r_rect * rt`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    matrix: na::Matrix3x4<f64>,
}

impl Projection {
    pub fn matrix(&self) -> &na::Matrix3x4<f64> {
        &self.matrix
    }

    /// Pixel coordinates of a range point, or `None` when the point is not in
    /// front of the camera.
    pub fn project(&self, point: &RangePoint) -> Option<na::Point2<f64>> {
        let y = self.matrix * point.to_homogeneous();
        let depth = y[2];
        if !(depth > 0.0) {
            return None;
        }
        let p = na::Point2::new(y[0] / depth, y[1] / depth);
        if p.x.is_finite() && p.y.is_finite() {
            Some(p)
        } else {
            None
        }
    }
}
