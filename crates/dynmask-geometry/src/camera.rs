use glam::DVec3;

use crate::{error::GeometryError, pose::Pose};

/// A struct representing the intrinsic parameters of a pinhole camera.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PinholeIntrinsic {
    /// Focal length along x in pixels.
    pub fx: f64,
    /// Focal length along y in pixels.
    pub fy: f64,
    /// Principal point x in pixels.
    pub cx: f64,
    /// Principal point y in pixels.
    pub cy: f64,
}

impl PinholeIntrinsic {
    /// Creates a new intrinsic, validating that the focal lengths are positive.
    pub fn new(fx: f64, fy: f64, cx: f64, cy: f64) -> Result<Self, GeometryError> {
        let finite = [fx, fy, cx, cy].iter().all(|v| v.is_finite());
        if !finite || fx <= 0.0 || fy <= 0.0 {
            return Err(GeometryError::InvalidIntrinsic(format!(
                "fx={fx} fy={fy} cx={cx} cy={cy}"
            )));
        }
        Ok(Self { fx, fy, cx, cy })
    }

    /// Creates an intrinsic from a 3x3 camera matrix `[[fx, 0, cx], [0, fy, cy], [0, 0, 1]]`.
    ///
    /// Skew is not supported and must be zero.
    pub fn from_matrix(k: &[[f64; 3]; 3]) -> Result<Self, GeometryError> {
        let zeros = [k[0][1], k[1][0], k[2][0], k[2][1]];
        if zeros.iter().any(|v| v.abs() > 1e-9) || (k[2][2] - 1.0).abs() > 1e-9 {
            return Err(GeometryError::InvalidIntrinsic(format!(
                "expected [[fx, 0, cx], [0, fy, cy], [0, 0, 1]], got {k:?}"
            )));
        }
        Self::new(k[0][0], k[1][1], k[0][2], k[1][2])
    }

    /// Returns the camera matrix as a 3x3 array.
    pub fn camera_matrix(&self) -> [[f64; 3]; 3] {
        [
            [self.fx, 0.0, self.cx],
            [0.0, self.fy, self.cy],
            [0.0, 0.0, 1.0],
        ]
    }

    /// Direction of the viewing ray through pixel `(u, v)`, scaled to unit depth.
    pub fn ray(&self, u: f64, v: f64) -> DVec3 {
        DVec3::new((u - self.cx) / self.fx, (v - self.cy) / self.fy, 1.0)
    }
}

/// Calibration of one camera of the rig.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CameraCalibration {
    /// Stable integer id of the camera.
    pub camera_id: u32,
    /// Camera-position name, e.g. `front_wide`.
    pub position: String,
    /// Pinhole intrinsics.
    pub intrinsic: PinholeIntrinsic,
    /// Camera frame expressed in the ego frame (`ego_from_camera`).
    pub extrinsic: Pose,
}
