#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// 3D bounding boxes and their corners.
pub mod bbox;

/// Pinhole camera intrinsics and per-camera calibration.
pub mod camera;

/// Error types for the geometry module.
pub mod error;

/// Rigid transforms in homogeneous form.
pub mod pose;

/// Projection of points and boxes into the image plane.
pub mod projection;

pub use crate::bbox::{BoundingBox3d, BoxSize, OrientedBox};
pub use crate::camera::{CameraCalibration, PinholeIntrinsic};
pub use crate::error::GeometryError;
pub use crate::pose::{compose, inverse, transform_point, Pose};
pub use crate::projection::{convex_hull_2d, project, project_box3d, ProjectedBox, Projection};
