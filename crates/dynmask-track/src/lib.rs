#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Trajectory construction from grouped detections.
pub mod builder;

/// Object detections and identifiers.
pub mod detection;

/// Error types for the track module.
pub mod error;

/// Binary and JSON persistence of trajectories.
pub mod io;

/// Motion statistics and dynamic/static classification.
pub mod motion;

/// The trajectory record.
pub mod trajectory;

pub use crate::builder::{
    BoxFrame, TrackBuilder, TrackBuilderConfig, TrackIssue, TrackIssueReason, TrackOutput,
};
pub use crate::detection::{ObjectClass, ObjectDetection, ObjectId};
pub use crate::error::TrackError;
pub use crate::trajectory::{MotionClass, Trajectory, TrajectorySample};
