#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Camera intrinsics and extrinsics.
pub mod calibration;

/// Per-frame ego poses.
pub mod ego_pose;

/// Error types for I/O operations.
pub mod error;

/// Paths of the normalized dataset layout.
pub mod layout;

/// Whitespace separated matrix text files.
pub mod matrix;

/// Per-frame object detection files.
pub mod objects;

/// PNG mask encoding and size probing.
pub mod png;

/// Frame timestamps.
pub mod timestamps;

pub use crate::error::IoError;
pub use crate::layout::DatasetLayout;
