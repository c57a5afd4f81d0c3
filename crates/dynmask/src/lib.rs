#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Validated run configuration.
pub mod config;

/// Error types for the pipeline.
pub mod error;

/// Runs the enabled stages in order.
pub mod pipeline;

/// The processing-stage interface and per-unit reports.
pub mod stage;

/// Concrete stages.
pub mod stages;

pub use dynmask_geometry as geometry;
pub use dynmask_image as image;
pub use dynmask_io as io;
pub use dynmask_mask as mask;
pub use dynmask_track as track;

pub use crate::config::{CameraConfig, Config, ConfigError, StagesConfig};
pub use crate::error::PipelineError;
pub use crate::pipeline::{run_pipeline, PipelineSummary, StageKind};
pub use crate::stage::{Stage, StageOutput, StageReport, Unit, UnitIssue};
pub use crate::stages::{MaskInput, MaskStage, TrackInput, TrackStage};
