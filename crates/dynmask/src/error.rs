use crate::config::ConfigError;

/// An error type for the pipeline.
///
/// Only run-level failures end up here; per-unit failures are collected in
/// [`crate::StageReport`]s.
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    /// The configuration is invalid.
    #[error(transparent)]
    ConfigError(#[from] ConfigError),

    /// Error reading the dataset or writing outputs.
    #[error(transparent)]
    IoError(#[from] dynmask_io::IoError),

    /// Error building or persisting trajectories.
    #[error(transparent)]
    TrackError(#[from] dynmask_track::TrackError),

    /// Error writing masks.
    #[error(transparent)]
    MaskError(#[from] dynmask_mask::MaskError),

    /// Error to create or write a file.
    #[error("Failed to manipulate the file. {0}")]
    FileError(#[from] std::io::Error),

    /// Error to serialize json.
    #[error("Json error. {0}")]
    JsonError(#[from] serde_json::Error),

    /// A stage name given on the command line is not known.
    #[error("Unknown stage {0:?}, expected one of: track, dynamic_mask")]
    UnknownStage(String),
}
