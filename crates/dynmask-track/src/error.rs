/// An error type for the track module.
#[derive(thiserror::Error, Debug)]
pub enum TrackError {
    /// Error reading or writing a file.
    #[error("Failed to manipulate the file. {0}")]
    FileError(#[from] std::io::Error),

    /// Error encoding or decoding the structured form.
    #[error("Failed to (de)serialize trajectories as json. {0}")]
    JsonError(#[from] serde_json::Error),

    /// Error encoding the binary form.
    #[error("Failed to encode trajectories. {0}")]
    EncodeError(#[from] bincode::error::EncodeError),

    /// Error decoding the binary form.
    #[error("Failed to decode trajectories. {0}")]
    DecodeError(#[from] bincode::error::DecodeError),

    /// The dynamic distance threshold is not usable.
    #[error("Dynamic threshold must be finite and positive, got {0}")]
    InvalidThreshold(f64),
}
