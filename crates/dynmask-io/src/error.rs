use std::path::PathBuf;

/// An error type for the io module.
#[derive(thiserror::Error, Debug)]
pub enum IoError {
    /// Error when the file does not exist.
    #[error("File does not exist: {0}")]
    FileDoesNotExist(PathBuf),

    /// Error to open, read or write the file.
    #[error("Failed to manipulate the file. {0}")]
    FileError(#[from] std::io::Error),

    /// The file content could not be parsed.
    #[error("Failed to parse {0}: {1}")]
    ParseError(PathBuf, String),

    /// Error to (de)serialize json.
    #[error("Json error. {0}")]
    JsonError(#[from] serde_json::Error),

    /// The parsed values do not form a valid transform or camera.
    #[error("Invalid geometry. {0}")]
    GeometryError(#[from] dynmask_geometry::GeometryError),

    /// Error to create or convert the image.
    #[error("Failed to create image. {0}")]
    ImageError(#[from] dynmask_image::ImageError),

    /// Error to encode the PNG image.
    #[error("Failed to encode the png image. {0}")]
    PngEncodingError(String),

    /// Error to decode the PNG image.
    #[error("Failed to decode the png image. {0}")]
    PngDecodeError(String),
}
