use crate::image::ImageSize;

/// Errors of raster construction and access.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ImageError {
    /// Pixel buffer length differs from the pixel count.
    #[error("got {0} pixel values for {1} pixels")]
    InvalidDataLength(usize, usize),

    /// Coordinates outside the raster.
    #[error("pixel ({0}, {1}) is outside a {2} image")]
    PixelIndexOutOfBounds(usize, usize, ImageSize),

    /// A value the target pixel type cannot hold.
    #[error("pixel value {0} does not fit the target type")]
    CastError(String),
}
