#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// The raster type.
pub mod image;

/// Raster errors.
pub mod error;

pub use crate::error::ImageError;
pub use crate::image::{Image, ImageSize};
