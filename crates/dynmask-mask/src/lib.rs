#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Error types for the mask module.
pub mod error;

/// Writing masks and visibility lists to disk.
pub mod io;

/// Convex polygon scanline rasterization.
pub mod raster;

/// Depth-buffered rendering of dynamic objects per frame and camera.
pub mod renderer;

pub use crate::error::{MaskError, RenderIssue};
pub use crate::renderer::{
    CameraView, EncodedMask, FrameMask, MaskEncoding, MaskRenderer, MaskRendererConfig,
    RenderInput, RenderOutput,
};
