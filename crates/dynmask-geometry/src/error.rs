/// An error type for the geometry module.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    /// The matrix is not a valid rigid transform.
    #[error("Malformed pose: {0}")]
    MalformedPose(String),

    /// The point lies on or behind the camera plane.
    #[error("Point has non-positive depth ({0})")]
    NonPositiveDepth(f64),

    /// The intrinsic matrix is not a valid pinhole matrix.
    #[error("Invalid intrinsic matrix: {0}")]
    InvalidIntrinsic(String),
}
