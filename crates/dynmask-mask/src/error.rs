use dynmask_track::ObjectId;

/// An error type for the mask module.
#[derive(thiserror::Error, Debug)]
pub enum MaskError {
    /// The camera has no usable intrinsic/extrinsic calibration.
    #[error("Missing calibration for camera {0}")]
    MissingCalibration(u32),

    /// The frame has no valid ego pose.
    #[error("Missing ego pose for frame {0}")]
    MissingEgoPose(usize),

    /// The object id cannot be stored in a 16-bit label image.
    #[error("Object id {0} does not fit a 16-bit label")]
    LabelOverflow(ObjectId),

    /// The object id equals the background label.
    #[error("Object id {0} is the background label")]
    ReservedLabel(ObjectId),

    /// Error from the geometry module.
    #[error(transparent)]
    GeometryError(#[from] dynmask_geometry::GeometryError),

    /// Error from the image module.
    #[error(transparent)]
    ImageError(#[from] dynmask_image::ImageError),

    /// Error writing masks to disk.
    #[error(transparent)]
    IoError(#[from] dynmask_io::IoError),

    /// Error to create or write a file.
    #[error("Failed to manipulate the file. {0}")]
    FileError(#[from] std::io::Error),

    /// Error to serialize json.
    #[error("Json error. {0}")]
    JsonError(#[from] serde_json::Error),
}

/// A (frame, camera) or camera unit that produced no mask.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RenderIssue {
    /// Frame index; `None` when the whole camera failed.
    pub frame: Option<usize>,
    /// Camera id.
    pub camera_id: u32,
    /// Human readable reason.
    pub reason: String,
}

impl std::fmt::Display for RenderIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self.frame {
            Some(frame) => write!(f, "frame {frame} camera {}: {}", self.camera_id, self.reason),
            None => write!(f, "camera {}: {}", self.camera_id, self.reason),
        }
    }
}
