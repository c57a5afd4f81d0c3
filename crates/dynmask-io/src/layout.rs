use std::path::{Path, PathBuf};

/// Zero-padded frame name used in every per-frame file name.
pub fn frame_name(frame: usize) -> String {
    format!("{frame:06}")
}

/// Paths of the normalized dataset.
///
/// `input` holds the raw per-frame detections, `output` holds the converted
/// poses, calibration and images, and receives everything this crate writes.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetLayout {
    input: PathBuf,
    output: PathBuf,
}

impl DatasetLayout {
    /// Create a layout from the input and output roots.
    pub fn new(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
        }
    }

    /// The input root.
    pub fn input(&self) -> &Path {
        &self.input
    }

    /// The output root.
    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Directory of per-frame object JSON files.
    pub fn objects_dir(&self) -> PathBuf {
        self.input.join("objects")
    }

    /// Directory of per-frame ego pose matrices.
    pub fn ego_pose_dir(&self) -> PathBuf {
        self.output.join("ego_pose")
    }

    /// Ego pose matrix of `frame`.
    pub fn ego_pose_path(&self, frame: usize) -> PathBuf {
        self.ego_pose_dir().join(format!("{}.txt", frame_name(frame)))
    }

    /// Intrinsic parameters of `camera_id`.
    pub fn intrinsics_path(&self, camera_id: u32) -> PathBuf {
        self.output.join("intrinsics").join(format!("{camera_id}.txt"))
    }

    /// Extrinsic matrix of `camera_id`.
    pub fn extrinsics_path(&self, camera_id: u32) -> PathBuf {
        self.output.join("extrinsics").join(format!("{camera_id}.txt"))
    }

    /// Source image of `frame` seen by `camera_id`.
    pub fn image_path(&self, frame: usize, camera_id: u32) -> PathBuf {
        self.output
            .join("images")
            .join(format!("{}_{camera_id}.png", frame_name(frame)))
    }

    /// Frame timestamps.
    pub fn timestamps_path(&self) -> PathBuf {
        self.output.join("timestamps.json")
    }

    /// Directory receiving the trajectory records.
    pub fn track_dir(&self) -> PathBuf {
        self.output.join("track")
    }

    /// Directory receiving the dynamic masks.
    pub fn mask_dir(&self) -> PathBuf {
        self.output.join("dynamic_mask")
    }

    /// Mask of `frame` for `camera_id`.
    pub fn mask_path(&self, frame: usize, camera_id: u32) -> PathBuf {
        self.mask_dir()
            .join(format!("{}_{camera_id}.png", frame_name(frame)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_naming_convention() {
        let layout = DatasetLayout::new("/in", "/out");
        assert_eq!(frame_name(7), "000007");
        assert_eq!(
            layout.mask_path(10, 2),
            PathBuf::from("/out/dynamic_mask/000010_2.png")
        );
        assert_eq!(
            layout.ego_pose_path(3),
            PathBuf::from("/out/ego_pose/000003.txt")
        );
        assert_eq!(layout.objects_dir(), PathBuf::from("/in/objects"));
    }
}
