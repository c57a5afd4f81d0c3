use std::{collections::BTreeMap, fs, path::Path};

use dynmask_geometry::Pose;

use crate::{error::IoError, layout::DatasetLayout, matrix::read_matrix4};

/// Ego poses of a sequence, keyed by frame.
///
/// Frames whose file exists but cannot be read or does not hold a rigid
/// transform are kept in `failures` so the caller can report them.
#[derive(Debug, Default)]
pub struct EgoPoses {
    /// `world_from_ego` per frame.
    pub poses: BTreeMap<usize, Pose>,
    /// Frames that failed to load, with the reason.
    pub failures: Vec<(usize, IoError)>,
}

/// Read a single ego pose matrix and validate it as a rigid transform.
pub fn read_ego_pose(path: impl AsRef<Path>) -> Result<Pose, IoError> {
    Ok(Pose::from_matrix(read_matrix4(path)?)?)
}

// frame index of an `NNNNNN.txt` file name
fn frame_of(path: &Path) -> Option<usize> {
    if path.extension()? != "txt" {
        return None;
    }
    path.file_stem()?.to_str()?.parse().ok()
}

/// Load every `ego_pose/{frame:06}.txt` file of the dataset.
///
/// A missing directory is an error; unreadable or malformed files are not.
pub fn load_ego_poses(layout: &DatasetLayout) -> Result<EgoPoses, IoError> {
    let dir = layout.ego_pose_dir();
    if !dir.exists() {
        return Err(IoError::FileDoesNotExist(dir));
    }

    let mut frames = fs::read_dir(&dir)?
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| frame_of(&entry.path()))
        .collect::<Vec<_>>();
    frames.sort_unstable();

    let mut ego_poses = EgoPoses::default();
    for frame in frames {
        match read_ego_pose(layout.ego_pose_path(frame)) {
            Ok(pose) => {
                ego_poses.poses.insert(frame, pose);
            }
            Err(e) => {
                log::warn!("ego pose of frame {frame} rejected: {e}");
                ego_poses.failures.push((frame, e));
            }
        }
    }

    log::debug!(
        "loaded {} ego poses from {}",
        ego_poses.poses.len(),
        dir.display()
    );
    Ok(ego_poses)
}
