use dynmask_geometry::{BoxSize, OrientedBox, Pose};

use crate::detection::{ObjectClass, ObjectId};

/// Motion label of a trajectory.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    serde::Serialize,
    serde::Deserialize,
    bincode::Encode,
    bincode::Decode,
)]
#[serde(rename_all = "lowercase")]
pub enum MotionClass {
    /// The object moved more than the configured threshold.
    Dynamic,
    /// The object did not move, or motion could not be observed.
    Static,
}

/// The state of an object at one frame.
#[derive(
    Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize, bincode::Encode, bincode::Decode,
)]
pub struct TrajectorySample {
    /// Frame index.
    pub frame: usize,
    /// Frame timestamp in seconds.
    pub timestamp: f64,
    /// Box pose in world frame (`world_from_box`).
    pub pose_world: Pose,
    /// Box pose in ego frame (`ego_from_box`), when known.
    pub pose_ego: Option<Pose>,
    /// Box extent observed at this frame.
    pub size: BoxSize,
    /// Heading in world frame, radians.
    pub yaw: f64,
    /// Visibility flag carried over from the detection.
    pub visible: bool,
    /// Speed of the box center since the previous sample, m/s.
    pub speed: f64,
}

impl TrajectorySample {
    /// Box center in world frame.
    pub fn center_world(&self) -> [f64; 3] {
        self.pose_world.translation().to_array()
    }
}

/// The full-sequence trajectory of one object.
///
/// Built once by [`crate::TrackBuilder`]; consumers only ever borrow it.
#[derive(
    Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize, bincode::Encode, bincode::Decode,
)]
pub struct Trajectory {
    /// Object identifier.
    pub object_id: ObjectId,
    /// Category of the first detection.
    pub class: ObjectClass,
    /// Dynamic/static label.
    pub motion: MotionClass,
    /// Per-axis maximum extent over all samples.
    pub size: BoxSize,
    /// Largest world-frame distance of any sample center from the first one.
    pub max_displacement: f64,
    /// Sum of world-frame center displacements between consecutive samples.
    pub path_length: f64,
    /// Rigid symmetric object.
    pub symmetric: bool,
    /// Non-rigid object (pedestrians).
    pub deformable: bool,
    /// Samples ordered by frame.
    pub samples: Vec<TrajectorySample>,
}

impl Trajectory {
    /// Whether the object is labeled dynamic.
    pub fn is_dynamic(&self) -> bool {
        self.motion == MotionClass::Dynamic
    }

    /// The sample at `frame`, if the object was observed there.
    pub fn sample_at(&self, frame: usize) -> Option<&TrajectorySample> {
        self.samples
            .binary_search_by_key(&frame, |s| s.frame)
            .ok()
            .map(|i| &self.samples[i])
    }

    /// The world-frame box at `frame` if the object is visible there.
    ///
    /// The aggregate trajectory size is used so the footprint is stable across frames.
    pub fn visible_box_at(&self, frame: usize) -> Option<OrientedBox> {
        self.sample_at(frame)
            .filter(|s| s.visible)
            .map(|s| OrientedBox {
                pose: s.pose_world,
                size: self.size,
            })
    }

    /// Frame indices covered by the trajectory.
    pub fn frames(&self) -> impl Iterator<Item = usize> + '_ {
        self.samples.iter().map(|s| s.frame)
    }
}
