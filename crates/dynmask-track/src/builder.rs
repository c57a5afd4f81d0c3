use std::collections::BTreeMap;

use dynmask_geometry::{BoxSize, Pose};
use log::{debug, info, warn};
use rayon::prelude::*;

use crate::{
    detection::{ObjectDetection, ObjectId},
    error::TrackError,
    motion::{classify, motion_stats, DEFAULT_DYNAMIC_THRESHOLD},
    trajectory::{MotionClass, Trajectory, TrajectorySample},
};

/// Frame in which detection boxes are expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoxFrame {
    /// Boxes are relative to the ego vehicle; the ego pose lifts them to world.
    #[default]
    Ego,
    /// Boxes are already in world frame.
    World,
}

/// Configuration of the trajectory builder.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TrackBuilderConfig {
    /// Displacement in meters above which an object is dynamic.
    pub dynamic_threshold: f64,
    /// Frame of the incoming boxes.
    pub box_frame: BoxFrame,
}

impl Default for TrackBuilderConfig {
    fn default() -> Self {
        Self {
            dynamic_threshold: DEFAULT_DYNAMIC_THRESHOLD,
            box_frame: BoxFrame::Ego,
        }
    }
}

/// Why a detection (or a whole object) was dropped.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "detail")]
pub enum TrackIssueReason {
    /// The detection references a frame with no timestamp.
    UnknownFrame,
    /// No valid ego pose exists for the referenced frame.
    MissingEgoPose,
    /// The box has non-finite or negative parameters.
    InvalidBox,
    /// A second detection of the same object at the same frame.
    DuplicateFrame,
    /// No frame of the object survived.
    NoValidFrames,
}

impl std::fmt::Display for TrackIssueReason {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let text = match self {
            TrackIssueReason::UnknownFrame => "unknown frame index",
            TrackIssueReason::MissingEgoPose => "missing ego pose",
            TrackIssueReason::InvalidBox => "invalid box parameters",
            TrackIssueReason::DuplicateFrame => "duplicate detection for frame",
            TrackIssueReason::NoValidFrames => "no valid frames",
        };
        write!(f, "{text}")
    }
}

/// A per-object report of a dropped frame (broken trajectory) or dropped object.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TrackIssue {
    /// The affected object.
    pub object_id: ObjectId,
    /// The dropped frame, if the issue concerns a single frame.
    pub frame: Option<usize>,
    /// What went wrong.
    pub reason: TrackIssueReason,
}

impl std::fmt::Display for TrackIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self.frame {
            Some(frame) => write!(f, "object {} frame {}: {}", self.object_id, frame, self.reason),
            None => write!(f, "object {}: {}", self.object_id, self.reason),
        }
    }
}

/// The result of a trajectory build.
#[derive(Debug, Clone, Default)]
pub struct TrackOutput {
    /// One trajectory per object with at least one valid frame, ordered by id.
    pub trajectories: Vec<Trajectory>,
    /// Per-unit reports.
    pub issues: Vec<TrackIssue>,
    /// Object id -> dense index in order of first appearance.
    pub object_index: BTreeMap<ObjectId, usize>,
}

impl TrackOutput {
    /// Number of dynamic trajectories.
    pub fn num_dynamic(&self) -> usize {
        self.trajectories.iter().filter(|t| t.is_dynamic()).count()
    }
}

/// Builds per-object trajectories and classifies them as dynamic or static.
///
/// # Example
///
/// ```
/// use std::collections::BTreeMap;
/// use dynmask_geometry::{BoundingBox3d, BoxSize, Pose};
/// use dynmask_track::{ObjectClass, ObjectDetection, ObjectId, TrackBuilder, TrackBuilderConfig};
///
/// let detection = |frame: usize, x: f64| ObjectDetection {
///     object_id: ObjectId(17),
///     frame,
///     class: ObjectClass::Vehicle,
///     bbox: BoundingBox3d { center: [x, 0.0, 0.0], size: BoxSize::default(), yaw: 0.0 },
///     visible: true,
/// };
/// let ego_poses = BTreeMap::from([(0, Pose::identity()), (1, Pose::identity())]);
/// let timestamps = BTreeMap::from([(0, 0.0), (1, 0.1)]);
///
/// let builder = TrackBuilder::new(TrackBuilderConfig::default()).unwrap();
/// let output = builder.build(&[detection(0, 0.0), detection(1, 5.0)], &ego_poses, &timestamps);
/// assert!(output.trajectories[0].is_dynamic());
/// ```
#[derive(Debug, Clone)]
pub struct TrackBuilder {
    config: TrackBuilderConfig,
}

impl TrackBuilder {
    /// Create a builder.
    ///
    /// # Errors
    ///
    /// Returns [`TrackError::InvalidThreshold`] if the threshold is not finite and positive.
    pub fn new(config: TrackBuilderConfig) -> Result<Self, TrackError> {
        let t = config.dynamic_threshold;
        if !t.is_finite() || t <= 0.0 {
            return Err(TrackError::InvalidThreshold(t));
        }
        Ok(Self { config })
    }

    /// The builder configuration.
    pub fn config(&self) -> &TrackBuilderConfig {
        &self.config
    }

    /// Build all trajectories.
    ///
    /// # Arguments
    ///
    /// * `detections` - All detections of the sequence, in any order.
    /// * `ego_poses` - Valid `world_from_ego` poses keyed by frame index.
    /// * `timestamps` - Timestamps in seconds keyed by frame index; frames absent
    ///   here are unknown.
    pub fn build(
        &self,
        detections: &[ObjectDetection],
        ego_poses: &BTreeMap<usize, Pose>,
        timestamps: &BTreeMap<usize, f64>,
    ) -> TrackOutput {
        let groups = group_by_object(detections);
        info!(
            "grouped {} detections into {} objects",
            detections.len(),
            groups.len()
        );

        let results = groups
            .par_iter()
            .map(|(object_id, group)| self.build_one(*object_id, group, ego_poses, timestamps))
            .collect::<Vec<_>>();

        let mut output = TrackOutput {
            object_index: object_index(detections),
            ..Default::default()
        };
        for (trajectory, mut issues) in results {
            output.issues.append(&mut issues);
            if let Some(trajectory) = trajectory {
                output.trajectories.push(trajectory);
            }
        }

        for issue in output.issues.iter() {
            warn!("broken trajectory: {issue}");
        }
        info!(
            "built {} trajectories ({} dynamic), {} issues",
            output.trajectories.len(),
            output.num_dynamic(),
            output.issues.len()
        );

        output
    }

    fn build_one(
        &self,
        object_id: ObjectId,
        group: &[ObjectDetection],
        ego_poses: &BTreeMap<usize, Pose>,
        timestamps: &BTreeMap<usize, f64>,
    ) -> (Option<Trajectory>, Vec<TrackIssue>) {
        let mut issues = Vec::new();
        let mut samples: Vec<TrajectorySample> = Vec::with_capacity(group.len());
        // category of the first detection that made it into the trajectory
        let mut class = None;

        let mut report = |frame: usize, reason: TrackIssueReason| {
            issues.push(TrackIssue {
                object_id,
                frame: Some(frame),
                reason,
            })
        };

        for det in group {
            if samples.last().is_some_and(|s| s.frame == det.frame) {
                report(det.frame, TrackIssueReason::DuplicateFrame);
                continue;
            }
            let Some(&timestamp) = timestamps.get(&det.frame) else {
                report(det.frame, TrackIssueReason::UnknownFrame);
                continue;
            };
            if !det.has_valid_box() {
                report(det.frame, TrackIssueReason::InvalidBox);
                continue;
            }

            let box_pose = det.bbox.pose();
            let ego_pose = ego_poses.get(&det.frame);
            let (pose_world, pose_ego) = match (self.config.box_frame, ego_pose) {
                (BoxFrame::Ego, Some(ego)) => (ego.compose(&box_pose), Some(box_pose)),
                (BoxFrame::Ego, None) => {
                    report(det.frame, TrackIssueReason::MissingEgoPose);
                    continue;
                }
                (BoxFrame::World, ego) => (box_pose, ego.map(|e| e.inverse().compose(&box_pose))),
            };

            class.get_or_insert(det.class);
            samples.push(TrajectorySample {
                frame: det.frame,
                timestamp,
                yaw: pose_world.yaw(),
                pose_world,
                pose_ego,
                size: det.bbox.size,
                visible: det.visible,
                speed: 0.0,
            });
        }

        let Some(class) = class else {
            issues.push(TrackIssue {
                object_id,
                frame: None,
                reason: TrackIssueReason::NoValidFrames,
            });
            return (None, issues);
        };

        let points = samples
            .iter()
            .map(|s| (s.timestamp, s.center_world()))
            .collect::<Vec<_>>();
        let stats = motion_stats(&points);
        for (sample, speed) in samples.iter_mut().zip(stats.speeds.iter()) {
            sample.speed = *speed;
        }

        let motion = classify(
            samples.len(),
            stats.max_displacement,
            self.config.dynamic_threshold,
        );
        if samples.len() < 2 {
            debug!("object {object_id} has a single valid frame, classified static");
        }

        let size = samples
            .iter()
            .fold(BoxSize::default(), |acc, s| acc.max(&s.size));

        let trajectory = Trajectory {
            object_id,
            class,
            motion,
            size,
            max_displacement: stats.max_displacement,
            path_length: stats.path_length,
            symmetric: class.is_symmetric(),
            deformable: class.is_deformable(),
            samples,
        };
        debug!(
            "object {object_id}: {} samples, displacement {:.3} m, {:?}",
            trajectory.samples.len(),
            trajectory.max_displacement,
            trajectory.motion
        );
        debug_assert!(trajectory.samples.len() >= 2 || trajectory.motion == MotionClass::Static);

        (Some(trajectory), issues)
    }
}

/// Group detections into an object id -> detections map, each group ordered by frame.
///
/// Built with a parallel fold/reduce; the relative order of detections sharing
/// a frame is the input order.
pub fn group_by_object(detections: &[ObjectDetection]) -> BTreeMap<ObjectId, Vec<ObjectDetection>> {
    let mut groups = detections
        .par_iter()
        .fold(
            BTreeMap::<ObjectId, Vec<ObjectDetection>>::new,
            |mut acc, det| {
                acc.entry(det.object_id).or_default().push(det.clone());
                acc
            },
        )
        .reduce(BTreeMap::new, |mut a, b| {
            for (id, mut dets) in b {
                a.entry(id).or_default().append(&mut dets);
            }
            a
        });

    for group in groups.values_mut() {
        // stable sort keeps input order within a frame
        group.sort_by_key(|d| d.frame);
    }
    groups
}

/// Dense object index in order of first appearance (by frame, then input order).
pub fn object_index(detections: &[ObjectDetection]) -> BTreeMap<ObjectId, usize> {
    let mut order = (0..detections.len()).collect::<Vec<_>>();
    order.sort_by_key(|&i| detections[i].frame);

    let mut index = BTreeMap::new();
    for i in order {
        let next = index.len();
        index.entry(detections[i].object_id).or_insert(next);
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::ObjectClass;
    use approx::assert_relative_eq;
    use dynmask_geometry::BoundingBox3d;

    fn det(id: u32, frame: usize, center: [f64; 3]) -> ObjectDetection {
        ObjectDetection {
            object_id: ObjectId(id),
            frame,
            class: ObjectClass::Vehicle,
            bbox: BoundingBox3d {
                center,
                size: BoxSize {
                    length: 4.0,
                    width: 2.0,
                    height: 1.5,
                },
                yaw: 0.0,
            },
            visible: true,
        }
    }

    fn identity_poses(n: usize) -> BTreeMap<usize, Pose> {
        (0..n).map(|i| (i, Pose::identity())).collect()
    }

    fn timestamps(n: usize) -> BTreeMap<usize, f64> {
        (0..n).map(|i| (i, i as f64 * 0.1)).collect()
    }

    fn builder() -> TrackBuilder {
        TrackBuilder::new(TrackBuilderConfig::default()).unwrap()
    }

    #[test]
    fn test_rejects_bad_threshold() {
        for t in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let config = TrackBuilderConfig {
                dynamic_threshold: t,
                ..Default::default()
            };
            assert!(TrackBuilder::new(config).is_err());
        }
    }

    #[test]
    fn test_single_frame_is_static() {
        let output = builder().build(&[det(22, 3, [0.0; 3])], &identity_poses(5), &timestamps(5));
        assert_eq!(output.trajectories.len(), 1);
        assert_eq!(output.trajectories[0].motion, MotionClass::Static);
        assert!(output.issues.is_empty());
    }

    #[test]
    fn test_threshold_classification() {
        let dets = vec![
            det(1, 0, [0.0, 0.0, 0.0]),
            det(1, 1, [0.5, 0.0, 0.0]),
            det(2, 0, [10.0, 0.0, 0.0]),
            det(2, 1, [10.1, 0.0, 0.0]),
        ];
        let output = builder().build(&dets, &identity_poses(2), &timestamps(2));
        assert_eq!(output.trajectories[0].object_id, ObjectId(1));
        assert_eq!(output.trajectories[0].motion, MotionClass::Dynamic);
        assert_eq!(output.trajectories[1].motion, MotionClass::Static);
        assert_relative_eq!(output.trajectories[1].max_displacement, 0.1, epsilon = 1e-12);
    }

    #[test]
    fn test_ego_motion_is_compensated() {
        // the object keeps a constant offset from an ego that moves 5m: it moves in world
        let dets = vec![det(3, 0, [10.0, 0.0, 0.0]), det(3, 1, [10.0, 0.0, 0.0])];
        let ego_poses = BTreeMap::from([
            (0, Pose::identity()),
            (1, Pose::from_yaw_translation(0.0, [5.0, 0.0, 0.0])),
        ]);
        let output = builder().build(&dets, &ego_poses, &timestamps(2));
        let trajectory = &output.trajectories[0];
        assert!(trajectory.is_dynamic());
        assert_relative_eq!(trajectory.samples[1].center_world()[0], 15.0, epsilon = 1e-12);
        assert_relative_eq!(trajectory.samples[1].speed, 50.0, epsilon = 1e-9);

        // a parked car seen from a moving ego stays static
        let dets = vec![det(4, 0, [10.0, 0.0, 0.0]), det(4, 1, [5.0, 0.0, 0.0])];
        let output = builder().build(&dets, &ego_poses, &timestamps(2));
        assert_eq!(output.trajectories[0].motion, MotionClass::Static);
    }

    #[test]
    fn test_world_frame_boxes_ignore_ego() {
        let config = TrackBuilderConfig {
            box_frame: BoxFrame::World,
            ..Default::default()
        };
        let dets = vec![det(5, 0, [0.0, 0.0, 0.0]), det(5, 10, [5.0, 0.0, 0.0])];
        let output = TrackBuilder::new(config)
            .unwrap()
            .build(&dets, &BTreeMap::new(), &timestamps(11));
        assert!(output.trajectories[0].is_dynamic());
        assert!(output.issues.is_empty());
        assert!(output.trajectories[0].samples[0].pose_ego.is_none());
    }

    #[test]
    fn test_missing_pose_drops_frame_only() {
        let dets = vec![
            det(6, 0, [0.0, 0.0, 0.0]),
            det(6, 1, [1.0, 0.0, 0.0]),
            det(6, 2, [2.0, 0.0, 0.0]),
        ];
        let mut ego_poses = identity_poses(3);
        ego_poses.remove(&1);
        let output = builder().build(&dets, &ego_poses, &timestamps(3));
        assert_eq!(output.trajectories[0].samples.len(), 2);
        assert!(output.trajectories[0].is_dynamic());
        assert_eq!(
            output.issues,
            vec![TrackIssue {
                object_id: ObjectId(6),
                frame: Some(1),
                reason: TrackIssueReason::MissingEgoPose,
            }]
        );
    }

    #[test]
    fn test_fewer_than_two_valid_frames_falls_back_to_static() {
        let dets = vec![det(7, 0, [0.0, 0.0, 0.0]), det(7, 9, [50.0, 0.0, 0.0])];
        // frame 9 is unknown
        let output = builder().build(&dets, &identity_poses(10), &timestamps(5));
        assert_eq!(output.trajectories[0].motion, MotionClass::Static);
        assert_eq!(output.issues[0].reason, TrackIssueReason::UnknownFrame);
    }

    #[test]
    fn test_no_valid_frames_omits_object() {
        let mut bad = det(8, 0, [0.0, 0.0, 0.0]);
        bad.bbox.size.width = f64::NAN;
        let output = builder().build(&[bad], &identity_poses(1), &timestamps(1));
        assert!(output.trajectories.is_empty());
        assert_eq!(output.issues.len(), 2);
        assert_eq!(output.issues[1].reason, TrackIssueReason::NoValidFrames);
    }

    #[test]
    fn test_class_comes_from_kept_detections() {
        // the dropped first detection carries a different category
        let mut dropped = det(12, 0, [0.0, 0.0, 0.0]);
        dropped.bbox.size.length = -1.0;
        let mut kept = vec![det(12, 1, [0.0, 0.0, 0.0]), det(12, 2, [1.0, 0.0, 0.0])];
        for d in kept.iter_mut() {
            d.class = ObjectClass::Pedestrian;
        }
        let dets = [vec![dropped], kept].concat();

        let output = builder().build(&dets, &identity_poses(3), &timestamps(3));
        let trajectory = &output.trajectories[0];
        assert_eq!(trajectory.class, ObjectClass::Pedestrian);
        assert!(trajectory.deformable);
        assert!(!trajectory.symmetric);
        assert_eq!(output.issues[0].reason, TrackIssueReason::InvalidBox);
    }

    #[test]
    fn test_duplicate_frame_keeps_first() {
        let dets = vec![det(9, 0, [0.0, 0.0, 0.0]), det(9, 0, [9.0, 0.0, 0.0])];
        let output = builder().build(&dets, &identity_poses(1), &timestamps(1));
        assert_eq!(output.trajectories[0].samples.len(), 1);
        assert_eq!(output.trajectories[0].samples[0].center_world()[0], 0.0);
        assert_eq!(output.issues[0].reason, TrackIssueReason::DuplicateFrame);
    }

    #[test]
    fn test_grouping_orders_by_frame() {
        let dets = vec![
            det(1, 2, [0.0; 3]),
            det(2, 0, [0.0; 3]),
            det(1, 0, [0.0; 3]),
            det(1, 1, [0.0; 3]),
        ];
        let groups = group_by_object(&dets);
        let frames = groups[&ObjectId(1)].iter().map(|d| d.frame).collect::<Vec<_>>();
        assert_eq!(frames, vec![0, 1, 2]);
        assert_eq!(groups[&ObjectId(2)].len(), 1);
    }

    #[test]
    fn test_object_index_first_appearance() {
        let dets = vec![det(30, 1, [0.0; 3]), det(10, 2, [0.0; 3]), det(20, 0, [0.0; 3])];
        let index = object_index(&dets);
        assert_eq!(index[&ObjectId(20)], 0);
        assert_eq!(index[&ObjectId(30)], 1);
        assert_eq!(index[&ObjectId(10)], 2);
    }

    #[test]
    fn test_size_is_per_axis_max() {
        let mut a = det(11, 0, [0.0; 3]);
        let mut b = det(11, 1, [0.0; 3]);
        a.bbox.size.length = 5.0;
        b.bbox.size.height = 3.0;
        let output = builder().build(&[a, b], &identity_poses(2), &timestamps(2));
        let size = output.trajectories[0].size;
        assert_eq!((size.length, size.width, size.height), (5.0, 2.0, 3.0));
    }
}
