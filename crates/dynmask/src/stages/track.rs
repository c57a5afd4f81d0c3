use std::collections::BTreeMap;

use dynmask_io::{ego_pose::EgoPoses, objects::ObjectFrames, DatasetLayout};
use dynmask_track::{io::save_track_outputs, TrackBuilder, Trajectory};

use super::REPORTS_JSON;
use crate::{
    config::Config,
    error::PipelineError,
    stage::{Stage, StageOutput, StageReport, Unit, UnitIssue},
};

/// Everything the track stage reads.
#[derive(Debug)]
pub struct TrackInput {
    /// Detections of every frame, plus unusable records.
    pub objects: ObjectFrames,
    /// Ego poses, plus frames whose pose was rejected.
    pub ego_poses: EgoPoses,
    /// Frame timestamps in seconds.
    pub timestamps: BTreeMap<usize, f64>,
}

/// Builds, classifies and persists per-object trajectories.
pub struct TrackStage {
    layout: DatasetLayout,
    builder: TrackBuilder,
}

impl TrackStage {
    /// Create the stage from the run configuration.
    pub fn new(config: &Config) -> Result<Self, PipelineError> {
        Ok(Self {
            layout: config.layout(),
            builder: TrackBuilder::new(config.track.clone())?,
        })
    }
}

impl Stage for TrackStage {
    type Input = TrackInput;
    type Output = Vec<Trajectory>;

    fn name(&self) -> &'static str {
        "track"
    }

    fn run(&self, input: TrackInput) -> Result<StageOutput<Vec<Trajectory>>, PipelineError> {
        let TrackInput {
            objects,
            ego_poses,
            timestamps,
        } = input;

        let mut report = StageReport::new(self.name());
        report.extend(objects.issues);
        report.extend(ego_poses.failures.into_iter().map(|(frame, e)| UnitIssue {
            unit: Unit::Frame { frame },
            reason: e.to_string(),
        }));

        let built = self
            .builder
            .build(&objects.detections, &ego_poses.poses, &timestamps);

        let track_dir = self.layout.track_dir();
        save_track_outputs(&track_dir, &built.trajectories, &built.object_index)?;
        log::info!(
            "saved {} trajectories ({} dynamic) to {}",
            built.trajectories.len(),
            built.num_dynamic(),
            track_dir.display()
        );

        report.completed = built.trajectories.len();
        report.extend(built.issues);
        report.write_json(track_dir.join(REPORTS_JSON))?;

        Ok(StageOutput {
            output: built.trajectories,
            report,
        })
    }
}
