use std::{collections::BTreeSet, str::FromStr};

use dynmask_io::{ego_pose::load_ego_poses, objects::read_objects_dir, timestamps::load_timestamps};
use dynmask_track::io::load_trajectories;

use crate::{
    config::Config,
    error::PipelineError,
    stage::{Stage, StageReport},
    stages::{MaskInput, MaskStage, TrackInput, TrackStage},
};

/// The stages known to the runner, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum StageKind {
    /// Trajectory building.
    Track,
    /// Dynamic mask rendering.
    DynamicMask,
}

impl StageKind {
    /// Every stage, in execution order.
    pub const ALL: [StageKind; 2] = [StageKind::Track, StageKind::DynamicMask];

    /// The stage name.
    pub fn name(&self) -> &'static str {
        match self {
            StageKind::Track => "track",
            StageKind::DynamicMask => "dynamic_mask",
        }
    }

    /// The stages to run: the `requested` names if any, else the ones enabled
    /// in the configuration. Always in execution order.
    pub fn select(config: &Config, requested: &[String]) -> Result<Vec<StageKind>, PipelineError> {
        if requested.is_empty() {
            return Ok(StageKind::ALL
                .into_iter()
                .filter(|kind| match kind {
                    StageKind::Track => config.stages.track,
                    StageKind::DynamicMask => config.stages.dynamic_mask,
                })
                .collect());
        }
        let selected = requested
            .iter()
            .map(|name| name.parse::<StageKind>())
            .collect::<Result<BTreeSet<StageKind>, _>>()?;
        Ok(selected.into_iter().collect())
    }
}

impl FromStr for StageKind {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StageKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| PipelineError::UnknownStage(s.to_string()))
    }
}

/// Reports of every stage that ran.
#[derive(Debug, Default)]
pub struct PipelineSummary {
    /// One report per stage, in execution order.
    pub reports: Vec<StageReport>,
}

impl PipelineSummary {
    /// Total number of failed units over all stages.
    pub fn num_issues(&self) -> usize {
        self.reports.iter().map(|r| r.issues.len()).sum()
    }
}

/// Run `stages` over the dataset described by `config`.
///
/// The mask stage uses the trajectories of the track stage when both run,
/// otherwise it loads the persisted ones. Per-unit failures end up in the
/// summary; only configuration and unreadable-dataset errors are returned.
pub fn run_pipeline(config: &Config, stages: &[StageKind]) -> Result<PipelineSummary, PipelineError> {
    config.validate()?;
    let layout = config.layout();
    let mut summary = PipelineSummary::default();

    let ego_poses = load_ego_poses(&layout)?;
    let poses = ego_poses.poses.clone();
    let mut frames = ego_poses
        .poses
        .keys()
        .copied()
        .chain(ego_poses.failures.iter().map(|(frame, _)| *frame))
        .collect::<BTreeSet<_>>();

    let mut trajectories = None;
    if stages.contains(&StageKind::Track) {
        let objects = read_objects_dir(layout.objects_dir())?;
        frames.extend(objects.frames());
        let timestamps = load_timestamps(layout.timestamps_path(), objects.num_frames)?;

        let stage = TrackStage::new(config)?;
        log::info!("running stage {}", stage.name());
        let result = stage.run(TrackInput {
            objects,
            ego_poses,
            timestamps,
        })?;
        trajectories = Some(result.output);
        summary.reports.push(result.report);
    }

    if stages.contains(&StageKind::DynamicMask) {
        let trajectories = match trajectories {
            Some(trajectories) => trajectories,
            None => load_trajectories(layout.track_dir())?,
        };
        frames.extend(trajectories.iter().flat_map(|t| t.frames()));

        let stage = MaskStage::new(config);
        log::info!("running stage {}", stage.name());
        let result = stage.run(MaskInput {
            trajectories,
            ego_poses: poses,
            frames: frames.into_iter().collect(),
        })?;
        summary.reports.push(result.report);
    }

    for report in summary.reports.iter() {
        log::info!(
            "stage {}: {} units completed, {} failed",
            report.stage,
            report.completed,
            report.issues.len()
        );
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(track: bool, dynamic_mask: bool) -> Config {
        let mut config = Config::from_yaml_str(
            "input: a\noutput: b\ncamera: { positions: [f], id_map: { f: 0 } }\n",
        )
        .unwrap();
        config.stages.track = track;
        config.stages.dynamic_mask = dynamic_mask;
        config
    }

    #[test]
    fn test_select_from_config() -> Result<(), PipelineError> {
        assert_eq!(
            StageKind::select(&config(true, true), &[])?,
            vec![StageKind::Track, StageKind::DynamicMask]
        );
        assert_eq!(
            StageKind::select(&config(false, true), &[])?,
            vec![StageKind::DynamicMask]
        );
        assert!(StageKind::select(&config(false, false), &[])?.is_empty());
        Ok(())
    }

    #[test]
    fn test_select_requested() -> Result<(), PipelineError> {
        // requested stages override the config and keep execution order
        let requested = vec!["dynamic_mask".to_string(), "track".to_string()];
        assert_eq!(
            StageKind::select(&config(false, false), &requested)?,
            vec![StageKind::Track, StageKind::DynamicMask]
        );
        assert!(matches!(
            StageKind::select(&config(true, true), &["sky_mask".to_string()]),
            Err(PipelineError::UnknownStage(name)) if name == "sky_mask"
        ));
        Ok(())
    }
}
