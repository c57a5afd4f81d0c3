use std::{collections::BTreeMap, fs};

use dynmask_geometry::Pose;
use dynmask_image::ImageSize;
use dynmask_io::{calibration::load_calibration, DatasetLayout};
use dynmask_mask::{
    io::{resolve_image_size, write_camera_visibility, write_mask, CAMERA_VISIBILITY_JSON},
    CameraView, MaskRenderer, RenderInput, RenderOutput,
};
use dynmask_track::Trajectory;

use super::REPORTS_JSON;
use crate::{
    config::Config,
    error::PipelineError,
    stage::{Stage, StageOutput, StageReport, Unit, UnitIssue},
};

/// Everything the mask stage reads besides the calibration files.
#[derive(Debug)]
pub struct MaskInput {
    /// All trajectories of the sequence.
    pub trajectories: Vec<Trajectory>,
    /// Valid `world_from_ego` poses keyed by frame.
    pub ego_poses: BTreeMap<usize, Pose>,
    /// Frames to render, ascending.
    pub frames: Vec<usize>,
}

/// Renders and writes one dynamic mask per frame and camera.
pub struct MaskStage {
    layout: DatasetLayout,
    renderer: MaskRenderer,
    cameras: Vec<(String, u32)>,
    image_sizes: BTreeMap<String, ImageSize>,
}

impl MaskStage {
    /// Create the stage from the run configuration.
    pub fn new(config: &Config) -> Self {
        let cameras = config.cameras();
        let image_sizes = cameras
            .iter()
            .filter_map(|(position, _)| Some((position.clone(), config.image_size(position)?)))
            .collect();
        Self {
            layout: config.layout(),
            renderer: MaskRenderer::new(config.mask.clone()),
            cameras,
            image_sizes,
        }
    }

    // calibrated cameras, plus the load error of the others
    fn load_views(&self, sample_frame: usize) -> (BTreeMap<u32, CameraView>, BTreeMap<u32, String>) {
        let mut views = BTreeMap::new();
        let mut errors = BTreeMap::new();
        for (position, camera_id) in self.cameras.iter() {
            match load_calibration(&self.layout, position, *camera_id) {
                Ok(calibration) => {
                    let image_size = resolve_image_size(
                        self.image_sizes.get(position).copied(),
                        self.layout.image_path(sample_frame, *camera_id),
                        self.renderer.config().default_size(),
                    );
                    log::debug!("camera {position} ({camera_id}): {image_size}");
                    views.insert(*camera_id, CameraView {
                        calibration,
                        image_size,
                    });
                }
                Err(e) => {
                    log::warn!("camera {position} ({camera_id}) is not calibrated: {e}");
                    errors.insert(*camera_id, e.to_string());
                }
            }
        }
        (views, errors)
    }
}

impl Stage for MaskStage {
    type Input = MaskInput;
    type Output = RenderOutput;

    fn name(&self) -> &'static str {
        "dynamic_mask"
    }

    fn run(&self, input: MaskInput) -> Result<StageOutput<RenderOutput>, PipelineError> {
        let sample_frame = input.frames.first().copied().unwrap_or_default();
        let (views, calibration_errors) = self.load_views(sample_frame);

        let mask_dir = self.layout.mask_dir();
        fs::create_dir_all(&mask_dir)?;

        let camera_ids = self.cameras.iter().map(|(_, id)| *id).collect::<Vec<_>>();
        let output = self.renderer.render(
            &RenderInput {
                trajectories: &input.trajectories,
                ego_poses: &input.ego_poses,
                views: &views,
                camera_ids: &camera_ids,
                frames: &input.frames,
            },
            |mask| write_mask(self.layout.mask_path(mask.frame, mask.camera_id), &mask.mask),
        );
        write_camera_visibility(mask_dir.join(CAMERA_VISIBILITY_JSON), &output.visibility)?;

        let mut report = StageReport::new(self.name());
        report.completed = output.num_masks;
        report.extend(output.issues.iter().cloned().map(|issue| {
            let mut issue = UnitIssue::from(issue);
            if let Unit::Camera { camera_id } = issue.unit {
                if let Some(detail) = calibration_errors.get(&camera_id) {
                    issue.reason = format!("{}: {detail}", issue.reason);
                }
            }
            issue
        }));
        report.write_json(mask_dir.join(REPORTS_JSON))?;

        Ok(StageOutput { output, report })
    }
}
