use std::collections::BTreeMap;

use dynmask_geometry::{project_box3d, CameraCalibration, GeometryError, Pose};
use dynmask_image::{Image, ImageSize};
use dynmask_track::{ObjectId, Trajectory};
use rayon::prelude::*;

use crate::{
    error::{MaskError, RenderIssue},
    raster::convex_polygon_spans,
};

/// Pixel encoding of the written masks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaskEncoding {
    /// 16-bit, pixel = object id, background = 0.
    #[default]
    Label,
    /// 8-bit, 255 for any dynamic object, background = 0.
    Binary,
}

fn default_image_size() -> [usize; 2] {
    [1920, 1080]
}

/// Settings of the mask renderer.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct MaskRendererConfig {
    /// Output pixel encoding.
    pub encoding: MaskEncoding,
    /// Image size `[width, height]` used when a camera has no known size.
    pub default_image_size: [usize; 2],
}

impl Default for MaskRendererConfig {
    fn default() -> Self {
        Self {
            encoding: MaskEncoding::default(),
            default_image_size: default_image_size(),
        }
    }
}

impl MaskRendererConfig {
    /// The fallback image size.
    pub fn default_size(&self) -> ImageSize {
        self.default_image_size.into()
    }
}

/// A calibrated camera together with the resolution of its images.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraView {
    /// Intrinsics and `ego_from_camera` extrinsic.
    pub calibration: CameraCalibration,
    /// Resolution of the source images, and therefore of the masks.
    pub image_size: ImageSize,
}

impl CameraView {
    /// The camera id.
    pub fn camera_id(&self) -> u32 {
        self.calibration.camera_id
    }
}

/// A rendered mask in its output encoding.
#[derive(Debug, Clone, PartialEq)]
pub enum EncodedMask {
    /// See [`MaskEncoding::Label`].
    Label(Image<u16>),
    /// See [`MaskEncoding::Binary`].
    Binary(Image<u8>),
}

impl EncodedMask {
    /// Size of the mask.
    pub fn size(&self) -> ImageSize {
        match self {
            EncodedMask::Label(image) => image.size(),
            EncodedMask::Binary(image) => image.size(),
        }
    }
}

/// The mask of one (frame, camera) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameMask {
    /// Frame index.
    pub frame: usize,
    /// Camera id.
    pub camera_id: u32,
    /// The encoded mask.
    pub mask: EncodedMask,
    /// Objects, dynamic or static, covering at least one pixel; ascending.
    pub visible: Vec<ObjectId>,
    /// Number of pixels labeled with a dynamic object.
    pub dynamic_pixels: usize,
}

/// Everything a rendering pass reads.
#[derive(Debug, Clone, Copy)]
pub struct RenderInput<'a> {
    /// All trajectories; only dynamic ones are drawn.
    pub trajectories: &'a [Trajectory],
    /// `world_from_ego` per frame.
    pub ego_poses: &'a BTreeMap<usize, Pose>,
    /// Cameras that could be calibrated, keyed by id.
    pub views: &'a BTreeMap<u32, CameraView>,
    /// Cameras requested by the configuration.
    pub camera_ids: &'a [u32],
    /// Frames to render.
    pub frames: &'a [usize],
}

/// Summary of a rendering pass.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RenderOutput {
    /// Number of masks handed to the sink successfully.
    pub num_masks: usize,
    /// Visible object ids per frame and camera.
    pub visibility: BTreeMap<usize, BTreeMap<u32, Vec<ObjectId>>>,
    /// Units that produced no mask.
    pub issues: Vec<RenderIssue>,
}

/// Renders dynamic object masks for every (frame, camera) pair.
pub struct MaskRenderer {
    config: MaskRendererConfig,
}

impl MaskRenderer {
    /// Create a renderer from its configuration.
    pub fn new(config: MaskRendererConfig) -> Self {
        Self { config }
    }

    /// The renderer configuration.
    pub fn config(&self) -> &MaskRendererConfig {
        &self.config
    }

    /// Render the mask of one frame seen by one camera.
    ///
    /// Every trajectory with a visible sample at `frame` is projected. Dynamic
    /// ones are drawn through a per-pixel depth buffer: each pixel keeps the
    /// object whose surface is hit first by the viewing ray through the pixel
    /// center, and equal depths go to the smaller object id. Boxes entirely
    /// behind the camera or outside the image are skipped.
    ///
    /// # Errors
    ///
    /// [`MaskError::LabelOverflow`] when a drawn id does not fit the label
    /// encoding, [`MaskError::ReservedLabel`] when it collides with the
    /// background value.
    pub fn render_frame(
        &self,
        trajectories: &[Trajectory],
        frame: usize,
        ego_pose: &Pose,
        view: &CameraView,
    ) -> Result<FrameMask, MaskError> {
        let size = view.image_size;
        let intrinsic = &view.calibration.intrinsic;
        let mut labels = Image::from_size_val(size, 0u32);
        // infinite depth marks a background pixel
        let mut depths = Image::from_size_val(size, f64::INFINITY);
        let mut visible = Vec::new();

        for trajectory in trajectories {
            let Some(world_box) = trajectory.visible_box_at(frame) else {
                continue;
            };

            let projected = match project_box3d(
                &world_box,
                ego_pose,
                &view.calibration.extrinsic,
                intrinsic,
            ) {
                Ok(projected) => projected,
                Err(GeometryError::NonPositiveDepth(_)) => continue,
                Err(e) => return Err(e.into()),
            };
            if !projected.overlaps_image(size.width, size.height) {
                continue;
            }

            let spans = convex_polygon_spans(&projected.hull, size);
            if spans.is_empty() {
                continue;
            }
            visible.push(trajectory.object_id);
            if !trajectory.is_dynamic() {
                continue;
            }

            let label = trajectory.object_id.0;
            for span in spans {
                let row = span.y * size.width;
                let v = span.y as f64 + 0.5;
                for x in span.x_start..=span.x_end {
                    let idx = row + x;
                    let depth = projected.surface_depth(intrinsic, x as f64 + 0.5, v);
                    let current = depths.as_slice()[idx];
                    let nearer = depth < current
                        || (depth == current && label < labels.as_slice()[idx]);
                    if nearer {
                        depths.as_slice_mut()[idx] = depth;
                        labels.as_slice_mut()[idx] = label;
                    }
                }
            }
        }

        visible.sort_unstable();
        let occupied = depths.map(|d| d.is_finite());
        let dynamic_pixels = occupied.as_slice().iter().filter(|&&o| o).count();
        let mask = self.encode(&labels, &occupied)?;

        Ok(FrameMask {
            frame,
            camera_id: view.camera_id(),
            mask,
            visible,
            dynamic_pixels,
        })
    }

    fn encode(&self, labels: &Image<u32>, occupied: &Image<bool>) -> Result<EncodedMask, MaskError> {
        match self.config.encoding {
            MaskEncoding::Label => {
                let background_label = labels
                    .as_slice()
                    .iter()
                    .zip(occupied.as_slice())
                    .any(|(&l, &o)| o && l == 0);
                if background_label {
                    return Err(MaskError::ReservedLabel(ObjectId(0)));
                }
                match labels.cast::<u16>() {
                    Ok(image) => Ok(EncodedMask::Label(image)),
                    Err(_) => {
                        let max = labels.as_slice().iter().copied().max().unwrap_or_default();
                        Err(MaskError::LabelOverflow(ObjectId(max)))
                    }
                }
            }
            MaskEncoding::Binary => Ok(EncodedMask::Binary(
                occupied.map(|&o| if o { 255u8 } else { 0 }),
            )),
        }
    }

    /// Render every requested (frame, camera) pair in parallel and hand each
    /// mask to `sink`.
    ///
    /// Failures are collected per unit: a camera without a view is reported
    /// once as [`MaskError::MissingCalibration`] and the other cameras still
    /// render; a frame without ego pose is reported per camera as
    /// [`MaskError::MissingEgoPose`]. A failed unit writes no mask.
    pub fn render<F>(&self, input: &RenderInput, sink: F) -> RenderOutput
    where
        F: Fn(&FrameMask) -> Result<(), MaskError> + Sync,
    {
        let mut output = RenderOutput::default();

        let mut views = Vec::with_capacity(input.camera_ids.len());
        for camera_id in input.camera_ids {
            match input.views.get(camera_id) {
                Some(view) => views.push(view),
                None => {
                    let issue = RenderIssue {
                        frame: None,
                        camera_id: *camera_id,
                        reason: MaskError::MissingCalibration(*camera_id).to_string(),
                    };
                    log::warn!("{issue}");
                    output.issues.push(issue);
                }
            }
        }

        let units = input
            .frames
            .iter()
            .flat_map(|&frame| views.iter().map(move |&view| (frame, view)))
            .collect::<Vec<_>>();
        log::info!(
            "rendering {} masks ({} frames x {} cameras)",
            units.len(),
            input.frames.len(),
            views.len()
        );

        let results = units
            .par_iter()
            .map(|&(frame, view)| {
                let result = input
                    .ego_poses
                    .get(&frame)
                    .ok_or(MaskError::MissingEgoPose(frame))
                    .and_then(|ego_pose| {
                        self.render_frame(input.trajectories, frame, ego_pose, view)
                    })
                    .and_then(|mask| {
                        sink(&mask)?;
                        log::debug!(
                            "frame {frame} camera {}: {} dynamic pixels",
                            mask.camera_id,
                            mask.dynamic_pixels
                        );
                        Ok(mask.visible)
                    });
                (frame, view.camera_id(), result)
            })
            .collect::<Vec<_>>();

        for (frame, camera_id, result) in results {
            match result {
                Ok(visible) => {
                    output.num_masks += 1;
                    output
                        .visibility
                        .entry(frame)
                        .or_default()
                        .insert(camera_id, visible);
                }
                Err(e) => {
                    let issue = RenderIssue {
                        frame: Some(frame),
                        camera_id,
                        reason: e.to_string(),
                    };
                    log::warn!("{issue}");
                    output.issues.push(issue);
                }
            }
        }

        log::info!(
            "rendered {} masks, {} failures",
            output.num_masks,
            output.issues.len()
        );
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dynmask_geometry::{BoxSize, PinholeIntrinsic};
    use dynmask_track::{MotionClass, ObjectClass, TrajectorySample};
    use std::sync::Mutex;

    // camera at 1.5m height looking along ego +x, 100x100 image
    fn front_view(camera_id: u32) -> CameraView {
        let extrinsic = Pose::from_matrix([
            [0.0, 0.0, 1.0, 0.0],
            [-1.0, 0.0, 0.0, 0.0],
            [0.0, -1.0, 0.0, 1.5],
            [0.0, 0.0, 0.0, 1.0],
        ])
        .unwrap();
        CameraView {
            calibration: CameraCalibration {
                camera_id,
                position: "front".to_string(),
                intrinsic: PinholeIntrinsic::new(100.0, 100.0, 50.0, 50.0).unwrap(),
                extrinsic,
            },
            image_size: [100, 100].into(),
        }
    }

    fn trajectory(id: u32, motion: MotionClass, frames: &[usize], center: [f64; 3]) -> Trajectory {
        let cube = BoxSize {
            length: 1.0,
            width: 1.0,
            height: 1.0,
        };
        sized_trajectory(id, motion, frames, center, cube)
    }

    fn sized_trajectory(
        id: u32,
        motion: MotionClass,
        frames: &[usize],
        center: [f64; 3],
        size: BoxSize,
    ) -> Trajectory {
        Trajectory {
            object_id: ObjectId(id),
            class: ObjectClass::Vehicle,
            motion,
            size,
            max_displacement: 0.0,
            path_length: 0.0,
            symmetric: true,
            deformable: false,
            samples: frames
                .iter()
                .map(|&frame| TrajectorySample {
                    frame,
                    timestamp: frame as f64 * 0.1,
                    pose_world: Pose::from_yaw_translation(0.0, center),
                    pose_ego: None,
                    size,
                    yaw: 0.0,
                    visible: true,
                    speed: 0.0,
                })
                .collect(),
        }
    }

    fn label_at(mask: &FrameMask, x: usize, y: usize) -> u16 {
        match &mask.mask {
            EncodedMask::Label(image) => *image.get(x, y).unwrap(),
            EncodedMask::Binary(_) => panic!("expected a label mask"),
        }
    }

    #[test]
    fn test_nearer_object_wins() -> Result<(), MaskError> {
        let renderer = MaskRenderer::new(MaskRendererConfig::default());
        let view = front_view(0);

        // the far object has the smaller id, so id order alone would pick it
        let far = trajectory(1, MotionClass::Dynamic, &[0], [10.0, 0.0, 1.5]);
        let near = trajectory(2, MotionClass::Dynamic, &[0], [5.0, 0.0, 1.5]);
        for trajectories in [vec![far.clone(), near.clone()], vec![near, far]] {
            let mask = renderer.render_frame(&trajectories, 0, &Pose::identity(), &view)?;
            assert_eq!(label_at(&mask, 50, 50), 2);
            assert_eq!(label_at(&mask, 0, 0), 0);
            assert_eq!(mask.visible, vec![ObjectId(1), ObjectId(2)]);
        }
        Ok(())
    }

    #[test]
    fn test_clipped_box_does_not_cover_nearer_object() -> Result<(), MaskError> {
        let renderer = MaskRenderer::new(MaskRendererConfig::default());
        let view = front_view(0);

        // a truck alongside the camera: its center is behind the image plane,
        // its right side is 2.5m away and more
        let truck = sized_trajectory(
            1,
            MotionClass::Dynamic,
            &[0],
            [-1.0, 2.0, 1.5],
            BoxSize {
                length: 10.0,
                width: 2.0,
                height: 2.0,
            },
        );
        // a pedestrian in front of the truck, near face at 2m
        let pedestrian = sized_trajectory(
            2,
            MotionClass::Dynamic,
            &[0],
            [2.5, 1.0, 1.5],
            BoxSize {
                length: 1.0,
                width: 0.6,
                height: 1.0,
            },
        );

        for trajectories in [
            vec![truck.clone(), pedestrian.clone()],
            vec![pedestrian, truck],
        ] {
            let mask = renderer.render_frame(&trajectories, 0, &Pose::identity(), &view)?;
            assert_eq!(mask.visible, vec![ObjectId(1), ObjectId(2)]);
            // both boxes cover these pixels, the pedestrian is hit first
            assert_eq!(label_at(&mask, 10, 50), 2);
            assert_eq!(label_at(&mask, 20, 50), 2);
            // below the pedestrian only the truck is seen
            assert_eq!(label_at(&mask, 10, 80), 1);
            assert_eq!(label_at(&mask, 60, 50), 0);
        }
        Ok(())
    }

    #[test]
    fn test_object_id_zero() -> Result<(), MaskError> {
        let object = [trajectory(0, MotionClass::Dynamic, &[0], [10.0, 0.0, 1.5])];
        let view = front_view(0);

        // indistinguishable from background in a label mask
        let renderer = MaskRenderer::new(MaskRendererConfig::default());
        assert!(matches!(
            renderer.render_frame(&object, 0, &Pose::identity(), &view),
            Err(MaskError::ReservedLabel(ObjectId(0)))
        ));

        let renderer = MaskRenderer::new(MaskRendererConfig {
            encoding: MaskEncoding::Binary,
            ..Default::default()
        });
        let mask = renderer.render_frame(&object, 0, &Pose::identity(), &view)?;
        assert!(mask.dynamic_pixels > 0);
        assert_eq!(mask.visible, vec![ObjectId(0)]);
        let EncodedMask::Binary(image) = &mask.mask else {
            panic!("expected a binary mask");
        };
        assert_eq!(image.get(50, 50), Some(&255));
        Ok(())
    }

    #[test]
    fn test_equal_depth_goes_to_smaller_id() -> Result<(), MaskError> {
        let renderer = MaskRenderer::new(MaskRendererConfig::default());
        let a = trajectory(9, MotionClass::Dynamic, &[0], [10.0, 0.0, 1.5]);
        let b = trajectory(4, MotionClass::Dynamic, &[0], [10.0, 0.0, 1.5]);
        let mask = renderer.render_frame(&[a, b], 0, &Pose::identity(), &front_view(0))?;
        assert_eq!(label_at(&mask, 50, 50), 4);
        Ok(())
    }

    #[test]
    fn test_skips_static_behind_and_outside() -> Result<(), MaskError> {
        let renderer = MaskRenderer::new(MaskRendererConfig::default());
        let trajectories = [
            trajectory(3, MotionClass::Static, &[0], [10.0, 0.0, 1.5]),
            trajectory(5, MotionClass::Dynamic, &[0], [-10.0, 0.0, 1.5]),
            trajectory(6, MotionClass::Dynamic, &[0], [10.0, 50.0, 1.5]),
            trajectory(7, MotionClass::Dynamic, &[1], [10.0, 0.0, 1.5]),
        ];
        let mask = renderer.render_frame(&trajectories, 0, &Pose::identity(), &front_view(0))?;
        assert_eq!(mask.dynamic_pixels, 0);
        // the static object is visible but not drawn
        assert_eq!(mask.visible, vec![ObjectId(3)]);
        Ok(())
    }

    #[test]
    fn test_ego_pose_moves_the_footprint() -> Result<(), MaskError> {
        let renderer = MaskRenderer::new(MaskRendererConfig::default());
        let object = [trajectory(8, MotionClass::Dynamic, &[0], [10.0, 0.0, 1.5])];

        // ego drove past the object
        let ego_pose = Pose::from_yaw_translation(0.0, [20.0, 0.0, 0.0]);
        let mask = renderer.render_frame(&object, 0, &ego_pose, &front_view(0))?;
        assert_eq!(mask.dynamic_pixels, 0);

        let ego_pose = Pose::from_yaw_translation(0.0, [5.0, 0.0, 0.0]);
        let mask = renderer.render_frame(&object, 0, &ego_pose, &front_view(0))?;
        assert_eq!(label_at(&mask, 50, 50), 8);
        Ok(())
    }

    #[test]
    fn test_label_overflow_and_binary_encoding() -> Result<(), MaskError> {
        let object = [trajectory(70_000, MotionClass::Dynamic, &[0], [10.0, 0.0, 1.5])];
        let view = front_view(0);

        let renderer = MaskRenderer::new(MaskRendererConfig::default());
        assert!(matches!(
            renderer.render_frame(&object, 0, &Pose::identity(), &view),
            Err(MaskError::LabelOverflow(ObjectId(70_000)))
        ));

        let renderer = MaskRenderer::new(MaskRendererConfig {
            encoding: MaskEncoding::Binary,
            ..Default::default()
        });
        let mask = renderer.render_frame(&object, 0, &Pose::identity(), &view)?;
        let EncodedMask::Binary(image) = &mask.mask else {
            panic!("expected a binary mask");
        };
        assert_eq!(image.get(50, 50), Some(&255));
        assert_eq!(image.get(0, 0), Some(&0));
        Ok(())
    }

    #[test]
    fn test_render_reports_per_unit_failures() {
        let renderer = MaskRenderer::new(MaskRendererConfig::default());
        let trajectories = [trajectory(17, MotionClass::Dynamic, &[0, 2], [10.0, 0.0, 1.5])];
        let ego_poses = BTreeMap::from([(0, Pose::identity()), (2, Pose::identity())]);
        let views = BTreeMap::from([(0, front_view(0))]);
        let written = Mutex::new(Vec::new());

        let output = renderer.render(
            &RenderInput {
                trajectories: &trajectories,
                ego_poses: &ego_poses,
                views: &views,
                camera_ids: &[0, 1],
                frames: &[0, 1, 2],
            },
            |mask| {
                written.lock().unwrap().push((mask.frame, mask.camera_id));
                Ok(())
            },
        );

        let mut written = written.into_inner().unwrap();
        written.sort_unstable();
        assert_eq!(written, vec![(0, 0), (2, 0)]);
        assert_eq!(output.num_masks, 2);
        assert_eq!(output.visibility[&0][&0], vec![ObjectId(17)]);
        assert_eq!(output.visibility[&2][&0], vec![ObjectId(17)]);

        assert_eq!(output.issues.len(), 2);
        assert_eq!(output.issues[0].frame, None);
        assert_eq!(output.issues[0].camera_id, 1);
        assert_eq!(output.issues[1].frame, Some(1));
        assert_eq!(output.issues[1].camera_id, 0);
    }

    #[test]
    fn test_sink_failure_is_reported() {
        let renderer = MaskRenderer::new(MaskRendererConfig::default());
        let ego_poses = BTreeMap::from([(0, Pose::identity())]);
        let views = BTreeMap::from([(3, front_view(3))]);
        let output = renderer.render(
            &RenderInput {
                trajectories: &[],
                ego_poses: &ego_poses,
                views: &views,
                camera_ids: &[3],
                frames: &[0],
            },
            |_| Err(MaskError::MissingCalibration(3)),
        );
        assert_eq!(output.num_masks, 0);
        assert_eq!(output.issues.len(), 1);
    }
}
