use std::{fs, path::Path};

use dynmask::{
    io::{layout::frame_name, png::read_image_png_gray16},
    run_pipeline,
    track::{io::load_trajectories, MotionClass, ObjectId},
    Config, PipelineSummary, StageKind, Unit,
};
use tempfile::TempDir;

const NUM_FRAMES: usize = 11;

const IDENTITY: &str = "1 0 0 0\n0 1 0 0\n0 0 1 0\n0 0 0 1\n";

// camera 10m behind the ego origin looking along +x
const FRONT_EXTRINSIC: &str = "0 0 1 -10\n-1 0 0 0\n0 -1 0 0\n0 0 0 1\n";

fn object(track_id: u32, label: &str, x: f64) -> serde_json::Value {
    serde_json::json!({
        "track_id": track_id,
        "label": label,
        "box3d_center": [x, 0.0, 0.0],
        "box3d_size": [2.0, 2.0, 2.0],
        "box3d_heading": 0.0,
    })
}

struct Dataset {
    dir: TempDir,
}

impl Dataset {
    // object 17 at frames 0 and 10, 5m apart; object 22 at frame 3 only
    fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let raw = dir.path().join("raw");
        let out = dir.path().join("out");
        for sub in ["ego_pose", "intrinsics", "extrinsics"] {
            fs::create_dir_all(out.join(sub))?;
        }
        fs::create_dir_all(raw.join("objects"))?;

        for frame in 0..NUM_FRAMES {
            let objects = match frame {
                0 => vec![object(17, "TYPE_VEHICLE", 0.0)],
                3 => vec![object(22, "TYPE_VEHICLE", 0.0)],
                10 => vec![object(17, "TYPE_VEHICLE", 5.0)],
                _ => vec![],
            };
            fs::write(
                raw.join("objects").join(format!("{}.json", frame_name(frame))),
                serde_json::to_string(&objects)?,
            )?;
            fs::write(
                out.join("ego_pose").join(format!("{}.txt", frame_name(frame))),
                IDENTITY,
            )?;
        }

        fs::write(out.join("intrinsics/0.txt"), "100\n100\n50\n50\n0\n0\n0\n")?;
        fs::write(out.join("extrinsics/0.txt"), FRONT_EXTRINSIC)?;
        Ok(Self { dir })
    }

    fn root(&self) -> &Path {
        self.dir.path()
    }

    fn out(&self) -> std::path::PathBuf {
        self.root().join("out")
    }

    fn config(&self, positions: &str, id_map: &str) -> Result<Config, dynmask::ConfigError> {
        Config::from_yaml_str(&format!(
            "input: {}\noutput: {}\ncamera:\n  positions: {positions}\n  id_map: {id_map}\n  \
             image_size: {{ front: [100, 100] }}\n",
            self.root().join("raw").display(),
            self.out().display(),
        ))
    }

    fn front_config(&self) -> Result<Config, dynmask::ConfigError> {
        self.config("[front]", "{ front: 0 }")
    }

    fn label_at(&self, frame: usize, camera_id: u32, x: usize, y: usize) -> Option<u16> {
        let path = self
            .out()
            .join("dynamic_mask")
            .join(format!("{}_{camera_id}.png", frame_name(frame)));
        let image = read_image_png_gray16(path).ok()?;
        image.get(x, y).copied()
    }

    fn mask_contains(&self, frame: usize, camera_id: u32, label: u16) -> bool {
        let path = self
            .out()
            .join("dynamic_mask")
            .join(format!("{}_{camera_id}.png", frame_name(frame)));
        read_image_png_gray16(path)
            .map(|image| image.as_slice().contains(&label))
            .unwrap_or(false)
    }
}

fn issues_of<'a>(summary: &'a PipelineSummary, stage: &str) -> Vec<&'a Unit> {
    summary
        .reports
        .iter()
        .filter(|r| r.stage == stage)
        .flat_map(|r| r.issues.iter().map(|i| &i.unit))
        .collect()
}

#[test]
fn moving_object_is_masked_only_where_detected() -> Result<(), Box<dyn std::error::Error>> {
    let _ = env_logger::builder().is_test(true).try_init();
    let dataset = Dataset::new()?;
    let config = dataset.front_config()?;

    let summary = run_pipeline(&config, &StageKind::ALL)?;
    assert_eq!(summary.num_issues(), 0);

    let trajectories = load_trajectories(dataset.out().join("track"))?;
    assert_eq!(trajectories.len(), 2);
    let moving = &trajectories[0];
    assert_eq!(moving.object_id, ObjectId(17));
    assert_eq!(moving.motion, MotionClass::Dynamic);
    assert_eq!(moving.frames().collect::<Vec<_>>(), vec![0, 10]);

    // single observation, so no displacement can be measured
    let parked = &trajectories[1];
    assert_eq!(parked.object_id, ObjectId(22));
    assert_eq!(parked.motion, MotionClass::Static);

    // the box center projects onto the principal point
    assert_eq!(dataset.label_at(0, 0, 50, 50), Some(17));
    assert_eq!(dataset.label_at(10, 0, 50, 50), Some(17));
    assert_eq!(dataset.label_at(0, 0, 0, 0), Some(0));
    for frame in 1..10 {
        assert!(!dataset.mask_contains(frame, 0, 17), "frame {frame}");
        assert_eq!(dataset.label_at(frame, 0, 50, 50), Some(0));
    }
    for frame in 0..NUM_FRAMES {
        assert!(!dataset.mask_contains(frame, 0, 22), "frame {frame}");
    }

    // the static object is still listed as visible
    let visibility: serde_json::Value = serde_json::from_str(&fs::read_to_string(
        dataset.out().join("dynamic_mask/camera_visibility.json"),
    )?)?;
    assert_eq!(visibility["000003"]["0"], serde_json::json!([22]));
    assert_eq!(visibility["000010"]["0"], serde_json::json!([17]));
    assert_eq!(visibility["000005"]["0"], serde_json::json!([]));

    let track_ids: serde_json::Value = serde_json::from_str(&fs::read_to_string(
        dataset.out().join("track/track_ids.json"),
    )?)?;
    assert_eq!(track_ids, serde_json::json!({"17": 0, "22": 1}));
    Ok(())
}

#[test]
fn uncalibrated_camera_does_not_stop_the_others() -> Result<(), Box<dyn std::error::Error>> {
    let dataset = Dataset::new()?;
    let config = dataset.config("[front, left]", "{ front: 0, left: 1 }")?;

    let summary = run_pipeline(&config, &StageKind::ALL)?;
    assert_eq!(
        issues_of(&summary, "dynamic_mask"),
        vec![&Unit::Camera { camera_id: 1 }]
    );
    let mask_report = &summary.reports[1];
    assert_eq!(mask_report.completed, NUM_FRAMES);
    assert!(mask_report.issues[0].reason.contains("Missing calibration"));

    assert_eq!(dataset.label_at(0, 0, 50, 50), Some(17));
    assert!(!dataset.out().join("dynamic_mask/000000_1.png").exists());

    let report: serde_json::Value = serde_json::from_str(&fs::read_to_string(
        dataset.out().join("dynamic_mask/reports.json"),
    )?)?;
    assert_eq!(report["issues"][0]["unit"]["kind"], "camera");
    Ok(())
}

#[test]
fn broken_ego_pose_is_reported_per_unit() -> Result<(), Box<dyn std::error::Error>> {
    let dataset = Dataset::new()?;
    // non-orthonormal rotation
    fs::write(
        dataset.out().join("ego_pose/000010.txt"),
        "2 0 0 0\n0 1 0 0\n0 0 1 0\n0 0 0 1\n",
    )?;
    let config = dataset.front_config()?;

    let summary = run_pipeline(&config, &StageKind::ALL)?;
    let track_issues = issues_of(&summary, "track");
    assert!(track_issues.contains(&&Unit::Frame { frame: 10 }));
    assert!(track_issues.contains(&&Unit::Object {
        object_id: ObjectId(17),
        frame: Some(10),
    }));
    assert_eq!(
        issues_of(&summary, "dynamic_mask"),
        vec![&Unit::FrameCamera {
            frame: 10,
            camera_id: 0
        }]
    );

    // one valid frame left: static, so never drawn
    let trajectories = load_trajectories(dataset.out().join("track"))?;
    assert_eq!(trajectories[0].motion, MotionClass::Static);
    assert_eq!(dataset.label_at(0, 0, 50, 50), Some(0));
    assert!(!dataset.out().join("dynamic_mask/000010_0.png").exists());
    Ok(())
}

#[test]
fn mask_stage_alone_reads_persisted_trajectories() -> Result<(), Box<dyn std::error::Error>> {
    let dataset = Dataset::new()?;
    let config = dataset.front_config()?;

    let summary = run_pipeline(&config, &[StageKind::Track])?;
    assert_eq!(summary.reports.len(), 1);
    assert!(!dataset.out().join("dynamic_mask").exists());

    let summary = run_pipeline(&config, &[StageKind::DynamicMask])?;
    assert_eq!(summary.reports.len(), 1);
    assert_eq!(summary.reports[0].completed, NUM_FRAMES);
    assert_eq!(dataset.label_at(10, 0, 50, 50), Some(17));
    Ok(())
}

#[test]
fn invalid_camera_map_aborts_the_run() -> Result<(), Box<dyn std::error::Error>> {
    let dataset = Dataset::new()?;
    let mut config = dataset.front_config()?;
    config.camera.positions.push("left".to_string());
    config.camera.id_map.insert("left".to_string(), 0);

    assert!(matches!(
        run_pipeline(&config, &StageKind::ALL),
        Err(dynmask::PipelineError::ConfigError(
            dynmask::ConfigError::DuplicateCameraId { id: 0, .. }
        ))
    ));
    assert!(!dataset.out().join("track").exists());
    Ok(())
}
