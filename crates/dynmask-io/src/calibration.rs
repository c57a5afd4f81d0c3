use dynmask_geometry::{CameraCalibration, PinholeIntrinsic, Pose};

use crate::{
    error::IoError,
    layout::DatasetLayout,
    matrix::{read_matrix4, read_values},
};

/// Read the pinhole intrinsics of `camera_id`.
///
/// The file holds one value per line: `fx, fy, cx, cy` followed by optional
/// distortion coefficients, which are ignored.
pub fn read_intrinsic(layout: &DatasetLayout, camera_id: u32) -> Result<PinholeIntrinsic, IoError> {
    let path = layout.intrinsics_path(camera_id);
    let values = read_values(&path)?;
    if values.len() < 4 {
        return Err(IoError::ParseError(
            path,
            format!("expected at least 4 intrinsic values, got {}", values.len()),
        ));
    }
    Ok(PinholeIntrinsic::new(
        values[0], values[1], values[2], values[3],
    )?)
}

/// Read the `ego_from_camera` extrinsic of `camera_id`.
pub fn read_extrinsic(layout: &DatasetLayout, camera_id: u32) -> Result<Pose, IoError> {
    Ok(Pose::from_matrix(read_matrix4(
        layout.extrinsics_path(camera_id),
    )?)?)
}

/// Load the full calibration of one camera position.
pub fn load_calibration(
    layout: &DatasetLayout,
    position: &str,
    camera_id: u32,
) -> Result<CameraCalibration, IoError> {
    Ok(CameraCalibration {
        camera_id,
        position: position.to_string(),
        intrinsic: read_intrinsic(layout, camera_id)?,
        extrinsic: read_extrinsic(layout, camera_id)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::write_matrix4;
    use std::fs;

    #[test]
    fn test_load_calibration() -> Result<(), IoError> {
        let tmp_dir = tempfile::tempdir()?;
        let layout = DatasetLayout::new(tmp_dir.path(), tmp_dir.path());
        fs::create_dir_all(tmp_dir.path().join("intrinsics"))?;
        fs::create_dir_all(tmp_dir.path().join("extrinsics"))?;

        fs::write(
            layout.intrinsics_path(1),
            "1000.0\n1001.0\n960.0\n540.0\n0.01\n-0.002\n0.0\n",
        )?;
        let extrinsic = Pose::from_yaw_translation(0.5, [1.5, 0.0, 1.8]);
        write_matrix4(layout.extrinsics_path(1), &extrinsic.matrix())?;

        let calib = load_calibration(&layout, "front_left", 1)?;
        assert_eq!(calib.camera_id, 1);
        assert_eq!(calib.position, "front_left");
        assert_eq!(calib.intrinsic, PinholeIntrinsic::new(1000.0, 1001.0, 960.0, 540.0)?);
        assert!(calib.extrinsic.approx_eq(&extrinsic, 1e-12));
        Ok(())
    }

    #[test]
    fn test_missing_or_short_intrinsics() -> Result<(), IoError> {
        let tmp_dir = tempfile::tempdir()?;
        let layout = DatasetLayout::new(tmp_dir.path(), tmp_dir.path());
        assert!(matches!(
            read_intrinsic(&layout, 0),
            Err(IoError::FileDoesNotExist(_))
        ));

        fs::create_dir_all(tmp_dir.path().join("intrinsics"))?;
        fs::write(layout.intrinsics_path(0), "1000.0\n1000.0\n")?;
        assert!(matches!(
            read_intrinsic(&layout, 0),
            Err(IoError::ParseError(..))
        ));
        Ok(())
    }
}
