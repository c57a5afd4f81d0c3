use std::{collections::BTreeMap, fs, path::Path};

use crate::{error::IoError, layout::frame_name};

/// Time step used when a sequence ships without timestamps, in seconds.
pub const DEFAULT_FRAME_STEP: f64 = 0.1;

#[derive(Debug, Default, serde::Serialize, serde::Deserialize)]
struct TimestampFile {
    #[serde(rename = "FRAME")]
    frame: BTreeMap<String, f64>,
}

/// Timestamps for frames `0..num_frames` at a fixed step from 0.
pub fn generate_timestamps(num_frames: usize, step: f64) -> BTreeMap<usize, f64> {
    (0..num_frames).map(|i| (i, i as f64 * step)).collect()
}

/// Read `{"FRAME": {"000000": t0, ...}}`.
pub fn read_timestamps(path: impl AsRef<Path>) -> Result<BTreeMap<usize, f64>, IoError> {
    let path = path.as_ref();
    let file: TimestampFile = serde_json::from_str(&fs::read_to_string(path)?)?;
    file.frame
        .into_iter()
        .map(|(name, t)| {
            name.parse::<usize>()
                .map(|frame| (frame, t))
                .map_err(|e| IoError::ParseError(path.to_path_buf(), format!("{name}: {e}")))
        })
        .collect()
}

/// Write timestamps in the `{"FRAME": {...}}` form.
pub fn write_timestamps(
    path: impl AsRef<Path>,
    timestamps: &BTreeMap<usize, f64>,
) -> Result<(), IoError> {
    let file = TimestampFile {
        frame: timestamps
            .iter()
            .map(|(frame, t)| (frame_name(*frame), *t))
            .collect(),
    };
    fs::write(path, serde_json::to_string_pretty(&file)?)?;
    Ok(())
}

/// Read the timestamps file if present, else generate them for `num_frames`.
pub fn load_timestamps(
    path: impl AsRef<Path>,
    num_frames: usize,
) -> Result<BTreeMap<usize, f64>, IoError> {
    let path = path.as_ref();
    if path.exists() {
        read_timestamps(path)
    } else {
        log::info!(
            "{} not found, using a {DEFAULT_FRAME_STEP} s step",
            path.display()
        );
        Ok(generate_timestamps(num_frames, DEFAULT_FRAME_STEP))
    }
}
