use std::{
    collections::BTreeMap,
    fs,
    io::{BufReader, BufWriter},
    path::Path,
};

use crate::{detection::ObjectId, error::TrackError, trajectory::Trajectory};

/// File name of the binary trajectory form.
pub const TRAJECTORY_BIN: &str = "trajectory.bin";

/// File name of the structured trajectory form.
pub const TRAJECTORY_JSON: &str = "trajectory.json";

/// File name of the object id -> index map.
pub const TRACK_IDS_JSON: &str = "track_ids.json";

/// Encode trajectories in the compact binary form.
pub fn encode_trajectories(trajectories: &[Trajectory]) -> Result<Vec<u8>, TrackError> {
    Ok(bincode::encode_to_vec(
        trajectories,
        bincode::config::standard(),
    )?)
}

/// Decode trajectories from the compact binary form.
///
/// Poses are re-validated while decoding.
pub fn decode_trajectories(bytes: &[u8]) -> Result<Vec<Trajectory>, TrackError> {
    let (trajectories, _len): (Vec<Trajectory>, usize) =
        bincode::decode_from_slice(bytes, bincode::config::standard())?;
    Ok(trajectories)
}

/// Write the binary form to `path`.
pub fn write_trajectories_bin(
    path: impl AsRef<Path>,
    trajectories: &[Trajectory],
) -> Result<(), TrackError> {
    fs::write(path, encode_trajectories(trajectories)?)?;
    Ok(())
}

/// Read the binary form from `path`.
pub fn read_trajectories_bin(path: impl AsRef<Path>) -> Result<Vec<Trajectory>, TrackError> {
    decode_trajectories(&fs::read(path)?)
}

/// Write the structured (JSON) form to `path`.
pub fn write_trajectories_json(
    path: impl AsRef<Path>,
    trajectories: &[Trajectory],
) -> Result<(), TrackError> {
    let writer = BufWriter::new(fs::File::create(path)?);
    serde_json::to_writer_pretty(writer, trajectories)?;
    Ok(())
}

/// Read the structured (JSON) form from `path`.
pub fn read_trajectories_json(path: impl AsRef<Path>) -> Result<Vec<Trajectory>, TrackError> {
    let reader = BufReader::new(fs::File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

/// Persist trajectories in both forms plus the object index under `dir`.
pub fn save_track_outputs(
    dir: impl AsRef<Path>,
    trajectories: &[Trajectory],
    object_index: &BTreeMap<ObjectId, usize>,
) -> Result<(), TrackError> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;
    write_trajectories_bin(dir.join(TRAJECTORY_BIN), trajectories)?;
    write_trajectories_json(dir.join(TRAJECTORY_JSON), trajectories)?;

    let writer = BufWriter::new(fs::File::create(dir.join(TRACK_IDS_JSON))?);
    serde_json::to_writer_pretty(writer, object_index)?;
    Ok(())
}

/// Load trajectories from `dir`, preferring the binary form.
pub fn load_trajectories(dir: impl AsRef<Path>) -> Result<Vec<Trajectory>, TrackError> {
    let dir = dir.as_ref();
    let bin = dir.join(TRAJECTORY_BIN);
    if bin.exists() {
        read_trajectories_bin(bin)
    } else {
        read_trajectories_json(dir.join(TRAJECTORY_JSON))
    }
}
