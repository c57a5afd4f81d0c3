use std::{fs, path::Path, path::PathBuf};

use dynmask_geometry::{BoundingBox3d, BoxSize};
use dynmask_track::{ObjectClass, ObjectDetection, ObjectId};

use crate::error::IoError;

// object ids come as integers or numeric strings depending on the converter
#[derive(Debug, serde::Deserialize)]
#[serde(untagged)]
enum RawTrackId {
    Number(u64),
    Text(String),
}

impl RawTrackId {
    fn to_object_id(&self) -> Result<ObjectId, String> {
        let id = match self {
            RawTrackId::Number(n) => *n,
            RawTrackId::Text(s) => s
                .trim()
                .parse::<u64>()
                .map_err(|_| format!("track id {s:?} is not numeric"))?,
        };
        match u32::try_from(id) {
            // 0 is the background value of the label masks
            Ok(0) => Err("track id 0 is reserved for background".to_string()),
            Ok(id) => Ok(ObjectId(id)),
            Err(_) => Err(format!("track id {id} does not fit 32 bits")),
        }
    }
}

fn default_visible() -> bool {
    true
}

/// One detection record of a per-frame object file.
#[derive(Debug, serde::Deserialize)]
struct ObjectRecord {
    track_id: RawTrackId,
    #[serde(default)]
    label: String,
    box3d_center: [f64; 3],
    box3d_size: [f64; 3],
    #[serde(default)]
    box3d_heading: f64,
    #[serde(default = "default_visible")]
    visible: bool,
}

impl ObjectRecord {
    fn into_detection(self, frame: usize) -> Result<ObjectDetection, String> {
        let [length, width, height] = self.box3d_size;
        Ok(ObjectDetection {
            object_id: self.track_id.to_object_id()?,
            frame,
            class: ObjectClass::from_label(&self.label),
            bbox: BoundingBox3d {
                center: self.box3d_center,
                size: BoxSize {
                    length,
                    width,
                    height,
                },
                yaw: self.box3d_heading,
            },
            visible: self.visible,
        })
    }
}

/// A record or file of the object directory that could not be used.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RecordIssue {
    /// Frame the file was assigned to.
    pub frame: usize,
    /// Offending file.
    pub file: PathBuf,
    /// Index of the record in the file, `None` when the whole file failed.
    pub record: Option<usize>,
    /// Human readable reason.
    pub reason: String,
}

/// Detections of a whole sequence.
#[derive(Debug, Default)]
pub struct ObjectFrames {
    /// Every usable detection, ordered by frame then by record.
    pub detections: Vec<ObjectDetection>,
    /// Number of frames, one per object file.
    pub num_frames: usize,
    /// Records and files that were skipped.
    pub issues: Vec<RecordIssue>,
}

impl ObjectFrames {
    /// Frame indices `0..num_frames`.
    pub fn frames(&self) -> std::ops::Range<usize> {
        0..self.num_frames
    }
}

/// Parse the records of one frame file.
///
/// Records that do not match the expected shape are returned as issues, the
/// remaining records are still used.
pub fn read_frame_objects(
    path: impl AsRef<Path>,
    frame: usize,
) -> Result<(Vec<ObjectDetection>, Vec<RecordIssue>), IoError> {
    let path = path.as_ref();
    let records: Vec<serde_json::Value> = serde_json::from_str(&fs::read_to_string(path)?)?;

    let mut detections = Vec::with_capacity(records.len());
    let mut issues = Vec::new();
    for (i, value) in records.into_iter().enumerate() {
        let parsed = serde_json::from_value::<ObjectRecord>(value)
            .map_err(|e| e.to_string())
            .and_then(|record| record.into_detection(frame));
        match parsed {
            Ok(detection) => detections.push(detection),
            Err(reason) => issues.push(RecordIssue {
                frame,
                file: path.to_path_buf(),
                record: Some(i),
                reason,
            }),
        }
    }
    Ok((detections, issues))
}

/// Read every `*.json` file of `dir`, sorted by name; the frame index of a
/// file is its position in that order.
///
/// A file that cannot be parsed still occupies its frame index and is
/// reported as an issue.
pub fn read_objects_dir(dir: impl AsRef<Path>) -> Result<ObjectFrames, IoError> {
    let dir = dir.as_ref();
    if !dir.exists() {
        return Err(IoError::FileDoesNotExist(dir.to_path_buf()));
    }

    let mut files = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect::<Vec<_>>();
    files.sort();

    let mut objects = ObjectFrames {
        num_frames: files.len(),
        ..Default::default()
    };
    for (frame, file) in files.iter().enumerate() {
        match read_frame_objects(file, frame) {
            Ok((detections, issues)) => {
                objects.detections.extend(detections);
                objects.issues.extend(issues);
            }
            Err(e) => {
                log::warn!("skipping object file {}: {e}", file.display());
                objects.issues.push(RecordIssue {
                    frame,
                    file: file.clone(),
                    record: None,
                    reason: e.to_string(),
                });
            }
        }
    }

    log::info!(
        "read {} detections from {} frames",
        objects.detections.len(),
        objects.num_frames
    );
    Ok(objects)
}
