use std::{fs, io::BufWriter, path::Path, path::PathBuf};

use dynmask_io::objects::RecordIssue;
use dynmask_mask::RenderIssue;
use dynmask_track::{ObjectId, TrackIssue};

use crate::error::PipelineError;

/// The unit a failure is attributed to.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Unit {
    /// A record of an object file; `record` is `None` for the whole file.
    Record {
        /// Frame of the file.
        frame: usize,
        /// The file.
        file: PathBuf,
        /// Index of the record in the file.
        record: Option<usize>,
    },
    /// A whole frame.
    Frame {
        /// Frame index.
        frame: usize,
    },
    /// One object, optionally at one frame.
    Object {
        /// Object id.
        object_id: ObjectId,
        /// Frame index.
        frame: Option<usize>,
    },
    /// A whole camera.
    Camera {
        /// Camera id.
        camera_id: u32,
    },
    /// One frame seen by one camera.
    FrameCamera {
        /// Frame index.
        frame: usize,
        /// Camera id.
        camera_id: u32,
    },
}

/// A failure attributed to one unit of work.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct UnitIssue {
    /// Where it happened.
    pub unit: Unit,
    /// What happened.
    pub reason: String,
}

impl From<RecordIssue> for UnitIssue {
    fn from(issue: RecordIssue) -> Self {
        UnitIssue {
            unit: Unit::Record {
                frame: issue.frame,
                file: issue.file,
                record: issue.record,
            },
            reason: issue.reason,
        }
    }
}

impl From<TrackIssue> for UnitIssue {
    fn from(issue: TrackIssue) -> Self {
        UnitIssue {
            unit: Unit::Object {
                object_id: issue.object_id,
                frame: issue.frame,
            },
            reason: issue.reason.to_string(),
        }
    }
}

impl From<RenderIssue> for UnitIssue {
    fn from(issue: RenderIssue) -> Self {
        let unit = match issue.frame {
            Some(frame) => Unit::FrameCamera {
                frame,
                camera_id: issue.camera_id,
            },
            None => Unit::Camera {
                camera_id: issue.camera_id,
            },
        };
        UnitIssue {
            unit,
            reason: issue.reason,
        }
    }
}

/// What a stage did.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StageReport {
    /// Stage name.
    pub stage: String,
    /// Units that completed.
    pub completed: usize,
    /// Units that failed.
    pub issues: Vec<UnitIssue>,
}

impl StageReport {
    /// An empty report for `stage`.
    pub fn new(stage: &str) -> Self {
        Self {
            stage: stage.to_string(),
            completed: 0,
            issues: Vec::new(),
        }
    }

    /// Add issues of any reportable kind.
    pub fn extend<I, T>(&mut self, issues: I)
    where
        I: IntoIterator<Item = T>,
        T: Into<UnitIssue>,
    {
        self.issues.extend(issues.into_iter().map(Into::into));
    }

    /// Write the report as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), PipelineError> {
        let writer = BufWriter::new(fs::File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }
}

/// The product of a stage together with its report.
#[derive(Debug)]
pub struct StageOutput<T> {
    /// The stage product.
    pub output: T,
    /// Per-unit report.
    pub report: StageReport,
}

/// A processing stage: consumes normalized inputs, produces outputs and
/// reports per-unit failures.
///
/// Stages own their configuration and hold no state shared with other stages.
pub trait Stage {
    /// What the stage consumes.
    type Input;
    /// What the stage produces.
    type Output;

    /// Stage name, as used on the command line and in reports.
    fn name(&self) -> &'static str;

    /// Run the stage.
    ///
    /// Only failures that invalidate the whole stage are returned as errors.
    fn run(&self, input: Self::Input) -> Result<StageOutput<Self::Output>, PipelineError>;
}
