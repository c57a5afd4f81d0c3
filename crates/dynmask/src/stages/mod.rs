mod mask;
mod track;

pub use mask::{MaskInput, MaskStage};
pub use track::{TrackInput, TrackStage};

/// File name of a stage report, written next to the stage outputs.
pub const REPORTS_JSON: &str = "reports.json";
