use std::{
    collections::{BTreeMap, BTreeSet},
    fs,
    path::{Path, PathBuf},
};

use dynmask_image::ImageSize;
use dynmask_io::DatasetLayout;
use dynmask_mask::MaskRendererConfig;
use dynmask_track::TrackBuilderConfig;

/// An error type for configuration loading and validation.
///
/// Any of these aborts the whole run.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// Error reading the configuration file.
    #[error("Failed to read the configuration. {0}")]
    FileError(#[from] std::io::Error),

    /// The file is not valid YAML or does not match the expected shape.
    #[error("Failed to parse the configuration. {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// No camera position is configured.
    #[error("camera.positions is empty")]
    EmptyPositions,

    /// A camera position is listed twice.
    #[error("camera position {0:?} is listed more than once")]
    DuplicatePosition(String),

    /// A camera position has no id.
    #[error("camera position {0:?} is missing from camera.id_map")]
    UnmappedPosition(String),

    /// Two positions share a camera id.
    #[error("camera id {id} is shared by {first:?} and {second:?}")]
    DuplicateCameraId {
        /// The shared id.
        id: u32,
        /// First position mapped to the id.
        first: String,
        /// Second position mapped to the id.
        second: String,
    },

    /// The dynamic threshold is not a positive distance.
    #[error("track.dynamic_threshold must be finite and positive, got {0}")]
    InvalidThreshold(f64),

    /// An image size has a zero dimension or names an unknown position.
    #[error("invalid image size for {0}")]
    InvalidImageSize(String),
}

fn enabled() -> bool {
    true
}

/// Which stages run.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StagesConfig {
    /// Build and persist trajectories.
    #[serde(default = "enabled")]
    pub track: bool,
    /// Render dynamic masks.
    #[serde(default = "enabled")]
    pub dynamic_mask: bool,
}

impl Default for StagesConfig {
    fn default() -> Self {
        Self {
            track: true,
            dynamic_mask: true,
        }
    }
}

/// The camera rig.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CameraConfig {
    /// Camera-position names to process, in order.
    pub positions: Vec<String>,
    /// Camera-position name -> camera id; must be injective.
    pub id_map: BTreeMap<String, u32>,
    /// Image size `[width, height]` per camera position, when known.
    #[serde(default)]
    pub image_size: BTreeMap<String, [usize; 2]>,
}

/// The run configuration, passed explicitly to every stage.
///
/// # Example
///
/// ```
/// use dynmask::Config;
///
/// let config = Config::from_yaml_str(
///     r#"
/// input: /data/raw
/// output: /data/out
/// camera:
///   positions: [front_wide, left]
///   id_map: { front_wide: 0, left: 1 }
/// "#,
/// )
/// .unwrap();
/// assert_eq!(config.cameras(), vec![("front_wide".to_string(), 0), ("left".to_string(), 1)]);
/// assert!(config.stages.track && config.stages.dynamic_mask);
/// ```
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Config {
    /// Root holding the per-frame object files.
    pub input: PathBuf,
    /// Root holding the converted dataset; receives all outputs.
    pub output: PathBuf,
    /// Enabled stages.
    #[serde(default)]
    pub stages: StagesConfig,
    /// The camera rig.
    pub camera: CameraConfig,
    /// Trajectory builder settings.
    #[serde(default)]
    pub track: TrackBuilderConfig,
    /// Mask renderer settings.
    #[serde(default)]
    pub mask: MaskRendererConfig,
}

impl Config {
    /// Parse and validate a YAML document.
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_yaml_str(&fs::read_to_string(path)?)
    }

    /// Check the invariants the stages rely on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.camera.positions.is_empty() {
            return Err(ConfigError::EmptyPositions);
        }

        let mut seen = BTreeSet::new();
        for position in self.camera.positions.iter() {
            if !seen.insert(position) {
                return Err(ConfigError::DuplicatePosition(position.clone()));
            }
            if !self.camera.id_map.contains_key(position) {
                return Err(ConfigError::UnmappedPosition(position.clone()));
            }
        }

        let mut owners: BTreeMap<u32, &String> = BTreeMap::new();
        for (position, id) in self.camera.id_map.iter() {
            if let Some(first) = owners.insert(*id, position) {
                return Err(ConfigError::DuplicateCameraId {
                    id: *id,
                    first: first.clone(),
                    second: position.clone(),
                });
            }
        }

        let threshold = self.track.dynamic_threshold;
        if !threshold.is_finite() || threshold <= 0.0 {
            return Err(ConfigError::InvalidThreshold(threshold));
        }

        for (position, [w, h]) in self.camera.image_size.iter() {
            if *w == 0 || *h == 0 || !self.camera.id_map.contains_key(position) {
                return Err(ConfigError::InvalidImageSize(position.clone()));
            }
        }
        let [w, h] = self.mask.default_image_size;
        if w == 0 || h == 0 {
            return Err(ConfigError::InvalidImageSize("mask.default_image_size".into()));
        }

        Ok(())
    }

    /// The dataset paths.
    pub fn layout(&self) -> DatasetLayout {
        DatasetLayout::new(&self.input, &self.output)
    }

    /// `(position, camera id)` of every configured position, in order.
    ///
    /// PRECONDITION: the configuration is validated.
    pub fn cameras(&self) -> Vec<(String, u32)> {
        self.camera
            .positions
            .iter()
            .filter_map(|p| self.camera.id_map.get(p).map(|id| (p.clone(), *id)))
            .collect()
    }

    /// The configured image size of a camera position.
    pub fn image_size(&self, position: &str) -> Option<ImageSize> {
        self.camera.image_size.get(position).map(|s| (*s).into())
    }
}
