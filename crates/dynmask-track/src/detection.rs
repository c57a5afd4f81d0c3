use dynmask_geometry::BoundingBox3d;

/// Stable identifier of a physical object across frames.
///
/// The id doubles as the pixel label in rendered masks, so `0` is reserved for
/// background by convention.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
    bincode::Encode,
    bincode::Decode,
)]
#[serde(transparent)]
pub struct ObjectId(pub u32);

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Coarse object category.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    serde::Serialize,
    serde::Deserialize,
    bincode::Encode,
    bincode::Decode,
)]
#[serde(rename_all = "lowercase")]
pub enum ObjectClass {
    /// Cars, trucks, buses.
    Vehicle,
    /// Pedestrians.
    Pedestrian,
    /// Bicycles and motorcycles with their riders.
    Cyclist,
    /// Traffic signs and lights.
    Sign,
    /// Anything that does not match a known category.
    #[default]
    Unknown,
}

// substring -> category, checked in order
const CATEGORY_KEYWORDS: [(&str, ObjectClass); 6] = [
    ("vehicle", ObjectClass::Vehicle),
    ("pedestrian", ObjectClass::Pedestrian),
    ("bicycle", ObjectClass::Cyclist),
    ("motorcycle", ObjectClass::Cyclist),
    ("sign", ObjectClass::Sign),
    ("traffic", ObjectClass::Sign),
];

impl ObjectClass {
    /// Map a free-form detector label onto a category by case-insensitive substring.
    ///
    /// # Examples
    ///
    /// ```
    /// use dynmask_track::ObjectClass;
    ///
    /// assert_eq!(ObjectClass::from_label("TYPE_VEHICLE"), ObjectClass::Vehicle);
    /// assert_eq!(ObjectClass::from_label("motorcycle_rider"), ObjectClass::Cyclist);
    /// assert_eq!(ObjectClass::from_label("cone"), ObjectClass::Unknown);
    /// ```
    pub fn from_label(label: &str) -> Self {
        let label = label.to_lowercase();
        CATEGORY_KEYWORDS
            .iter()
            .find(|(key, _)| label.contains(key))
            .map(|(_, class)| *class)
            .unwrap_or_default()
    }

    /// Pedestrians change shape while moving.
    pub fn is_deformable(&self) -> bool {
        matches!(self, ObjectClass::Pedestrian)
    }

    /// Rigid objects are treated as symmetric boxes.
    pub fn is_symmetric(&self) -> bool {
        !self.is_deformable()
    }
}

/// One observation of one object at one frame.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ObjectDetection {
    /// Object identifier, stable across frames.
    pub object_id: ObjectId,
    /// Index of the frame the detection belongs to.
    pub frame: usize,
    /// Object category.
    pub class: ObjectClass,
    /// The 3D box, in ego or world frame depending on the builder configuration.
    pub bbox: BoundingBox3d,
    /// Whether the object exists/is visible at this frame.
    pub visible: bool,
}

impl ObjectDetection {
    /// Whether every box parameter is finite and the extents are non-negative.
    pub fn has_valid_box(&self) -> bool {
        let b = &self.bbox;
        let finite = b
            .center
            .iter()
            .chain([b.size.length, b.size.width, b.size.height, b.yaw].iter())
            .all(|v| v.is_finite());
        finite && b.size.length >= 0.0 && b.size.width >= 0.0 && b.size.height >= 0.0
    }
}
