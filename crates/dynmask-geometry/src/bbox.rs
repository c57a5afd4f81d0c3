use crate::pose::Pose;

/// Edges of a box as pairs of corner indices into [`BoxSize::local_corners`].
pub const BOX_EDGES: [(usize, usize); 12] = [
    (0, 1),
    (1, 2),
    (2, 3),
    (3, 0),
    (4, 5),
    (5, 6),
    (6, 7),
    (7, 4),
    (0, 4),
    (1, 5),
    (2, 6),
    (3, 7),
];

/// Extent of a box along its local axes, in meters.
#[derive(
    Debug, Clone, Copy, PartialEq, Default, serde::Serialize, serde::Deserialize, bincode::Encode, bincode::Decode,
)]
pub struct BoxSize {
    /// Extent along local x (heading direction).
    pub length: f64,
    /// Extent along local y.
    pub width: f64,
    /// Extent along local z.
    pub height: f64,
}

impl BoxSize {
    /// Per-axis maximum of two sizes.
    pub fn max(&self, other: &BoxSize) -> BoxSize {
        BoxSize {
            length: self.length.max(other.length),
            width: self.width.max(other.width),
            height: self.height.max(other.height),
        }
    }

    /// The 8 corners of a box of this size centered at the origin.
    ///
    /// Bottom face first (z = -h/2), then top face, both walking
    /// (+l,-w), (+l,+w), (-l,+w), (-l,-w).
    pub fn local_corners(&self) -> [[f64; 3]; 8] {
        let l = self.length / 2.0;
        let w = self.width / 2.0;
        let h = self.height / 2.0;
        [
            [l, -w, -h],
            [l, w, -h],
            [-l, w, -h],
            [-l, -w, -h],
            [l, -w, h],
            [l, w, h],
            [-l, w, h],
            [-l, -w, h],
        ]
    }
}

/// An axis-aligned-in-z 3D box as delivered by a detector: center, size and yaw.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BoundingBox3d {
    /// Box center.
    pub center: [f64; 3],
    /// Box extent.
    pub size: BoxSize,
    /// Rotation about +z in radians.
    pub yaw: f64,
}

impl BoundingBox3d {
    /// Pose of the box frame in the frame the box is expressed in.
    pub fn pose(&self) -> Pose {
        Pose::from_yaw_translation(self.yaw, self.center)
    }

    /// The 8 box corners in the frame the box is expressed in.
    pub fn corners(&self) -> [[f64; 3]; 8] {
        OrientedBox {
            pose: self.pose(),
            size: self.size,
        }
        .corners()
    }
}

/// A box with a full rigid pose, used once a detection is lifted to world frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientedBox {
    /// Pose of the box frame (`frame_from_box`).
    pub pose: Pose,
    /// Box extent.
    pub size: BoxSize,
}

impl OrientedBox {
    /// The 8 box corners after applying the box pose.
    pub fn corners(&self) -> [[f64; 3]; 8] {
        self.size
            .local_corners()
            .map(|corner| self.pose.transform_point(&corner))
    }

    /// The box center.
    pub fn center(&self) -> [f64; 3] {
        self.pose.translation().to_array()
    }
}
