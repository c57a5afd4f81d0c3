use glam::{DMat3, DMat4, DVec3, DVec4};

use crate::error::GeometryError;

/// Maximum absolute deviation accepted when checking the rotation block.
///
/// Poses produced upstream are often stored as single precision text, so the
/// tolerance is looser than f64 epsilon.
pub const ORTHONORMAL_TOLERANCE: f64 = 1e-4;

/// A rigid transform: a proper rotation followed by a translation.
///
/// A `Pose` named `a_from_b` maps points expressed in frame `b` into frame `a`.
/// Every constructor that accepts raw matrices validates the rotation block, so
/// a `Pose` value is always a proper rigid transform. On disk and in JSON a
/// pose is its row-major 4x4 homogeneous matrix.
///
/// # Examples
///
/// ```
/// use dynmask_geometry::Pose;
///
/// let pose = Pose::from_yaw_translation(0.0, [1.0, 2.0, 3.0]);
/// assert_eq!(pose.translation().to_array(), [1.0, 2.0, 3.0]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "[[f64; 4]; 4]", into = "[[f64; 4]; 4]")]
pub struct Pose {
    rotation: DMat3,
    translation: DVec3,
}

impl Pose {
    /// The identity transform.
    pub fn identity() -> Self {
        Self {
            rotation: DMat3::IDENTITY,
            translation: DVec3::ZERO,
        }
    }

    /// Create a pose from a row-major 4x4 homogeneous matrix.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::MalformedPose`] if any entry is not finite, the
    /// bottom row is not `[0, 0, 0, 1]`, or the rotation block is not
    /// orthonormal with determinant +1. The matrix is never re-orthonormalized.
    pub fn from_matrix(matrix: [[f64; 4]; 4]) -> Result<Self, GeometryError> {
        // glam is column-major: loading rows as columns yields the transpose
        let homogeneous = DMat4::from_cols_array_2d(&matrix).transpose();
        if !homogeneous.is_finite() {
            return Err(GeometryError::MalformedPose(
                "matrix contains non-finite values".to_string(),
            ));
        }

        let bottom = homogeneous.row(3);
        if !bottom.abs_diff_eq(DVec4::W, ORTHONORMAL_TOLERANCE) {
            return Err(GeometryError::MalformedPose(format!(
                "bottom row must be [0, 0, 0, 1], got {:?}",
                bottom.to_array()
            )));
        }

        let rotation = DMat3::from_mat4(homogeneous);
        check_rotation(&rotation)?;

        Ok(Self {
            rotation,
            translation: homogeneous.w_axis.truncate(),
        })
    }

    /// Create a pose from a row-major 3x3 rotation and a translation.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::MalformedPose`] if the rotation is not orthonormal.
    pub fn from_rotation_translation(
        rotation: &[[f64; 3]; 3],
        translation: &[f64; 3],
    ) -> Result<Self, GeometryError> {
        let rotation = DMat3::from_cols_array_2d(rotation).transpose();
        let translation = DVec3::from_array(*translation);
        if !rotation.is_finite() || !translation.is_finite() {
            return Err(GeometryError::MalformedPose(
                "rotation or translation contains non-finite values".to_string(),
            ));
        }
        check_rotation(&rotation)?;
        Ok(Self {
            rotation,
            translation,
        })
    }

    /// Create a pose from a rotation about +Z (yaw, radians) and a translation.
    ///
    /// This is always a valid rigid transform, hence infallible.
    pub fn from_yaw_translation(yaw: f64, translation: [f64; 3]) -> Self {
        Self {
            rotation: DMat3::from_rotation_z(yaw),
            translation: DVec3::from_array(translation),
        }
    }

    /// The row-major homogeneous matrix.
    pub fn matrix(&self) -> [[f64; 4]; 4] {
        self.as_mat4().transpose().to_cols_array_2d()
    }

    /// The homogeneous matrix.
    pub fn as_mat4(&self) -> DMat4 {
        DMat4::from_cols(
            self.rotation.x_axis.extend(0.0),
            self.rotation.y_axis.extend(0.0),
            self.rotation.z_axis.extend(0.0),
            self.translation.extend(1.0),
        )
    }

    /// The rotation block.
    pub fn rotation(&self) -> DMat3 {
        self.rotation
    }

    /// The translation.
    pub fn translation(&self) -> DVec3 {
        self.translation
    }

    /// Heading of the rotation's x axis projected on the XY plane, in radians.
    pub fn yaw(&self) -> f64 {
        self.rotation.x_axis.y.atan2(self.rotation.x_axis.x)
    }

    /// Chain two transforms: `self * other`.
    ///
    /// If `self` is `a_from_b` and `other` is `b_from_c` the result is `a_from_c`.
    pub fn compose(&self, other: &Pose) -> Pose {
        Pose {
            rotation: self.rotation * other.rotation,
            translation: self.rotation * other.translation + self.translation,
        }
    }

    /// The closed-form rigid inverse: `[R^T | -R^T t]`.
    pub fn inverse(&self) -> Pose {
        let rotation = self.rotation.transpose();
        Pose {
            rotation,
            translation: -(rotation * self.translation),
        }
    }

    /// Apply the transform to a 3D point.
    pub fn transform_point(&self, point: &[f64; 3]) -> [f64; 3] {
        self.transform_point3(DVec3::from_array(*point)).to_array()
    }

    /// Apply the transform to a 3D point.
    pub fn transform_point3(&self, point: DVec3) -> DVec3 {
        self.rotation * point + self.translation
    }

    /// Rotate a direction; the translation does not apply.
    pub fn transform_vector3(&self, vector: DVec3) -> DVec3 {
        self.rotation * vector
    }

    /// Whether two poses agree entry-wise within `tolerance`.
    pub fn approx_eq(&self, other: &Pose, tolerance: f64) -> bool {
        self.rotation.abs_diff_eq(other.rotation, tolerance)
            && self.translation.abs_diff_eq(other.translation, tolerance)
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}

impl TryFrom<[[f64; 4]; 4]> for Pose {
    type Error = GeometryError;

    fn try_from(matrix: [[f64; 4]; 4]) -> Result<Self, Self::Error> {
        Pose::from_matrix(matrix)
    }
}

impl From<Pose> for [[f64; 4]; 4] {
    fn from(pose: Pose) -> Self {
        pose.matrix()
    }
}

impl bincode::Encode for Pose {
    fn encode<E: bincode::enc::Encoder>(
        &self,
        encoder: &mut E,
    ) -> Result<(), bincode::error::EncodeError> {
        bincode::Encode::encode(&self.matrix(), encoder)
    }
}

impl<C> bincode::Decode<C> for Pose {
    fn decode<D: bincode::de::Decoder<Context = C>>(
        decoder: &mut D,
    ) -> Result<Self, bincode::error::DecodeError> {
        let matrix: [[f64; 4]; 4] = bincode::Decode::decode(decoder)?;
        Pose::from_matrix(matrix)
            .map_err(|e| bincode::error::DecodeError::OtherString(e.to_string()))
    }
}

impl<'de, C> bincode::BorrowDecode<'de, C> for Pose {
    fn borrow_decode<D: bincode::de::BorrowDecoder<'de, Context = C>>(
        decoder: &mut D,
    ) -> Result<Self, bincode::error::DecodeError> {
        let matrix: [[f64; 4]; 4] = bincode::Decode::decode(decoder)?;
        Pose::from_matrix(matrix)
            .map_err(|e| bincode::error::DecodeError::OtherString(e.to_string()))
    }
}

/// Chain two rigid transforms, `a * b`.
pub fn compose(a: &Pose, b: &Pose) -> Pose {
    a.compose(b)
}

/// Invert a rigid transform.
pub fn inverse(pose: &Pose) -> Pose {
    pose.inverse()
}

/// Apply a rigid transform to a point.
pub fn transform_point(pose: &Pose, point: &[f64; 3]) -> [f64; 3] {
    pose.transform_point(point)
}

fn check_rotation(rotation: &DMat3) -> Result<(), GeometryError> {
    let gram = *rotation * rotation.transpose();
    if !gram.abs_diff_eq(DMat3::IDENTITY, ORTHONORMAL_TOLERANCE) {
        return Err(GeometryError::MalformedPose(format!(
            "rotation is not orthonormal (R * R^T = {:?})",
            gram.transpose().to_cols_array_2d()
        )));
    }

    let det = rotation.determinant();
    if (det - 1.0).abs() > ORTHONORMAL_TOLERANCE {
        return Err(GeometryError::MalformedPose(format!(
            "rotation determinant must be +1, got {det}"
        )));
    }

    Ok(())
}
