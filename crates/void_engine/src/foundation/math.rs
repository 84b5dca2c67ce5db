//! Math utilities and types
//!
//! Thin aliases over nalgebra plus the object transform used to build the
//! per-draw model and normal matrices.

pub use nalgebra::{Matrix3, Matrix4, Rotation3, Vector3, Vector4};

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 3x3 matrix type
pub type Mat3 = Matrix3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// Translation, Tait-Bryan rotation and scale of a drawable object.
///
/// Rotation angles are radians and are applied in Y, X, Z order, so the model
/// matrix is `T * Ry * Rx * Rz * S`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    /// Position in world space
    pub translation: Vec3,
    /// Rotation about X, Y and Z in radians
    pub rotation: Vec3,
    /// Per-axis scale factors
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: Vec3::zeros(),
            rotation: Vec3::zeros(),
            scale: Vec3::new(1.0, 1.0, 1.0),
        }
    }
}

impl Transform {
    /// Identity transform
    pub fn identity() -> Self {
        Self::default()
    }

    /// Transform with only a translation
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::default()
        }
    }

    /// Builder-style scale override
    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    /// Builder-style rotation override
    pub fn with_rotation(mut self, rotation: Vec3) -> Self {
        self.rotation = rotation;
        self
    }

    fn rotation_matrix(&self) -> Mat3 {
        let ry = Rotation3::from_axis_angle(&Vec3::y_axis(), self.rotation.y);
        let rx = Rotation3::from_axis_angle(&Vec3::x_axis(), self.rotation.x);
        let rz = Rotation3::from_axis_angle(&Vec3::z_axis(), self.rotation.z);
        (ry * rx * rz).into_inner()
    }

    /// Model matrix `T * Ry * Rx * Rz * S`
    pub fn model_matrix(&self) -> Mat4 {
        Mat4::new_translation(&self.translation)
            * self.rotation_matrix().to_homogeneous()
            * Mat4::new_nonuniform_scaling(&self.scale)
    }

    /// Normal matrix `R * S^-1`, widened to 4x4 for push constant upload.
    ///
    /// A zero scale component yields an infinite column; callers never scale
    /// an object to nothing and still expect it to be lit.
    pub fn normal_matrix(&self) -> Mat4 {
        let inverse_scale = Vec3::new(1.0 / self.scale.x, 1.0 / self.scale.y, 1.0 / self.scale.z);
        (self.rotation_matrix() * Mat3::from_diagonal(&inverse_scale)).to_homogeneous()
    }
}
