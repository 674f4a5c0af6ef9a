//! Per-drawable transform.
//!
//! Rotation is stored as Tait-Bryan angles applied in Y, X, Z order, so the
//! model matrix is `translate * Ry * Rx * Rz * scale`.

use glam::{EulerRot, Mat3, Mat4, Quat, Vec3};

/// Translation, scale and YXZ Euler rotation (radians).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TransformComponent {
    pub translation: Vec3,
    pub scale: Vec3,
    /// `x` pitch, `y` yaw, `z` roll.
    pub rotation: Vec3,
}

impl Default for TransformComponent {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            scale: Vec3::ONE,
            rotation: Vec3::ZERO,
        }
    }
}

impl TransformComponent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_translation(mut self, translation: Vec3) -> Self {
        self.translation = translation;
        self
    }

    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_rotation(mut self, rotation: Vec3) -> Self {
        self.rotation = rotation;
        self
    }

    /// The rotation as a quaternion, `Ry * Rx * Rz`.
    pub fn orientation(&self) -> Quat {
        Quat::from_euler(
            EulerRot::YXZ,
            self.rotation.y,
            self.rotation.x,
            self.rotation.z,
        )
    }

    /// Model matrix.
    pub fn mat4(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.orientation(), self.translation)
    }

    /// Matrix for transforming normals: rotation times inverse scale.
    ///
    /// Equal to the inverse transpose of the model matrix's upper 3x3.
    pub fn normal_matrix(&self) -> Mat3 {
        Mat3::from_quat(self.orientation()) * Mat3::from_diagonal(self.scale.recip())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    fn assert_mat4_near(a: Mat4, b: Mat4) {
        assert!(a.abs_diff_eq(b, 1e-5), "{a:?} != {b:?}");
    }

    #[test]
    fn test_identity() {
        let transform = TransformComponent::default();
        assert_mat4_near(transform.mat4(), Mat4::IDENTITY);
        assert!(transform.normal_matrix().abs_diff_eq(Mat3::IDENTITY, 1e-6));
    }

    #[test]
    fn test_matches_explicit_composition() {
        let transform = TransformComponent::new()
            .with_translation(Vec3::new(1.0, -2.0, 3.0))
            .with_scale(Vec3::new(2.0, 0.5, 3.0))
            .with_rotation(Vec3::new(0.3, -1.1, 0.7));

        let expected = Mat4::from_translation(transform.translation)
            * Mat4::from_rotation_y(transform.rotation.y)
            * Mat4::from_rotation_x(transform.rotation.x)
            * Mat4::from_rotation_z(transform.rotation.z)
            * Mat4::from_scale(transform.scale);

        assert_mat4_near(transform.mat4(), expected);
    }

    #[test]
    fn test_yaw_turns_forward_towards_x() {
        let transform = TransformComponent::new().with_rotation(Vec3::new(0.0, FRAC_PI_2, 0.0));
        let forward = transform.mat4().transform_vector3(Vec3::Z);
        assert!(forward.abs_diff_eq(Vec3::X, 1e-6));
    }

    #[test]
    fn test_normal_matrix_is_inverse_transpose() {
        let transform = TransformComponent::new()
            .with_scale(Vec3::new(3.0, 1.0, 0.25))
            .with_rotation(Vec3::new(0.4, 0.9, -0.2));

        let upper = Mat3::from_mat4(transform.mat4());
        let expected = upper.inverse().transpose();

        assert!(transform.normal_matrix().abs_diff_eq(expected, 1e-4));
    }

    #[test]
    fn test_normals_stay_perpendicular_under_non_uniform_scale() {
        let transform = TransformComponent::new().with_scale(Vec3::new(4.0, 1.0, 1.0));
        let model = transform.mat4();

        // Surface of the plane x = y, with normal (1, -1, 0).
        let tangent = model.transform_vector3(Vec3::new(1.0, 1.0, 0.0));
        let normal = transform.normal_matrix() * Vec3::new(1.0, -1.0, 0.0);

        assert!(tangent.dot(normal).abs() < 1e-5);
    }
}
