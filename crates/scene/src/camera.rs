//! Camera projection and view matrices.
//!
//! Uses the Vulkan clip-space conventions directly: depth in `[0, 1]`, +Y
//! pointing down the screen and +Z pointing into it. World "up" is therefore
//! [`WORLD_UP`] = -Y.

use glam::{Mat4, Vec3, Vec4};

/// Up direction of the world in this convention.
pub const WORLD_UP: Vec3 = Vec3::NEG_Y;

/// Projection and view matrices for rendering the scene.
#[derive(Clone, Debug, PartialEq)]
pub struct Camera {
    projection: Mat4,
    view: Mat4,
    inverse_view: Mat4,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            projection: Mat4::IDENTITY,
            view: Mat4::IDENTITY,
            inverse_view: Mat4::IDENTITY,
        }
    }
}

impl Camera {
    pub fn new() -> Self {
        Self::default()
    }

    /// Orthographic box mapping `[left, right] x [top, bottom] x [near, far]`
    /// onto clip space.
    pub fn set_orthographic_projection(
        &mut self,
        left: f32,
        right: f32,
        top: f32,
        bottom: f32,
        near: f32,
        far: f32,
    ) {
        self.projection = Mat4::from_cols(
            Vec4::new(2.0 / (right - left), 0.0, 0.0, 0.0),
            Vec4::new(0.0, 2.0 / (bottom - top), 0.0, 0.0),
            Vec4::new(0.0, 0.0, 1.0 / (far - near), 0.0),
            Vec4::new(
                -(right + left) / (right - left),
                -(bottom + top) / (bottom - top),
                -near / (far - near),
                1.0,
            ),
        );
    }

    /// Perspective projection with vertical field of view `fov_y` (radians).
    ///
    /// # Panics
    ///
    /// Panics if `aspect` is zero.
    pub fn set_perspective_projection(&mut self, fov_y: f32, aspect: f32, near: f32, far: f32) {
        assert!(aspect.abs() > f32::EPSILON, "aspect ratio must be non-zero");
        self.projection = Mat4::perspective_lh(fov_y, aspect, near, far);
    }

    /// Looks from `position` along `direction`.
    pub fn set_view_direction(&mut self, position: Vec3, direction: Vec3, up: Vec3) {
        let w = direction.normalize();
        let u = w.cross(up).normalize();
        let v = w.cross(u);
        self.set_view_basis(position, u, v, w);
    }

    /// Looks from `position` at `target`.
    pub fn set_view_target(&mut self, position: Vec3, target: Vec3, up: Vec3) {
        self.set_view_direction(position, target - position, up);
    }

    /// Places the camera at `position` with YXZ Euler `rotation`, matching
    /// [`TransformComponent`](crate::TransformComponent).
    pub fn set_view_yxz(&mut self, position: Vec3, rotation: Vec3) {
        let (s3, c3) = rotation.z.sin_cos();
        let (s2, c2) = rotation.x.sin_cos();
        let (s1, c1) = rotation.y.sin_cos();

        let u = Vec3::new(c1 * c3 + s1 * s2 * s3, c2 * s3, c1 * s2 * s3 - c3 * s1);
        let v = Vec3::new(c3 * s1 * s2 - c1 * s3, c2 * c3, c1 * c3 * s2 + s1 * s3);
        let w = Vec3::new(c2 * s1, -s2, c1 * c2);
        self.set_view_basis(position, u, v, w);
    }

    // Rows of the rotation are the camera's right, down and forward axes.
    fn set_view_basis(&mut self, position: Vec3, u: Vec3, v: Vec3, w: Vec3) {
        self.view = Mat4::from_cols(
            Vec4::new(u.x, v.x, w.x, 0.0),
            Vec4::new(u.y, v.y, w.y, 0.0),
            Vec4::new(u.z, v.z, w.z, 0.0),
            Vec4::new(-u.dot(position), -v.dot(position), -w.dot(position), 1.0),
        );
        self.inverse_view = Mat4::from_cols(
            u.extend(0.0),
            v.extend(0.0),
            w.extend(0.0),
            position.extend(1.0),
        );
    }

    #[inline]
    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    #[inline]
    pub fn view(&self) -> Mat4 {
        self.view
    }

    #[inline]
    pub fn inverse_view(&self) -> Mat4 {
        self.inverse_view
    }

    /// Camera position in world space.
    pub fn position(&self) -> Vec3 {
        self.inverse_view.w_axis.truncate()
    }

    pub fn projection_view(&self) -> Mat4 {
        self.projection * self.view
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::TransformComponent;

    #[test]
    fn test_perspective_depth_range() {
        let mut camera = Camera::new();
        camera.set_perspective_projection(50f32.to_radians(), 16.0 / 9.0, 0.1, 100.0);

        let near = camera.projection() * Vec4::new(0.0, 0.0, 0.1, 1.0);
        let far = camera.projection() * Vec4::new(0.0, 0.0, 100.0, 1.0);

        assert!((near.z / near.w).abs() < 1e-5);
        assert!((far.z / far.w - 1.0).abs() < 1e-5);
    }

    #[test]
    #[should_panic(expected = "aspect ratio")]
    fn test_perspective_rejects_zero_aspect() {
        Camera::new().set_perspective_projection(1.0, 0.0, 0.1, 10.0);
    }

    #[test]
    fn test_orthographic_maps_box_corners() {
        let mut camera = Camera::new();
        camera.set_orthographic_projection(-2.0, 2.0, -1.0, 1.0, 0.0, 10.0);

        let corner = camera.projection() * Vec4::new(2.0, 1.0, 10.0, 1.0);
        assert!(corner.truncate().abs_diff_eq(Vec3::new(1.0, 1.0, 1.0), 1e-6));

        let corner = camera.projection() * Vec4::new(-2.0, -1.0, 0.0, 1.0);
        assert!(corner.truncate().abs_diff_eq(Vec3::new(-1.0, -1.0, 0.0), 1e-6));
    }

    #[test]
    fn test_view_target_puts_target_on_forward_axis() {
        let mut camera = Camera::new();
        let position = Vec3::new(-1.0, -2.0, 2.0);
        let target = Vec3::new(0.0, 0.0, 2.5);
        camera.set_view_target(position, target, WORLD_UP);

        let in_view = camera.view().transform_point3(target);
        assert!(in_view.x.abs() < 1e-5);
        assert!(in_view.y.abs() < 1e-5);
        assert!((in_view.z - (target - position).length()).abs() < 1e-5);
    }

    #[test]
    fn test_inverse_view_round_trips() {
        let mut camera = Camera::new();
        camera.set_view_yxz(Vec3::new(0.5, -1.0, -2.5), Vec3::new(0.2, 1.3, 0.1));

        let product = camera.view() * camera.inverse_view();
        assert!(product.abs_diff_eq(Mat4::IDENTITY, 1e-5));
        assert!(camera.position().abs_diff_eq(Vec3::new(0.5, -1.0, -2.5), 1e-6));
    }

    #[test]
    fn test_view_yxz_inverts_transform() {
        let transform = TransformComponent::new()
            .with_translation(Vec3::new(1.0, 2.0, 3.0))
            .with_rotation(Vec3::new(-0.4, 0.8, 0.3));

        let mut camera = Camera::new();
        camera.set_view_yxz(transform.translation, transform.rotation);

        assert!(
            camera
                .inverse_view()
                .abs_diff_eq(transform.mat4(), 1e-5)
        );
    }
}
