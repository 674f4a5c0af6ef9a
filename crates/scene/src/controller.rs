//! Keyboard fly-camera controller.

use std::f32::consts::TAU;

use glam::Vec3;
use lumen_platform::{InputState, KeyCode};

use crate::transform::TransformComponent;

/// Pitch is kept inside +/- this many radians.
pub const PITCH_LIMIT: f32 = 1.5;

/// Key bindings for [`KeyboardMovementController`].
#[derive(Debug, Clone, Copy)]
pub struct KeyMappings {
    pub move_left: KeyCode,
    pub move_right: KeyCode,
    pub move_forward: KeyCode,
    pub move_backward: KeyCode,
    pub move_up: KeyCode,
    pub move_down: KeyCode,
    pub look_left: KeyCode,
    pub look_right: KeyCode,
    pub look_up: KeyCode,
    pub look_down: KeyCode,
}

impl Default for KeyMappings {
    fn default() -> Self {
        Self {
            move_left: KeyCode::KeyA,
            move_right: KeyCode::KeyD,
            move_forward: KeyCode::KeyW,
            move_backward: KeyCode::KeyS,
            move_up: KeyCode::KeyE,
            move_down: KeyCode::KeyQ,
            look_left: KeyCode::ArrowLeft,
            look_right: KeyCode::ArrowRight,
            look_up: KeyCode::ArrowUp,
            look_down: KeyCode::ArrowDown,
        }
    }
}

/// Moves a transform in the XZ plane from held keys.
#[derive(Debug, Clone, Copy)]
pub struct KeyboardMovementController {
    pub keys: KeyMappings,
    /// Units per second.
    pub move_speed: f32,
    /// Radians per second.
    pub look_speed: f32,
}

impl Default for KeyboardMovementController {
    fn default() -> Self {
        Self {
            keys: KeyMappings::default(),
            move_speed: 3.0,
            look_speed: 1.5,
        }
    }
}

impl KeyboardMovementController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies `dt` seconds of input to `transform`.
    pub fn move_in_plane_xz(&self, input: &InputState, dt: f32, transform: &mut TransformComponent) {
        let keys = &self.keys;

        let rotate = Vec3::new(
            input.axis(keys.look_up, keys.look_down),
            input.axis(keys.look_right, keys.look_left),
            0.0,
        );
        if rotate.length_squared() > f32::EPSILON {
            transform.rotation += self.look_speed * dt * rotate.normalize();
        }

        transform.rotation.x = transform.rotation.x.clamp(-PITCH_LIMIT, PITCH_LIMIT);
        transform.rotation.y = transform.rotation.y.rem_euclid(TAU);

        let yaw = transform.rotation.y;
        let forward = Vec3::new(yaw.sin(), 0.0, yaw.cos());
        let right = Vec3::new(forward.z, 0.0, -forward.x);
        let up = Vec3::NEG_Y;

        let move_dir = forward * input.axis(keys.move_forward, keys.move_backward)
            + right * input.axis(keys.move_right, keys.move_left)
            + up * input.axis(keys.move_up, keys.move_down);

        if move_dir.length_squared() > f32::EPSILON {
            transform.translation += self.move_speed * dt * move_dir.normalize();
        }
    }
}
