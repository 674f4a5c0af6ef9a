//! Keyboard state tracked from forwarded host events.

use std::collections::HashSet;

pub use winit::keyboard::KeyCode;

/// Tracks which keys are held and which changed since the last frame.
#[derive(Debug, Default, Clone)]
pub struct InputState {
    pressed_keys: HashSet<KeyCode>,
    just_pressed_keys: HashSet<KeyCode>,
    just_released_keys: HashSet<KeyCode>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears the per-frame edge sets. Call once per frame before polling events.
    pub fn begin_frame(&mut self) {
        self.just_pressed_keys.clear();
        self.just_released_keys.clear();
    }

    pub fn on_key_pressed(&mut self, key: KeyCode) {
        if self.pressed_keys.insert(key) {
            self.just_pressed_keys.insert(key);
        }
    }

    pub fn on_key_released(&mut self, key: KeyCode) {
        if self.pressed_keys.remove(&key) {
            self.just_released_keys.insert(key);
        }
    }

    pub fn is_key_pressed(&self, key: KeyCode) -> bool {
        self.pressed_keys.contains(&key)
    }

    pub fn is_key_just_pressed(&self, key: KeyCode) -> bool {
        self.just_pressed_keys.contains(&key)
    }

    pub fn is_key_just_released(&self, key: KeyCode) -> bool {
        self.just_released_keys.contains(&key)
    }

    /// `+1.0` while only `positive` is held, `-1.0` while only `negative` is.
    pub fn axis(&self, positive: KeyCode, negative: KeyCode) -> f32 {
        let mut value = 0.0;
        if self.is_key_pressed(positive) {
            value += 1.0;
        }
        if self.is_key_pressed(negative) {
            value -= 1.0;
        }
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_press_and_release_edges() {
        let mut input = InputState::new();
        input.on_key_pressed(KeyCode::KeyW);
        assert!(input.is_key_pressed(KeyCode::KeyW));
        assert!(input.is_key_just_pressed(KeyCode::KeyW));

        input.begin_frame();
        assert!(input.is_key_pressed(KeyCode::KeyW));
        assert!(!input.is_key_just_pressed(KeyCode::KeyW));

        input.on_key_released(KeyCode::KeyW);
        assert!(!input.is_key_pressed(KeyCode::KeyW));
        assert!(input.is_key_just_released(KeyCode::KeyW));
    }

    #[test]
    fn test_repeat_press_is_not_a_new_edge() {
        let mut input = InputState::new();
        input.on_key_pressed(KeyCode::Space);
        input.begin_frame();
        input.on_key_pressed(KeyCode::Space);
        assert!(!input.is_key_just_pressed(KeyCode::Space));
    }

    #[test]
    fn test_axis() {
        let mut input = InputState::new();
        assert_eq!(input.axis(KeyCode::KeyD, KeyCode::KeyA), 0.0);

        input.on_key_pressed(KeyCode::KeyD);
        assert_eq!(input.axis(KeyCode::KeyD, KeyCode::KeyA), 1.0);

        input.on_key_pressed(KeyCode::KeyA);
        assert_eq!(input.axis(KeyCode::KeyD, KeyCode::KeyA), 0.0);

        input.on_key_released(KeyCode::KeyD);
        assert_eq!(input.axis(KeyCode::KeyD, KeyCode::KeyA), -1.0);
    }
}
