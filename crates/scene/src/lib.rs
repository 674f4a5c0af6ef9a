//! Scene-side data: drawables and their registry, transforms, the camera and
//! the keyboard controller that drives it.

pub mod camera;
pub mod controller;
pub mod drawable;
pub mod transform;

pub use camera::{Camera, WORLD_UP};
pub use controller::{KeyMappings, KeyboardMovementController};
pub use drawable::{Drawable, DrawableId, DrawableRegistry, IdAllocator, PointLightComponent};
pub use transform::TransformComponent;
