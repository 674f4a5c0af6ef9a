//! Platform layer: the winit window, host event forwarding and the surface
//! provider the renderer drives.
//!
//! The winit event loop stays on the main thread. It forwards [`HostEvent`]s
//! through an [`EventForwarder`] to the render thread, where a
//! [`WindowSurface`] implements [`SurfaceProvider`].

mod event;
mod input;
mod provider;
mod window;

pub use event::{EventForwarder, HostEvent, HostState, host_channel};
pub use input::{InputState, KeyCode};
pub use provider::SurfaceProvider;
pub use window::{Surface, WindowSurface, create_window, required_surface_extensions};

// Re-export winit types that users might need
pub use winit::event::WindowEvent;
pub use winit::event_loop::{ActiveEventLoop, EventLoop};
pub use winit::window::{Window, WindowId};
