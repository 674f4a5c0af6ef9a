//! The seam between the frame loop and whatever hosts the presentable surface.

use ash::vk;

/// What the renderer needs from the window that owns its surface.
pub trait SurfaceProvider {
    /// Current drawable size in pixels. Either side is zero while minimized.
    fn extent(&self) -> vk::Extent2D;

    /// Whether the framebuffer size changed since the flag was last reset.
    fn was_resized(&self) -> bool;

    /// Clears the resize flag.
    fn reset_resized_flag(&mut self);

    /// Blocks until at least one host event arrives and applies it.
    fn wait_events(&mut self);

    /// Applies every pending host event without blocking.
    fn poll_events(&mut self);

    /// Whether the host asked the application to exit.
    fn close_requested(&self) -> bool;
}
