//! The begin/end frame state machine.
//!
//! [`Renderer`] owns the presentation chain, the [`FrameSynchronizer`] and one
//! command buffer per frame in flight. A frame goes through
//!
//! ```text
//! Idle --begin_frame--> Recording --begin_pass--> InPass
//!   ^                      |  ^                      |
//!   +------end_frame-------+  +-------end_pass-------+
//! ```
//!
//! Calling a transition from the wrong state panics. Stale and suboptimal
//! surfaces are handled here by rebuilding the chain; only fatal failures
//! reach the caller as [`RhiError`].

use std::mem;

use ash::vk;
use tracing::{debug, error, info, warn};

use lumen_core::{PresentPreference, RendererConfig};
use lumen_platform::SurfaceProvider;
use lumen_rhi::{
    AcquireOutcome, ChainRequest, PresentModePolicy, PresentationChain, RhiError, RhiResult,
};

use crate::MAX_FRAMES_IN_FLIGHT;
use crate::backend::{PassBeginInfo, RenderBackend, full_scissor, viewport_for};
use crate::frame_sync::{FrameSynchronizer, PresentOutcome};

/// Where the renderer is within a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    /// No frame is being recorded.
    Idle,
    /// A command buffer is recording, no render pass is open.
    Recording,
    /// The chain's render pass is open.
    InPass,
}

/// Renderer options that do not depend on the device.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RendererSettings {
    /// Color the pass clears to.
    pub clear_color: [f32; 4],
    /// Negative-height viewport.
    pub flip_viewport_y: bool,
    pub present_mode: PresentModePolicy,
    /// Number of frame slots; at least one.
    pub frames_in_flight: usize,
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self::from(&RendererConfig::default())
    }
}

impl From<&RendererConfig> for RendererSettings {
    fn from(config: &RendererConfig) -> Self {
        let present_mode = match config.present_mode {
            PresentPreference::LowLatency => PresentModePolicy::LowLatency,
            PresentPreference::Vsync => PresentModePolicy::Vsync,
        };

        Self {
            clear_color: config.clear_color,
            flip_viewport_y: config.flip_viewport_y,
            present_mode,
            frames_in_flight: MAX_FRAMES_IN_FLIGHT,
        }
    }
}

/// Frame orchestrator over a [`RenderBackend`] and a [`SurfaceProvider`].
///
/// # Resource Destruction Order
///
/// 1. Wait for the device to go idle
/// 2. Destroy frame slots and free command buffers
/// 3. Drop the chain
/// 4. Drop the window, then the backend
///
/// Field order encodes steps 3 and 4.
pub struct Renderer<B: RenderBackend, W: SurfaceProvider> {
    chain: B::Chain,
    sync: FrameSynchronizer,
    /// One per frame in flight, indexed by the synchronizer's slot.
    command_buffers: Vec<vk::CommandBuffer>,
    state: FrameState,
    /// Image acquired by the frame being recorded.
    current_image: u32,
    /// Set by a suboptimal acquire; honored after the frame is presented.
    deferred_rebuild: bool,
    settings: RendererSettings,
    window: W,
    backend: B,
}

impl<B: RenderBackend, W: SurfaceProvider> Renderer<B, W> {
    /// Builds the first chain and the per-frame resources.
    ///
    /// Blocks while the window has no drawable area.
    ///
    /// # Errors
    ///
    /// Returns [`RhiError::SurfaceError`] if the window is closed before it
    /// ever reports a drawable size, or any error from chain creation.
    pub fn new(backend: B, mut window: W, settings: RendererSettings) -> RhiResult<Self> {
        let extent = wait_for_drawable_extent(&mut window).ok_or_else(|| {
            RhiError::SurfaceError("window closed before it had a drawable size".to_string())
        })?;

        let chain = backend.create_chain(
            ChainRequest {
                extent,
                present_mode: settings.present_mode,
            },
            None,
        )?;

        let mut sync = FrameSynchronizer::new(&backend, settings.frames_in_flight, chain.image_count())?;

        let command_buffers = match backend.allocate_command_buffers(settings.frames_in_flight as u32) {
            Ok(buffers) => buffers,
            Err(e) => {
                sync.destroy(&backend);
                return Err(e);
            }
        };

        // The initial size is already accounted for.
        window.reset_resized_flag();

        info!(
            "Renderer initialized: {}x{}, {} images, {} frames in flight",
            chain.extent().width,
            chain.extent().height,
            chain.image_count(),
            settings.frames_in_flight
        );

        Ok(Self {
            chain,
            sync,
            command_buffers,
            state: FrameState::Idle,
            current_image: 0,
            deferred_rebuild: false,
            settings,
            window,
            backend,
        })
    }

    /// Waits for the active frame slot, acquires an image and starts recording.
    ///
    /// Returns `Ok(None)` when the surface was stale; the chain has been
    /// rebuilt and the caller should skip drawing this tick.
    ///
    /// # Panics
    ///
    /// Panics unless the renderer is [`FrameState::Idle`].
    pub fn begin_frame(&mut self) -> RhiResult<Option<vk::CommandBuffer>> {
        assert_eq!(
            self.state,
            FrameState::Idle,
            "begin_frame called while a frame is already in progress"
        );

        let image_index = match self.sync.acquire(&self.backend, &self.chain)? {
            AcquireOutcome::Ready(index) => index,
            AcquireOutcome::Suboptimal(index) => {
                debug!("Swapchain suboptimal on acquire, rebuilding after present");
                self.deferred_rebuild = true;
                index
            }
            AcquireOutcome::Stale => {
                debug!("Swapchain out of date on acquire, recreating");
                self.rebuild_chain()?;
                return Ok(None);
            }
        };

        let command_buffer = self.current_command_buffer();
        self.backend.begin_commands(command_buffer)?;

        self.current_image = image_index;
        self.state = FrameState::Recording;
        Ok(Some(command_buffer))
    }

    /// Finishes recording, submits and presents the frame.
    ///
    /// Rebuilds the chain if presentation reported a stale or suboptimal
    /// surface, if the acquire was suboptimal, or if the window was resized.
    ///
    /// # Panics
    ///
    /// Panics unless the renderer is [`FrameState::Recording`].
    pub fn end_frame(&mut self) -> RhiResult<()> {
        assert_eq!(
            self.state,
            FrameState::Recording,
            "end_frame called without a recording frame outside a render pass"
        );

        let command_buffer = self.current_command_buffer();
        self.state = FrameState::Idle;

        self.backend.end_commands(command_buffer)?;
        let status = self.sync.submit_and_present(
            &self.backend,
            &self.chain,
            command_buffer,
            self.current_image,
        )?;

        let outcome = PresentOutcome {
            status,
            resize_requested: self.window.was_resized(),
        };
        let deferred = mem::take(&mut self.deferred_rebuild);

        if outcome.needs_rebuild() || deferred {
            debug!(
                "Recreating swapchain after present: {:?}, resized: {}, deferred: {}",
                outcome.status, outcome.resize_requested, deferred
            );
            self.rebuild_chain()?;
        }

        Ok(())
    }

    /// Opens the chain's render pass on the acquired image.
    ///
    /// Clears color to the configured background and depth to the far plane,
    /// and sets a viewport and scissor covering the whole chain.
    ///
    /// # Panics
    ///
    /// Panics unless the renderer is [`FrameState::Recording`], or if
    /// `command_buffer` is not the one returned by [`Renderer::begin_frame`].
    pub fn begin_pass(&mut self, command_buffer: vk::CommandBuffer) {
        assert_eq!(
            self.state,
            FrameState::Recording,
            "begin_pass called without a recording frame or with a pass already open"
        );
        assert_eq!(
            command_buffer,
            self.current_command_buffer(),
            "begin_pass called with a command buffer from another frame"
        );

        let extent = self.chain.extent();
        let pass = PassBeginInfo {
            render_pass: self.chain.render_pass(),
            framebuffer: self.chain.framebuffer(self.current_image),
            extent,
            clear_color: self.settings.clear_color,
            viewport: viewport_for(extent, self.settings.flip_viewport_y),
            scissor: full_scissor(extent),
        };
        self.backend.begin_pass(command_buffer, &pass);

        self.state = FrameState::InPass;
    }

    /// Closes the render pass opened by [`Renderer::begin_pass`].
    ///
    /// # Panics
    ///
    /// Panics unless the renderer is [`FrameState::InPass`], or if
    /// `command_buffer` is not the one returned by [`Renderer::begin_frame`].
    pub fn end_pass(&mut self, command_buffer: vk::CommandBuffer) {
        assert_eq!(
            self.state,
            FrameState::InPass,
            "end_pass called without an open render pass"
        );
        assert_eq!(
            command_buffer,
            self.current_command_buffer(),
            "end_pass called with a command buffer from another frame"
        );

        self.backend.end_pass(command_buffer);
        self.state = FrameState::Recording;
    }

    /// Index of the active frame slot, in `0..frames_in_flight`.
    #[inline]
    pub fn frame_index(&self) -> usize {
        self.sync.current_frame()
    }

    /// Render pass every pipeline drawing into the chain must be compatible with.
    ///
    /// Stays valid across rebuilds because the formats are checked to match.
    #[inline]
    pub fn render_pass(&self) -> vk::RenderPass {
        self.chain.render_pass()
    }

    #[inline]
    pub fn extent(&self) -> vk::Extent2D {
        self.chain.extent()
    }

    /// Width over height of the chain.
    pub fn aspect_ratio(&self) -> f32 {
        let extent = self.chain.extent();
        extent.width as f32 / extent.height as f32
    }

    #[inline]
    pub fn state(&self) -> FrameState {
        self.state
    }

    /// Whether a frame is being recorded.
    #[inline]
    pub fn is_frame_in_progress(&self) -> bool {
        self.state != FrameState::Idle
    }

    #[inline]
    pub fn settings(&self) -> &RendererSettings {
        &self.settings
    }

    #[inline]
    pub fn window(&self) -> &W {
        &self.window
    }

    #[inline]
    pub fn window_mut(&mut self) -> &mut W {
        &mut self.window
    }

    #[inline]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    #[inline]
    pub fn chain(&self) -> &B::Chain {
        &self.chain
    }

    /// Blocks until the device has finished all submitted work.
    pub fn wait_idle(&self) -> RhiResult<()> {
        self.backend.wait_idle()
    }

    fn current_command_buffer(&self) -> vk::CommandBuffer {
        self.command_buffers[self.sync.current_frame()]
    }

    /// Replaces the chain with one sized to the window and clears the
    /// window's resize flag.
    ///
    /// Does nothing if the window closes while it has no drawable area.
    fn rebuild_chain(&mut self) -> RhiResult<()> {
        let Some(extent) = wait_for_drawable_extent(&mut self.window) else {
            warn!("Window closed while minimized, skipping swapchain rebuild");
            return Ok(());
        };
        // The new chain is sized to the extent just read.
        self.window.reset_resized_flag();

        self.backend.wait_idle()?;

        let request = ChainRequest {
            extent,
            present_mode: self.settings.present_mode,
        };
        let chain = self.backend.create_chain(request, Some(&self.chain))?;
        chain.formats().ensure_matches(&self.chain.formats())?;

        let previous = mem::replace(&mut self.chain, chain);
        drop(previous);

        self.sync.reset_image_tracking(self.chain.image_count());
        self.deferred_rebuild = false;

        info!(
            "Swapchain recreated: {}x{}, {} images",
            self.chain.extent().width,
            self.chain.extent().height,
            self.chain.image_count()
        );
        Ok(())
    }
}

impl<B: RenderBackend, W: SurfaceProvider> Drop for Renderer<B, W> {
    fn drop(&mut self) {
        if let Err(e) = self.backend.wait_idle() {
            error!(
                "Failed to wait for device idle during renderer drop: {:?}",
                e
            );
        }

        self.sync.destroy(&self.backend);
        self.backend.free_command_buffers(&self.command_buffers);
        self.command_buffers.clear();

        info!("Renderer destroyed");
    }
}

/// Returns the window's drawable extent, blocking on host events while
/// either side is zero. `None` if the window closes first.
fn wait_for_drawable_extent<W: SurfaceProvider + ?Sized>(window: &mut W) -> Option<vk::Extent2D> {
    let mut extent = window.extent();
    if extent.width == 0 || extent.height == 0 {
        debug!("Window has no drawable area, waiting for host events");
    }

    while extent.width == 0 || extent.height == 0 {
        if window.close_requested() {
            return None;
        }
        window.wait_events();
        extent = window.extent();
    }

    Some(extent)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_from_config() {
        let config = RendererConfig {
            flip_viewport_y: true,
            clear_color: [0.1, 0.2, 0.3, 1.0],
            present_mode: PresentPreference::Vsync,
            ..RendererConfig::default()
        };
        let settings = RendererSettings::from(&config);
        assert!(settings.flip_viewport_y);
        assert_eq!(settings.clear_color, [0.1, 0.2, 0.3, 1.0]);
        assert_eq!(settings.present_mode, PresentModePolicy::Vsync);
        assert_eq!(settings.frames_in_flight, MAX_FRAMES_IN_FLIGHT);
    }

    #[test]
    fn test_default_settings() {
        let settings = RendererSettings::default();
        assert!(!settings.flip_viewport_y);
        assert_eq!(settings.present_mode, PresentModePolicy::LowLatency);
    }
}
