//! winit window creation, Vulkan surface creation and the render-thread
//! window provider.

use std::ffi::{CStr, c_char};
use std::sync::Arc;
use std::sync::mpsc::{Receiver, TryRecvError};

use ash::vk;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use winit::dpi::PhysicalSize;
use winit::event_loop::ActiveEventLoop;
use winit::window::{Window as WinitWindow, WindowAttributes};

use lumen_core::{Error, Result, WindowConfig};

use crate::event::{HostEvent, HostState};
use crate::input::InputState;
use crate::provider::SurfaceProvider;

/// RAII wrapper for a Vulkan surface.
///
/// The Vulkan instance must outlive it.
pub struct Surface {
    handle: vk::SurfaceKHR,
    surface_loader: ash::khr::surface::Instance,
}

impl Surface {
    #[inline]
    pub fn handle(&self) -> vk::SurfaceKHR {
        self.handle
    }

    /// Loader for surface capability, format and present mode queries.
    #[inline]
    pub fn loader(&self) -> &ash::khr::surface::Instance {
        &self.surface_loader
    }
}

impl Drop for Surface {
    fn drop(&mut self) {
        // SAFETY: created by ash_window::create_surface from the same instance
        // as the loader, and destroyed only here.
        unsafe {
            self.surface_loader.destroy_surface(self.handle, None);
        }
        tracing::debug!("Vulkan surface destroyed");
    }
}

/// Opens the application window on the event loop thread.
pub fn create_window(event_loop: &ActiveEventLoop, config: &WindowConfig) -> Result<Arc<WinitWindow>> {
    let attrs = WindowAttributes::default()
        .with_title(config.title.clone())
        .with_inner_size(PhysicalSize::new(config.width, config.height))
        .with_resizable(true);

    let window = event_loop
        .create_window(attrs)
        .map_err(|e| Error::Window(e.to_string()))?;

    tracing::info!("Window created: {}x{}", config.width, config.height);

    Ok(Arc::new(window))
}

/// Instance extensions needed to create a surface for `window`.
///
/// The pointers reference static strings owned by the Vulkan loader.
pub fn required_surface_extensions(window: &WinitWindow) -> Result<Vec<*const c_char>> {
    let display_handle = window
        .display_handle()
        .map_err(|e| Error::Window(format!("Failed to get display handle: {}", e)))?;

    let extensions = ash_window::enumerate_required_extensions(display_handle.as_raw())
        .map_err(|e| Error::Surface(format!("Failed to enumerate required extensions: {}", e)))?;

    tracing::debug!(
        "Required Vulkan extensions for surface: {:?}",
        extensions
            .iter()
            // SAFETY: ash_window returns valid, null-terminated static strings.
            .map(|&ext| unsafe { CStr::from_ptr(ext) })
            .collect::<Vec<_>>()
    );

    Ok(extensions.to_vec())
}

/// The window as seen from the render thread.
///
/// Host events arrive over the channel fed by an
/// [`EventForwarder`](crate::EventForwarder) on the main thread.
pub struct WindowSurface {
    window: Arc<WinitWindow>,
    events: Receiver<HostEvent>,
    state: HostState,
}

impl WindowSurface {
    pub fn new(window: Arc<WinitWindow>, events: Receiver<HostEvent>) -> Self {
        let size = window.inner_size();
        Self {
            window,
            events,
            state: HostState::new(size.width, size.height),
        }
    }

    /// Creates the Vulkan surface for this window.
    ///
    /// `instance` must outlive the returned [`Surface`].
    pub fn create_surface(&self, entry: &ash::Entry, instance: &ash::Instance) -> Result<Surface> {
        let display_handle = self
            .window
            .display_handle()
            .map_err(|e| Error::Window(format!("Failed to get display handle: {}", e)))?;

        let window_handle = self
            .window
            .window_handle()
            .map_err(|e| Error::Window(format!("Failed to get window handle: {}", e)))?;

        // SAFETY: entry and instance are valid, and the handles come from a
        // live winit window kept alive by `self.window`.
        let handle = unsafe {
            ash_window::create_surface(
                entry,
                instance,
                display_handle.as_raw(),
                window_handle.as_raw(),
                None,
            )
            .map_err(|e| Error::Surface(format!("Failed to create Vulkan surface: {}", e)))?
        };

        let surface_loader = ash::khr::surface::Instance::new(entry, instance);

        tracing::info!("Vulkan surface created");

        Ok(Surface {
            handle,
            surface_loader,
        })
    }

    #[inline]
    pub fn window(&self) -> &WinitWindow {
        &self.window
    }

    #[inline]
    pub fn input(&self) -> &InputState {
        self.state.input()
    }

    /// Clears per-frame key edges. Call before [`SurfaceProvider::poll_events`].
    pub fn begin_input_frame(&mut self) {
        self.state.input_mut().begin_frame();
    }

    /// Width over height, or 1.0 while minimized.
    pub fn aspect_ratio(&self) -> f32 {
        let extent = self.state.extent();
        if extent.width == 0 || extent.height == 0 {
            return 1.0;
        }
        extent.width as f32 / extent.height as f32
    }

    fn hang_up(&mut self) {
        if !self.state.close_requested() {
            tracing::debug!("Host event channel closed");
        }
        self.state.request_close();
    }
}

impl SurfaceProvider for WindowSurface {
    fn extent(&self) -> vk::Extent2D {
        self.state.extent()
    }

    fn was_resized(&self) -> bool {
        self.state.was_resized()
    }

    fn reset_resized_flag(&mut self) {
        self.state.reset_resized_flag();
    }

    fn wait_events(&mut self) {
        if self.state.close_requested() {
            return;
        }
        match self.events.recv() {
            Ok(event) => {
                self.state.apply(event);
                self.poll_events();
            }
            Err(_) => self.hang_up(),
        }
    }

    fn poll_events(&mut self) {
        loop {
            match self.events.try_recv() {
                Ok(event) => self.state.apply(event),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.hang_up();
                    break;
                }
            }
        }
    }

    fn close_requested(&self) -> bool {
        self.state.close_requested()
    }
}
