//! Host events forwarded from the winit event loop to the render thread.
//!
//! The event loop owns the OS side and must stay on the main thread, so it
//! translates what the renderer cares about into [`HostEvent`]s and sends them
//! over a channel. The render thread folds them into a [`HostState`].

use std::sync::mpsc::{self, Receiver, Sender};

use ash::vk;
use winit::event::{ElementState, WindowEvent};
use winit::keyboard::PhysicalKey;

use crate::input::{InputState, KeyCode};

/// Window events the render thread reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostEvent {
    /// New framebuffer size in physical pixels. Zero while minimized.
    Resized { width: u32, height: u32 },
    Key { code: KeyCode, pressed: bool },
    CloseRequested,
}

impl HostEvent {
    /// Translates a winit window event, dropping the ones nobody consumes.
    pub fn from_window_event(event: &WindowEvent) -> Option<Self> {
        match event {
            WindowEvent::Resized(size) => Some(HostEvent::Resized {
                width: size.width,
                height: size.height,
            }),
            WindowEvent::CloseRequested | WindowEvent::Destroyed => Some(HostEvent::CloseRequested),
            WindowEvent::KeyboardInput { event, .. } => match event.physical_key {
                PhysicalKey::Code(code) => Some(HostEvent::Key {
                    code,
                    pressed: event.state == ElementState::Pressed,
                }),
                PhysicalKey::Unidentified(_) => None,
            },
            _ => None,
        }
    }
}

/// Main-thread end of the host event channel.
#[derive(Debug, Clone)]
pub struct EventForwarder {
    sender: Sender<HostEvent>,
}

impl EventForwarder {
    /// Translates and forwards `event`.
    ///
    /// Returns `false` once the render thread has hung up.
    pub fn forward(&self, event: &WindowEvent) -> bool {
        match HostEvent::from_window_event(event) {
            Some(host_event) => self.send(host_event),
            None => true,
        }
    }

    pub fn send(&self, event: HostEvent) -> bool {
        self.sender.send(event).is_ok()
    }
}

/// Creates the channel carrying host events to the render thread.
pub fn host_channel() -> (EventForwarder, Receiver<HostEvent>) {
    let (sender, receiver) = mpsc::channel();
    (EventForwarder { sender }, receiver)
}

/// Render-thread view of the window, built from [`HostEvent`]s.
#[derive(Debug, Clone)]
pub struct HostState {
    extent: vk::Extent2D,
    resized: bool,
    close_requested: bool,
    input: InputState,
}

impl HostState {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            extent: vk::Extent2D { width, height },
            resized: false,
            close_requested: false,
            input: InputState::new(),
        }
    }

    /// Folds one event into the state.
    pub fn apply(&mut self, event: HostEvent) {
        match event {
            HostEvent::Resized { width, height } => {
                let extent = vk::Extent2D { width, height };
                if extent != self.extent {
                    tracing::debug!("Framebuffer resized: {}x{}", width, height);
                    self.extent = extent;
                    self.resized = true;
                }
            }
            HostEvent::Key { code, pressed: true } => {
                if code == KeyCode::Escape {
                    self.close_requested = true;
                }
                self.input.on_key_pressed(code);
            }
            HostEvent::Key {
                code,
                pressed: false,
            } => self.input.on_key_released(code),
            HostEvent::CloseRequested => self.close_requested = true,
        }
    }

    #[inline]
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    /// Sticky until [`HostState::reset_resized_flag`].
    #[inline]
    pub fn was_resized(&self) -> bool {
        self.resized
    }

    pub fn reset_resized_flag(&mut self) {
        self.resized = false;
    }

    #[inline]
    pub fn close_requested(&self) -> bool {
        self.close_requested
    }

    pub fn request_close(&mut self) {
        self.close_requested = true;
    }

    #[inline]
    pub fn input(&self) -> &InputState {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut InputState {
        &mut self.input
    }
}
