//! Vulkan abstraction layer (Render Hardware Interface).
//!
//! Thin, safe wrappers over `ash` used by the renderer:
//! - Instance, physical device selection and logical device creation
//! - The presentation chain and its per-image attachments
//! - Per-frame synchronization primitives
//! - Command buffers, buffers, descriptors and pipelines

mod error;

pub mod buffer;
pub mod command;
pub mod descriptor;
pub mod device;
pub mod image;
pub mod instance;
pub mod physical_device;
pub mod pipeline;
pub mod render_pass;
pub mod shader;
pub mod swapchain;
pub mod sync;
pub mod vertex;

pub use error::{RhiError, RhiResult};
pub use swapchain::{
    ACQUIRE_TIMEOUT, AcquireOutcome, ChainFormats, ChainRequest, PresentModePolicy,
    PresentationChain, SurfaceChain, SurfaceStatus,
};
pub use sync::{FrameSlot, FrameSubmit, SyncDevice};

// Re-export ash types that users might need
pub use ash::vk;
