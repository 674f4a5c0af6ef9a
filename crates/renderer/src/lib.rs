//! Frame rendering on top of `lumen_rhi`.
//!
//! This crate orchestrates the rendering process:
//! - [`FrameSynchronizer`]: the acquire/submit/present protocol
//! - [`Renderer`]: the begin/end frame and pass state machine, and chain
//!   rebuilds on resize or stale surfaces
//! - [`VulkanBackend`]: the device side of [`RenderBackend`]
//! - Render systems, meshes and the per-frame uniform buffer

pub mod backend;
pub mod frame;
pub mod frame_sync;
pub mod mesh;
pub mod renderer;
pub mod systems;
pub mod ubo;
pub mod vulkan;

pub use backend::{PassBeginInfo, RenderBackend};
pub use frame::FrameInfo;
pub use frame_sync::{FrameSynchronizer, PresentOutcome};
pub use mesh::{Mesh, MeshData};
pub use renderer::{FrameState, Renderer, RendererSettings};
pub use systems::{PointLightSystem, SimpleRenderSystem};
pub use ubo::{FrameUniforms, GlobalUbo};
pub use vulkan::VulkanBackend;

/// Maximum number of frames that can be in flight simultaneously.
pub const MAX_FRAMES_IN_FLIGHT: usize = 2;
