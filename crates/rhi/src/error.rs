//! RHI-specific error types.
//!
//! Everything in here is fatal for the frame loop. Out-of-date and suboptimal
//! surfaces are reported through [`crate::swapchain::SurfaceStatus`] instead.

use ash::vk;
use thiserror::Error;

/// RHI-specific error type.
#[derive(Error, Debug)]
pub enum RhiError {
    /// Vulkan API error
    #[error("Vulkan error: {0}")]
    VulkanError(#[from] vk::Result),

    /// Failed to load Vulkan
    #[error("Failed to load Vulkan: {0}")]
    LoadingError(#[from] ash::LoadingError),

    /// GPU allocator error
    #[error("Allocator error: {0}")]
    AllocatorError(#[from] gpu_allocator::AllocationError),

    /// No suitable GPU found
    #[error("No suitable GPU found")]
    NoSuitableGpu,

    /// None of the candidate depth formats can be used as a depth attachment
    #[error("No supported depth format among {0:?}")]
    NoSupportedDepthFormat(Vec<vk::Format>),

    /// Shader loading error
    #[error("Shader error: {0}")]
    ShaderError(String),

    /// Surface error
    #[error("Surface error: {0}")]
    SurfaceError(String),

    /// Swapchain error
    #[error("Swapchain error: {0}")]
    SwapchainError(String),

    /// A rebuilt chain resolved to different attachment formats than its predecessor
    #[error("Swapchain {attachment} format changed from {expected:?} to {found:?}")]
    FormatMismatch {
        /// Which attachment changed ("color" or "depth")
        attachment: &'static str,
        /// Format of the previous chain
        expected: vk::Format,
        /// Format of the rebuilt chain
        found: vk::Format,
    },

    /// Pipeline creation error
    #[error("Pipeline error: {0}")]
    PipelineError(String),

    /// Buffer sizing or mapping error
    #[error("Buffer error: {0}")]
    BufferError(String),

    /// Descriptor pool or layout error
    #[error("Descriptor error: {0}")]
    DescriptorError(String),
}

/// Result type alias for RHI operations.
pub type RhiResult<T> = std::result::Result<T, RhiError>;
