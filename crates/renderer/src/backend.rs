//! The seam between the frame orchestrator and the GPU.
//!
//! [`RenderBackend`] extends [`SyncDevice`] with chain construction, device
//! idling and the handful of command-buffer calls the orchestrator itself
//! makes. Everything a render system records goes straight to Vulkan.

use ash::vk;

use lumen_rhi::{ChainRequest, PresentationChain, RhiResult, SyncDevice};

/// Depth the depth attachment is cleared to.
pub const CLEAR_DEPTH: f32 = 1.0;

/// Stencil value the depth attachment is cleared to.
pub const CLEAR_STENCIL: u32 = 0;

/// What the orchestrator needs from the device.
pub trait RenderBackend: SyncDevice {
    type Chain: PresentationChain;

    /// Builds a chain for `request`, handing `previous` to the present engine
    /// when rebuilding.
    fn create_chain(
        &self,
        request: ChainRequest,
        previous: Option<&Self::Chain>,
    ) -> RhiResult<Self::Chain>;

    /// Blocks until all submitted GPU work has finished.
    fn wait_idle(&self) -> RhiResult<()>;

    fn allocate_command_buffers(&self, count: u32) -> RhiResult<Vec<vk::CommandBuffer>>;

    fn free_command_buffers(&self, command_buffers: &[vk::CommandBuffer]);

    /// Starts one-time-submit recording.
    fn begin_commands(&self, command_buffer: vk::CommandBuffer) -> RhiResult<()>;

    fn end_commands(&self, command_buffer: vk::CommandBuffer) -> RhiResult<()>;

    /// Begins the render pass and sets the dynamic viewport and scissor.
    fn begin_pass(&self, command_buffer: vk::CommandBuffer, pass: &PassBeginInfo);

    fn end_pass(&self, command_buffer: vk::CommandBuffer);
}

/// Everything needed to open the chain's render pass for one image.
#[derive(Debug, Clone, Copy)]
pub struct PassBeginInfo {
    pub render_pass: vk::RenderPass,
    pub framebuffer: vk::Framebuffer,
    pub extent: vk::Extent2D,
    pub clear_color: [f32; 4],
    pub viewport: vk::Viewport,
    pub scissor: vk::Rect2D,
}

impl PassBeginInfo {
    /// Clear values for the color and depth attachments, in attachment order.
    pub fn clear_values(&self) -> [vk::ClearValue; 2] {
        [
            vk::ClearValue {
                color: vk::ClearColorValue {
                    float32: self.clear_color,
                },
            },
            vk::ClearValue {
                depth_stencil: vk::ClearDepthStencilValue {
                    depth: CLEAR_DEPTH,
                    stencil: CLEAR_STENCIL,
                },
            },
        ]
    }

    pub fn render_area(&self) -> vk::Rect2D {
        full_scissor(self.extent)
    }
}

/// Viewport covering `extent` with depth range `[0, 1]`.
///
/// With `flip_y` the viewport starts at the bottom edge with a negative
/// height, so +Y points up in clip space.
pub fn viewport_for(extent: vk::Extent2D, flip_y: bool) -> vk::Viewport {
    let width = extent.width as f32;
    let height = extent.height as f32;
    let (y, height) = if flip_y {
        (height, -height)
    } else {
        (0.0, height)
    };

    vk::Viewport {
        x: 0.0,
        y,
        width,
        height,
        min_depth: 0.0,
        max_depth: 1.0,
    }
}

/// Scissor covering `extent`.
pub fn full_scissor(extent: vk::Extent2D) -> vk::Rect2D {
    vk::Rect2D {
        offset: vk::Offset2D { x: 0, y: 0 },
        extent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXTENT: vk::Extent2D = vk::Extent2D {
        width: 800,
        height: 600,
    };

    #[test]
    fn test_viewport_covers_extent() {
        let viewport = viewport_for(EXTENT, false);
        assert_eq!(viewport.x, 0.0);
        assert_eq!(viewport.y, 0.0);
        assert_eq!(viewport.width, 800.0);
        assert_eq!(viewport.height, 600.0);
        assert_eq!(viewport.min_depth, 0.0);
        assert_eq!(viewport.max_depth, 1.0);
    }

    #[test]
    fn test_flipped_viewport() {
        let viewport = viewport_for(EXTENT, true);
        assert_eq!(viewport.y, 600.0);
        assert_eq!(viewport.height, -600.0);
        assert_eq!(viewport.width, 800.0);
    }

    #[test]
    fn test_scissor_covers_extent() {
        let scissor = full_scissor(EXTENT);
        assert_eq!(scissor.offset.x, 0);
        assert_eq!(scissor.offset.y, 0);
        assert_eq!(scissor.extent, EXTENT);
    }

    #[test]
    fn test_clear_values() {
        let info = PassBeginInfo {
            render_pass: vk::RenderPass::null(),
            framebuffer: vk::Framebuffer::null(),
            extent: EXTENT,
            clear_color: [0.01, 0.01, 0.01, 1.0],
            viewport: viewport_for(EXTENT, false),
            scissor: full_scissor(EXTENT),
        };

        let [color, depth] = info.clear_values();
        // SAFETY: written through the same union members just above.
        unsafe {
            assert_eq!(color.color.float32, [0.01, 0.01, 0.01, 1.0]);
            assert_eq!(depth.depth_stencil.depth, 1.0);
            assert_eq!(depth.depth_stencil.stencil, 0);
        }
        assert_eq!(info.render_area().extent, EXTENT);
    }
}
