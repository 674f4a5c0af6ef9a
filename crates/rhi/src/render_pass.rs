//! Render pass and framebuffer objects for presenting to the swapchain.

use std::sync::Arc;

use ash::vk;
use tracing::debug;

use crate::device::Device;
use crate::error::RhiResult;

/// Index of the color attachment in the swapchain render pass.
pub const COLOR_ATTACHMENT: u32 = 0;
/// Index of the depth attachment in the swapchain render pass.
pub const DEPTH_ATTACHMENT: u32 = 1;

/// A `VkRenderPass` destroyed on drop.
pub struct RenderPass {
    device: Arc<Device>,
    render_pass: vk::RenderPass,
}

impl RenderPass {
    /// Builds the single-subpass color + depth pass used for swapchain images.
    ///
    /// Color is cleared, stored, and left in `PRESENT_SRC_KHR`. Depth is
    /// cleared and discarded.
    pub fn for_swapchain(
        device: Arc<Device>,
        color_format: vk::Format,
        depth_format: vk::Format,
    ) -> RhiResult<Self> {
        let attachments = swapchain_attachments(color_format, depth_format);

        let color_refs = [vk::AttachmentReference {
            attachment: COLOR_ATTACHMENT,
            layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        }];
        let depth_ref = vk::AttachmentReference {
            attachment: DEPTH_ATTACHMENT,
            layout: vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
        };

        let subpasses = [vk::SubpassDescription::default()
            .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
            .color_attachments(&color_refs)
            .depth_stencil_attachment(&depth_ref)];
        let dependencies = [swapchain_dependency()];

        let create_info = vk::RenderPassCreateInfo::default()
            .attachments(&attachments)
            .subpasses(&subpasses)
            .dependencies(&dependencies);

        let render_pass = unsafe { device.handle().create_render_pass(&create_info, None)? };

        debug!(
            "Created swapchain render pass (color {:?}, depth {:?})",
            color_format, depth_format
        );

        Ok(Self {
            device,
            render_pass,
        })
    }

    /// Returns the Vulkan render pass handle.
    #[inline]
    pub fn handle(&self) -> vk::RenderPass {
        self.render_pass
    }
}

impl Drop for RenderPass {
    fn drop(&mut self) {
        unsafe { self.device.handle().destroy_render_pass(self.render_pass, None) };
    }
}

/// A `VkFramebuffer` destroyed on drop.
pub struct Framebuffer {
    device: Arc<Device>,
    framebuffer: vk::Framebuffer,
}

impl Framebuffer {
    /// Creates a single-layer framebuffer over `attachments` for `render_pass`.
    pub fn new(
        device: Arc<Device>,
        render_pass: vk::RenderPass,
        attachments: &[vk::ImageView],
        extent: vk::Extent2D,
    ) -> RhiResult<Self> {
        let create_info = vk::FramebufferCreateInfo::default()
            .render_pass(render_pass)
            .attachments(attachments)
            .width(extent.width)
            .height(extent.height)
            .layers(1);

        let framebuffer = unsafe { device.handle().create_framebuffer(&create_info, None)? };

        Ok(Self {
            device,
            framebuffer,
        })
    }

    /// Returns the Vulkan framebuffer handle.
    #[inline]
    pub fn handle(&self) -> vk::Framebuffer {
        self.framebuffer
    }
}

impl Drop for Framebuffer {
    fn drop(&mut self) {
        unsafe { self.device.handle().destroy_framebuffer(self.framebuffer, None) };
    }
}

fn swapchain_attachments(
    color_format: vk::Format,
    depth_format: vk::Format,
) -> [vk::AttachmentDescription; 2] {
    let color = vk::AttachmentDescription::default()
        .format(color_format)
        .samples(vk::SampleCountFlags::TYPE_1)
        .load_op(vk::AttachmentLoadOp::CLEAR)
        .store_op(vk::AttachmentStoreOp::STORE)
        .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
        .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
        .initial_layout(vk::ImageLayout::UNDEFINED)
        .final_layout(vk::ImageLayout::PRESENT_SRC_KHR);

    let depth = vk::AttachmentDescription::default()
        .format(depth_format)
        .samples(vk::SampleCountFlags::TYPE_1)
        .load_op(vk::AttachmentLoadOp::CLEAR)
        .store_op(vk::AttachmentStoreOp::DONT_CARE)
        .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
        .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
        .initial_layout(vk::ImageLayout::UNDEFINED)
        .final_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL);

    [color, depth]
}

/// External-to-subpass dependency: color and depth writes wait for the
/// previous frame's color output and early depth tests.
fn swapchain_dependency() -> vk::SubpassDependency {
    let stages = vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT
        | vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS;

    vk::SubpassDependency::default()
        .src_subpass(vk::SUBPASS_EXTERNAL)
        .dst_subpass(0)
        .src_stage_mask(stages)
        .src_access_mask(vk::AccessFlags::empty())
        .dst_stage_mask(stages)
        .dst_access_mask(
            vk::AccessFlags::COLOR_ATTACHMENT_WRITE
                | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_attachment_ends_presentable() {
        let [color, _] = swapchain_attachments(vk::Format::B8G8R8A8_SRGB, vk::Format::D32_SFLOAT);
        assert_eq!(color.format, vk::Format::B8G8R8A8_SRGB);
        assert_eq!(color.load_op, vk::AttachmentLoadOp::CLEAR);
        assert_eq!(color.store_op, vk::AttachmentStoreOp::STORE);
        assert_eq!(color.final_layout, vk::ImageLayout::PRESENT_SRC_KHR);
    }

    #[test]
    fn test_depth_attachment_is_discarded() {
        let [_, depth] = swapchain_attachments(vk::Format::B8G8R8A8_SRGB, vk::Format::D32_SFLOAT);
        assert_eq!(depth.format, vk::Format::D32_SFLOAT);
        assert_eq!(depth.load_op, vk::AttachmentLoadOp::CLEAR);
        assert_eq!(depth.store_op, vk::AttachmentStoreOp::DONT_CARE);
        assert_eq!(
            depth.final_layout,
            vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL
        );
    }

    #[test]
    fn test_dependency_blocks_color_and_depth_writes() {
        let dep = swapchain_dependency();
        assert_eq!(dep.src_subpass, vk::SUBPASS_EXTERNAL);
        assert_eq!(dep.dst_subpass, 0);
        assert!(
            dep.src_stage_mask
                .contains(vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS)
        );
        assert!(
            dep.dst_access_mask
                .contains(vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE)
        );
        assert!(
            dep.dst_access_mask
                .contains(vk::AccessFlags::COLOR_ATTACHMENT_WRITE)
        );
    }
}
