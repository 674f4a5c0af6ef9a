//! Command pool and command buffer management.
//!
//! - [`CommandPool`] allocates and frees primary command buffers.
//! - [`CommandBuffer`] wraps a borrowed `VkCommandBuffer` handle with the
//!   recording calls the renderer and its render systems use.

use std::sync::Arc;

use ash::vk;
use tracing::info;

use crate::device::Device;
use crate::error::RhiResult;

/// Vulkan command pool wrapper.
///
/// Created with `RESET_COMMAND_BUFFER`, so each buffer is reset implicitly
/// when recording begins again.
///
/// # Thread Safety
///
/// Command pools are externally synchronized; record from one thread.
pub struct CommandPool {
    device: Arc<Device>,
    pool: vk::CommandPool,
    queue_family_index: u32,
}

impl CommandPool {
    /// Creates a command pool for the given queue family.
    pub fn new(device: Arc<Device>, queue_family_index: u32) -> RhiResult<Self> {
        let create_info = vk::CommandPoolCreateInfo::default()
            .queue_family_index(queue_family_index)
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);

        let pool = unsafe { device.handle().create_command_pool(&create_info, None)? };

        info!(
            "Command pool created for queue family {}",
            queue_family_index
        );

        Ok(Self {
            device,
            pool,
            queue_family_index,
        })
    }

    /// Returns the Vulkan command pool handle.
    #[inline]
    pub fn handle(&self) -> vk::CommandPool {
        self.pool
    }

    /// Allocates `count` primary command buffers.
    pub fn allocate_command_buffers(&self, count: u32) -> RhiResult<Vec<vk::CommandBuffer>> {
        let alloc_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(self.pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(count);

        Ok(unsafe { self.device.handle().allocate_command_buffers(&alloc_info)? })
    }

    /// Returns command buffers to the pool. None of them may be pending.
    pub fn free_command_buffers(&self, buffers: &[vk::CommandBuffer]) {
        if buffers.is_empty() {
            return;
        }
        unsafe {
            self.device
                .handle()
                .free_command_buffers(self.pool, buffers);
        }
    }
}

impl Drop for CommandPool {
    fn drop(&mut self) {
        unsafe {
            self.device.handle().destroy_command_pool(self.pool, None);
        }
        info!(
            "Command pool destroyed for queue family {}",
            self.queue_family_index
        );
    }
}

/// Recording interface over a command buffer owned by a [`CommandPool`].
///
/// Does not free the buffer on drop.
#[derive(Clone)]
pub struct CommandBuffer {
    device: Arc<Device>,
    buffer: vk::CommandBuffer,
}

impl CommandBuffer {
    /// Wraps an existing command buffer handle.
    #[inline]
    pub fn from_handle(device: Arc<Device>, buffer: vk::CommandBuffer) -> Self {
        Self { device, buffer }
    }

    /// Returns the raw Vulkan command buffer handle.
    #[inline]
    pub fn handle(&self) -> vk::CommandBuffer {
        self.buffer
    }

    // =========================================================================
    // Recording Control
    // =========================================================================

    /// Begins one-time-submit recording.
    pub fn begin(&self) -> RhiResult<()> {
        let begin_info = vk::CommandBufferBeginInfo::default()
            .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);

        unsafe {
            self.device
                .handle()
                .begin_command_buffer(self.buffer, &begin_info)?;
        }
        Ok(())
    }

    /// Ends recording; the buffer is then ready for submission.
    pub fn end(&self) -> RhiResult<()> {
        unsafe {
            self.device.handle().end_command_buffer(self.buffer)?;
        }
        Ok(())
    }

    // =========================================================================
    // Render Passes
    // =========================================================================

    /// Begins a render pass with inline subpass contents.
    pub fn begin_render_pass(&self, begin_info: &vk::RenderPassBeginInfo) {
        unsafe {
            self.device.handle().cmd_begin_render_pass(
                self.buffer,
                begin_info,
                vk::SubpassContents::INLINE,
            );
        }
    }

    /// Ends the current render pass.
    pub fn end_render_pass(&self) {
        unsafe {
            self.device.handle().cmd_end_render_pass(self.buffer);
        }
    }

    /// Sets viewport 0.
    pub fn set_viewport(&self, viewport: &vk::Viewport) {
        unsafe {
            self.device
                .handle()
                .cmd_set_viewport(self.buffer, 0, std::slice::from_ref(viewport));
        }
    }

    /// Sets scissor 0.
    pub fn set_scissor(&self, scissor: &vk::Rect2D) {
        unsafe {
            self.device
                .handle()
                .cmd_set_scissor(self.buffer, 0, std::slice::from_ref(scissor));
        }
    }

    // =========================================================================
    // Binding
    // =========================================================================

    /// Binds a graphics pipeline.
    pub fn bind_graphics_pipeline(&self, pipeline: vk::Pipeline) {
        unsafe {
            self.device.handle().cmd_bind_pipeline(
                self.buffer,
                vk::PipelineBindPoint::GRAPHICS,
                pipeline,
            );
        }
    }

    /// Binds vertex buffers starting at `first_binding`.
    pub fn bind_vertex_buffers(
        &self,
        first_binding: u32,
        buffers: &[vk::Buffer],
        offsets: &[vk::DeviceSize],
    ) {
        unsafe {
            self.device
                .handle()
                .cmd_bind_vertex_buffers(self.buffer, first_binding, buffers, offsets);
        }
    }

    /// Binds a `u32` index buffer.
    pub fn bind_index_buffer(&self, buffer: vk::Buffer, offset: vk::DeviceSize) {
        unsafe {
            self.device.handle().cmd_bind_index_buffer(
                self.buffer,
                buffer,
                offset,
                vk::IndexType::UINT32,
            );
        }
    }

    /// Binds graphics descriptor sets starting at `first_set`.
    pub fn bind_descriptor_sets(
        &self,
        layout: vk::PipelineLayout,
        first_set: u32,
        descriptor_sets: &[vk::DescriptorSet],
    ) {
        unsafe {
            self.device.handle().cmd_bind_descriptor_sets(
                self.buffer,
                vk::PipelineBindPoint::GRAPHICS,
                layout,
                first_set,
                descriptor_sets,
                &[],
            );
        }
    }

    /// Updates push constants from a plain-old-data value.
    pub fn push_constants<T: bytemuck::Pod>(
        &self,
        layout: vk::PipelineLayout,
        stages: vk::ShaderStageFlags,
        offset: u32,
        data: &T,
    ) {
        unsafe {
            self.device.handle().cmd_push_constants(
                self.buffer,
                layout,
                stages,
                offset,
                bytemuck::bytes_of(data),
            );
        }
    }

    // =========================================================================
    // Drawing
    // =========================================================================

    /// Records a non-indexed draw.
    pub fn draw(
        &self,
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    ) {
        unsafe {
            self.device.handle().cmd_draw(
                self.buffer,
                vertex_count,
                instance_count,
                first_vertex,
                first_instance,
            );
        }
    }

    /// Records an indexed draw.
    pub fn draw_indexed(
        &self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    ) {
        unsafe {
            self.device.handle().cmd_draw_indexed(
                self.buffer,
                index_count,
                instance_count,
                first_index,
                vertex_offset,
                first_instance,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_buffer_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<CommandBuffer>();
    }

    #[test]
    fn test_command_pool_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<CommandPool>();
    }
}
