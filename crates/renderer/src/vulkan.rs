//! [`RenderBackend`] over a real Vulkan device.

use std::sync::Arc;

use ash::vk;
use tracing::info;

use lumen_platform::{Surface, WindowSurface, required_surface_extensions};
use lumen_rhi::command::{CommandBuffer, CommandPool};
use lumen_rhi::device::Device;
use lumen_rhi::instance::Instance;
use lumen_rhi::physical_device::select_physical_device;
use lumen_rhi::{ChainRequest, FrameSubmit, RhiError, RhiResult, SurfaceChain, SyncDevice};

use crate::backend::{PassBeginInfo, RenderBackend};

/// Instance, surface, device and the command pool frames record from.
///
/// Fields drop in declaration order: the pool before the device, the
/// surface before the instance. Everything else holding the device must be
/// dropped first.
pub struct VulkanBackend {
    command_pool: CommandPool,
    device: Arc<Device>,
    surface: Surface,
    instance: Instance,
}

impl VulkanBackend {
    /// Brings up Vulkan for `window`.
    ///
    /// # Errors
    ///
    /// Returns an error if the loader, instance, surface, device or command
    /// pool cannot be created, or no GPU can present to the window.
    pub fn new(window: &WindowSurface, enable_validation: bool) -> RhiResult<Self> {
        let extensions = required_surface_extensions(window.window())
            .map_err(|e| RhiError::SurfaceError(e.to_string()))?;

        let instance = Instance::new(c"lumen", enable_validation, &extensions)?;

        let surface = window
            .create_surface(instance.entry(), instance.handle())
            .map_err(|e| RhiError::SurfaceError(e.to_string()))?;

        let physical_device =
            select_physical_device(instance.handle(), surface.handle(), surface.loader())?;
        info!(
            "Using {} ({})",
            physical_device.device_name(),
            physical_device.device_type_name()
        );

        let device = Device::new(&instance, &physical_device)?;

        let graphics_family = device
            .queue_families()
            .graphics_family
            .ok_or(RhiError::NoSuitableGpu)?;
        let command_pool = CommandPool::new(device.clone(), graphics_family)?;

        Ok(Self {
            command_pool,
            device,
            surface,
            instance,
        })
    }

    /// The logical device, for creating pipelines, buffers and descriptors.
    #[inline]
    pub fn device(&self) -> &Arc<Device> {
        &self.device
    }

    #[inline]
    pub fn instance(&self) -> &Instance {
        &self.instance
    }

    fn recorder(&self, command_buffer: vk::CommandBuffer) -> CommandBuffer {
        CommandBuffer::from_handle(self.device.clone(), command_buffer)
    }
}

impl SyncDevice for VulkanBackend {
    fn create_semaphore(&self) -> RhiResult<vk::Semaphore> {
        self.device.create_semaphore()
    }

    fn create_fence(&self, signaled: bool) -> RhiResult<vk::Fence> {
        self.device.create_fence(signaled)
    }

    fn destroy_semaphore(&self, semaphore: vk::Semaphore) {
        self.device.destroy_semaphore(semaphore);
    }

    fn destroy_fence(&self, fence: vk::Fence) {
        self.device.destroy_fence(fence);
    }

    fn wait_for_fence(&self, fence: vk::Fence, timeout: u64) -> RhiResult<()> {
        self.device.wait_for_fence(fence, timeout)
    }

    fn reset_fence(&self, fence: vk::Fence) -> RhiResult<()> {
        self.device.reset_fence(fence)
    }

    fn submit_frame(&self, submit: &FrameSubmit) -> RhiResult<()> {
        self.device.submit_frame(submit)
    }
}

impl RenderBackend for VulkanBackend {
    type Chain = SurfaceChain;

    fn create_chain(
        &self,
        request: ChainRequest,
        previous: Option<&SurfaceChain>,
    ) -> RhiResult<SurfaceChain> {
        SurfaceChain::new(
            self.device.clone(),
            self.surface.handle(),
            self.surface.loader(),
            request,
            previous,
        )
    }

    fn wait_idle(&self) -> RhiResult<()> {
        self.device.wait_idle()
    }

    fn allocate_command_buffers(&self, count: u32) -> RhiResult<Vec<vk::CommandBuffer>> {
        self.command_pool.allocate_command_buffers(count)
    }

    fn free_command_buffers(&self, command_buffers: &[vk::CommandBuffer]) {
        self.command_pool.free_command_buffers(command_buffers);
    }

    fn begin_commands(&self, command_buffer: vk::CommandBuffer) -> RhiResult<()> {
        self.recorder(command_buffer).begin()
    }

    fn end_commands(&self, command_buffer: vk::CommandBuffer) -> RhiResult<()> {
        self.recorder(command_buffer).end()
    }

    fn begin_pass(&self, command_buffer: vk::CommandBuffer, pass: &PassBeginInfo) {
        let clear_values = pass.clear_values();
        let begin_info = vk::RenderPassBeginInfo::default()
            .render_pass(pass.render_pass)
            .framebuffer(pass.framebuffer)
            .render_area(pass.render_area())
            .clear_values(&clear_values);

        let recorder = self.recorder(command_buffer);
        recorder.begin_render_pass(&begin_info);
        recorder.set_viewport(&pass.viewport);
        recorder.set_scissor(&pass.scissor);
    }

    fn end_pass(&self, command_buffer: vk::CommandBuffer) {
        self.recorder(command_buffer).end_render_pass();
    }
}
