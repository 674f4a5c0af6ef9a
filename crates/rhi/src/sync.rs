//! Synchronization primitives and the seam the frame loop drives them through.
//!
//! - [`SyncDevice`] is everything the frame synchronizer needs from a device:
//!   fence and semaphore lifetime, fence waits and resets, and the per-frame
//!   queue submission. [`Device`] implements it against Vulkan.
//! - [`FrameSlot`] groups the primitives of one frame in flight.
//!
//! # Usage Pattern
//!
//! ```text
//! 1. Wait for the slot's in-flight fence (CPU waits for the GPU)
//! 2. Acquire a swapchain image (signals image_available)
//! 3. Reset the in-flight fence
//! 4. Submit: wait image_available at COLOR_ATTACHMENT_OUTPUT,
//!    signal render_finished and the in-flight fence
//! 5. Present, waiting on render_finished
//! ```
//!
//! Semaphores only order GPU work; the CPU never waits on them.

use ash::vk;
use tracing::debug;

use crate::device::Device;
use crate::error::RhiResult;

/// One frame's queue submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSubmit {
    /// Recorded command buffer to execute.
    pub command_buffer: vk::CommandBuffer,
    /// Semaphore the submission waits on before writing color output.
    pub wait_semaphore: vk::Semaphore,
    /// Stage at which `wait_semaphore` is waited on.
    pub wait_stage: vk::PipelineStageFlags,
    /// Semaphore signaled when the command buffer completes.
    pub signal_semaphore: vk::Semaphore,
    /// Fence signaled when the command buffer completes.
    pub fence: vk::Fence,
}

/// Device operations used by the frame synchronization protocol.
pub trait SyncDevice {
    /// Creates an unsignaled binary semaphore.
    fn create_semaphore(&self) -> RhiResult<vk::Semaphore>;

    /// Creates a fence, optionally already signaled.
    fn create_fence(&self, signaled: bool) -> RhiResult<vk::Fence>;

    /// Destroys a semaphore. It must not be in use.
    fn destroy_semaphore(&self, semaphore: vk::Semaphore);

    /// Destroys a fence. It must not be in use.
    fn destroy_fence(&self, fence: vk::Fence);

    /// Blocks until `fence` is signaled or `timeout` nanoseconds pass.
    fn wait_for_fence(&self, fence: vk::Fence, timeout: u64) -> RhiResult<()>;

    /// Returns `fence` to the unsignaled state.
    fn reset_fence(&self, fence: vk::Fence) -> RhiResult<()>;

    /// Submits one frame's command buffer to the graphics queue.
    fn submit_frame(&self, submit: &FrameSubmit) -> RhiResult<()>;
}

impl SyncDevice for Device {
    fn create_semaphore(&self) -> RhiResult<vk::Semaphore> {
        let create_info = vk::SemaphoreCreateInfo::default();
        Ok(unsafe { self.handle().create_semaphore(&create_info, None)? })
    }

    fn create_fence(&self, signaled: bool) -> RhiResult<vk::Fence> {
        let flags = if signaled {
            vk::FenceCreateFlags::SIGNALED
        } else {
            vk::FenceCreateFlags::empty()
        };
        let create_info = vk::FenceCreateInfo::default().flags(flags);
        Ok(unsafe { self.handle().create_fence(&create_info, None)? })
    }

    fn destroy_semaphore(&self, semaphore: vk::Semaphore) {
        unsafe { self.handle().destroy_semaphore(semaphore, None) };
    }

    fn destroy_fence(&self, fence: vk::Fence) {
        unsafe { self.handle().destroy_fence(fence, None) };
    }

    fn wait_for_fence(&self, fence: vk::Fence, timeout: u64) -> RhiResult<()> {
        unsafe { self.handle().wait_for_fences(&[fence], true, timeout)? };
        Ok(())
    }

    fn reset_fence(&self, fence: vk::Fence) -> RhiResult<()> {
        unsafe { self.handle().reset_fences(&[fence])? };
        Ok(())
    }

    fn submit_frame(&self, submit: &FrameSubmit) -> RhiResult<()> {
        let wait_semaphores = [submit.wait_semaphore];
        let wait_stages = [submit.wait_stage];
        let command_buffers = [submit.command_buffer];
        let signal_semaphores = [submit.signal_semaphore];

        let submit_info = vk::SubmitInfo::default()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores);

        unsafe { self.submit_graphics(&[submit_info], submit.fence) }
    }
}

/// Synchronization primitives for one frame in flight.
///
/// Holds raw handles; [`FrameSlot::destroy`] must be called with the device
/// that created them once the GPU no longer uses them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSlot {
    image_available: vk::Semaphore,
    render_finished: vk::Semaphore,
    in_flight: vk::Fence,
}

impl FrameSlot {
    /// Creates the slot's semaphores and its fence.
    ///
    /// The fence starts signaled so the first wait on a fresh slot returns
    /// immediately.
    pub fn new<D: SyncDevice + ?Sized>(device: &D) -> RhiResult<Self> {
        let image_available = device.create_semaphore()?;
        let render_finished = match device.create_semaphore() {
            Ok(semaphore) => semaphore,
            Err(e) => {
                device.destroy_semaphore(image_available);
                return Err(e);
            }
        };
        let in_flight = match device.create_fence(true) {
            Ok(fence) => fence,
            Err(e) => {
                device.destroy_semaphore(render_finished);
                device.destroy_semaphore(image_available);
                return Err(e);
            }
        };

        debug!("Created frame slot primitives");

        Ok(Self {
            image_available,
            render_finished,
            in_flight,
        })
    }

    /// Signaled by image acquisition, waited on by the submission.
    #[inline]
    pub fn image_available(&self) -> vk::Semaphore {
        self.image_available
    }

    /// Signaled by the submission, waited on by presentation.
    #[inline]
    pub fn render_finished(&self) -> vk::Semaphore {
        self.render_finished
    }

    /// Signaled when the slot's submission retires.
    #[inline]
    pub fn in_flight(&self) -> vk::Fence {
        self.in_flight
    }

    /// The submission description for `command_buffer` on this slot.
    pub fn submit_info(&self, command_buffer: vk::CommandBuffer) -> FrameSubmit {
        FrameSubmit {
            command_buffer,
            wait_semaphore: self.image_available,
            wait_stage: vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
            signal_semaphore: self.render_finished,
            fence: self.in_flight,
        }
    }

    /// Destroys the slot's primitives.
    pub fn destroy<D: SyncDevice + ?Sized>(&self, device: &D) {
        device.destroy_semaphore(self.render_finished);
        device.destroy_semaphore(self.image_available);
        device.destroy_fence(self.in_flight);
    }
}
