//! What a render system receives for one frame.

use ash::vk;

use lumen_rhi::command::CommandBuffer;
use lumen_scene::Camera;

/// Per-frame context handed to render systems between `begin_pass` and
/// `end_pass`.
pub struct FrameInfo<'a> {
    /// Active frame slot, in `0..frames_in_flight`.
    pub frame_index: usize,
    /// Seconds since the previous frame.
    pub frame_time: f32,
    /// Recorder for the command buffer returned by `begin_frame`.
    pub command_buffer: &'a CommandBuffer,
    pub camera: &'a Camera,
    /// Set 0 for this frame, pointing at its global uniform buffer.
    pub global_descriptor_set: vk::DescriptorSet,
}
