//! Per-frame uniform data shared by every render system.
//!
//! [`GlobalUbo`] matches the std140 `GlobalUbo` block at set 0, binding 0 in
//! the shaders. [`FrameUniforms`] keeps one host-visible copy per frame in
//! flight so the CPU never writes a buffer the GPU may still be reading.

use std::sync::Arc;

use ash::vk;
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3, Vec4};
use tracing::debug;

use lumen_rhi::RhiResult;
use lumen_rhi::buffer::{Buffer, BufferUsage};
use lumen_rhi::descriptor::{
    DescriptorPool, DescriptorSetLayout, uniform_buffer_binding, uniform_pool_sizes,
    write_uniform_buffer,
};
use lumen_rhi::device::Device;

/// Global uniform buffer data.
///
/// # Memory Layout
///
/// - Offset 0: projection * view (64 bytes)
/// - Offset 64: ambient light color, w = intensity (16 bytes)
/// - Offset 80: light position (12 bytes)
/// - Offset 92: padding (4 bytes)
/// - Offset 96: light color, w = intensity (16 bytes)
/// - Total size: 112 bytes
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct GlobalUbo {
    pub projection_view: Mat4,
    pub ambient_light_color: Vec4,
    pub light_position: Vec3,
    pub _padding: f32,
    pub light_color: Vec4,
}

impl GlobalUbo {
    /// Size of the struct in bytes.
    pub const SIZE: usize = std::mem::size_of::<Self>();

    /// Faint white ambient light.
    pub const DEFAULT_AMBIENT: Vec4 = Vec4::new(1.0, 1.0, 1.0, 0.02);

    pub fn new(projection_view: Mat4) -> Self {
        Self {
            projection_view,
            ..Self::default()
        }
    }

    /// Sets the light used for diffuse shading.
    pub fn with_light(mut self, position: Vec3, color: Vec3, intensity: f32) -> Self {
        self.light_position = position;
        self.light_color = color.extend(intensity);
        self
    }
}

impl Default for GlobalUbo {
    fn default() -> Self {
        Self {
            projection_view: Mat4::IDENTITY,
            ambient_light_color: Self::DEFAULT_AMBIENT,
            light_position: Vec3::ZERO,
            _padding: 0.0,
            light_color: Vec4::ZERO,
        }
    }
}

/// One uniform buffer and descriptor set per frame in flight.
///
/// Fields drop in declaration order; the pool frees the sets.
pub struct FrameUniforms {
    descriptor_sets: Vec<vk::DescriptorSet>,
    buffers: Vec<Buffer>,
    _pool: DescriptorPool,
    layout: DescriptorSetLayout,
}

impl FrameUniforms {
    /// Binding of the global uniform buffer within set 0.
    pub const BINDING: u32 = 0;

    /// Creates `frames_in_flight` buffers and the sets pointing at them.
    pub fn new(device: Arc<Device>, frames_in_flight: usize) -> RhiResult<Self> {
        let bindings = [uniform_buffer_binding(
            Self::BINDING,
            vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT,
        )];
        let layout = DescriptorSetLayout::new(device.clone(), &bindings)?;

        let set_count = frames_in_flight as u32;
        let pool = DescriptorPool::new(device.clone(), set_count, &uniform_pool_sizes(set_count))?;

        let buffers = (0..frames_in_flight)
            .map(|_| {
                Buffer::new_with_data(
                    device.clone(),
                    BufferUsage::Uniform,
                    bytemuck::bytes_of(&GlobalUbo::default()),
                )
            })
            .collect::<RhiResult<Vec<_>>>()?;

        let layouts = vec![layout.handle(); frames_in_flight];
        let descriptor_sets = pool.allocate(&layouts)?;

        for (set, buffer) in descriptor_sets.iter().zip(&buffers) {
            write_uniform_buffer(&device, *set, Self::BINDING, buffer.descriptor_info());
        }

        debug!(
            "Created {} global uniform buffers of {} bytes",
            buffers.len(),
            GlobalUbo::SIZE
        );

        Ok(Self {
            descriptor_sets,
            buffers,
            _pool: pool,
            layout,
        })
    }

    /// Layout of set 0, for pipeline layouts.
    #[inline]
    pub fn layout(&self) -> vk::DescriptorSetLayout {
        self.layout.handle()
    }

    #[inline]
    pub fn descriptor_set(&self, frame_index: usize) -> vk::DescriptorSet {
        self.descriptor_sets[frame_index]
    }

    /// Writes `ubo` into the buffer of `frame_index`.
    ///
    /// The frame's fence must have been waited on, which
    /// `Renderer::begin_frame` does.
    pub fn update(&self, frame_index: usize, ubo: &GlobalUbo) -> RhiResult<()> {
        self.buffers[frame_index].write_value(ubo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_ubo_size() {
        // Mat4 (64) + Vec4 (16) + Vec3 (12) + padding (4) + Vec4 (16) = 112 bytes
        assert_eq!(GlobalUbo::SIZE, 112);
    }

    #[test]
    fn test_global_ubo_std140_offsets() {
        assert_eq!(std::mem::offset_of!(GlobalUbo, ambient_light_color), 64);
        assert_eq!(std::mem::offset_of!(GlobalUbo, light_position), 80);
        assert_eq!(std::mem::offset_of!(GlobalUbo, light_color), 96);
    }

    #[test]
    fn test_global_ubo_default() {
        let ubo = GlobalUbo::default();
        assert_eq!(ubo.projection_view, Mat4::IDENTITY);
        assert_eq!(ubo.ambient_light_color, Vec4::new(1.0, 1.0, 1.0, 0.02));
        assert_eq!(ubo.light_color, Vec4::ZERO);
    }

    #[test]
    fn test_global_ubo_with_light() {
        let projection_view = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
        let ubo = GlobalUbo::new(projection_view).with_light(
            Vec3::new(0.0, -1.0, 0.0),
            Vec3::new(1.0, 0.5, 0.25),
            2.0,
        );

        assert_eq!(ubo.projection_view, projection_view);
        assert_eq!(ubo.light_position, Vec3::new(0.0, -1.0, 0.0));
        assert_eq!(ubo.light_color, Vec4::new(1.0, 0.5, 0.25, 2.0));
        assert_eq!(bytemuck::bytes_of(&ubo).len(), GlobalUbo::SIZE);
    }
}
