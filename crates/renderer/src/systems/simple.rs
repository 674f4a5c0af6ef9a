use std::path::Path;
use std::sync::Arc;

use ash::vk;
use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use tracing::info;

use lumen_rhi::RhiResult;
use lumen_rhi::device::Device;
use lumen_rhi::pipeline::{GraphicsPipelineBuilder, Pipeline, PipelineLayout};
use lumen_rhi::vertex::Vertex;
use lumen_scene::{DrawableRegistry, TransformComponent};

use crate::frame::FrameInfo;
use crate::mesh::Mesh;

/// Per-drawable push constants.
///
/// # Memory Layout
///
/// - Offset 0: model matrix (64 bytes)
/// - Offset 64: normal matrix, upper 3x3 used (64 bytes)
/// - Total size: 128 bytes
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct SimplePushConstants {
    pub model_matrix: Mat4,
    pub normal_matrix: Mat4,
}

impl SimplePushConstants {
    pub const SIZE: usize = std::mem::size_of::<Self>();

    pub const STAGES: vk::ShaderStageFlags = vk::ShaderStageFlags::from_raw(
        vk::ShaderStageFlags::VERTEX.as_raw() | vk::ShaderStageFlags::FRAGMENT.as_raw(),
    );

    pub fn from_transform(transform: &TransformComponent) -> Self {
        Self {
            model_matrix: transform.mat4(),
            normal_matrix: Mat4::from_mat3(transform.normal_matrix()),
        }
    }

    fn range() -> vk::PushConstantRange {
        vk::PushConstantRange {
            stage_flags: Self::STAGES,
            offset: 0,
            size: Self::SIZE as u32,
        }
    }
}

/// Draws every drawable that has a mesh with vertex colors and diffuse
/// lighting from the global uniform buffer.
pub struct SimpleRenderSystem {
    pipeline: Pipeline,
    layout: PipelineLayout,
}

impl SimpleRenderSystem {
    /// Builds the pipeline for `render_pass` from `simple_shader.{vert,frag}.spv`
    /// in `shader_dir`.
    pub fn new(
        device: Arc<Device>,
        render_pass: vk::RenderPass,
        global_set_layout: vk::DescriptorSetLayout,
        shader_dir: &Path,
    ) -> RhiResult<Self> {
        let (vertex_shader, fragment_shader) =
            super::load_shader_pair(&device, shader_dir, "simple_shader")?;

        let layout = PipelineLayout::new(
            device.clone(),
            &[global_set_layout],
            &[SimplePushConstants::range()],
        )?;

        let pipeline = GraphicsPipelineBuilder::new()
            .vertex_shader(&vertex_shader)
            .fragment_shader(&fragment_shader)
            .vertex_binding(Vertex::binding_description())
            .vertex_attributes(&Vertex::attribute_descriptions())
            .build(device, &layout, render_pass)?;

        info!("Simple render system created");

        Ok(Self { pipeline, layout })
    }

    /// Records one bind and draw per drawable with a mesh.
    pub fn render(&self, frame: &FrameInfo<'_>, drawables: &DrawableRegistry<Mesh>) {
        let cmd = frame.command_buffer;
        cmd.bind_graphics_pipeline(self.pipeline.handle());
        cmd.bind_descriptor_sets(self.layout.handle(), 0, &[frame.global_descriptor_set]);

        for (drawable, mesh) in drawables.with_meshes() {
            let push = SimplePushConstants::from_transform(&drawable.transform);
            cmd.push_constants(self.layout.handle(), SimplePushConstants::STAGES, 0, &push);
            mesh.bind(cmd);
            mesh.draw(cmd);
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::{Mat3, Vec3};

    use super::*;

    #[test]
    fn test_push_constants_size() {
        // Vulkan guarantees at least 128 bytes of push constants.
        assert_eq!(SimplePushConstants::SIZE, 128);
        assert_eq!(SimplePushConstants::range().size, 128);
    }

    #[test]
    fn test_push_constants_stages() {
        assert!(SimplePushConstants::STAGES.contains(vk::ShaderStageFlags::VERTEX));
        assert!(SimplePushConstants::STAGES.contains(vk::ShaderStageFlags::FRAGMENT));
    }

    #[test]
    fn test_push_constants_from_transform() {
        let transform = TransformComponent::new()
            .with_translation(Vec3::new(1.0, 2.0, 3.0))
            .with_scale(Vec3::new(2.0, 2.0, 2.0));
        let push = SimplePushConstants::from_transform(&transform);

        assert_eq!(push.model_matrix, transform.mat4());
        assert_eq!(
            Mat3::from_mat4(push.normal_matrix),
            transform.normal_matrix()
        );
        assert_eq!(push.normal_matrix.w_axis, glam::Vec4::W);
    }
}
