use std::path::Path;
use std::sync::Arc;

use ash::vk;
use bytemuck::{Pod, Zeroable};
use glam::Vec4;
use tracing::info;

use lumen_rhi::RhiResult;
use lumen_rhi::device::Device;
use lumen_rhi::pipeline::{ColorBlend, GraphicsPipelineBuilder, Pipeline, PipelineLayout};
use lumen_scene::{Drawable, DrawableRegistry, PointLightComponent};

use crate::frame::FrameInfo;
use crate::mesh::Mesh;
use crate::ubo::GlobalUbo;

/// Vertices of the camera-facing billboard, generated in the vertex shader.
const BILLBOARD_VERTICES: u32 = 6;

/// Per-light push constants.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct PointLightPushConstants {
    /// xyz = world position, w = billboard radius.
    pub position: Vec4,
    /// rgb = color, a = intensity.
    pub color: Vec4,
}

impl PointLightPushConstants {
    pub const SIZE: usize = std::mem::size_of::<Self>();

    pub const STAGES: vk::ShaderStageFlags = vk::ShaderStageFlags::from_raw(
        vk::ShaderStageFlags::VERTEX.as_raw() | vk::ShaderStageFlags::FRAGMENT.as_raw(),
    );

    pub fn new(drawable: &Drawable<Mesh>, light: PointLightComponent) -> Self {
        Self {
            position: drawable.transform.translation.extend(light.radius),
            color: drawable.color.extend(light.intensity),
        }
    }
}

/// Draws a glowing billboard for every drawable with a point light.
pub struct PointLightSystem {
    pipeline: Pipeline,
    layout: PipelineLayout,
}

impl PointLightSystem {
    /// Builds the pipeline for `render_pass` from `point_light.{vert,frag}.spv`
    /// in `shader_dir`.
    pub fn new(
        device: Arc<Device>,
        render_pass: vk::RenderPass,
        global_set_layout: vk::DescriptorSetLayout,
        shader_dir: &Path,
    ) -> RhiResult<Self> {
        let (vertex_shader, fragment_shader) =
            super::load_shader_pair(&device, shader_dir, "point_light")?;

        let push_range = vk::PushConstantRange {
            stage_flags: PointLightPushConstants::STAGES,
            offset: 0,
            size: PointLightPushConstants::SIZE as u32,
        };
        let layout = PipelineLayout::new(device.clone(), &[global_set_layout], &[push_range])?;

        let pipeline = GraphicsPipelineBuilder::new()
            .vertex_shader(&vertex_shader)
            .fragment_shader(&fragment_shader)
            .color_blend(ColorBlend::Alpha)
            .depth_write_enable(false)
            .build(device, &layout, render_pass)?;

        info!("Point light system created");

        Ok(Self { pipeline, layout })
    }

    /// Copies the first point light into `ubo`; leaves it dark without one.
    pub fn update(&self, drawables: &DrawableRegistry<Mesh>, ubo: &mut GlobalUbo) {
        write_first_light(drawables, ubo);
    }

    pub fn render(&self, frame: &FrameInfo<'_>, drawables: &DrawableRegistry<Mesh>) {
        let cmd = frame.command_buffer;
        cmd.bind_graphics_pipeline(self.pipeline.handle());
        cmd.bind_descriptor_sets(self.layout.handle(), 0, &[frame.global_descriptor_set]);

        for (drawable, light) in drawables.point_lights() {
            let push = PointLightPushConstants::new(drawable, light);
            cmd.push_constants(self.layout.handle(), PointLightPushConstants::STAGES, 0, &push);
            cmd.draw(BILLBOARD_VERTICES, 1, 0, 0);
        }
    }
}

fn write_first_light(drawables: &DrawableRegistry<Mesh>, ubo: &mut GlobalUbo) {
    match drawables.point_lights().next() {
        Some((drawable, light)) => {
            ubo.light_position = drawable.transform.translation;
            ubo.light_color = drawable.color.extend(light.intensity);
        }
        None => ubo.light_color = Vec4::ZERO,
    }
}
