//! Graphics pipelines targeting a render pass subpass.
//!
//! - [`PipelineLayout`] ties descriptor set layouts and push constant ranges
//!   together.
//! - [`GraphicsPipelineBuilder`] assembles the fixed-function state. Viewport
//!   and scissor are always dynamic so pipelines survive swapchain rebuilds.

use std::sync::Arc;

use ash::vk;
use tracing::{debug, info};

use crate::device::Device;
use crate::error::{RhiError, RhiResult};
use crate::shader::{Shader, ShaderStage};

/// Vulkan pipeline layout wrapper.
pub struct PipelineLayout {
    device: Arc<Device>,
    layout: vk::PipelineLayout,
}

impl PipelineLayout {
    pub fn new(
        device: Arc<Device>,
        descriptor_set_layouts: &[vk::DescriptorSetLayout],
        push_constant_ranges: &[vk::PushConstantRange],
    ) -> RhiResult<Self> {
        let create_info = vk::PipelineLayoutCreateInfo::default()
            .set_layouts(descriptor_set_layouts)
            .push_constant_ranges(push_constant_ranges);

        let layout = unsafe { device.handle().create_pipeline_layout(&create_info, None)? };

        debug!(
            "Created pipeline layout with {} descriptor set layout(s) and {} push constant range(s)",
            descriptor_set_layouts.len(),
            push_constant_ranges.len()
        );

        Ok(Self { device, layout })
    }

    #[inline]
    pub fn handle(&self) -> vk::PipelineLayout {
        self.layout
    }
}

impl Drop for PipelineLayout {
    fn drop(&mut self) {
        unsafe {
            self.device
                .handle()
                .destroy_pipeline_layout(self.layout, None);
        }
        debug!("Pipeline layout destroyed");
    }
}

/// Face culling.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CullMode {
    #[default]
    None,
    Back,
}

impl CullMode {
    pub fn to_vk(self) -> vk::CullModeFlags {
        match self {
            CullMode::None => vk::CullModeFlags::NONE,
            CullMode::Back => vk::CullModeFlags::BACK,
        }
    }
}

/// Color attachment blending.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColorBlend {
    /// Writes replace the attachment.
    #[default]
    Opaque,
    /// `src * a + dst * (1 - a)`.
    Alpha,
}

impl ColorBlend {
    /// Blend state for a single RGBA color attachment.
    pub fn attachment_state(self) -> vk::PipelineColorBlendAttachmentState {
        let state = vk::PipelineColorBlendAttachmentState::default()
            .color_write_mask(vk::ColorComponentFlags::RGBA);

        match self {
            ColorBlend::Opaque => state.blend_enable(false),
            ColorBlend::Alpha => state
                .blend_enable(true)
                .src_color_blend_factor(vk::BlendFactor::SRC_ALPHA)
                .dst_color_blend_factor(vk::BlendFactor::ONE_MINUS_SRC_ALPHA)
                .color_blend_op(vk::BlendOp::ADD)
                .src_alpha_blend_factor(vk::BlendFactor::ONE)
                .dst_alpha_blend_factor(vk::BlendFactor::ZERO)
                .alpha_blend_op(vk::BlendOp::ADD),
        }
    }
}

/// Dynamic states every pipeline is created with.
pub const DYNAMIC_STATES: [vk::DynamicState; 2] =
    [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];

/// Vulkan graphics pipeline wrapper.
pub struct Pipeline {
    device: Arc<Device>,
    pipeline: vk::Pipeline,
}

impl Pipeline {
    #[inline]
    pub fn handle(&self) -> vk::Pipeline {
        self.pipeline
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        unsafe {
            self.device.handle().destroy_pipeline(self.pipeline, None);
        }
        info!("Graphics pipeline destroyed");
    }
}

/// Builder for render-pass based graphics pipelines.
///
/// Defaults: triangle list, no culling, counter-clockwise front faces,
/// depth test and write with `LESS`, opaque color output.
pub struct GraphicsPipelineBuilder<'a> {
    vertex_shader: Option<&'a Shader>,
    fragment_shader: Option<&'a Shader>,
    vertex_bindings: Vec<vk::VertexInputBindingDescription>,
    vertex_attributes: Vec<vk::VertexInputAttributeDescription>,
    cull_mode: CullMode,
    color_blend: ColorBlend,
    depth_write_enable: bool,
    subpass: u32,
}

impl Default for GraphicsPipelineBuilder<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> GraphicsPipelineBuilder<'a> {
    pub fn new() -> Self {
        Self {
            vertex_shader: None,
            fragment_shader: None,
            vertex_bindings: Vec::new(),
            vertex_attributes: Vec::new(),
            cull_mode: CullMode::None,
            color_blend: ColorBlend::Opaque,
            depth_write_enable: true,
            subpass: 0,
        }
    }

    pub fn vertex_shader(mut self, shader: &'a Shader) -> Self {
        self.vertex_shader = Some(shader);
        self
    }

    pub fn fragment_shader(mut self, shader: &'a Shader) -> Self {
        self.fragment_shader = Some(shader);
        self
    }

    /// Adds a vertex input binding. Pipelines without bindings generate
    /// their vertices in the shader.
    pub fn vertex_binding(mut self, binding: vk::VertexInputBindingDescription) -> Self {
        self.vertex_bindings.push(binding);
        self
    }

    pub fn vertex_attributes(mut self, attributes: &[vk::VertexInputAttributeDescription]) -> Self {
        self.vertex_attributes = attributes.to_vec();
        self
    }

    pub fn cull_mode(mut self, mode: CullMode) -> Self {
        self.cull_mode = mode;
        self
    }

    pub fn color_blend(mut self, blend: ColorBlend) -> Self {
        self.color_blend = blend;
        self
    }

    pub fn depth_write_enable(mut self, enable: bool) -> Self {
        self.depth_write_enable = enable;
        self
    }

    pub fn subpass(mut self, subpass: u32) -> Self {
        self.subpass = subpass;
        self
    }

    fn shaders(&self) -> RhiResult<(&'a Shader, &'a Shader)> {
        let vertex = self
            .vertex_shader
            .ok_or_else(|| RhiError::PipelineError("Vertex shader is required".to_string()))?;
        let fragment = self
            .fragment_shader
            .ok_or_else(|| RhiError::PipelineError("Fragment shader is required".to_string()))?;

        if vertex.stage() != ShaderStage::Vertex {
            return Err(RhiError::PipelineError(format!(
                "Expected a vertex shader, got {}",
                vertex.stage()
            )));
        }
        if fragment.stage() != ShaderStage::Fragment {
            return Err(RhiError::PipelineError(format!(
                "Expected a fragment shader, got {}",
                fragment.stage()
            )));
        }
        Ok((vertex, fragment))
    }

    /// Builds the pipeline for `render_pass`.
    ///
    /// # Errors
    ///
    /// Fails if either shader is missing or bound to the wrong stage, or if
    /// pipeline creation fails.
    pub fn build(
        self,
        device: Arc<Device>,
        layout: &PipelineLayout,
        render_pass: vk::RenderPass,
    ) -> RhiResult<Pipeline> {
        let (vertex_shader, fragment_shader) = self.shaders()?;

        let shader_stages = [
            vertex_shader.stage_create_info(),
            fragment_shader.stage_create_info(),
        ];

        let vertex_input_state = vk::PipelineVertexInputStateCreateInfo::default()
            .vertex_binding_descriptions(&self.vertex_bindings)
            .vertex_attribute_descriptions(&self.vertex_attributes);

        let input_assembly_state = vk::PipelineInputAssemblyStateCreateInfo::default()
            .topology(vk::PrimitiveTopology::TRIANGLE_LIST)
            .primitive_restart_enable(false);

        // Viewport and scissor are dynamic.
        let viewport_state = vk::PipelineViewportStateCreateInfo::default()
            .viewport_count(1)
            .scissor_count(1);

        let rasterization_state = vk::PipelineRasterizationStateCreateInfo::default()
            .polygon_mode(vk::PolygonMode::FILL)
            .line_width(1.0)
            .cull_mode(self.cull_mode.to_vk())
            .front_face(vk::FrontFace::COUNTER_CLOCKWISE);

        let multisample_state = vk::PipelineMultisampleStateCreateInfo::default()
            .rasterization_samples(vk::SampleCountFlags::TYPE_1)
            .min_sample_shading(1.0);

        let depth_stencil_state = vk::PipelineDepthStencilStateCreateInfo::default()
            .depth_test_enable(true)
            .depth_write_enable(self.depth_write_enable)
            .depth_compare_op(vk::CompareOp::LESS)
            .min_depth_bounds(0.0)
            .max_depth_bounds(1.0);

        let color_blend_attachments = [self.color_blend.attachment_state()];
        let color_blend_state = vk::PipelineColorBlendStateCreateInfo::default()
            .logic_op_enable(false)
            .attachments(&color_blend_attachments);

        let dynamic_state =
            vk::PipelineDynamicStateCreateInfo::default().dynamic_states(&DYNAMIC_STATES);

        let pipeline_info = vk::GraphicsPipelineCreateInfo::default()
            .stages(&shader_stages)
            .vertex_input_state(&vertex_input_state)
            .input_assembly_state(&input_assembly_state)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterization_state)
            .multisample_state(&multisample_state)
            .depth_stencil_state(&depth_stencil_state)
            .color_blend_state(&color_blend_state)
            .dynamic_state(&dynamic_state)
            .layout(layout.handle())
            .render_pass(render_pass)
            .subpass(self.subpass);

        let pipelines = unsafe {
            device
                .handle()
                .create_graphics_pipelines(vk::PipelineCache::null(), &[pipeline_info], None)
                .map_err(|(_, result)| result)?
        };
        let pipeline = pipelines.into_iter().next().ok_or_else(|| {
            RhiError::PipelineError("Driver returned no pipeline".to_string())
        })?;

        info!("Graphics pipeline created");
        Ok(Pipeline { device, pipeline })
    }
}
