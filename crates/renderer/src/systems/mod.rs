//! Render systems: each owns a pipeline built against the chain's render
//! pass and records draws for the drawables it cares about.
//!
//! Systems borrow the [`DrawableRegistry`](lumen_scene::DrawableRegistry)
//! immutably while recording, so the registry cannot change mid-pass.

mod point_light;
mod simple;

pub use point_light::{PointLightPushConstants, PointLightSystem};
pub use simple::{SimplePushConstants, SimpleRenderSystem};

use std::path::Path;
use std::sync::Arc;

use lumen_rhi::RhiResult;
use lumen_rhi::device::Device;
use lumen_rhi::shader::{Shader, ShaderStage};

/// Loads `<dir>/<name>.vert.spv` and `<dir>/<name>.frag.spv`.
fn load_shader_pair(device: &Arc<Device>, dir: &Path, name: &str) -> RhiResult<(Shader, Shader)> {
    let vertex = Shader::from_spirv_file(
        device.clone(),
        &dir.join(format!("{}.vert.spv", name)),
        ShaderStage::Vertex,
        "main",
    )?;
    let fragment = Shader::from_spirv_file(
        device.clone(),
        &dir.join(format!("{}.frag.spv", name)),
        ShaderStage::Fragment,
        "main",
    )?;
    Ok((vertex, fragment))
}
