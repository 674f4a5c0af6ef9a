//! SPIR-V shader modules.
//!
//! [`Shader`] owns a `VkShaderModule` together with its stage and entry point,
//! ready to be plugged into a graphics pipeline.

use std::ffi::{CStr, CString};
use std::path::Path;
use std::sync::Arc;

use ash::vk;
use tracing::{debug, info};

use crate::device::Device;
use crate::error::{RhiError, RhiResult};

/// First word of every SPIR-V module.
pub const SPIRV_MAGIC: u32 = 0x0723_0203;

/// Pipeline stage a shader module is bound to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    /// Converts the stage to Vulkan shader stage flags.
    pub fn to_vk_stage(self) -> vk::ShaderStageFlags {
        match self {
            ShaderStage::Vertex => vk::ShaderStageFlags::VERTEX,
            ShaderStage::Fragment => vk::ShaderStageFlags::FRAGMENT,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Fragment => "fragment",
        }
    }
}

impl std::fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Reinterprets raw bytes as little-endian SPIR-V words.
///
/// # Errors
///
/// Fails if the length is not a multiple of 4 or the magic number is missing.
pub fn spirv_words(bytes: &[u8]) -> RhiResult<Vec<u32>> {
    if !bytes.len().is_multiple_of(4) {
        return Err(RhiError::ShaderError(format!(
            "SPIR-V code must be 4-byte aligned, got {} bytes",
            bytes.len()
        )));
    }

    let code: Vec<u32> = bytes
        .chunks_exact(4)
        .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect();

    match code.first() {
        Some(&SPIRV_MAGIC) => Ok(code),
        Some(word) => Err(RhiError::ShaderError(format!(
            "Invalid SPIR-V magic number {:#010x}",
            word
        ))),
        None => Err(RhiError::ShaderError("SPIR-V code is empty".to_string())),
    }
}

/// Vulkan shader module wrapper.
pub struct Shader {
    device: Arc<Device>,
    module: vk::ShaderModule,
    stage: ShaderStage,
    entry_point: CString,
}

impl Shader {
    /// Loads a compiled SPIR-V file from disk.
    ///
    /// # Errors
    ///
    /// Returns [`RhiError::ShaderError`] if the file cannot be read or is not
    /// valid SPIR-V.
    pub fn from_spirv_file(
        device: Arc<Device>,
        path: &Path,
        stage: ShaderStage,
        entry_point: &str,
    ) -> RhiResult<Self> {
        debug!("Loading {} shader from {:?}", stage, path);

        let bytes = std::fs::read(path).map_err(|e| {
            RhiError::ShaderError(format!("Failed to read shader file {:?}: {}", path, e))
        })?;

        Self::from_spirv_bytes(device, &bytes, stage, entry_point)
    }

    /// Creates a shader module from SPIR-V bytes.
    pub fn from_spirv_bytes(
        device: Arc<Device>,
        bytes: &[u8],
        stage: ShaderStage,
        entry_point: &str,
    ) -> RhiResult<Self> {
        let code = spirv_words(bytes)?;
        let entry_point = CString::new(entry_point)
            .map_err(|e| RhiError::ShaderError(format!("Invalid entry point name: {}", e)))?;

        let create_info = vk::ShaderModuleCreateInfo::default().code(&code);
        let module = unsafe { device.handle().create_shader_module(&create_info, None)? };

        info!(
            "Created {} shader module with entry point {:?}",
            stage, entry_point
        );

        Ok(Self {
            device,
            module,
            stage,
            entry_point,
        })
    }

    #[inline]
    pub fn handle(&self) -> vk::ShaderModule {
        self.module
    }

    #[inline]
    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    #[inline]
    pub fn entry_point(&self) -> &CStr {
        &self.entry_point
    }

    /// Stage description for pipeline creation. Borrows from `self`.
    pub fn stage_create_info(&self) -> vk::PipelineShaderStageCreateInfo<'_> {
        vk::PipelineShaderStageCreateInfo::default()
            .stage(self.stage.to_vk_stage())
            .module(self.module)
            .name(&self.entry_point)
    }
}

impl Drop for Shader {
    fn drop(&mut self) {
        unsafe {
            self.device
                .handle()
                .destroy_shader_module(self.module, None);
        }
        debug!("Destroyed {} shader module", self.stage);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module_bytes(words: &[u32]) -> Vec<u8> {
        words.iter().flat_map(|w| w.to_le_bytes()).collect()
    }

    #[test]
    fn test_shader_stage_to_vk_stage() {
        assert_eq!(
            ShaderStage::Vertex.to_vk_stage(),
            vk::ShaderStageFlags::VERTEX
        );
        assert_eq!(
            ShaderStage::Fragment.to_vk_stage(),
            vk::ShaderStageFlags::FRAGMENT
        );
    }

    #[test]
    fn test_shader_stage_display() {
        assert_eq!(format!("{}", ShaderStage::Vertex), "vertex");
        assert_eq!(format!("{}", ShaderStage::Fragment), "fragment");
    }

    #[test]
    fn test_spirv_words_accepts_valid_header() {
        let bytes = module_bytes(&[SPIRV_MAGIC, 0x0001_0000, 0, 1, 0]);
        let words = spirv_words(&bytes).unwrap();
        assert_eq!(words.len(), 5);
        assert_eq!(words[0], SPIRV_MAGIC);
        assert_eq!(words[1], 0x0001_0000);
    }

    #[test]
    fn test_spirv_words_rejects_misaligned_input() {
        let mut bytes = module_bytes(&[SPIRV_MAGIC]);
        bytes.push(0);
        assert!(matches!(
            spirv_words(&bytes),
            Err(RhiError::ShaderError(_))
        ));
    }

    #[test]
    fn test_spirv_words_rejects_bad_magic() {
        let bytes = module_bytes(&[0xdead_beef, 0]);
        assert!(spirv_words(&bytes).is_err());
    }

    #[test]
    fn test_spirv_words_rejects_empty_input() {
        assert!(spirv_words(&[]).is_err());
    }
}
