//! Descriptor set layouts, pools and writes.
//!
//! The renderer binds one uniform buffer per frame in flight at set 0, so
//! this module only covers what that needs:
//! - [`DescriptorSetLayout`] built from [`uniform_buffer_binding`]s
//! - [`DescriptorPool`] sized with [`uniform_pool_sizes`]
//! - [`write_uniform_buffer`] to point a set at its buffer

use std::sync::Arc;

use ash::vk;
use tracing::debug;

use crate::device::Device;
use crate::error::{RhiError, RhiResult};

/// Layout binding for a single uniform buffer visible to `stages`.
pub fn uniform_buffer_binding(
    binding: u32,
    stages: vk::ShaderStageFlags,
) -> vk::DescriptorSetLayoutBinding<'static> {
    vk::DescriptorSetLayoutBinding::default()
        .binding(binding)
        .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
        .descriptor_count(1)
        .stage_flags(stages)
}

/// Pool sizes for `sets` sets holding one uniform buffer each.
pub fn uniform_pool_sizes(sets: u32) -> [vk::DescriptorPoolSize; 1] {
    [vk::DescriptorPoolSize::default()
        .ty(vk::DescriptorType::UNIFORM_BUFFER)
        .descriptor_count(sets)]
}

/// Descriptor set layout wrapper.
pub struct DescriptorSetLayout {
    device: Arc<Device>,
    layout: vk::DescriptorSetLayout,
}

impl DescriptorSetLayout {
    /// Creates a layout from `bindings`. Binding numbers must be unique.
    pub fn new(
        device: Arc<Device>,
        bindings: &[vk::DescriptorSetLayoutBinding],
    ) -> RhiResult<Self> {
        if let Some(duplicate) = duplicate_binding(bindings) {
            return Err(RhiError::DescriptorError(format!(
                "Binding {} declared more than once",
                duplicate
            )));
        }

        let create_info = vk::DescriptorSetLayoutCreateInfo::default().bindings(bindings);
        let layout = unsafe {
            device
                .handle()
                .create_descriptor_set_layout(&create_info, None)?
        };

        debug!(
            "Created descriptor set layout with {} binding(s)",
            bindings.len()
        );

        Ok(Self { device, layout })
    }

    #[inline]
    pub fn handle(&self) -> vk::DescriptorSetLayout {
        self.layout
    }
}

impl Drop for DescriptorSetLayout {
    fn drop(&mut self) {
        unsafe {
            self.device
                .handle()
                .destroy_descriptor_set_layout(self.layout, None);
        }
    }
}

fn duplicate_binding(bindings: &[vk::DescriptorSetLayoutBinding]) -> Option<u32> {
    bindings.iter().enumerate().find_map(|(i, a)| {
        bindings[..i]
            .iter()
            .any(|b| b.binding == a.binding)
            .then_some(a.binding)
    })
}

/// Descriptor pool for allocating descriptor sets.
///
/// Sets are released all at once when the pool is destroyed.
pub struct DescriptorPool {
    device: Arc<Device>,
    pool: vk::DescriptorPool,
    max_sets: u32,
}

impl DescriptorPool {
    pub fn new(
        device: Arc<Device>,
        max_sets: u32,
        pool_sizes: &[vk::DescriptorPoolSize],
    ) -> RhiResult<Self> {
        let create_info = vk::DescriptorPoolCreateInfo::default()
            .max_sets(max_sets)
            .pool_sizes(pool_sizes);

        let pool = unsafe { device.handle().create_descriptor_pool(&create_info, None)? };

        debug!(
            "Created descriptor pool: max_sets={}, pool_sizes={}",
            max_sets,
            pool_sizes.len()
        );

        Ok(Self {
            device,
            pool,
            max_sets,
        })
    }

    /// Allocates one set per entry in `layouts`.
    ///
    /// # Errors
    ///
    /// Returns [`RhiError::DescriptorError`] if more sets are requested than
    /// the pool was created for.
    pub fn allocate(
        &self,
        layouts: &[vk::DescriptorSetLayout],
    ) -> RhiResult<Vec<vk::DescriptorSet>> {
        if layouts.len() as u32 > self.max_sets {
            return Err(RhiError::DescriptorError(format!(
                "Requested {} sets from a pool of {}",
                layouts.len(),
                self.max_sets
            )));
        }

        let alloc_info = vk::DescriptorSetAllocateInfo::default()
            .descriptor_pool(self.pool)
            .set_layouts(layouts);

        let sets = unsafe { self.device.handle().allocate_descriptor_sets(&alloc_info)? };
        debug!("Allocated {} descriptor set(s)", sets.len());
        Ok(sets)
    }

    #[inline]
    pub fn handle(&self) -> vk::DescriptorPool {
        self.pool
    }
}

impl Drop for DescriptorPool {
    fn drop(&mut self) {
        unsafe {
            self.device
                .handle()
                .destroy_descriptor_pool(self.pool, None);
        }
        debug!("Destroyed descriptor pool");
    }
}

/// Points `binding` of `set` at a uniform buffer range.
pub fn write_uniform_buffer(
    device: &Device,
    set: vk::DescriptorSet,
    binding: u32,
    buffer_info: vk::DescriptorBufferInfo,
) {
    let buffer_infos = [buffer_info];
    let write = vk::WriteDescriptorSet::default()
        .dst_set(set)
        .dst_binding(binding)
        .dst_array_element(0)
        .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
        .buffer_info(&buffer_infos);

    unsafe {
        device
            .handle()
            .update_descriptor_sets(std::slice::from_ref(&write), &[]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_buffer_binding() {
        let binding = uniform_buffer_binding(0, vk::ShaderStageFlags::ALL_GRAPHICS);
        assert_eq!(binding.binding, 0);
        assert_eq!(binding.descriptor_type, vk::DescriptorType::UNIFORM_BUFFER);
        assert_eq!(binding.descriptor_count, 1);
        assert_eq!(binding.stage_flags, vk::ShaderStageFlags::ALL_GRAPHICS);
    }

    #[test]
    fn test_uniform_pool_sizes() {
        let sizes = uniform_pool_sizes(2);
        assert_eq!(sizes[0].ty, vk::DescriptorType::UNIFORM_BUFFER);
        assert_eq!(sizes[0].descriptor_count, 2);
    }

    #[test]
    fn test_duplicate_binding_detection() {
        let a = uniform_buffer_binding(0, vk::ShaderStageFlags::VERTEX);
        let b = uniform_buffer_binding(1, vk::ShaderStageFlags::FRAGMENT);
        let c = uniform_buffer_binding(0, vk::ShaderStageFlags::FRAGMENT);

        assert_eq!(duplicate_binding(&[a, b]), None);
        assert_eq!(duplicate_binding(&[a, b, c]), Some(0));
        assert_eq!(duplicate_binding(&[]), None);
    }
}
