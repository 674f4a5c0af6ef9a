//! Host-visible GPU buffers.
//!
//! Every [`Buffer`] lives in `CpuToGpu` memory allocated through
//! gpu-allocator and stays persistently mapped, so vertex, index and uniform
//! data are written straight from the CPU without staging copies.

use std::sync::Arc;

use ash::vk;
use gpu_allocator::MemoryLocation;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use tracing::debug;

use crate::device::Device;
use crate::error::{RhiError, RhiResult};

/// What a buffer is bound as.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BufferUsage {
    Vertex,
    Index,
    Uniform,
}

impl BufferUsage {
    /// Converts to Vulkan buffer usage flags.
    pub fn to_vk_usage(self) -> vk::BufferUsageFlags {
        match self {
            BufferUsage::Vertex => vk::BufferUsageFlags::VERTEX_BUFFER,
            BufferUsage::Index => vk::BufferUsageFlags::INDEX_BUFFER,
            BufferUsage::Uniform => vk::BufferUsageFlags::UNIFORM_BUFFER,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            BufferUsage::Vertex => "vertex",
            BufferUsage::Index => "index",
            BufferUsage::Uniform => "uniform",
        }
    }
}

/// Checks that `len` bytes written at `offset` stay inside a buffer of `size`.
pub fn check_write_range(
    size: vk::DeviceSize,
    offset: vk::DeviceSize,
    len: usize,
) -> RhiResult<()> {
    let end = offset.checked_add(len as vk::DeviceSize);
    match end {
        Some(end) if end <= size => Ok(()),
        _ => Err(RhiError::BufferError(format!(
            "Write exceeds buffer size: offset {} + data {} > buffer {}",
            offset, len, size
        ))),
    }
}

/// GPU buffer with managed, persistently mapped memory.
pub struct Buffer {
    device: Arc<Device>,
    buffer: vk::Buffer,
    allocation: Option<Allocation>,
    size: vk::DeviceSize,
    usage: BufferUsage,
}

impl Buffer {
    /// Creates a buffer of `size` bytes.
    ///
    /// # Errors
    ///
    /// Fails on a zero size or when buffer or memory allocation fails.
    pub fn new(device: Arc<Device>, usage: BufferUsage, size: vk::DeviceSize) -> RhiResult<Self> {
        if size == 0 {
            return Err(RhiError::BufferError(
                "Buffer size must be greater than 0".to_string(),
            ));
        }

        let buffer_info = vk::BufferCreateInfo::default()
            .size(size)
            .usage(usage.to_vk_usage())
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let buffer = unsafe { device.handle().create_buffer(&buffer_info, None)? };
        let requirements = unsafe { device.handle().get_buffer_memory_requirements(buffer) };

        let allocation = {
            let mut allocator = device
                .allocator()
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            allocator.allocate(&AllocationCreateDesc {
                name: usage.name(),
                requirements,
                location: MemoryLocation::CpuToGpu,
                linear: true,
                allocation_scheme: AllocationScheme::GpuAllocatorManaged,
            })
        };
        let allocation = match allocation {
            Ok(allocation) => allocation,
            Err(e) => {
                unsafe { device.handle().destroy_buffer(buffer, None) };
                return Err(e.into());
            }
        };

        // From here on Drop releases both the buffer and the allocation.
        let this = Self {
            device,
            buffer,
            allocation: Some(allocation),
            size,
            usage,
        };

        if let Some(allocation) = this.allocation.as_ref() {
            unsafe {
                this.device.handle().bind_buffer_memory(
                    buffer,
                    allocation.memory(),
                    allocation.offset(),
                )?;
            }
        }

        debug!("Created {} buffer: {} bytes", usage.name(), size);
        Ok(this)
    }

    /// Creates a buffer sized for `data` and uploads it.
    pub fn new_with_data(device: Arc<Device>, usage: BufferUsage, data: &[u8]) -> RhiResult<Self> {
        let buffer = Self::new(device, usage, data.len() as vk::DeviceSize)?;
        buffer.write_data(0, data)?;
        Ok(buffer)
    }

    /// Copies `data` into the mapped memory at `offset`.
    pub fn write_data(&self, offset: vk::DeviceSize, data: &[u8]) -> RhiResult<()> {
        if data.is_empty() {
            return Ok(());
        }
        check_write_range(self.size, offset, data.len())?;

        let mapped_ptr = self
            .allocation
            .as_ref()
            .and_then(|allocation| allocation.mapped_ptr())
            .ok_or_else(|| RhiError::BufferError("Buffer memory is not mapped".to_string()))?;

        unsafe {
            let dst = mapped_ptr.as_ptr().cast::<u8>().add(offset as usize);
            std::ptr::copy_nonoverlapping(data.as_ptr(), dst, data.len());
        }

        Ok(())
    }

    /// Writes a single plain-old-data value at offset 0.
    pub fn write_value<T: bytemuck::Pod>(&self, value: &T) -> RhiResult<()> {
        self.write_data(0, bytemuck::bytes_of(value))
    }

    #[inline]
    pub fn handle(&self) -> vk::Buffer {
        self.buffer
    }

    #[inline]
    pub fn size(&self) -> vk::DeviceSize {
        self.size
    }

    #[inline]
    pub fn usage(&self) -> BufferUsage {
        self.usage
    }

    /// Descriptor info covering the whole buffer.
    pub fn descriptor_info(&self) -> vk::DescriptorBufferInfo {
        vk::DescriptorBufferInfo::default()
            .buffer(self.buffer)
            .offset(0)
            .range(self.size)
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        unsafe {
            self.device.handle().destroy_buffer(self.buffer, None);
        }

        if let Some(allocation) = self.allocation.take() {
            let mut allocator = self
                .device
                .allocator()
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if let Err(e) = allocator.free(allocation) {
                tracing::error!("Failed to free buffer allocation: {:?}", e);
            }
        }

        debug!("Destroyed {} buffer", self.usage.name());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_usage_to_vk_usage() {
        assert_eq!(
            BufferUsage::Vertex.to_vk_usage(),
            vk::BufferUsageFlags::VERTEX_BUFFER
        );
        assert_eq!(
            BufferUsage::Index.to_vk_usage(),
            vk::BufferUsageFlags::INDEX_BUFFER
        );
        assert_eq!(
            BufferUsage::Uniform.to_vk_usage(),
            vk::BufferUsageFlags::UNIFORM_BUFFER
        );
    }

    #[test]
    fn test_write_range_accepts_exact_fit() {
        assert!(check_write_range(64, 0, 64).is_ok());
        assert!(check_write_range(64, 48, 16).is_ok());
    }

    #[test]
    fn test_write_range_rejects_overflow() {
        assert!(matches!(
            check_write_range(64, 60, 8),
            Err(RhiError::BufferError(_))
        ));
        assert!(check_write_range(64, u64::MAX, 1).is_err());
    }
}
