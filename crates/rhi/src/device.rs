//! Vulkan logical device and queue management.
//!
//! The [`Device`] owns the `VkDevice`, its graphics and present queues, the
//! swapchain extension loader, and the gpu-allocator instance every image and
//! buffer in the renderer is allocated from. It is shared through `Arc`.

use std::mem::ManuallyDrop;
use std::sync::{Arc, Mutex};

use ash::vk;
use gpu_allocator::vulkan::{Allocator, AllocatorCreateDesc};
use tracing::{debug, error, info};

use crate::error::{RhiError, RhiResult};
use crate::instance::Instance;
use crate::physical_device::{PhysicalDeviceInfo, QueueFamilyIndices};
use crate::swapchain::SwapchainSupportDetails;

/// Required device extensions.
const DEVICE_EXTENSIONS: &[&std::ffi::CStr] = &[ash::khr::swapchain::NAME];

/// Depth formats tried in order when picking the depth attachment format.
pub const DEPTH_FORMAT_CANDIDATES: [vk::Format; 3] = [
    vk::Format::D32_SFLOAT,
    vk::Format::D32_SFLOAT_S8_UINT,
    vk::Format::D24_UNORM_S8_UINT,
];

/// Vulkan logical device wrapper.
///
/// # Thread Safety
///
/// Shared across threads with `Arc`; the allocator sits behind a `Mutex`.
pub struct Device {
    instance: ash::Instance,
    device: ash::Device,
    physical_device: vk::PhysicalDevice,
    swapchain_loader: ash::khr::swapchain::Device,
    /// Dropped by hand before the device is destroyed.
    allocator: ManuallyDrop<Mutex<Allocator>>,
    graphics_queue: vk::Queue,
    present_queue: vk::Queue,
    queue_families: QueueFamilyIndices,
}

impl Device {
    /// Creates the logical device, its queues and the memory allocator.
    ///
    /// # Errors
    ///
    /// Returns an error if device creation or allocator initialization fails,
    /// or if `physical_device_info` lacks a graphics or present family.
    pub fn new(
        instance: &Instance,
        physical_device_info: &PhysicalDeviceInfo,
    ) -> RhiResult<Arc<Self>> {
        let queue_families = physical_device_info.queue_families;
        let (Some(graphics_family), Some(present_family)) =
            (queue_families.graphics_family, queue_families.present_family)
        else {
            return Err(RhiError::NoSuitableGpu);
        };

        let unique_families = queue_families.unique_families();
        let queue_priorities = [1.0f32];
        let queue_create_infos: Vec<vk::DeviceQueueCreateInfo> = unique_families
            .iter()
            .map(|&family| {
                vk::DeviceQueueCreateInfo::default()
                    .queue_family_index(family)
                    .queue_priorities(&queue_priorities)
            })
            .collect();

        debug!(
            "Creating {} queue(s) for families: {:?}",
            queue_create_infos.len(),
            unique_families
        );

        let features = vk::PhysicalDeviceFeatures::default();
        let extension_names: Vec<*const std::ffi::c_char> =
            DEVICE_EXTENSIONS.iter().map(|ext| ext.as_ptr()).collect();

        let create_info = vk::DeviceCreateInfo::default()
            .queue_create_infos(&queue_create_infos)
            .enabled_extension_names(&extension_names)
            .enabled_features(&features);

        let device = unsafe {
            instance
                .handle()
                .create_device(physical_device_info.device, &create_info, None)?
        };

        info!(
            "Logical device created on '{}'",
            physical_device_info.device_name()
        );

        let graphics_queue = unsafe { device.get_device_queue(graphics_family, 0) };
        let present_queue = unsafe { device.get_device_queue(present_family, 0) };

        let allocator = Allocator::new(&AllocatorCreateDesc {
            instance: instance.handle().clone(),
            device: device.clone(),
            physical_device: physical_device_info.device,
            debug_settings: Default::default(),
            buffer_device_address: false,
            allocation_sizes: Default::default(),
        })?;

        let swapchain_loader = ash::khr::swapchain::Device::new(instance.handle(), &device);

        Ok(Arc::new(Self {
            instance: instance.handle().clone(),
            device,
            physical_device: physical_device_info.device,
            swapchain_loader,
            allocator: ManuallyDrop::new(Mutex::new(allocator)),
            graphics_queue,
            present_queue,
            queue_families,
        }))
    }

    /// Returns the Vulkan logical device handle.
    #[inline]
    pub fn handle(&self) -> &ash::Device {
        &self.device
    }

    /// Returns the physical device handle.
    #[inline]
    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.physical_device
    }

    /// Returns the `VK_KHR_swapchain` function loader.
    #[inline]
    pub fn swapchain_loader(&self) -> &ash::khr::swapchain::Device {
        &self.swapchain_loader
    }

    /// Returns the graphics queue handle.
    #[inline]
    pub fn graphics_queue(&self) -> vk::Queue {
        self.graphics_queue
    }

    /// Returns the presentation queue handle.
    #[inline]
    pub fn present_queue(&self) -> vk::Queue {
        self.present_queue
    }

    /// Returns the queue family indices.
    #[inline]
    pub fn queue_families(&self) -> &QueueFamilyIndices {
        &self.queue_families
    }

    /// Returns the GPU memory allocator.
    #[inline]
    pub fn allocator(&self) -> &Mutex<Allocator> {
        &self.allocator
    }

    /// Queries the current swapchain support for `surface`.
    pub fn swapchain_support(
        &self,
        surface: vk::SurfaceKHR,
        surface_loader: &ash::khr::surface::Instance,
    ) -> RhiResult<SwapchainSupportDetails> {
        SwapchainSupportDetails::query(self.physical_device, surface, surface_loader)
    }

    /// Returns the first of `candidates` whose `tiling` features contain `features`.
    pub fn find_supported_format(
        &self,
        candidates: &[vk::Format],
        tiling: vk::ImageTiling,
        features: vk::FormatFeatureFlags,
    ) -> Option<vk::Format> {
        pick_supported_format(candidates, tiling, features, |format| unsafe {
            self.instance
                .get_physical_device_format_properties(self.physical_device, format)
        })
    }

    /// Picks the depth attachment format from [`DEPTH_FORMAT_CANDIDATES`].
    ///
    /// # Errors
    ///
    /// Returns [`RhiError::NoSupportedDepthFormat`] if none can be used.
    pub fn find_depth_format(&self) -> RhiResult<vk::Format> {
        self.find_supported_format(
            &DEPTH_FORMAT_CANDIDATES,
            vk::ImageTiling::OPTIMAL,
            vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT,
        )
        .ok_or_else(|| RhiError::NoSupportedDepthFormat(DEPTH_FORMAT_CANDIDATES.to_vec()))
    }

    /// Blocks until all queues on the device are idle.
    pub fn wait_idle(&self) -> RhiResult<()> {
        unsafe { self.device.device_wait_idle()? };
        Ok(())
    }

    /// Submits work to the graphics queue.
    ///
    /// # Safety
    ///
    /// The command buffers must be fully recorded and `fence` must be
    /// unsignaled and not in use by another submission.
    pub unsafe fn submit_graphics(
        &self,
        submit_infos: &[vk::SubmitInfo],
        fence: vk::Fence,
    ) -> RhiResult<()> {
        unsafe {
            self.device
                .queue_submit(self.graphics_queue, submit_infos, fence)?;
        }
        Ok(())
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        unsafe {
            if let Err(e) = self.device.device_wait_idle() {
                error!("Failed to wait for device idle during drop: {:?}", e);
            }
            // The allocator frees its memory blocks through the device.
            ManuallyDrop::drop(&mut self.allocator);
            self.device.destroy_device(None);
        }
        info!("Logical device destroyed");
    }
}

// Safety: ash::Device and ash::Instance are function tables, the remaining
// fields are plain handles, and the allocator is behind a Mutex.
unsafe impl Send for Device {}
unsafe impl Sync for Device {}

fn pick_supported_format(
    candidates: &[vk::Format],
    tiling: vk::ImageTiling,
    features: vk::FormatFeatureFlags,
    properties_of: impl Fn(vk::Format) -> vk::FormatProperties,
) -> Option<vk::Format> {
    candidates.iter().copied().find(|&format| {
        let props = properties_of(format);
        match tiling {
            vk::ImageTiling::LINEAR => props.linear_tiling_features.contains(features),
            vk::ImageTiling::OPTIMAL => props.optimal_tiling_features.contains(features),
            _ => false,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn depth_capable(formats: &'static [vk::Format]) -> impl Fn(vk::Format) -> vk::FormatProperties {
        move |format| {
            let mut props = vk::FormatProperties::default();
            if formats.contains(&format) {
                props.optimal_tiling_features = vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT;
            }
            props
        }
    }

    #[test]
    fn test_device_extensions_defined() {
        assert!(DEVICE_EXTENSIONS.contains(&ash::khr::swapchain::NAME));
    }

    #[test]
    fn test_pick_first_supported_depth_format() {
        let picked = pick_supported_format(
            &DEPTH_FORMAT_CANDIDATES,
            vk::ImageTiling::OPTIMAL,
            vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT,
            depth_capable(&[vk::Format::D32_SFLOAT, vk::Format::D24_UNORM_S8_UINT]),
        );
        assert_eq!(picked, Some(vk::Format::D32_SFLOAT));
    }

    #[test]
    fn test_pick_falls_through_candidates() {
        let picked = pick_supported_format(
            &DEPTH_FORMAT_CANDIDATES,
            vk::ImageTiling::OPTIMAL,
            vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT,
            depth_capable(&[vk::Format::D24_UNORM_S8_UINT]),
        );
        assert_eq!(picked, Some(vk::Format::D24_UNORM_S8_UINT));
    }

    #[test]
    fn test_pick_respects_tiling() {
        let picked = pick_supported_format(
            &DEPTH_FORMAT_CANDIDATES,
            vk::ImageTiling::LINEAR,
            vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT,
            depth_capable(&[vk::Format::D32_SFLOAT]),
        );
        assert_eq!(picked, None);
    }

    #[test]
    fn test_device_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Device>();
    }
}
