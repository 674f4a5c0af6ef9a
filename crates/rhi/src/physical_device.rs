//! Physical device (GPU) selection.
//!
//! A GPU is usable when it has a graphics queue family, a family that can
//! present to the window surface, the swapchain extension, and at least one
//! surface format and present mode. Among usable GPUs, discrete ones win.

use std::ffi::CStr;

use ash::vk;
use tracing::{debug, info, warn};

use crate::error::RhiError;
use crate::swapchain::SwapchainSupportDetails;

/// Queue family indices for graphics and presentation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QueueFamilyIndices {
    /// Index of the queue family that supports graphics operations.
    pub graphics_family: Option<u32>,
    /// Index of the queue family that supports presentation to the surface.
    pub present_family: Option<u32>,
}

impl QueueFamilyIndices {
    /// Both a graphics and a present family were found.
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.graphics_family.is_some() && self.present_family.is_some()
    }

    /// Returns the distinct family indices, graphics first.
    pub fn unique_families(&self) -> Vec<u32> {
        let mut families = Vec::with_capacity(2);
        if let Some(graphics) = self.graphics_family {
            families.push(graphics);
        }
        if let Some(present) = self.present_family
            && !families.contains(&present)
        {
            families.push(present);
        }
        families
    }

    /// Graphics and present work run on different families.
    pub fn is_split(&self) -> bool {
        self.graphics_family != self.present_family
    }
}

/// Information about the selected physical device.
#[derive(Clone)]
pub struct PhysicalDeviceInfo {
    /// Vulkan physical device handle.
    pub device: vk::PhysicalDevice,
    /// Device properties (name, limits, API version, etc.).
    pub properties: vk::PhysicalDeviceProperties,
    /// Queue family indices for graphics and presentation.
    pub queue_families: QueueFamilyIndices,
}

impl PhysicalDeviceInfo {
    /// Returns the device name as a string.
    pub fn device_name(&self) -> &str {
        unsafe {
            CStr::from_ptr(self.properties.device_name.as_ptr())
                .to_str()
                .unwrap_or("Unknown Device")
        }
    }

    /// Returns a human-readable string for the device type.
    pub fn device_type_name(&self) -> &'static str {
        match self.properties.device_type {
            vk::PhysicalDeviceType::DISCRETE_GPU => "Discrete GPU",
            vk::PhysicalDeviceType::INTEGRATED_GPU => "Integrated GPU",
            vk::PhysicalDeviceType::VIRTUAL_GPU => "Virtual GPU",
            vk::PhysicalDeviceType::CPU => "CPU",
            _ => "Other",
        }
    }
}

impl std::fmt::Debug for PhysicalDeviceInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhysicalDeviceInfo")
            .field("name", &self.device_name())
            .field("type", &self.device_type_name())
            .field("queue_families", &self.queue_families)
            .finish()
    }
}

/// Selects the most suitable physical device for presenting to `surface`.
///
/// # Errors
///
/// Returns [`RhiError::NoSuitableGpu`] if no GPU meets the requirements.
pub fn select_physical_device(
    instance: &ash::Instance,
    surface: vk::SurfaceKHR,
    surface_loader: &ash::khr::surface::Instance,
) -> Result<PhysicalDeviceInfo, RhiError> {
    let devices = unsafe { instance.enumerate_physical_devices()? };

    if devices.is_empty() {
        warn!("No Vulkan-capable GPUs found");
        return Err(RhiError::NoSuitableGpu);
    }

    let selected = devices
        .into_iter()
        .filter_map(|device| check_device_suitability(instance, device, surface, surface_loader))
        .max_by_key(|info| device_type_rank(info.properties.device_type))
        .ok_or(RhiError::NoSuitableGpu)?;

    info!(
        "Selected GPU: '{}' ({}), queues {:?}",
        selected.device_name(),
        selected.device_type_name(),
        selected.queue_families
    );

    Ok(selected)
}

fn check_device_suitability(
    instance: &ash::Instance,
    device: vk::PhysicalDevice,
    surface: vk::SurfaceKHR,
    surface_loader: &ash::khr::surface::Instance,
) -> Option<PhysicalDeviceInfo> {
    let properties = unsafe { instance.get_physical_device_properties(device) };
    let name = unsafe { CStr::from_ptr(properties.device_name.as_ptr()) }.to_string_lossy();

    let queue_families = find_queue_families(instance, device, surface, surface_loader);
    if !queue_families.is_complete() {
        debug!("GPU '{}' skipped: missing graphics or present queue", name);
        return None;
    }

    if !supports_swapchain_extension(instance, device) {
        debug!("GPU '{}' skipped: VK_KHR_swapchain not supported", name);
        return None;
    }

    match SwapchainSupportDetails::query(device, surface, surface_loader) {
        Ok(support) if support.is_adequate() => {}
        _ => {
            debug!("GPU '{}' skipped: inadequate swapchain support", name);
            return None;
        }
    }

    Some(PhysicalDeviceInfo {
        device,
        properties,
        queue_families,
    })
}

fn supports_swapchain_extension(instance: &ash::Instance, device: vk::PhysicalDevice) -> bool {
    let Ok(extensions) = (unsafe { instance.enumerate_device_extension_properties(device) }) else {
        return false;
    };
    extensions.iter().any(|ext| {
        let name = unsafe { CStr::from_ptr(ext.extension_name.as_ptr()) };
        name == ash::khr::swapchain::NAME
    })
}

fn find_queue_families(
    instance: &ash::Instance,
    device: vk::PhysicalDevice,
    surface: vk::SurfaceKHR,
    surface_loader: &ash::khr::surface::Instance,
) -> QueueFamilyIndices {
    let families = unsafe { instance.get_physical_device_queue_family_properties(device) };
    let mut indices = QueueFamilyIndices::default();

    for (i, family) in families.iter().enumerate() {
        let i = i as u32;
        if family.queue_count == 0 {
            continue;
        }

        let has_graphics = family.queue_flags.contains(vk::QueueFlags::GRAPHICS);
        let has_present = unsafe {
            surface_loader
                .get_physical_device_surface_support(device, i, surface)
                .unwrap_or(false)
        };

        // One family doing both avoids concurrent sharing on the swapchain.
        if has_graphics && has_present {
            return QueueFamilyIndices {
                graphics_family: Some(i),
                present_family: Some(i),
            };
        }
        if has_graphics && indices.graphics_family.is_none() {
            indices.graphics_family = Some(i);
        }
        if has_present && indices.present_family.is_none() {
            indices.present_family = Some(i);
        }
    }

    indices
}

fn device_type_rank(device_type: vk::PhysicalDeviceType) -> u32 {
    match device_type {
        vk::PhysicalDeviceType::DISCRETE_GPU => 4,
        vk::PhysicalDeviceType::INTEGRATED_GPU => 3,
        vk::PhysicalDeviceType::VIRTUAL_GPU => 2,
        vk::PhysicalDeviceType::CPU => 1,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_family_indices_default() {
        let indices = QueueFamilyIndices::default();
        assert!(!indices.is_complete());
        assert!(indices.unique_families().is_empty());
    }

    #[test]
    fn test_queue_family_indices_incomplete() {
        let indices = QueueFamilyIndices {
            graphics_family: Some(0),
            present_family: None,
        };
        assert!(!indices.is_complete());
    }

    #[test]
    fn test_unique_families_shared() {
        let indices = QueueFamilyIndices {
            graphics_family: Some(0),
            present_family: Some(0),
        };
        assert!(indices.is_complete());
        assert!(!indices.is_split());
        assert_eq!(indices.unique_families(), vec![0]);
    }

    #[test]
    fn test_unique_families_split() {
        let indices = QueueFamilyIndices {
            graphics_family: Some(0),
            present_family: Some(2),
        };
        assert!(indices.is_split());
        assert_eq!(indices.unique_families(), vec![0, 2]);
    }

    #[test]
    fn test_discrete_gpu_ranks_highest() {
        assert!(
            device_type_rank(vk::PhysicalDeviceType::DISCRETE_GPU)
                > device_type_rank(vk::PhysicalDeviceType::INTEGRATED_GPU)
        );
        assert!(
            device_type_rank(vk::PhysicalDeviceType::INTEGRATED_GPU)
                > device_type_rank(vk::PhysicalDeviceType::CPU)
        );
    }
}
