//! Owned images and image views.
//!
//! - [`ImageView`] wraps a view onto an image owned elsewhere (swapchain images).
//! - [`DepthImage`] owns a depth image, its GPU-only memory and its view.
//!
//! Both destroy their Vulkan objects on drop.

use std::sync::Arc;

use ash::vk;
use gpu_allocator::MemoryLocation;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use tracing::debug;

use crate::device::Device;
use crate::error::{RhiError, RhiResult};

/// A 2D single-mip image view.
pub struct ImageView {
    device: Arc<Device>,
    view: vk::ImageView,
}

impl ImageView {
    /// Creates a 2D view of `image` covering its first mip and layer.
    pub fn new(
        device: Arc<Device>,
        image: vk::Image,
        format: vk::Format,
        aspect: vk::ImageAspectFlags,
    ) -> RhiResult<Self> {
        let create_info = vk::ImageViewCreateInfo::default()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(format)
            .components(vk::ComponentMapping::default())
            .subresource_range(
                vk::ImageSubresourceRange::default()
                    .aspect_mask(aspect)
                    .base_mip_level(0)
                    .level_count(1)
                    .base_array_layer(0)
                    .layer_count(1),
            );

        let view = unsafe { device.handle().create_image_view(&create_info, None)? };
        Ok(Self { device, view })
    }

    /// Returns the Vulkan image view handle.
    #[inline]
    pub fn handle(&self) -> vk::ImageView {
        self.view
    }
}

impl Drop for ImageView {
    fn drop(&mut self) {
        unsafe { self.device.handle().destroy_image_view(self.view, None) };
    }
}

/// Depth attachment image with its memory and view.
///
/// Destruction order: view, image, allocation.
pub struct DepthImage {
    device: Arc<Device>,
    /// Dropped before the image is destroyed.
    view: Option<ImageView>,
    image: vk::Image,
    allocation: Option<Allocation>,
    format: vk::Format,
    extent: vk::Extent2D,
}

impl DepthImage {
    /// Creates a depth image of `extent` in `format`.
    ///
    /// # Errors
    ///
    /// Fails on a zero-sized extent, or if image creation, allocation,
    /// binding or view creation fails.
    pub fn new(device: Arc<Device>, extent: vk::Extent2D, format: vk::Format) -> RhiResult<Self> {
        if extent.width == 0 || extent.height == 0 {
            return Err(RhiError::SwapchainError(
                "Depth image dimensions must be greater than 0".to_string(),
            ));
        }

        let image_info = vk::ImageCreateInfo::default()
            .image_type(vk::ImageType::TYPE_2D)
            .format(format)
            .extent(vk::Extent3D {
                width: extent.width,
                height: extent.height,
                depth: 1,
            })
            .mip_levels(1)
            .array_layers(1)
            .samples(vk::SampleCountFlags::TYPE_1)
            .tiling(vk::ImageTiling::OPTIMAL)
            .usage(vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .initial_layout(vk::ImageLayout::UNDEFINED);

        let image = unsafe { device.handle().create_image(&image_info, None)? };
        let requirements = unsafe { device.handle().get_image_memory_requirements(image) };

        let allocation = {
            let mut allocator = device
                .allocator()
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            allocator.allocate(&AllocationCreateDesc {
                name: "depth_image",
                requirements,
                location: MemoryLocation::GpuOnly,
                linear: false,
                allocation_scheme: AllocationScheme::GpuAllocatorManaged,
            })
        };
        let allocation = match allocation {
            Ok(allocation) => allocation,
            Err(e) => {
                unsafe { device.handle().destroy_image(image, None) };
                return Err(e.into());
            }
        };

        // From here on `Drop` cleans up whatever was created.
        let mut depth = Self {
            device: device.clone(),
            view: None,
            image,
            allocation: Some(allocation),
            format,
            extent,
        };

        if let Some(allocation) = &depth.allocation {
            unsafe {
                device
                    .handle()
                    .bind_image_memory(image, allocation.memory(), allocation.offset())?;
            }
        }

        depth.view = Some(ImageView::new(
            device,
            image,
            format,
            vk::ImageAspectFlags::DEPTH,
        )?);

        debug!(
            "Created depth image: {}x{} ({:?})",
            extent.width, extent.height, format
        );

        Ok(depth)
    }

    /// Returns the Vulkan image handle.
    #[inline]
    pub fn image(&self) -> vk::Image {
        self.image
    }

    /// Returns the depth view handle, or null while under construction.
    #[inline]
    pub fn view(&self) -> vk::ImageView {
        self.view
            .as_ref()
            .map_or(vk::ImageView::null(), ImageView::handle)
    }

    /// Returns the depth format.
    #[inline]
    pub fn format(&self) -> vk::Format {
        self.format
    }

    /// Returns the image extent.
    #[inline]
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }
}

impl Drop for DepthImage {
    fn drop(&mut self) {
        self.view = None;
        unsafe { self.device.handle().destroy_image(self.image, None) };

        if let Some(allocation) = self.allocation.take() {
            let mut allocator = self
                .device
                .allocator()
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if let Err(e) = allocator.free(allocation) {
                tracing::error!("Failed to free depth image memory: {:?}", e);
            }
        }
    }
}

/// Whether `format` carries a stencil component.
pub fn has_stencil_component(format: vk::Format) -> bool {
    matches!(
        format,
        vk::Format::D32_SFLOAT_S8_UINT | vk::Format::D24_UNORM_S8_UINT
    )
}
