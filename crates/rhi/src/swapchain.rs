//! The presentation surface chain.
//!
//! A [`SurfaceChain`] owns everything needed to present: the `VkSwapchainKHR`,
//! one [`PresentableImage`] per swapchain image (color view, depth image,
//! framebuffer) and the render pass they are built against. It is immutable
//! once built; a resize or an out-of-date surface means building a new one
//! from the old one and dropping the old one.
//!
//! The selection logic (format, present mode, extent, image count) lives in
//! [`ChainPlan::resolve`], a pure function over [`SwapchainSupportDetails`].
//!
//! Acquire and present results are split into two channels: transient
//! surface conditions come back as [`AcquireOutcome`] / [`SurfaceStatus`],
//! everything else is an [`RhiError`].

use std::sync::Arc;

use ash::vk;
use tracing::{debug, info, warn};

use crate::device::Device;
use crate::error::{RhiError, RhiResult};
use crate::image::{DepthImage, ImageView};
use crate::render_pass::{Framebuffer, RenderPass};

/// Color format and color space used when the surface offers them.
pub const PREFERRED_SURFACE_FORMAT: vk::SurfaceFormatKHR = vk::SurfaceFormatKHR {
    format: vk::Format::B8G8R8A8_SRGB,
    color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
};

/// Timeout passed to `vkAcquireNextImageKHR`; effectively unbounded.
pub const ACQUIRE_TIMEOUT: u64 = u64::MAX;

/// Swapchain surface support details.
#[derive(Debug, Clone)]
pub struct SwapchainSupportDetails {
    /// Surface capabilities (min/max image count, extents, transforms, etc.)
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    /// Supported surface formats (format and color space combinations)
    pub formats: Vec<vk::SurfaceFormatKHR>,
    /// Supported present modes (FIFO, MAILBOX, IMMEDIATE, etc.)
    pub present_modes: Vec<vk::PresentModeKHR>,
}

impl SwapchainSupportDetails {
    /// Queries swapchain support details for a physical device and surface.
    pub fn query(
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
        surface_loader: &ash::khr::surface::Instance,
    ) -> RhiResult<Self> {
        let capabilities = unsafe {
            surface_loader.get_physical_device_surface_capabilities(physical_device, surface)?
        };
        let formats = unsafe {
            surface_loader.get_physical_device_surface_formats(physical_device, surface)?
        };
        let present_modes = unsafe {
            surface_loader.get_physical_device_surface_present_modes(physical_device, surface)?
        };

        debug!(
            "Swapchain support: {} formats, {} present modes, image count: {}-{}",
            formats.len(),
            present_modes.len(),
            capabilities.min_image_count,
            if capabilities.max_image_count == 0 {
                "unlimited".to_string()
            } else {
                capabilities.max_image_count.to_string()
            }
        );

        Ok(Self {
            capabilities,
            formats,
            present_modes,
        })
    }

    /// At least one format and one present mode are available.
    #[inline]
    pub fn is_adequate(&self) -> bool {
        !self.formats.is_empty() && !self.present_modes.is_empty()
    }
}

/// How the present mode is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PresentModePolicy {
    /// MAILBOX, then IMMEDIATE, then FIFO.
    #[default]
    LowLatency,
    /// Always FIFO.
    Vsync,
}

/// What the caller asks of a new chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainRequest {
    /// Drawable size of the window in pixels.
    pub extent: vk::Extent2D,
    /// Present mode selection policy.
    pub present_mode: PresentModePolicy,
}

/// Resolved swapchain parameters.
#[derive(Debug, Clone, Copy)]
pub struct ChainPlan {
    /// Color format and color space.
    pub surface_format: vk::SurfaceFormatKHR,
    /// Present mode.
    pub present_mode: vk::PresentModeKHR,
    /// Image extent.
    pub extent: vk::Extent2D,
    /// Requested minimum image count.
    pub image_count: u32,
    /// Surface transform to apply.
    pub pre_transform: vk::SurfaceTransformFlagsKHR,
}

impl ChainPlan {
    /// Chooses format, present mode, extent and image count from `support`.
    ///
    /// # Errors
    ///
    /// Returns [`RhiError::SwapchainError`] if the surface reports no formats
    /// or no present modes.
    pub fn resolve(support: &SwapchainSupportDetails, request: ChainRequest) -> RhiResult<Self> {
        if !support.is_adequate() {
            return Err(RhiError::SwapchainError(
                "Inadequate swapchain support (no formats or present modes)".to_string(),
            ));
        }

        Ok(Self {
            surface_format: choose_surface_format(&support.formats),
            present_mode: choose_present_mode(&support.present_modes, request.present_mode),
            extent: choose_extent(&support.capabilities, request.extent),
            image_count: determine_image_count(&support.capabilities),
            pre_transform: support.capabilities.current_transform,
        })
    }
}

/// Attachment formats a chain renders with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainFormats {
    /// Swapchain color format.
    pub color: vk::Format,
    /// Depth attachment format.
    pub depth: vk::Format,
}

impl ChainFormats {
    /// Checks that a rebuilt chain kept its predecessor's formats.
    ///
    /// Pipelines are built against the render pass, so a format change would
    /// invalidate every pipeline in the renderer.
    ///
    /// # Errors
    ///
    /// Returns [`RhiError::FormatMismatch`] naming the attachment that changed.
    pub fn ensure_matches(&self, previous: &ChainFormats) -> RhiResult<()> {
        if self.color != previous.color {
            return Err(RhiError::FormatMismatch {
                attachment: "color",
                expected: previous.color,
                found: self.color,
            });
        }
        if self.depth != previous.depth {
            return Err(RhiError::FormatMismatch {
                attachment: "depth",
                expected: previous.depth,
                found: self.depth,
            });
        }
        Ok(())
    }
}

/// Transient state of the presentation surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceStatus {
    /// The chain matches the surface.
    Ready,
    /// Usable, but the chain should be rebuilt soon.
    Suboptimal,
    /// Out of date; the chain must be rebuilt before presenting again.
    Stale,
}

impl SurfaceStatus {
    /// Maps a `vkQueuePresentKHR` result.
    ///
    /// # Errors
    ///
    /// Any error other than `ERROR_OUT_OF_DATE_KHR` is fatal.
    pub fn from_present(result: Result<bool, vk::Result>) -> RhiResult<Self> {
        match result {
            Ok(false) => Ok(SurfaceStatus::Ready),
            Ok(true) | Err(vk::Result::SUBOPTIMAL_KHR) => Ok(SurfaceStatus::Suboptimal),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(SurfaceStatus::Stale),
            Err(e) => Err(RhiError::VulkanError(e)),
        }
    }

    /// The chain no longer matches the surface exactly.
    #[inline]
    pub fn needs_rebuild(self) -> bool {
        self != SurfaceStatus::Ready
    }
}

/// Result of asking the presentation engine for the next image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// Image acquired.
    Ready(u32),
    /// Image acquired, but the chain should be rebuilt soon.
    Suboptimal(u32),
    /// No image; the chain must be rebuilt.
    Stale,
}

impl AcquireOutcome {
    /// Maps a `vkAcquireNextImageKHR` result.
    ///
    /// # Errors
    ///
    /// Any error other than `ERROR_OUT_OF_DATE_KHR` is fatal.
    pub fn from_acquire(result: Result<(u32, bool), vk::Result>) -> RhiResult<Self> {
        match result {
            Ok((index, false)) => Ok(AcquireOutcome::Ready(index)),
            Ok((index, true)) => Ok(AcquireOutcome::Suboptimal(index)),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(AcquireOutcome::Stale),
            Err(e) => Err(RhiError::VulkanError(e)),
        }
    }

    /// The acquired image index, if any.
    #[inline]
    pub fn image_index(self) -> Option<u32> {
        match self {
            AcquireOutcome::Ready(index) | AcquireOutcome::Suboptimal(index) => Some(index),
            AcquireOutcome::Stale => None,
        }
    }

    /// The surface status this outcome reports.
    #[inline]
    pub fn status(self) -> SurfaceStatus {
        match self {
            AcquireOutcome::Ready(_) => SurfaceStatus::Ready,
            AcquireOutcome::Suboptimal(_) => SurfaceStatus::Suboptimal,
            AcquireOutcome::Stale => SurfaceStatus::Stale,
        }
    }
}

/// What the frame loop needs from a chain of presentable images.
///
/// Render systems only see `extent` and `render_pass`, and must not keep
/// either across a rebuild.
pub trait PresentationChain {
    /// Size of every image in the chain.
    fn extent(&self) -> vk::Extent2D;

    /// Number of images in the chain.
    fn image_count(&self) -> usize;

    /// Color and depth formats.
    fn formats(&self) -> ChainFormats;

    /// Render pass every framebuffer of the chain is compatible with.
    fn render_pass(&self) -> vk::RenderPass;

    /// Framebuffer of image `image_index`.
    fn framebuffer(&self, image_index: u32) -> vk::Framebuffer;

    /// Acquires the next image, signaling `signal` when it is ready.
    fn acquire_next_image(&self, signal: vk::Semaphore, timeout: u64) -> RhiResult<AcquireOutcome>;

    /// Queues image `image_index` for presentation after `wait` is signaled.
    fn present(&self, image_index: u32, wait: vk::Semaphore) -> RhiResult<SurfaceStatus>;
}

/// One swapchain image with everything rendered into it.
///
/// Field order is drop order: framebuffer, depth, color view.
pub struct PresentableImage {
    framebuffer: Framebuffer,
    depth: DepthImage,
    view: ImageView,
    image: vk::Image,
    index: u32,
}

impl PresentableImage {
    /// Position of this image in the swapchain.
    #[inline]
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Swapchain-owned color image.
    #[inline]
    pub fn image(&self) -> vk::Image {
        self.image
    }

    /// Color view.
    #[inline]
    pub fn view(&self) -> vk::ImageView {
        self.view.handle()
    }

    /// Depth image paired with this color image.
    #[inline]
    pub fn depth(&self) -> &DepthImage {
        &self.depth
    }

    /// Framebuffer over `[color view, depth view]`.
    #[inline]
    pub fn framebuffer(&self) -> vk::Framebuffer {
        self.framebuffer.handle()
    }
}

/// The Vulkan presentation chain.
pub struct SurfaceChain {
    device: Arc<Device>,
    swapchain: vk::SwapchainKHR,
    images: Vec<PresentableImage>,
    render_pass: Option<RenderPass>,
    formats: ChainFormats,
    color_space: vk::ColorSpaceKHR,
    present_mode: vk::PresentModeKHR,
    extent: vk::Extent2D,
}

impl SurfaceChain {
    /// Builds a chain for `surface`.
    ///
    /// When `previous` is given its swapchain is handed to the driver as
    /// `oldSwapchain` so presentation can overlap the handover. The caller
    /// keeps `previous` alive until this returns and drops it afterwards.
    ///
    /// # Errors
    ///
    /// Any creation failure is returned as-is; nothing is retried.
    pub fn new(
        device: Arc<Device>,
        surface: vk::SurfaceKHR,
        surface_loader: &ash::khr::surface::Instance,
        request: ChainRequest,
        previous: Option<&SurfaceChain>,
    ) -> RhiResult<Self> {
        let support = device.swapchain_support(surface, surface_loader)?;
        let plan = ChainPlan::resolve(&support, request)?;
        let depth_format = device.find_depth_format()?;

        info!(
            "Creating swapchain: {}x{}, format {:?}, color space {:?}, present mode {:?}, depth {:?}, {} images requested",
            plan.extent.width,
            plan.extent.height,
            plan.surface_format.format,
            plan.surface_format.color_space,
            plan.present_mode,
            depth_format,
            plan.image_count
        );

        let queue_families = device.queue_families();
        let family_indices: Vec<u32> = queue_families.unique_families();
        let (sharing_mode, shared_families) = if queue_families.is_split() {
            debug!("Using CONCURRENT sharing between families {:?}", family_indices);
            (vk::SharingMode::CONCURRENT, family_indices.as_slice())
        } else {
            (vk::SharingMode::EXCLUSIVE, &[][..])
        };

        let old_swapchain = previous.map_or(vk::SwapchainKHR::null(), |chain| chain.swapchain);

        let create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(surface)
            .min_image_count(plan.image_count)
            .image_format(plan.surface_format.format)
            .image_color_space(plan.surface_format.color_space)
            .image_extent(plan.extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .image_sharing_mode(sharing_mode)
            .queue_family_indices(shared_families)
            .pre_transform(plan.pre_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(plan.present_mode)
            .clipped(true)
            .old_swapchain(old_swapchain);

        let swapchain = unsafe {
            device
                .swapchain_loader()
                .create_swapchain(&create_info, None)?
        };

        // Partially built chains are torn down by `Drop`.
        let mut chain = Self {
            device: device.clone(),
            swapchain,
            images: Vec::new(),
            render_pass: None,
            formats: ChainFormats {
                color: plan.surface_format.format,
                depth: depth_format,
            },
            color_space: plan.surface_format.color_space,
            present_mode: plan.present_mode,
            extent: plan.extent,
        };

        let render_pass =
            RenderPass::for_swapchain(device.clone(), chain.formats.color, depth_format)?;
        let render_pass_handle = render_pass.handle();
        chain.render_pass = Some(render_pass);

        let swapchain_images = unsafe { device.swapchain_loader().get_swapchain_images(swapchain)? };
        chain.images.reserve(swapchain_images.len());

        for (index, image) in swapchain_images.into_iter().enumerate() {
            let view = ImageView::new(
                device.clone(),
                image,
                chain.formats.color,
                vk::ImageAspectFlags::COLOR,
            )?;
            let depth = DepthImage::new(device.clone(), plan.extent, depth_format)?;
            let framebuffer = Framebuffer::new(
                device.clone(),
                render_pass_handle,
                &[view.handle(), depth.view()],
                plan.extent,
            )?;

            chain.images.push(PresentableImage {
                framebuffer,
                depth,
                view,
                image,
                index: index as u32,
            });
        }

        info!("Swapchain created with {} images", chain.images.len());

        Ok(chain)
    }

    /// Returns the Vulkan swapchain handle.
    #[inline]
    pub fn handle(&self) -> vk::SwapchainKHR {
        self.swapchain
    }

    /// Returns the chain's presentable images.
    #[inline]
    pub fn images(&self) -> &[PresentableImage] {
        &self.images
    }

    /// Returns the color space of the swapchain images.
    #[inline]
    pub fn color_space(&self) -> vk::ColorSpaceKHR {
        self.color_space
    }

    /// Returns the present mode in use.
    #[inline]
    pub fn present_mode(&self) -> vk::PresentModeKHR {
        self.present_mode
    }

    /// Width over height of the chain extent.
    pub fn aspect_ratio(&self) -> f32 {
        self.extent.width as f32 / self.extent.height.max(1) as f32
    }
}

impl PresentationChain for SurfaceChain {
    fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    fn image_count(&self) -> usize {
        self.images.len()
    }

    fn formats(&self) -> ChainFormats {
        self.formats
    }

    fn render_pass(&self) -> vk::RenderPass {
        self.render_pass
            .as_ref()
            .map_or(vk::RenderPass::null(), RenderPass::handle)
    }

    fn framebuffer(&self, image_index: u32) -> vk::Framebuffer {
        self.images[image_index as usize].framebuffer()
    }

    fn acquire_next_image(&self, signal: vk::Semaphore, timeout: u64) -> RhiResult<AcquireOutcome> {
        let result = unsafe {
            self.device.swapchain_loader().acquire_next_image(
                self.swapchain,
                timeout,
                signal,
                vk::Fence::null(),
            )
        };
        AcquireOutcome::from_acquire(result)
    }

    fn present(&self, image_index: u32, wait: vk::Semaphore) -> RhiResult<SurfaceStatus> {
        let wait_semaphores = [wait];
        let swapchains = [self.swapchain];
        let image_indices = [image_index];

        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        let result = unsafe {
            self.device
                .swapchain_loader()
                .queue_present(self.device.present_queue(), &present_info)
        };
        SurfaceStatus::from_present(result)
    }
}

impl Drop for SurfaceChain {
    fn drop(&mut self) {
        let image_count = self.images.len();
        self.images.clear();
        self.render_pass = None;

        unsafe {
            self.device
                .swapchain_loader()
                .destroy_swapchain(self.swapchain, None);
        }

        info!(
            "Swapchain destroyed (was {}x{}, {} images)",
            self.extent.width, self.extent.height, image_count
        );
    }
}

/// Prefers [`PREFERRED_SURFACE_FORMAT`], else the first reported format.
fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> vk::SurfaceFormatKHR {
    let preferred = formats.iter().find(|f| {
        f.format == PREFERRED_SURFACE_FORMAT.format
            && f.color_space == PREFERRED_SURFACE_FORMAT.color_space
    });

    match preferred {
        Some(&format) => format,
        None => {
            warn!("Using first available surface format: {:?}", formats[0]);
            formats[0]
        }
    }
}

/// Low-latency-no-tear, then low-latency-with-tear, then FIFO, which every
/// implementation supports.
fn choose_present_mode(
    present_modes: &[vk::PresentModeKHR],
    policy: PresentModePolicy,
) -> vk::PresentModeKHR {
    if policy == PresentModePolicy::LowLatency {
        for mode in [vk::PresentModeKHR::MAILBOX, vk::PresentModeKHR::IMMEDIATE] {
            if present_modes.contains(&mode) {
                return mode;
            }
        }
    }
    vk::PresentModeKHR::FIFO
}

/// Uses the surface's current extent when it is defined, otherwise the
/// requested size. Either way the result is clamped to the surface limits.
fn choose_extent(capabilities: &vk::SurfaceCapabilitiesKHR, requested: vk::Extent2D) -> vk::Extent2D {
    let target = if capabilities.current_extent.width != u32::MAX {
        capabilities.current_extent
    } else {
        requested
    };

    let min = capabilities.min_image_extent;
    let max = capabilities.max_image_extent;
    // Not `u32::clamp`: drivers have reported min > max for minimized windows.
    vk::Extent2D {
        width: target.width.min(max.width).max(min.width),
        height: target.height.min(max.height).max(min.height),
    }
}

/// One more than the minimum, capped by the maximum when there is one.
fn determine_image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let preferred = capabilities.min_image_count + 1;
    if capabilities.max_image_count > 0 {
        preferred.min(capabilities.max_image_count)
    } else {
        preferred
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn surface_format(format: vk::Format, color_space: vk::ColorSpaceKHR) -> vk::SurfaceFormatKHR {
        vk::SurfaceFormatKHR {
            format,
            color_space,
        }
    }

    fn capabilities(min: u32, max: u32) -> vk::SurfaceCapabilitiesKHR {
        vk::SurfaceCapabilitiesKHR {
            min_image_count: min,
            max_image_count: max,
            current_extent: vk::Extent2D {
                width: u32::MAX,
                height: u32::MAX,
            },
            min_image_extent: vk::Extent2D {
                width: 1,
                height: 1,
            },
            max_image_extent: vk::Extent2D {
                width: 4096,
                height: 4096,
            },
            ..Default::default()
        }
    }

    fn request(width: u32, height: u32) -> ChainRequest {
        ChainRequest {
            extent: vk::Extent2D { width, height },
            present_mode: PresentModePolicy::LowLatency,
        }
    }

    #[test]
    fn test_steady_state_plan() {
        let support = SwapchainSupportDetails {
            capabilities: capabilities(2, 3),
            formats: vec![surface_format(
                vk::Format::B8G8R8A8_SRGB,
                vk::ColorSpaceKHR::SRGB_NONLINEAR,
            )],
            present_modes: vec![vk::PresentModeKHR::FIFO],
        };

        let plan = ChainPlan::resolve(&support, request(800, 600)).unwrap();
        assert_eq!(plan.image_count, 3);
        assert_eq!(plan.surface_format.format, vk::Format::B8G8R8A8_SRGB);
        assert_eq!(
            plan.surface_format.color_space,
            vk::ColorSpaceKHR::SRGB_NONLINEAR
        );
        assert_eq!(plan.present_mode, vk::PresentModeKHR::FIFO);
        assert_eq!(plan.extent, vk::Extent2D { width: 800, height: 600 });
    }

    #[test]
    fn test_plan_rejects_inadequate_support() {
        let support = SwapchainSupportDetails {
            capabilities: capabilities(2, 3),
            formats: vec![],
            present_modes: vec![vk::PresentModeKHR::FIFO],
        };
        assert!(matches!(
            ChainPlan::resolve(&support, request(800, 600)),
            Err(RhiError::SwapchainError(_))
        ));
    }

    #[test]
    fn test_choose_surface_format_prefers_srgb() {
        let formats = vec![
            surface_format(vk::Format::R8G8B8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
            surface_format(vk::Format::B8G8R8A8_SRGB, vk::ColorSpaceKHR::SRGB_NONLINEAR),
        ];
        let selected = choose_surface_format(&formats);
        assert_eq!(selected.format, vk::Format::B8G8R8A8_SRGB);
    }

    #[test]
    fn test_choose_surface_format_falls_back_to_first() {
        let formats = vec![
            surface_format(vk::Format::R8G8B8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
            surface_format(vk::Format::B8G8R8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
        ];
        let selected = choose_surface_format(&formats);
        assert_eq!(selected.format, vk::Format::R8G8B8A8_UNORM);
    }

    #[test]
    fn test_choose_present_mode_order() {
        let all = [
            vk::PresentModeKHR::FIFO,
            vk::PresentModeKHR::IMMEDIATE,
            vk::PresentModeKHR::MAILBOX,
        ];
        assert_eq!(
            choose_present_mode(&all, PresentModePolicy::LowLatency),
            vk::PresentModeKHR::MAILBOX
        );
        assert_eq!(
            choose_present_mode(&all[..2], PresentModePolicy::LowLatency),
            vk::PresentModeKHR::IMMEDIATE
        );
        assert_eq!(
            choose_present_mode(&all[..1], PresentModePolicy::LowLatency),
            vk::PresentModeKHR::FIFO
        );
    }

    #[test]
    fn test_vsync_policy_forces_fifo() {
        let all = [vk::PresentModeKHR::MAILBOX, vk::PresentModeKHR::FIFO];
        assert_eq!(
            choose_present_mode(&all, PresentModePolicy::Vsync),
            vk::PresentModeKHR::FIFO
        );
    }

    #[test]
    fn test_choose_extent_uses_current() {
        let mut caps = capabilities(2, 3);
        caps.current_extent = vk::Extent2D {
            width: 1920,
            height: 1080,
        };
        let extent = choose_extent(&caps, vk::Extent2D { width: 800, height: 600 });
        assert_eq!(extent, vk::Extent2D { width: 1920, height: 1080 });
    }

    #[test]
    fn test_extent_clamping_property() {
        let sizes = [0, 1, 50, 100, 640, 2000, 2001, 5000, u32::MAX - 1];
        for &min in &[1u32, 100, 640] {
            for &max in &[640u32, 2000, 4096] {
                if min > max {
                    continue;
                }
                let mut caps = capabilities(2, 3);
                caps.min_image_extent = vk::Extent2D { width: min, height: min };
                caps.max_image_extent = vk::Extent2D { width: max, height: max };

                for &w in &sizes {
                    for &h in &sizes {
                        let extent = choose_extent(&caps, vk::Extent2D { width: w, height: h });
                        assert!((min..=max).contains(&extent.width), "{w} in [{min}, {max}]");
                        assert!((min..=max).contains(&extent.height), "{h} in [{min}, {max}]");
                        if (min..=max).contains(&w) {
                            assert_eq!(extent.width, w);
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_image_count_property() {
        for min in 1..=8u32 {
            for max in 0..=10u32 {
                if max != 0 && max < min {
                    continue;
                }
                let count = determine_image_count(&capabilities(min, max));
                if max > 0 {
                    assert!(count <= max);
                    assert!(count >= min);
                    assert!(count == min + 1 || count == max);
                } else {
                    assert_eq!(count, min + 1);
                }
            }
        }
    }

    #[test]
    fn test_formats_match() {
        let previous = ChainFormats {
            color: vk::Format::B8G8R8A8_SRGB,
            depth: vk::Format::D32_SFLOAT,
        };
        assert!(previous.ensure_matches(&previous).is_ok());
    }

    #[test]
    fn test_rebuild_rejects_changed_color_format() {
        let old_support = SwapchainSupportDetails {
            capabilities: capabilities(2, 3),
            formats: vec![surface_format(
                vk::Format::B8G8R8A8_SRGB,
                vk::ColorSpaceKHR::SRGB_NONLINEAR,
            )],
            present_modes: vec![vk::PresentModeKHR::FIFO],
        };
        // The surface stops offering the sRGB format between builds.
        let new_support = SwapchainSupportDetails {
            formats: vec![surface_format(
                vk::Format::R8G8B8A8_UNORM,
                vk::ColorSpaceKHR::SRGB_NONLINEAR,
            )],
            ..old_support.clone()
        };

        let old = ChainPlan::resolve(&old_support, request(800, 600)).unwrap();
        let new = ChainPlan::resolve(&new_support, request(800, 600)).unwrap();
        let previous = ChainFormats {
            color: old.surface_format.format,
            depth: vk::Format::D32_SFLOAT,
        };
        let rebuilt = ChainFormats {
            color: new.surface_format.format,
            depth: vk::Format::D32_SFLOAT,
        };

        match rebuilt.ensure_matches(&previous) {
            Err(RhiError::FormatMismatch {
                attachment,
                expected,
                found,
            }) => {
                assert_eq!(attachment, "color");
                assert_eq!(expected, vk::Format::B8G8R8A8_SRGB);
                assert_eq!(found, vk::Format::R8G8B8A8_UNORM);
            }
            other => panic!("expected a format mismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_rebuild_rejects_changed_depth_format() {
        let previous = ChainFormats {
            color: vk::Format::B8G8R8A8_SRGB,
            depth: vk::Format::D32_SFLOAT,
        };
        let rebuilt = ChainFormats {
            depth: vk::Format::D24_UNORM_S8_UINT,
            ..previous
        };
        assert!(matches!(
            rebuilt.ensure_matches(&previous),
            Err(RhiError::FormatMismatch {
                attachment: "depth",
                ..
            })
        ));
    }

    #[test]
    fn test_acquire_outcome_mapping() {
        assert_eq!(
            AcquireOutcome::from_acquire(Ok((2, false))).unwrap(),
            AcquireOutcome::Ready(2)
        );
        assert_eq!(
            AcquireOutcome::from_acquire(Ok((1, true))).unwrap(),
            AcquireOutcome::Suboptimal(1)
        );
        assert_eq!(
            AcquireOutcome::from_acquire(Err(vk::Result::ERROR_OUT_OF_DATE_KHR)).unwrap(),
            AcquireOutcome::Stale
        );
        assert!(AcquireOutcome::from_acquire(Err(vk::Result::ERROR_DEVICE_LOST)).is_err());
        assert_eq!(AcquireOutcome::Stale.image_index(), None);
        assert_eq!(AcquireOutcome::Suboptimal(1).status(), SurfaceStatus::Suboptimal);
    }

    #[test]
    fn test_present_status_mapping() {
        assert_eq!(SurfaceStatus::from_present(Ok(false)).unwrap(), SurfaceStatus::Ready);
        assert_eq!(
            SurfaceStatus::from_present(Ok(true)).unwrap(),
            SurfaceStatus::Suboptimal
        );
        assert_eq!(
            SurfaceStatus::from_present(Err(vk::Result::SUBOPTIMAL_KHR)).unwrap(),
            SurfaceStatus::Suboptimal
        );
        assert_eq!(
            SurfaceStatus::from_present(Err(vk::Result::ERROR_OUT_OF_DATE_KHR)).unwrap(),
            SurfaceStatus::Stale
        );
        assert!(matches!(
            SurfaceStatus::from_present(Err(vk::Result::ERROR_SURFACE_LOST_KHR)),
            Err(RhiError::VulkanError(vk::Result::ERROR_SURFACE_LOST_KHR))
        ));
        assert!(!SurfaceStatus::Ready.needs_rebuild());
        assert!(SurfaceStatus::Stale.needs_rebuild());
    }
}
