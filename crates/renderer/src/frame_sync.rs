//! The acquire/submit/present protocol across frames in flight.
//!
//! [`FrameSynchronizer`] owns one [`FrameSlot`] per frame in flight and a map
//! from presentable image to the fence of the slot last rendering into it.
//!
//! ```text
//! acquire:            wait slot fence -> acquire image (signals image_available)
//! submit_and_present: wait image fence (if another slot still owns the image)
//!                     -> record slot fence for the image -> reset slot fence
//!                     -> submit -> present -> advance slot
//! ```
//!
//! The fences are the only thing the CPU ever waits on.

use ash::vk;
use tracing::{debug, info};

use lumen_rhi::{
    ACQUIRE_TIMEOUT, AcquireOutcome, FrameSlot, PresentationChain, RhiResult, SurfaceStatus,
    SyncDevice,
};

/// Timeout for CPU waits on frame fences.
pub const FENCE_TIMEOUT: u64 = u64::MAX;

/// Result of presenting a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresentOutcome {
    pub status: SurfaceStatus,
    /// The host reported a framebuffer size change since the last rebuild.
    pub resize_requested: bool,
}

impl PresentOutcome {
    /// The chain must be rebuilt before the next frame.
    pub fn needs_rebuild(&self) -> bool {
        self.status.needs_rebuild() || self.resize_requested
    }
}

/// Per-frame synchronization state.
///
/// Owns raw handles; call [`FrameSynchronizer::destroy`] with the creating
/// device once it is idle.
#[derive(Debug)]
pub struct FrameSynchronizer {
    slots: Vec<FrameSlot>,
    images_in_flight: Vec<Option<vk::Fence>>,
    current_frame: usize,
}

impl FrameSynchronizer {
    /// Creates `frames_in_flight` slots and tracking for `image_count` images.
    ///
    /// # Panics
    ///
    /// Panics if `frames_in_flight` is zero.
    pub fn new<D: SyncDevice + ?Sized>(
        device: &D,
        frames_in_flight: usize,
        image_count: usize,
    ) -> RhiResult<Self> {
        assert!(frames_in_flight > 0, "at least one frame in flight is required");

        let mut slots = Vec::with_capacity(frames_in_flight);
        for index in 0..frames_in_flight {
            match FrameSlot::new(device) {
                Ok(slot) => {
                    debug!("Created frame slot {}", index);
                    slots.push(slot);
                }
                Err(e) => {
                    for slot in &slots {
                        slot.destroy(device);
                    }
                    return Err(e);
                }
            }
        }

        info!(
            "Frame synchronizer created: {} frames in flight, {} images",
            frames_in_flight, image_count
        );

        Ok(Self {
            slots,
            images_in_flight: vec![None; image_count],
            current_frame: 0,
        })
    }

    #[inline]
    pub fn frames_in_flight(&self) -> usize {
        self.slots.len()
    }

    /// Index of the active slot, in `0..frames_in_flight`.
    #[inline]
    pub fn current_frame(&self) -> usize {
        self.current_frame
    }

    #[inline]
    pub fn current_slot(&self) -> &FrameSlot {
        &self.slots[self.current_frame]
    }

    /// Fence of the slot last submitted against `image_index`, if any.
    pub fn image_fence(&self, image_index: u32) -> Option<vk::Fence> {
        self.images_in_flight
            .get(image_index as usize)
            .copied()
            .flatten()
    }

    /// Waits until the active slot is retired, then acquires the next image.
    ///
    /// On [`AcquireOutcome::Stale`] nothing was signaled and the slot is left
    /// as it was.
    pub fn acquire<D, C>(&self, device: &D, chain: &C) -> RhiResult<AcquireOutcome>
    where
        D: SyncDevice + ?Sized,
        C: PresentationChain + ?Sized,
    {
        let slot = self.current_slot();
        device.wait_for_fence(slot.in_flight(), FENCE_TIMEOUT)?;
        chain.acquire_next_image(slot.image_available(), ACQUIRE_TIMEOUT)
    }

    /// Submits `command_buffer` for `image_index` and presents it.
    ///
    /// Advances to the next slot on every call, including failed ones.
    ///
    /// # Panics
    ///
    /// Panics if `image_index` is outside the tracked image range.
    pub fn submit_and_present<D, C>(
        &mut self,
        device: &D,
        chain: &C,
        command_buffer: vk::CommandBuffer,
        image_index: u32,
    ) -> RhiResult<SurfaceStatus>
    where
        D: SyncDevice + ?Sized,
        C: PresentationChain + ?Sized,
    {
        let result = self.submit_and_present_current(device, chain, command_buffer, image_index);
        self.current_frame = (self.current_frame + 1) % self.slots.len();
        result
    }

    fn submit_and_present_current<D, C>(
        &mut self,
        device: &D,
        chain: &C,
        command_buffer: vk::CommandBuffer,
        image_index: u32,
    ) -> RhiResult<SurfaceStatus>
    where
        D: SyncDevice + ?Sized,
        C: PresentationChain + ?Sized,
    {
        let image = image_index as usize;
        assert!(
            image < self.images_in_flight.len(),
            "image index {} out of range for {} tracked images",
            image_index,
            self.images_in_flight.len()
        );

        let slot = self.slots[self.current_frame];

        // Another slot may still be rendering into this image.
        if let Some(fence) = self.images_in_flight[image] {
            device.wait_for_fence(fence, FENCE_TIMEOUT)?;
        }
        self.images_in_flight[image] = Some(slot.in_flight());

        device.reset_fence(slot.in_flight())?;
        device.submit_frame(&slot.submit_info(command_buffer))?;

        chain.present(image_index, slot.render_finished())
    }

    /// Forgets image ownership after a chain rebuild. The device must be idle.
    pub fn reset_image_tracking(&mut self, image_count: usize) {
        self.images_in_flight.clear();
        self.images_in_flight.resize(image_count, None);
        debug!("Image tracking reset for {} images", image_count);
    }

    /// Destroys every slot. The device must be idle.
    pub fn destroy<D: SyncDevice + ?Sized>(&mut self, device: &D) {
        for slot in self.slots.drain(..) {
            slot.destroy(device);
        }
        self.images_in_flight.clear();
        self.current_frame = 0;
        debug!("Frame synchronizer destroyed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_present_outcome_needs_rebuild() {
        let outcome = |status, resize_requested| PresentOutcome {
            status,
            resize_requested,
        };
        assert!(!outcome(SurfaceStatus::Ready, false).needs_rebuild());
        assert!(outcome(SurfaceStatus::Ready, true).needs_rebuild());
        assert!(outcome(SurfaceStatus::Suboptimal, false).needs_rebuild());
        assert!(outcome(SurfaceStatus::Stale, false).needs_rebuild());
    }
}
