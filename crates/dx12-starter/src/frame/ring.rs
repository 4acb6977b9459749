//! Per-frame command allocators cycled by a monotonic frame counter.
//!
//! ```text
//! Free ──record + submit──▶ Pending(f) ──fence reaches f──▶ Free
//! ```
//!
//! A slot is handed out for recording only in the `Free` state, so the CPU
//! never resets an allocator the GPU may still be reading.

use log::trace;

use super::fence::{FenceSynchronizer, FenceValue, Timeline};
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Free,
    Pending(FenceValue),
}

#[derive(Debug)]
pub struct FrameSlot<A> {
    allocator: A,
    fence_value: FenceValue,
}

impl<A> FrameSlot<A> {
    fn new(allocator: A) -> Self {
        Self {
            allocator,
            fence_value: FenceValue::NONE,
        }
    }

    pub fn state(&self) -> SlotState {
        if self.fence_value.is_none() {
            SlotState::Free
        } else {
            SlotState::Pending(self.fence_value)
        }
    }

    pub fn fence_value(&self) -> FenceValue {
        self.fence_value
    }

    pub fn allocator(&self) -> &A {
        &self.allocator
    }

    pub fn allocator_mut(&mut self) -> &mut A {
        &mut self.allocator
    }

    /// Tags the slot with the value that marks completion of its submitted work.
    pub fn mark_pending(&mut self, fence_value: FenceValue) {
        debug_assert!(!fence_value.is_none());
        self.fence_value = fence_value;
    }

    /// Waits for the outstanding work (if any), then frees the slot.
    fn release<T: Timeline>(&mut self, fence: &FenceSynchronizer<T>) -> Result<()> {
        if let SlotState::Pending(value) = self.state() {
            fence.wait_for_value(value)?;
            debug_assert!(fence.is_complete(value).unwrap_or(false));
            self.fence_value = FenceValue::NONE;
        }
        Ok(())
    }
}

pub struct FrameRing<A> {
    slots: Vec<FrameSlot<A>>,
    frame_index: u64,
}

impl<A> FrameRing<A> {
    /// One slot per allocator. Panics on an empty list.
    pub fn new(allocators: Vec<A>) -> Self {
        assert!(!allocators.is_empty(), "a frame ring needs at least one slot");
        Self {
            slots: allocators.into_iter().map(FrameSlot::new).collect(),
            frame_index: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Ring position of frame `frame_index`.
    pub fn slot_index(&self, frame_index: u64) -> usize {
        (frame_index % self.slots.len() as u64) as usize
    }

    pub fn slot(&self, index: usize) -> &FrameSlot<A> {
        &self.slots[index]
    }

    pub fn current(&self) -> &FrameSlot<A> {
        &self.slots[self.slot_index(self.frame_index)]
    }

    pub fn current_mut(&mut self) -> &mut FrameSlot<A> {
        let i = self.slot_index(self.frame_index);
        &mut self.slots[i]
    }

    /// Advances the frame counter and returns the slot for the new frame,
    /// waiting on the fence first if the slot still has work in flight.
    pub fn acquire_next<T: Timeline>(
        &mut self,
        fence: &FenceSynchronizer<T>,
    ) -> Result<&mut FrameSlot<A>> {
        self.frame_index += 1;
        let i = self.slot_index(self.frame_index);
        let slot = &mut self.slots[i];
        trace!(
            "frame {} uses slot {i} ({:?})",
            self.frame_index,
            slot.state()
        );
        slot.release(fence)?;
        Ok(slot)
    }

    /// Waits for the highest value ever signaled, then frees every slot.
    ///
    /// The current slot may be `Free` when the last frame failed after
    /// acquiring it, so the wait targets the fence rather than the slot.
    pub fn wait_for_last_submitted<T: Timeline>(
        &mut self,
        fence: &FenceSynchronizer<T>,
    ) -> Result<()> {
        fence.wait_for_value(fence.last_signaled())?;
        for slot in &mut self.slots {
            slot.release(fence)?;
        }
        Ok(())
    }
}
