use log::{trace, warn};

use super::backend::{Backend, CommandQueue};
use super::fence::{FenceSynchronizer, FenceValue};
use super::ring::FrameSlot;
use super::swap_chain::{SwapChain, VSYNC_INTERVAL};
use crate::Result;

/// Submits the closed frame list, presents with vsync and signals the fence.
///
/// The signal is issued after `Present` on the same queue, so the stored
/// value covers every command the frame submitted. A failed present still
/// signals and tags the slot, because the list was already executed and its
/// allocator must not be reset before the GPU is done with it.
pub fn present<B: Backend>(
    queue: &B::Queue,
    swap_chain: &B::SwapChain,
    fence: &mut FenceSynchronizer<B::Timeline>,
    command_list: &B::CommandList,
    slot: &mut FrameSlot<B::Allocator>,
) -> Result<FenceValue> {
    queue.execute(command_list)?;

    let presented = swap_chain.present(VSYNC_INTERVAL);
    if let Err(e) = &presented {
        warn!("present failed: {e}");
    }

    let value = fence.signal_next()?;
    slot.mark_pending(value);
    trace!("frame submitted, fence value {}", value.get());

    presented.map(|()| value)
}
