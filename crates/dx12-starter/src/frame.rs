pub mod backend;

pub mod fence;
pub mod presenter;
pub mod recorder;
pub mod ring;
pub mod swap_chain;
pub mod viewport;

#[cfg(test)]
pub(crate) mod mock;

pub use backend::{Backend, CommandAllocator, CommandQueue, Scene};
pub use fence::{FenceSynchronizer, FenceValue, Timeline};
pub use recorder::{CommandList, DrawCommand, ResourceState, Transition};
pub use ring::{FrameRing, FrameSlot, SlotState};
pub use swap_chain::SwapChain;
pub use viewport::{ScissorRect, Viewport};
