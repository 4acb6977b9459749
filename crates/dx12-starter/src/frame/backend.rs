//! The seam between the frame protocol and a graphics API.
//!
//! [`Backend`] names one concrete type per GPU object the protocol touches.
//! The Direct3D 12 implementation lives in `crate::d3d12`; tests drive the
//! same protocol through `frame::mock`.

use crate::Result;

use super::fence::Timeline;
use super::recorder::CommandList;
use super::swap_chain::SwapChain;

pub trait Backend: Sized {
    /// Device handle handed to the UI collaborator.
    type Device;
    /// Shader-visible descriptor heap handed to the UI collaborator.
    type DescriptorHeap;
    /// One back buffer plus its render-target view.
    type RenderTarget;

    type Allocator: CommandAllocator;
    type CommandList: CommandList<Self>;
    type Queue: CommandQueue<Self>;
    type Timeline: Timeline;
    type SwapChain: SwapChain<Self>;

    /// Pipeline state, root signature and descriptor heaps bound every frame.
    type Pipeline;
    type Scene: Scene;
}

/// Backing memory for one frame's recorded commands.
pub trait CommandAllocator {
    /// Recycles the memory. Only valid once the GPU finished every command
    /// recorded into it.
    fn reset(&mut self) -> Result<()>;
}

pub trait CommandQueue<B: Backend> {
    /// Submits a closed command list.
    fn execute(&self, command_list: &B::CommandList) -> Result<()>;
}

/// The scene drawn between the render-target barriers.
pub trait Scene {
    fn vertex_count(&self) -> u32;

    /// Rewrites size-dependent GPU data. Called only after a full drain.
    fn resize(&mut self, width: u32, height: u32);
}
