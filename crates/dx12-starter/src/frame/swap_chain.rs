use super::backend::Backend;
use crate::Result;

/// Sync interval used for every present: wait for one vertical blank.
pub const VSYNC_INTERVAL: u32 = 1;

/// The presentation engine.
///
/// Two things bound how far the CPU can run ahead. The frame-latency
/// waitable caps queued-but-unpresented frames; the fence caps allocator
/// reuse. Both waits are needed.
pub trait SwapChain<B: Backend> {
    fn buffer_count(&self) -> usize;

    /// Chosen by the presentation engine, not by the application. Re-query
    /// it every frame.
    fn current_back_buffer_index(&self) -> usize;

    /// `None` while the back buffers are released for a resize.
    fn render_target(&self, index: usize) -> Option<&B::RenderTarget>;

    /// Blocks, with no timeout, until a new frame can be queued without
    /// exceeding the maximum frame latency.
    fn wait_for_frame_latency(&self) -> Result<()>;

    fn present(&self, sync_interval: u32) -> Result<()>;

    /// Drops every reference to the back buffers. The GPU must be drained first.
    fn release_render_targets(&mut self);

    /// Resizes the back buffers (count and format unchanged) and recreates
    /// their render-target views.
    fn resize(&mut self, width: u32, height: u32) -> Result<()>;
}
