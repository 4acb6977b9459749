//! The per-frame loop: pace, acquire a slot, record, present.

use log::{debug, error, info};

use crate::frame::{
    presenter, recorder, Backend, FenceSynchronizer, FenceValue, FrameRing, ScissorRect, Scene,
    SwapChain, Viewport,
};
use crate::ui::Ui;
use crate::{Error, Result};

/// GPU objects a [`FrameRenderer`] takes ownership of.
pub struct FrameResources<B: Backend> {
    pub queue: B::Queue,
    pub timeline: B::Timeline,
    /// One per frame slot.
    pub allocators: Vec<B::Allocator>,
    pub command_list: B::CommandList,
    pub swap_chain: B::SwapChain,
    pub pipeline: B::Pipeline,
    pub scene: B::Scene,
}

pub struct FrameRenderer<B: Backend> {
    queue: B::Queue,
    fence: FenceSynchronizer<B::Timeline>,
    ring: FrameRing<B::Allocator>,
    command_list: B::CommandList,
    swap_chain: B::SwapChain,
    pipeline: B::Pipeline,
    scene: B::Scene,
    viewport: Viewport,
    scissor: ScissorRect,
}

impl<B: Backend> FrameRenderer<B> {
    pub fn new(resources: FrameResources<B>, width: u32, height: u32) -> Self {
        let FrameResources {
            queue,
            timeline,
            allocators,
            command_list,
            swap_chain,
            pipeline,
            scene,
        } = resources;

        info!(
            "frame renderer: {} frame slots, {} back buffers, {width}x{height}",
            allocators.len(),
            swap_chain.buffer_count()
        );

        Self {
            queue,
            fence: FenceSynchronizer::new(timeline),
            ring: FrameRing::new(allocators),
            command_list,
            swap_chain,
            pipeline,
            scene,
            viewport: Viewport::full(width, height),
            scissor: ScissorRect::full(width, height),
        }
    }

    /// Renders and presents one frame.
    ///
    /// Blocks on the swap chain's latency waitable, then on the fence if the
    /// next frame slot still has work in flight.
    pub fn render_frame<U: Ui<B> + ?Sized>(&mut self, ui: &mut U) -> Result<FenceValue> {
        self.swap_chain.wait_for_frame_latency()?;
        let slot = self.ring.acquire_next(&self.fence)?;

        // the presentation engine picks the back buffer, not the frame counter
        let back_buffer = self.swap_chain.current_back_buffer_index();
        let target = self
            .swap_chain
            .render_target(back_buffer)
            .ok_or(Error::RenderTargetsReleased)?;

        let ui_draws = ui.render();
        let frame = recorder::FrameCommands::<B> {
            pipeline: &self.pipeline,
            scene: &self.scene,
            target,
            viewport: &self.viewport,
            scissor: &self.scissor,
            clear_color: ui.clear_color(),
            ui_draws: &ui_draws,
        };
        recorder::record_frame::<B>(&mut self.command_list, slot.allocator_mut(), &frame)?;

        presenter::present::<B>(
            &self.queue,
            &self.swap_chain,
            &mut self.fence,
            &self.command_list,
            slot,
        )
    }

    /// Resizes the back buffers to the new client area.
    ///
    /// Zero-sized (minimized) and unchanged sizes are ignored. Otherwise the
    /// GPU is drained before any back-buffer reference is dropped.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 {
            debug!("ignoring resize to {width}x{height}");
            return Ok(());
        }
        if self.scissor.size() == (width, height) {
            return Ok(());
        }

        info!("resizing back buffers to {width}x{height}");
        self.wait_for_last_submitted_frame()?;
        self.swap_chain.release_render_targets();
        self.swap_chain.resize(width, height)?;
        self.scene.resize(width, height);
        self.viewport = Viewport::full(width, height);
        self.scissor = ScissorRect::full(width, height);
        Ok(())
    }

    /// Blocks until the GPU finished everything submitted so far.
    pub fn wait_for_last_submitted_frame(&mut self) -> Result<()> {
        self.ring.wait_for_last_submitted(&self.fence)
    }

    pub fn frame_index(&self) -> u64 {
        self.ring.frame_index()
    }

    pub fn last_signaled(&self) -> FenceValue {
        self.fence.last_signaled()
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn scissor(&self) -> &ScissorRect {
        &self.scissor
    }

    pub fn pipeline(&self) -> &B::Pipeline {
        &self.pipeline
    }

    pub fn scene(&self) -> &B::Scene {
        &self.scene
    }

    pub fn swap_chain(&self) -> &B::SwapChain {
        &self.swap_chain
    }
}

impl<B: Backend> Drop for FrameRenderer<B> {
    fn drop(&mut self) {
        if let Err(e) = self.wait_for_last_submitted_frame() {
            error!("failed to drain the GPU on shutdown: {e}");
        }
        self.swap_chain.release_render_targets();
    }
}
