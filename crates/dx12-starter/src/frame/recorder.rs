//! Builds the single command list submitted for a frame.
//!
//! Recording order:
//!
//! ```text
//! reset allocator + list
//! bind pipeline, root signature, descriptor heaps, viewport
//! ┌ PRESENT -> RENDER_TARGET          (RenderTargetPass::begin)
//! │ clear + bind render target
//! │ scene draw
//! │ UI draws
//! └ RENDER_TARGET -> PRESENT          (RenderTargetPass::drop)
//! close
//! ```

use glam::Vec4;

use super::backend::{Backend, CommandAllocator, Scene};
use super::viewport::{ScissorRect, Viewport};
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceState {
    Present,
    RenderTarget,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub before: ResourceState,
    pub after: ResourceState,
}

impl Transition {
    pub const PRESENT_TO_RENDER_TARGET: Self = Self {
        before: ResourceState::Present,
        after: ResourceState::RenderTarget,
    };

    pub const RENDER_TARGET_TO_PRESENT: Self = Self {
        before: ResourceState::RenderTarget,
        after: ResourceState::Present,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawCommand {
    pub vertex_count: u32,
    pub instance_count: u32,
    pub start_vertex: u32,
    pub start_instance: u32,
}

impl DrawCommand {
    /// One instance of a non-indexed triangle list.
    pub fn triangles(vertex_count: u32) -> Self {
        Self {
            vertex_count,
            instance_count: 1,
            start_vertex: 0,
            start_instance: 0,
        }
    }
}

/// The subset of a graphics command list the frame needs.
pub trait CommandList<B: Backend> {
    /// Opens the list for recording against `allocator`.
    fn reset(&mut self, allocator: &B::Allocator, pipeline: &B::Pipeline) -> Result<()>;

    /// Pipeline state, root signature, descriptor heaps and root tables.
    fn bind_pipeline(&mut self, pipeline: &B::Pipeline);

    fn set_viewport(&mut self, viewport: &Viewport, scissor: &ScissorRect);

    fn transition(&mut self, target: &B::RenderTarget, transition: Transition);

    fn clear_render_target(&mut self, target: &B::RenderTarget, color: [f32; 4]);

    fn set_render_target(&mut self, target: &B::RenderTarget);

    /// Topology and vertex buffers of the scene.
    fn bind_scene(&mut self, scene: &B::Scene);

    fn draw(&mut self, draw: &DrawCommand);

    /// No further recording until the next [`CommandList::reset`].
    fn close(&mut self) -> Result<()>;

    /// Debug marker, for graphics debuggers.
    fn begin_event(&mut self, _name: &str) {}

    fn end_event(&mut self) {}
}

/// Everything recorded into one frame.
pub struct FrameCommands<'a, B: Backend> {
    pub pipeline: &'a B::Pipeline,
    pub scene: &'a B::Scene,
    /// Back buffer of *this* frame, as reported by the swap chain.
    pub target: &'a B::RenderTarget,
    pub viewport: &'a Viewport,
    pub scissor: &'a ScissorRect,
    pub clear_color: Vec4,
    pub ui_draws: &'a [DrawCommand],
}

/// Scope in which the back buffer is a render target.
///
/// Opening the pass records `PRESENT -> RENDER_TARGET`; dropping it records
/// `RENDER_TARGET -> PRESENT`. The pass holds the only borrow of the list,
/// so the list cannot be closed while the back buffer is a render target.
pub struct RenderTargetPass<'a, B: Backend> {
    list: &'a mut B::CommandList,
    target: &'a B::RenderTarget,
}

impl<'a, B: Backend> RenderTargetPass<'a, B> {
    pub fn begin(list: &'a mut B::CommandList, target: &'a B::RenderTarget) -> Self {
        list.transition(target, Transition::PRESENT_TO_RENDER_TARGET);
        Self { list, target }
    }

    pub fn clear(&mut self, color: [f32; 4]) {
        self.list.clear_render_target(self.target, color);
    }

    pub fn bind_output(&mut self) {
        self.list.set_render_target(self.target);
    }

    pub fn draw_scene(&mut self, scene: &B::Scene) {
        self.list.bind_scene(scene);
        self.list.draw(&DrawCommand::triangles(scene.vertex_count()));
    }

    pub fn draw(&mut self, draw: &DrawCommand) {
        self.list.draw(draw);
    }

    pub fn begin_event(&mut self, name: &str) {
        self.list.begin_event(name);
    }

    pub fn end_event(&mut self) {
        self.list.end_event();
    }
}

impl<'a, B: Backend> Drop for RenderTargetPass<'a, B> {
    fn drop(&mut self) {
        self.list
            .transition(self.target, Transition::RENDER_TARGET_TO_PRESENT);
    }
}

/// Clear color with rgb scaled by alpha.
pub fn premultiplied(color: Vec4) -> [f32; 4] {
    [color.x * color.w, color.y * color.w, color.z * color.w, color.w]
}

/// Records a complete frame. `allocator` must belong to a free frame slot.
pub fn record_frame<B: Backend>(
    list: &mut B::CommandList,
    allocator: &mut B::Allocator,
    frame: &FrameCommands<'_, B>,
) -> Result<()> {
    allocator.reset()?;
    list.reset(allocator, frame.pipeline)?;

    list.begin_event("Frame");
    list.bind_pipeline(frame.pipeline);
    list.set_viewport(frame.viewport, frame.scissor);
    {
        let mut pass = RenderTargetPass::<B>::begin(list, frame.target);
        pass.begin_event("Clear");
        pass.clear(premultiplied(frame.clear_color));
        pass.end_event();
        pass.bind_output();

        pass.begin_event("Scene");
        pass.draw_scene(frame.scene);
        pass.end_event();

        if !frame.ui_draws.is_empty() {
            pass.begin_event("UI");
            for draw in frame.ui_draws {
                pass.draw(draw);
            }
            pass.end_event();
        }
    }
    list.end_event();

    list.close()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::mock::{
        Event, Mock, MockAllocator, MockCommandList, MockGpu, MockScene, MockTarget,
    };

    fn record(
        gpu: &std::rc::Rc<MockGpu>,
        ui_draws: &[DrawCommand],
        clear_color: Vec4,
    ) -> Vec<Event> {
        let mut list = MockCommandList::new(gpu);
        let mut allocator = MockAllocator::new(gpu, 4);
        let scene = MockScene::new(gpu, 36);
        let target = MockTarget { index: 2 };
        let viewport = Viewport::full(640, 480);
        let scissor = ScissorRect::full(640, 480);

        let frame = FrameCommands::<Mock> {
            pipeline: &(),
            scene: &scene,
            target: &target,
            viewport: &viewport,
            scissor: &scissor,
            clear_color,
            ui_draws,
        };
        record_frame::<Mock>(&mut list, &mut allocator, &frame).unwrap();
        gpu.events()
    }

    #[test]
    fn frame_is_recorded_in_order() {
        let gpu = MockGpu::new(0);
        let ui = DrawCommand {
            vertex_count: 6,
            instance_count: 1,
            start_vertex: 36,
            start_instance: 0,
        };

        let events = record(&gpu, &[ui], Vec4::new(1.0, 0.5, 0.25, 1.0));

        assert_eq!(
            events,
            vec![
                Event::AllocatorReset(4),
                Event::ListReset(4),
                Event::BindPipeline,
                Event::SetViewport(Viewport::full(640, 480), ScissorRect::full(640, 480)),
                Event::Barrier(2, Transition::PRESENT_TO_RENDER_TARGET),
                Event::Clear(2, [1.0, 0.5, 0.25, 1.0]),
                Event::SetRenderTarget(2),
                Event::BindScene,
                Event::Draw(DrawCommand::triangles(36)),
                Event::Draw(ui),
                Event::Barrier(2, Transition::RENDER_TARGET_TO_PRESENT),
                Event::Close,
            ]
        );
        assert!(gpu.violations().is_empty());
    }

    #[test]
    fn every_draw_sits_between_the_two_barriers() {
        let gpu = MockGpu::new(0);
        let draws = [DrawCommand::triangles(3), DrawCommand::triangles(6)];

        let events = record(&gpu, &draws, Vec4::ONE);

        let barriers: Vec<usize> = events
            .iter()
            .enumerate()
            .filter(|(_, e)| matches!(e, Event::Barrier(..)))
            .map(|(i, _)| i)
            .collect();
        assert_eq!(barriers.len(), 2);
        for (i, event) in events.iter().enumerate() {
            if matches!(event, Event::Draw(_) | Event::Clear(..) | Event::SetRenderTarget(_)) {
                assert!(barriers[0] < i && i < barriers[1], "{event:?} outside the pass");
            }
        }
        assert_eq!(events.last(), Some(&Event::Close));
    }

    #[test]
    fn clear_color_is_premultiplied() {
        assert_eq!(
            premultiplied(Vec4::new(0.4, 0.6, 0.8, 0.5)),
            [0.2, 0.3, 0.4, 0.5]
        );
        assert_eq!(premultiplied(Vec4::new(0.4, 0.6, 0.8, 0.0)), [0.0; 4]);
    }

    #[test]
    fn allocator_is_reset_before_the_list_opens() {
        let gpu = MockGpu::new(0);

        let events = record(&gpu, &[], Vec4::ONE);

        assert_eq!(&events[..2], &[Event::AllocatorReset(4), Event::ListReset(4)]);
        assert!(!events.iter().any(|e| matches!(e, Event::Draw(d) if d.vertex_count != 36)));
    }
}
