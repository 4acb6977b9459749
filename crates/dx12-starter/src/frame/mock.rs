//! In-memory backend that logs every GPU-visible call and models a GPU
//! running up to `latency` fence values behind the CPU.
//!
//! The mock also checks the hazards the frame protocol exists to prevent
//! and records them as violations instead of failing the call.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use glam::Vec4;

use super::backend::{Backend, CommandAllocator, CommandQueue, Scene};
use super::fence::Timeline;
use super::recorder::{CommandList, DrawCommand, Transition};
use super::swap_chain::SwapChain;
use super::viewport::{ScissorRect, Viewport};
use crate::renderer::{FrameRenderer, FrameResources};
use crate::ui::Ui;
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Event {
    LatencyWait,
    Wait(u64),
    AllocatorReset(usize),
    ListReset(usize),
    BindPipeline,
    SetViewport(Viewport, ScissorRect),
    Barrier(usize, Transition),
    Clear(usize, [f32; 4]),
    SetRenderTarget(usize),
    BindScene,
    Draw(DrawCommand),
    Close,
    /// Allocator the executed list was recorded with.
    Execute(Option<usize>),
    Present(u32),
    Signal(u64),
    ReleaseRenderTargets,
    ResizeBuffers(u32, u32),
    SceneResized(u32, u32),
}

#[derive(Default)]
struct State {
    events: Vec<Event>,
    completed: u64,
    /// Signaled values the GPU has not reached yet, oldest first.
    queued: VecDeque<u64>,
    removed: bool,
    fail_present: bool,
    last_executed: Option<usize>,
    /// Fence value covering the last submission of each allocator.
    allocator_fences: HashMap<usize, u64>,
    signaled: u64,
    violations: Vec<String>,
}

pub(crate) struct MockGpu {
    latency: usize,
    state: RefCell<State>,
}

impl MockGpu {
    /// `latency` is how many signaled values the GPU may leave unfinished.
    pub(crate) fn new(latency: usize) -> Rc<Self> {
        Rc::new(Self {
            latency,
            state: RefCell::new(State::default()),
        })
    }

    pub(crate) fn events(&self) -> Vec<Event> {
        self.state.borrow().events.clone()
    }

    pub(crate) fn take_events(&self) -> Vec<Event> {
        std::mem::take(&mut self.state.borrow_mut().events)
    }

    pub(crate) fn completed(&self) -> u64 {
        self.state.borrow().completed
    }

    pub(crate) fn violations(&self) -> Vec<String> {
        self.state.borrow().violations.clone()
    }

    pub(crate) fn remove_device(&self) {
        self.state.borrow_mut().removed = true;
    }

    pub(crate) fn fail_next_present(&self) {
        self.state.borrow_mut().fail_present = true;
    }

    fn push(&self, event: Event) {
        self.state.borrow_mut().events.push(event);
    }

    fn violation(&self, message: String) {
        self.state.borrow_mut().violations.push(message);
    }

    fn check_removed(&self) -> Result<()> {
        if self.state.borrow().removed {
            Err(Error::DeviceRemoved {
                reason: "mock device removed".into(),
            })
        } else {
            Ok(())
        }
    }
}

pub(crate) struct MockTimeline {
    gpu: Rc<MockGpu>,
}

impl MockTimeline {
    pub(crate) fn new(gpu: &Rc<MockGpu>) -> Self {
        Self { gpu: gpu.clone() }
    }
}

impl Timeline for MockTimeline {
    fn signal(&self, value: u64) -> Result<()> {
        self.gpu.check_removed()?;
        let mut state = self.gpu.state.borrow_mut();
        state.events.push(Event::Signal(value));
        state.signaled = value;
        if let Some(id) = state.last_executed.take() {
            state.allocator_fences.insert(id, value);
        }
        state.queued.push_back(value);
        while state.queued.len() > self.gpu.latency {
            if let Some(done) = state.queued.pop_front() {
                state.completed = done;
            }
        }
        Ok(())
    }

    fn completed_value(&self) -> u64 {
        let state = self.gpu.state.borrow();
        if state.removed {
            u64::MAX
        } else {
            state.completed
        }
    }

    fn wait_for_completion(&self, value: u64) -> Result<()> {
        let mut state = self.gpu.state.borrow_mut();
        state.events.push(Event::Wait(value));
        if state.removed {
            return Ok(());
        }
        if value > state.signaled {
            return Err(Error::WaitFailed(format!(
                "fence value {value} was never signaled"
            )));
        }
        state.completed = state.completed.max(value);
        state.queued.retain(|&v| v > value);
        Ok(())
    }

    fn removal_reason(&self) -> Option<String> {
        Some("mock device removed".into())
    }
}

pub(crate) struct MockAllocator {
    gpu: Rc<MockGpu>,
    id: usize,
}

impl MockAllocator {
    pub(crate) fn new(gpu: &Rc<MockGpu>, id: usize) -> Self {
        Self {
            gpu: gpu.clone(),
            id,
        }
    }
}

impl CommandAllocator for MockAllocator {
    fn reset(&mut self) -> Result<()> {
        let mut state = self.gpu.state.borrow_mut();
        let fence = state.allocator_fences.get(&self.id).copied().unwrap_or(0);
        if fence > state.completed {
            let message = format!(
                "allocator {} reset while fence {fence} is pending (completed {})",
                self.id, state.completed
            );
            state.violations.push(message);
        }
        state.events.push(Event::AllocatorReset(self.id));
        Ok(())
    }
}

pub(crate) struct MockCommandList {
    gpu: Rc<MockGpu>,
    open: bool,
    allocator: Option<usize>,
}

impl MockCommandList {
    pub(crate) fn new(gpu: &Rc<MockGpu>) -> Self {
        Self {
            gpu: gpu.clone(),
            open: false,
            allocator: None,
        }
    }

    fn record(&self, event: Event) {
        if !self.open {
            self.gpu.violation(format!("{event:?} recorded into a closed list"));
        }
        self.gpu.push(event);
    }
}

impl CommandList<Mock> for MockCommandList {
    fn reset(&mut self, allocator: &MockAllocator, _pipeline: &()) -> Result<()> {
        if self.open {
            self.gpu.violation("list reset while open".into());
        }
        self.open = true;
        self.allocator = Some(allocator.id);
        self.gpu.push(Event::ListReset(allocator.id));
        Ok(())
    }

    fn bind_pipeline(&mut self, _pipeline: &()) {
        self.record(Event::BindPipeline);
    }

    fn set_viewport(&mut self, viewport: &Viewport, scissor: &ScissorRect) {
        self.record(Event::SetViewport(*viewport, *scissor));
    }

    fn transition(&mut self, target: &MockTarget, transition: Transition) {
        self.record(Event::Barrier(target.index, transition));
    }

    fn clear_render_target(&mut self, target: &MockTarget, color: [f32; 4]) {
        self.record(Event::Clear(target.index, color));
    }

    fn set_render_target(&mut self, target: &MockTarget) {
        self.record(Event::SetRenderTarget(target.index));
    }

    fn bind_scene(&mut self, _scene: &MockScene) {
        self.record(Event::BindScene);
    }

    fn draw(&mut self, draw: &DrawCommand) {
        self.record(Event::Draw(*draw));
    }

    fn close(&mut self) -> Result<()> {
        self.record(Event::Close);
        self.open = false;
        Ok(())
    }
}

pub(crate) struct MockQueue {
    gpu: Rc<MockGpu>,
}

impl MockQueue {
    pub(crate) fn new(gpu: &Rc<MockGpu>) -> Self {
        Self { gpu: gpu.clone() }
    }
}

impl CommandQueue<Mock> for MockQueue {
    fn execute(&self, command_list: &MockCommandList) -> Result<()> {
        self.gpu.check_removed()?;
        if command_list.open {
            self.gpu.violation("executed an open command list".into());
        }
        let mut state = self.gpu.state.borrow_mut();
        state.events.push(Event::Execute(command_list.allocator));
        state.last_executed = command_list.allocator;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct MockTarget {
    pub index: usize,
}

pub(crate) struct MockSwapChain {
    gpu: Rc<MockGpu>,
    buffer_count: usize,
    current: Cell<usize>,
    targets: Option<Vec<MockTarget>>,
    size: (u32, u32),
}

impl MockSwapChain {
    pub(crate) fn new(gpu: &Rc<MockGpu>, buffer_count: usize, width: u32, height: u32) -> Self {
        Self {
            gpu: gpu.clone(),
            buffer_count,
            current: Cell::new(0),
            targets: Some(Self::targets(buffer_count)),
            size: (width, height),
        }
    }

    pub(crate) fn size(&self) -> (u32, u32) {
        self.size
    }

    fn targets(count: usize) -> Vec<MockTarget> {
        (0..count).map(|index| MockTarget { index }).collect()
    }
}

impl SwapChain<Mock> for MockSwapChain {
    fn buffer_count(&self) -> usize {
        self.buffer_count
    }

    fn current_back_buffer_index(&self) -> usize {
        self.current.get()
    }

    fn render_target(&self, index: usize) -> Option<&MockTarget> {
        self.targets.as_ref().and_then(|t| t.get(index))
    }

    fn wait_for_frame_latency(&self) -> Result<()> {
        self.gpu.push(Event::LatencyWait);
        Ok(())
    }

    fn present(&self, sync_interval: u32) -> Result<()> {
        self.gpu.check_removed()?;
        self.gpu.push(Event::Present(sync_interval));
        let failed = std::mem::take(&mut self.gpu.state.borrow_mut().fail_present);
        if failed {
            return Err(Error::Backend("present failed".into()));
        }
        self.current.set((self.current.get() + 1) % self.buffer_count);
        Ok(())
    }

    fn release_render_targets(&mut self) {
        let (signaled, completed) = {
            let state = self.gpu.state.borrow();
            (state.signaled, state.completed)
        };
        if signaled > completed {
            self.gpu.violation(format!(
                "back buffers released with fence {signaled} pending (completed {completed})"
            ));
        }
        self.targets = None;
        self.gpu.push(Event::ReleaseRenderTargets);
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        if self.targets.is_some() {
            self.gpu
                .violation("swap chain resized while back buffers are referenced".into());
        }
        self.gpu.push(Event::ResizeBuffers(width, height));
        self.targets = Some(Self::targets(self.buffer_count));
        self.current.set(0);
        self.size = (width, height);
        Ok(())
    }
}

pub(crate) struct MockScene {
    gpu: Rc<MockGpu>,
    vertex_count: u32,
}

impl MockScene {
    pub(crate) fn new(gpu: &Rc<MockGpu>, vertex_count: u32) -> Self {
        Self {
            gpu: gpu.clone(),
            vertex_count,
        }
    }
}

impl Scene for MockScene {
    fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.gpu.push(Event::SceneResized(width, height));
    }
}

/// UI collaborator that returns a fixed set of draws every frame.
#[derive(Default)]
pub(crate) struct MockUi {
    pub draws: Vec<DrawCommand>,
    pub frames: usize,
}

impl Ui<Mock> for MockUi {
    fn init(
        &mut self,
        _window: raw_window_handle::RawWindowHandle,
        _device: &(),
        _srv_heap: &(),
    ) -> Result<()> {
        Ok(())
    }

    fn update(&mut self) {}

    fn render(&mut self) -> Vec<DrawCommand> {
        self.frames += 1;
        self.draws.clone()
    }

    fn clear_color(&self) -> Vec4 {
        Vec4::new(0.45, 0.55, 0.60, 1.0)
    }
}

pub(crate) struct Mock;

impl Backend for Mock {
    type Device = ();
    type DescriptorHeap = ();
    type RenderTarget = MockTarget;
    type Allocator = MockAllocator;
    type CommandList = MockCommandList;
    type Queue = MockQueue;
    type Timeline = MockTimeline;
    type SwapChain = MockSwapChain;
    type Pipeline = ();
    type Scene = MockScene;
}

/// A renderer over the mock with a 36-vertex scene.
pub(crate) fn renderer(
    gpu: &Rc<MockGpu>,
    frame_slots: usize,
    back_buffers: usize,
    width: u32,
    height: u32,
) -> FrameRenderer<Mock> {
    FrameRenderer::new(
        FrameResources {
            queue: MockQueue::new(gpu),
            timeline: MockTimeline::new(gpu),
            allocators: (0..frame_slots).map(|id| MockAllocator::new(gpu, id)).collect(),
            command_list: MockCommandList::new(gpu),
            swap_chain: MockSwapChain::new(gpu, back_buffers, width, height),
            pipeline: (),
            scene: MockScene::new(gpu, 36),
        },
        width,
        height,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::fence::FenceSynchronizer;

    #[test]
    fn early_release_is_flagged() {
        let gpu = MockGpu::new(4);
        let mut fence = FenceSynchronizer::new(MockTimeline::new(&gpu));
        let mut swap_chain = MockSwapChain::new(&gpu, 3, 8, 8);
        fence.signal_next().unwrap();

        swap_chain.release_render_targets();

        assert_eq!(gpu.violations().len(), 1);
    }

    #[test]
    fn reusing_a_busy_allocator_is_flagged() {
        let gpu = MockGpu::new(4);
        let mut fence = FenceSynchronizer::new(MockTimeline::new(&gpu));
        let queue = MockQueue::new(&gpu);
        let mut list = MockCommandList::new(&gpu);
        let mut allocator = MockAllocator::new(&gpu, 0);

        list.reset(&allocator, &()).unwrap();
        list.close().unwrap();
        queue.execute(&list).unwrap();
        fence.signal_next().unwrap();
        allocator.reset().unwrap();

        assert_eq!(gpu.violations().len(), 1);
    }
}
