use log::error;
use windows::{
    core::{Interface, PCWSTR},
    Win32::{
        Foundation::{CloseHandle, FALSE, HANDLE, WAIT_FAILED, WAIT_OBJECT_0},
        Graphics::{Direct3D::D3D_PRIMITIVE_TOPOLOGY_TRIANGLELIST, Direct3D12::*},
        System::Threading::{CreateEventW, WaitForSingleObject, INFINITE},
    },
};

use super::{
    barrier,
    pipeline::Pipeline,
    pix::{pix_color, Pix},
    scene::Scene,
    swap_chain::RenderTarget,
    util::{self, set_name_str},
    D3d12,
};
use crate::frame::{self, DrawCommand, ScissorRect, Transition, Viewport};
use crate::{Error, Result};

/// An owned auto-reset Win32 event, closed on drop.
pub struct Event(HANDLE);

impl Event {
    pub fn create() -> Result<Self> {
        // unnamed, so it is never shared with another queue or process
        let handle = unsafe { CreateEventW(None, false, false, PCWSTR::null()) }?;
        Ok(Self(handle))
    }

    /// Takes ownership of `handle`.
    pub fn from_handle(handle: HANDLE) -> Self {
        Self(handle)
    }

    pub fn handle(&self) -> HANDLE {
        self.0
    }

    /// Blocks with no timeout until the event is signaled.
    pub fn wait(&self) -> Result<()> {
        let result = unsafe { WaitForSingleObject(self.0, INFINITE) };
        if result == WAIT_OBJECT_0 {
            Ok(())
        } else if result == WAIT_FAILED {
            Err(Error::WaitFailed(
                windows::core::Error::from_win32().to_string(),
            ))
        } else {
            Err(Error::WaitFailed(format!(
                "unexpected wait result {:#x}",
                result.0
            )))
        }
    }
}

impl Drop for Event {
    fn drop(&mut self) {
        if let Err(e) = unsafe { CloseHandle(self.0) } {
            error!("failed to close an event handle: {e}");
        }
    }
}

// backing memory for recording the GPU commands into a command list
// cannot be reset or reused until the GPU finishes executing all commands
pub struct CommandAllocator {
    allocator: ID3D12CommandAllocator,
}

impl CommandAllocator {
    pub fn build(device: &ID3D12Device2, name: &str) -> Result<Self> {
        let allocator: ID3D12CommandAllocator =
            unsafe { device.CreateCommandAllocator(D3D12_COMMAND_LIST_TYPE_DIRECT) }?;
        set_name_str(&allocator, name)?;
        Ok(Self { allocator })
    }

    pub fn get(&self) -> &ID3D12CommandAllocator {
        &self.allocator
    }
}

impl frame::CommandAllocator for CommandAllocator {
    fn reset(&mut self) -> Result<()> {
        unsafe { self.allocator.Reset() }?;
        Ok(())
    }
}

/// The one direct command list, re-recorded every frame.
pub struct GraphicsCommandList {
    list: ID3D12GraphicsCommandList,
    pix: Option<Pix>,
}

impl GraphicsCommandList {
    /// Creates the list in the closed state, ready for its first reset.
    pub fn build(
        device: &ID3D12Device2,
        allocator: &CommandAllocator,
        pix: Option<Pix>,
    ) -> Result<Self> {
        let list: ID3D12GraphicsCommandList = unsafe {
            device.CreateCommandList(
                0,
                D3D12_COMMAND_LIST_TYPE_DIRECT,
                allocator.get(),
                None::<&ID3D12PipelineState>,
            )
        }?;
        set_name_str(&list, "frame_command_list")?;
        unsafe { list.Close() }?;
        Ok(Self { list, pix })
    }

    pub fn get(&self) -> &ID3D12GraphicsCommandList {
        &self.list
    }
}

impl frame::CommandList<D3d12> for GraphicsCommandList {
    fn reset(&mut self, allocator: &CommandAllocator, pipeline: &Pipeline) -> Result<()> {
        unsafe { self.list.Reset(allocator.get(), pipeline.pso()) }?;
        Ok(())
    }

    fn bind_pipeline(&mut self, pipeline: &Pipeline) {
        let table = unsafe { pipeline.view_heap().GetGPUDescriptorHandleForHeapStart() };
        unsafe {
            self.list.SetPipelineState(pipeline.pso());
            self.list.SetGraphicsRootSignature(pipeline.root_signature());
            self.list
                .SetDescriptorHeaps(&[Some(pipeline.view_heap().clone())]);
            self.list.SetGraphicsRootDescriptorTable(0, table);
        }
    }

    fn set_viewport(&mut self, viewport: &Viewport, scissor: &ScissorRect) {
        let viewport = D3D12_VIEWPORT {
            TopLeftX: viewport.top_left_x,
            TopLeftY: viewport.top_left_y,
            Width: viewport.width,
            Height: viewport.height,
            MinDepth: viewport.min_depth,
            MaxDepth: viewport.max_depth,
        };
        let rect = windows::Win32::Foundation::RECT {
            left: scissor.left,
            top: scissor.top,
            right: scissor.right,
            bottom: scissor.bottom,
        };
        unsafe {
            self.list.RSSetViewports(&[viewport]);
            self.list.RSSetScissorRects(&[rect]);
        }
    }

    fn transition(&mut self, target: &RenderTarget, transition: Transition) {
        let barriers = [barrier::transition_barrier(
            target.resource(),
            transition.before.into(),
            transition.after.into(),
        )];
        unsafe { self.list.ResourceBarrier(&barriers) };
    }

    fn clear_render_target(&mut self, target: &RenderTarget, color: [f32; 4]) {
        unsafe { self.list.ClearRenderTargetView(target.rtv(), &color, None) };
    }

    fn set_render_target(&mut self, target: &RenderTarget) {
        unsafe {
            self.list
                .OMSetRenderTargets(1, Some(&target.rtv()), FALSE, None)
        };
    }

    fn bind_scene(&mut self, scene: &Scene) {
        unsafe {
            self.list
                .IASetPrimitiveTopology(D3D_PRIMITIVE_TOPOLOGY_TRIANGLELIST);
            self.list.IASetVertexBuffers(0, Some(&[*scene.vertex_buffer_view()]));
        }
    }

    fn draw(&mut self, draw: &DrawCommand) {
        unsafe {
            self.list.DrawInstanced(
                draw.vertex_count,
                draw.instance_count,
                draw.start_vertex,
                draw.start_instance,
            )
        };
    }

    fn close(&mut self) -> Result<()> {
        unsafe { self.list.Close() }?;
        Ok(())
    }

    fn begin_event(&mut self, name: &str) {
        if let Some(pix) = &self.pix {
            pix.begin_event(&self.list, pix_color(0, 255, 0), name);
        }
    }

    fn end_event(&mut self) {
        if let Some(pix) = &self.pix {
            pix.end_event(&self.list);
        }
    }
}

pub struct Queue {
    queue: ID3D12CommandQueue,
}

impl Queue {
    pub fn build(device: &ID3D12Device2, name: &str) -> Result<Self> {
        let desc = D3D12_COMMAND_QUEUE_DESC {
            Type: D3D12_COMMAND_LIST_TYPE_DIRECT,
            Priority: D3D12_COMMAND_QUEUE_PRIORITY_NORMAL.0,
            Flags: D3D12_COMMAND_QUEUE_FLAG_NONE,
            NodeMask: 0,
        };
        let queue: ID3D12CommandQueue = unsafe { device.CreateCommandQueue(&desc) }?;
        set_name_str(&queue, name)?;
        Ok(Self { queue })
    }

    pub fn get(&self) -> &ID3D12CommandQueue {
        &self.queue
    }
}

impl frame::CommandQueue<D3d12> for Queue {
    fn execute(&self, command_list: &GraphicsCommandList) -> Result<()> {
        let command_lists = [Some(command_list.get().cast::<ID3D12CommandList>()?)];
        unsafe { self.queue.ExecuteCommandLists(&command_lists) };
        Ok(())
    }
}

/// The frame fence, signaled on the direct queue.
pub struct Timeline {
    queue: ID3D12CommandQueue,
    fence: ID3D12Fence,
    fence_event: Event,
    device: ID3D12Device2,
}

impl Timeline {
    pub fn build(device: &ID3D12Device2, queue: &Queue, name: &str) -> Result<Self> {
        let fence: ID3D12Fence = unsafe { device.CreateFence(0, D3D12_FENCE_FLAG_NONE) }?;
        set_name_str(&fence, name)?;

        Ok(Self {
            queue: queue.get().clone(),
            fence,
            fence_event: Event::create()?,
            device: device.clone(),
        })
    }
}

impl frame::Timeline for Timeline {
    fn signal(&self, value: u64) -> Result<()> {
        unsafe { self.queue.Signal(&self.fence, value) }
            .map_err(|e| util::check_removed(&self.device, e))
    }

    fn completed_value(&self) -> u64 {
        unsafe { self.fence.GetCompletedValue() }
    }

    fn wait_for_completion(&self, value: u64) -> Result<()> {
        unsafe {
            self.fence
                .SetEventOnCompletion(value, self.fence_event.handle())
        }
        .map_err(|e| util::check_removed(&self.device, e))?;
        self.fence_event.wait()
    }

    fn removal_reason(&self) -> Option<String> {
        Some(util::removal_reason(&self.device))
    }
}
