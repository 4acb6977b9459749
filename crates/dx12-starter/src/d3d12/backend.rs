use std::path::Path;

use log::info;
use windows::Win32::Foundation::HWND;
use windows::Win32::Graphics::Direct3D12::ID3D12DescriptorHeap;

use super::{
    command::{CommandAllocator, GraphicsCommandList, Queue, Timeline},
    device::Device,
    pipeline::Pipeline,
    pix::Pix,
    scene::Scene,
    swap_chain::{RenderTarget, SwapChain},
};
use crate::frame::Backend;
use crate::renderer::{FrameRenderer, FrameResources};
use crate::{Config, Error, Result};

pub struct D3d12;

impl Backend for D3d12 {
    type Device = Device;
    type DescriptorHeap = ID3D12DescriptorHeap;
    type RenderTarget = RenderTarget;
    type Allocator = CommandAllocator;
    type CommandList = GraphicsCommandList;
    type Queue = Queue;
    type Timeline = Timeline;
    type SwapChain = SwapChain;
    type Pipeline = Pipeline;
    type Scene = Scene;
}

/// The frame renderer plus the device it was created on.
pub struct Renderer {
    // dropped first: it drains the GPU before anything else goes away
    frame: FrameRenderer<D3d12>,
    device: Device,
}

impl Renderer {
    pub fn frame(&mut self) -> &mut FrameRenderer<D3d12> {
        &mut self.frame
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Shader-visible heap; descriptor 1 is reserved for the UI.
    pub fn srv_heap(&self) -> &ID3D12DescriptorHeap {
        self.frame.pipeline().view_heap()
    }
}

/// Creates every GPU object for a window of `width` x `height` pixels.
///
/// Any failure drops what was already created, in reverse order.
pub fn create_renderer(
    config: &Config,
    hwnd: HWND,
    width: u32,
    height: u32,
    shader_dir: &Path,
) -> Result<Renderer> {
    let device = Device::build(config.debug_layer_enabled(), config.gpu_validation_enabled())?;
    let d3d = device.get();

    let queue = Queue::build(d3d, "direct_queue")?;
    let timeline = Timeline::build(d3d, &queue, "frame_fence")?;

    let allocators = (0..config.frame_slot_count())
        .map(|i| CommandAllocator::build(d3d, &format!("frame_allocators[{i}]")))
        .collect::<Result<Vec<_>>>()?;
    let first_allocator = allocators
        .first()
        .ok_or_else(|| Error::InvalidConfig("at least one frame slot is required".into()))?;
    let command_list = GraphicsCommandList::build(d3d, first_allocator, Pix::load())?;

    let swap_chain = SwapChain::build(
        &device,
        &queue,
        hwnd,
        width,
        height,
        config.back_buffer_count(),
    )?;

    let pipeline = Pipeline::build(&device, shader_dir, config.debug_layer_enabled())?;
    let scene = Scene::build(&device, &pipeline, width, height)?;

    info!("renderer created on {}", device.adapter_name());

    let frame = FrameRenderer::new(
        FrameResources {
            queue,
            timeline,
            allocators,
            command_list,
            swap_chain,
            pipeline,
            scene,
        },
        width,
        height,
    );

    Ok(Renderer { frame, device })
}
