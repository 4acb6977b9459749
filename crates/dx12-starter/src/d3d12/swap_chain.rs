use log::debug;
use windows::core::Interface;
use windows::Win32::Foundation::HWND;
use windows::Win32::Graphics::{
    Direct3D12::*,
    Dxgi::{Common::*, *},
};

use super::{
    command::{Event, Queue},
    device::Device,
    util::{self, set_name_str},
    D3d12,
};
use crate::frame;
use crate::{Error, Result};

const BACK_BUFFER_FORMAT: DXGI_FORMAT = DXGI_FORMAT_R8G8B8A8_UNORM;
const SWAP_CHAIN_FLAGS: DXGI_SWAP_CHAIN_FLAG = DXGI_SWAP_CHAIN_FLAG_FRAME_LATENCY_WAITABLE_OBJECT;

/// A back buffer and its render-target view.
pub struct RenderTarget {
    resource: ID3D12Resource,
    rtv: D3D12_CPU_DESCRIPTOR_HANDLE,
}

impl RenderTarget {
    pub fn resource(&self) -> &ID3D12Resource {
        &self.resource
    }

    pub fn rtv(&self) -> D3D12_CPU_DESCRIPTOR_HANDLE {
        self.rtv
    }
}

pub struct SwapChain {
    swap_chain: IDXGISwapChain3,
    // signaled when a new frame can be queued without exceeding the maximum latency
    latency_waitable: Event,
    buffer_count: usize,

    rtv_heap: ID3D12DescriptorHeap,
    rtv_size: u32,
    render_targets: Option<Vec<RenderTarget>>,

    device: ID3D12Device2,
}

impl SwapChain {
    pub fn build(
        device: &Device,
        queue: &Queue,
        hwnd: HWND,
        width: u32,
        height: u32,
        buffer_count: usize,
    ) -> Result<Self> {
        let desc = DXGI_SWAP_CHAIN_DESC1 {
            Width: width,
            Height: height,
            Format: BACK_BUFFER_FORMAT,
            SampleDesc: DXGI_SAMPLE_DESC {
                Count: 1,
                Quality: 0,
            },
            Stereo: false.into(),
            BufferUsage: DXGI_USAGE_RENDER_TARGET_OUTPUT,
            BufferCount: buffer_count as u32,
            // behavior when resizing window
            Scaling: DXGI_SCALING_STRETCH,
            SwapEffect: DXGI_SWAP_EFFECT_FLIP_DISCARD,
            AlphaMode: DXGI_ALPHA_MODE_UNSPECIFIED,
            Flags: SWAP_CHAIN_FLAGS.0 as u32,
        };

        let factory = device.factory();
        let swap_chain: IDXGISwapChain1 =
            unsafe { factory.CreateSwapChainForHwnd(queue.get(), hwnd, &desc, None, None) }?;

        // Disable Alt+Enter fullscreen toggle
        unsafe { factory.MakeWindowAssociation(hwnd, DXGI_MWA_NO_ALT_ENTER) }?;

        let swap_chain = swap_chain.cast::<IDXGISwapChain3>()?;
        unsafe { swap_chain.SetMaximumFrameLatency(buffer_count as u32) }?;
        let latency_waitable =
            Event::from_handle(unsafe { swap_chain.GetFrameLatencyWaitableObject() });

        let rtv_heap = device.create_descriptor_heap(
            D3D12_DESCRIPTOR_HEAP_TYPE_RTV,
            buffer_count as u32,
            "rtv_heap",
        )?;
        let rtv_size = device.descriptor_size(D3D12_DESCRIPTOR_HEAP_TYPE_RTV);

        let mut this = Self {
            swap_chain,
            latency_waitable,
            buffer_count,
            rtv_heap,
            rtv_size,
            render_targets: None,
            device: device.get().clone(),
        };
        this.create_render_targets()?;
        Ok(this)
    }

    fn create_render_targets(&mut self) -> Result<()> {
        let heap_start = unsafe { self.rtv_heap.GetCPUDescriptorHandleForHeapStart() };

        let render_targets = (0..self.buffer_count)
            .map(|i| -> Result<RenderTarget> {
                let resource: ID3D12Resource = unsafe { self.swap_chain.GetBuffer(i as u32) }?;
                set_name_str(&resource, &format!("back_buffer[{i}]"))?;

                let rtv = D3D12_CPU_DESCRIPTOR_HANDLE {
                    ptr: heap_start.ptr + i * self.rtv_size as usize,
                };
                unsafe { self.device.CreateRenderTargetView(&resource, None, rtv) };

                Ok(RenderTarget { resource, rtv })
            })
            .collect::<Result<Vec<_>>>()?;

        self.render_targets = Some(render_targets);
        Ok(())
    }
}

impl frame::SwapChain<D3d12> for SwapChain {
    fn buffer_count(&self) -> usize {
        self.buffer_count
    }

    fn current_back_buffer_index(&self) -> usize {
        unsafe { self.swap_chain.GetCurrentBackBufferIndex() as usize }
    }

    fn render_target(&self, index: usize) -> Option<&RenderTarget> {
        self.render_targets.as_ref().and_then(|targets| targets.get(index))
    }

    fn wait_for_frame_latency(&self) -> Result<()> {
        self.latency_waitable.wait()
    }

    fn present(&self, sync_interval: u32) -> Result<()> {
        unsafe { self.swap_chain.Present(sync_interval, DXGI_PRESENT(0)) }
            .ok()
            .map_err(|e| util::check_removed(&self.device, e))
    }

    fn release_render_targets(&mut self) {
        if self.render_targets.take().is_some() {
            debug!("released {} back buffers", self.buffer_count);
        }
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        if self.render_targets.is_some() {
            return Err(Error::Backend(
                "back buffers must be released before resizing".into(),
            ));
        }

        // buffer count and format are preserved
        unsafe {
            self.swap_chain
                .ResizeBuffers(0, width, height, DXGI_FORMAT_UNKNOWN, SWAP_CHAIN_FLAGS)
        }
        .map_err(|e| util::check_removed(&self.device, e))?;

        self.create_render_targets()
    }
}
