use log::{debug, error, info, warn};
use windows::core::Interface;
use windows::Win32::Graphics::{
    Direct3D::*,
    Direct3D12::*,
    Dxgi::*,
};
use windows::Win32::System::Diagnostics::Debug::IsDebuggerPresent;

use super::util;
use crate::{Error, Result};

pub struct Device {
    // D3D12 Device: considered as a memory context that tracks allocations in GPU memory
    device: ID3D12Device2,
    factory: IDXGIFactory4,
    adapter_name: String,
}

impl Device {
    pub fn build(enable_debug_layer: bool, enable_gpu_based_validation: bool) -> Result<Self> {
        let factory = create_factory(enable_debug_layer, enable_gpu_based_validation)?;
        let (device, adapter_name) = create_device(&factory)?;
        info!("using adapter {adapter_name}");

        if enable_debug_layer || enable_gpu_based_validation {
            configure_info_queue(&device);
        }

        Ok(Self {
            device,
            factory,
            adapter_name,
        })
    }

    pub fn get(&self) -> &ID3D12Device2 {
        &self.device
    }

    pub fn factory(&self) -> &IDXGIFactory4 {
        &self.factory
    }

    pub fn adapter_name(&self) -> &str {
        &self.adapter_name
    }

    pub fn create_descriptor_heap(
        &self,
        heap_type: D3D12_DESCRIPTOR_HEAP_TYPE,
        max_descriptor_count: u32,
        name: &str,
    ) -> Result<ID3D12DescriptorHeap> {
        let is_shader_visible = (heap_type == D3D12_DESCRIPTOR_HEAP_TYPE_CBV_SRV_UAV)
            || (heap_type == D3D12_DESCRIPTOR_HEAP_TYPE_SAMPLER);

        let flags = if is_shader_visible {
            D3D12_DESCRIPTOR_HEAP_FLAG_SHADER_VISIBLE
        } else {
            D3D12_DESCRIPTOR_HEAP_FLAG_NONE
        };

        let desc = D3D12_DESCRIPTOR_HEAP_DESC {
            NumDescriptors: max_descriptor_count,
            Type: heap_type,
            Flags: flags,
            ..Default::default()
        };

        let heap: ID3D12DescriptorHeap = unsafe { self.device.CreateDescriptorHeap(&desc) }?;
        util::set_name_str(&heap, name)?;
        Ok(heap)
    }

    pub fn descriptor_size(&self, heap_type: D3D12_DESCRIPTOR_HEAP_TYPE) -> u32 {
        unsafe { self.device.GetDescriptorHandleIncrementSize(heap_type) }
    }
}

/// Lists every DXGI/D3D12 object still alive. Only meaningful with the debug
/// layer enabled, after all renderer objects are dropped.
pub fn report_live_objects() -> Result<()> {
    unsafe {
        let debug: IDXGIDebug1 = DXGIGetDebugInterface1(0)?;
        debug.ReportLiveObjects(
            DXGI_DEBUG_ALL,
            DXGI_DEBUG_RLO_DETAIL | DXGI_DEBUG_RLO_IGNORE_INTERNAL,
        )?;
    }
    Ok(())
}

fn create_factory(
    enable_debug_layer: bool,
    enable_gpu_based_validation: bool,
) -> Result<IDXGIFactory4> {
    let enable_debug_layer = enable_debug_layer || enable_gpu_based_validation;
    if enable_debug_layer {
        let mut debug: Option<ID3D12Debug1> = None;
        match unsafe { D3D12GetDebugInterface(&mut debug) } {
            Err(e) => warn!("failed to enable the debug layer: {e}"),
            Ok(()) => {
                if let Some(debug) = debug {
                    unsafe {
                        debug.EnableDebugLayer();
                        debug.SetEnableGPUBasedValidation(enable_gpu_based_validation);
                    }
                    info!(
                        "debug layer enabled (GPU-based validation: {enable_gpu_based_validation})"
                    );
                }
            }
        }
    }

    let flags = if enable_debug_layer {
        DXGI_CREATE_FACTORY_DEBUG
    } else {
        DXGI_CREATE_FACTORY_FLAGS(0)
    };

    Ok(unsafe { CreateDXGIFactory2(flags) }?)
}

/// Adapters in preference order: high performance first when the factory
/// can sort them, enumeration order otherwise.
fn enum_adapter(factory: &IDXGIFactory4, index: u32) -> Option<IDXGIAdapter1> {
    match factory.cast::<IDXGIFactory6>() {
        Ok(factory6) => unsafe {
            factory6.EnumAdapterByGpuPreference(index, DXGI_GPU_PREFERENCE_HIGH_PERFORMANCE)
        }
        .ok(),
        Err(_) => unsafe { factory.EnumAdapters1(index) }.ok(),
    }
}

fn create_device(factory: &IDXGIFactory4) -> Result<(ID3D12Device2, String)> {
    for index in 0.. {
        let Some(adapter) = enum_adapter(factory, index) else {
            break;
        };

        let adapter_desc = unsafe { adapter.GetDesc1() }?;
        let name = String::from_utf16_lossy(&adapter_desc.Description)
            .trim_end_matches('\0')
            .to_string();

        let adapter_flag = DXGI_ADAPTER_FLAG(adapter_desc.Flags as i32);
        if (adapter_flag & DXGI_ADAPTER_FLAG_SOFTWARE) != DXGI_ADAPTER_FLAG_NONE {
            debug!("skipping software adapter {name}");
            continue;
        }

        let mut device: Option<ID3D12Device2> = None;
        match unsafe { D3D12CreateDevice(&adapter, D3D_FEATURE_LEVEL_11_0, &mut device) } {
            Ok(()) => {
                if let Some(device) = device {
                    util::set_name_str(&device, &name)?;
                    return Ok((device, name));
                }
            }
            Err(e) => debug!("adapter {name} rejected: {e}"),
        }
    }

    Err(Error::NoAdapter)
}

fn configure_info_queue(device: &ID3D12Device2) {
    let Ok(info_queue) = device.cast::<ID3D12InfoQueue>() else {
        warn!("the debug layer is not available; validation messages are not captured");
        return;
    };

    let result = (|| -> windows::core::Result<()> {
        unsafe {
            // breaking without a debugger attached terminates the process
            if IsDebuggerPresent().as_bool() {
                info_queue.SetBreakOnSeverity(D3D12_MESSAGE_SEVERITY_CORRUPTION, true)?;
                info_queue.SetBreakOnSeverity(D3D12_MESSAGE_SEVERITY_ERROR, true)?;
            }

            let mut denied_severities = [D3D12_MESSAGE_SEVERITY_INFO];
            let mut denied_messages = [
                D3D12_MESSAGE_ID_CLEARRENDERTARGETVIEW_MISMATCHINGCLEARVALUE,
                // issued when capturing the frame using graphics debugger
                D3D12_MESSAGE_ID_MAP_INVALID_NULLRANGE,
                D3D12_MESSAGE_ID_UNMAP_INVALID_NULLRANGE,
            ];
            let filter = D3D12_INFO_QUEUE_FILTER {
                DenyList: D3D12_INFO_QUEUE_FILTER_DESC {
                    NumSeverities: denied_severities.len() as u32,
                    pSeverityList: denied_severities.as_mut_ptr(),
                    NumIDs: denied_messages.len() as u32,
                    pIDList: denied_messages.as_mut_ptr(),
                    ..Default::default()
                },
                ..Default::default()
            };
            info_queue.PushStorageFilter(&filter)?;
        }

        // route debug messages to the logger; the callback needs Windows 11 runtimes
        // https://github.com/microsoft/windows-rs/issues/3031
        if let Ok(info_queue1) = info_queue.cast::<ID3D12InfoQueue1>() {
            let mut callback_cookie = 0;
            unsafe {
                info_queue1.RegisterMessageCallback(
                    Some(capture_message),
                    D3D12_MESSAGE_CALLBACK_FLAG_NONE,
                    std::ptr::null_mut(),
                    &mut callback_cookie,
                )
            }?;
        } else {
            warn!("ID3D12InfoQueue1 is unavailable; debug messages go to the debugger output only");
        }
        Ok(())
    })();

    if let Err(e) = result {
        warn!("failed to configure the info queue: {e}");
    }
}

extern "system" fn capture_message(
    _category: D3D12_MESSAGE_CATEGORY,
    severity: D3D12_MESSAGE_SEVERITY,
    _id: D3D12_MESSAGE_ID,
    description: windows::core::PCSTR,
    _context: *mut core::ffi::c_void,
) {
    // DO NOT CALL D3D FUNCTIONS IN THIS FUNCTION
    let message = match unsafe { description.to_string() } {
        Ok(message) => message,
        Err(e) => {
            error!("a message from D3D is corrupted: {e}");
            return;
        }
    };

    match severity {
        D3D12_MESSAGE_SEVERITY_CORRUPTION | D3D12_MESSAGE_SEVERITY_ERROR => {
            error!(target: "d3d12", "{message}")
        }
        D3D12_MESSAGE_SEVERITY_WARNING => warn!(target: "d3d12", "{message}"),
        D3D12_MESSAGE_SEVERITY_INFO => info!(target: "d3d12", "{message}"),
        _ => debug!(target: "d3d12", "{message}"),
    }
}
