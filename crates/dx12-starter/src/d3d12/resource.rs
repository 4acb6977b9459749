use windows::Win32::Graphics::Direct3D12::*;
use windows::Win32::Graphics::Dxgi::Common::*;

use super::util::set_name_str;
use crate::{Error, Result};

/// Constant buffers are placed and viewed in 256-byte steps.
pub const CONSTANT_BUFFER_ALIGNMENT: u64 =
    D3D12_CONSTANT_BUFFER_DATA_PLACEMENT_ALIGNMENT as u64;

pub fn align_constant_buffer_size(size: u64) -> u64 {
    size.div_ceil(CONSTANT_BUFFER_ALIGNMENT) * CONSTANT_BUFFER_ALIGNMENT
}

pub fn heap_properties(heap_type: D3D12_HEAP_TYPE) -> D3D12_HEAP_PROPERTIES {
    D3D12_HEAP_PROPERTIES {
        Type: heap_type,
        CPUPageProperty: D3D12_CPU_PAGE_PROPERTY_UNKNOWN,
        MemoryPoolPreference: D3D12_MEMORY_POOL_UNKNOWN,
        CreationNodeMask: 1,
        VisibleNodeMask: 1,
    }
}

pub fn buffer_desc(buffer_size: u64) -> D3D12_RESOURCE_DESC {
    D3D12_RESOURCE_DESC {
        Dimension: D3D12_RESOURCE_DIMENSION_BUFFER,
        Alignment: 0,
        Width: buffer_size,
        Height: 1,
        DepthOrArraySize: 1,
        MipLevels: 1,
        Format: DXGI_FORMAT_UNKNOWN,
        SampleDesc: DXGI_SAMPLE_DESC {
            Count: 1,
            Quality: 0,
        },
        Layout: D3D12_TEXTURE_LAYOUT_ROW_MAJOR,
        Flags: D3D12_RESOURCE_FLAG_NONE,
    }
}

/// A CPU-writable buffer in an upload heap, optionally filled with `init_data`.
pub fn create_upload_buffer<T: Copy>(
    device: &ID3D12Device2,
    size: u64,
    init_data: Option<&[T]>,
    name: &str,
) -> Result<ID3D12Resource> {
    let properties = heap_properties(D3D12_HEAP_TYPE_UPLOAD);
    let desc = buffer_desc(size);
    let mut dst: Option<ID3D12Resource> = None;
    unsafe {
        device.CreateCommittedResource(
            &properties,
            D3D12_HEAP_FLAG_NONE,
            &desc,
            D3D12_RESOURCE_STATE_GENERIC_READ,
            None,
            &mut dst,
        )
    }?;
    let dst = dst.ok_or_else(|| Error::Backend(format!("{name} was not created")))?;

    if let Some(init_data) = init_data {
        debug_assert!(std::mem::size_of_val(init_data) as u64 <= size);
        let mut data = std::ptr::null_mut();
        unsafe {
            dst.Map(0, None, Some(&mut data))?;
            std::ptr::copy_nonoverlapping(init_data.as_ptr(), data as *mut T, init_data.len());
            dst.Unmap(0, None);
        }
    }

    set_name_str(&dst, name)?;

    Ok(dst)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_buffers_round_up_to_256_bytes() {
        assert_eq!(align_constant_buffer_size(1), 256);
        assert_eq!(align_constant_buffer_size(64), 256);
        assert_eq!(align_constant_buffer_size(256), 256);
        assert_eq!(align_constant_buffer_size(257), 512);
    }
}
