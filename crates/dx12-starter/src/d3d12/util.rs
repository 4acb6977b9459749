use windows::{
    core::{Interface, HSTRING, PCWSTR},
    Win32::Graphics::{
        Direct3D12::*,
        Dxgi::{DXGI_ERROR_DEVICE_REMOVED, DXGI_ERROR_DEVICE_RESET},
    },
};

use crate::Error;

pub fn set_name(object: &ID3D12Object, name: PCWSTR) -> windows::core::Result<()> {
    unsafe { object.SetName(name) }
}

pub fn set_name_str<T: Interface>(object: &T, name: &str) -> windows::core::Result<()> {
    // https://github.com/microsoft/windows-rs/issues/973
    let name: HSTRING = name.into();
    set_name(&object.cast()?, PCWSTR(name.as_ptr()))
}

/// Text for the HRESULT the device reports after removal.
pub fn removal_reason(device: &ID3D12Device) -> String {
    match unsafe { device.GetDeviceRemovedReason() } {
        Ok(()) => "the device reports no removal reason".to_string(),
        Err(e) => e.to_string(),
    }
}

/// Maps a failed submission or present to [`Error::DeviceRemoved`] when the
/// HRESULT says so, and to a plain Windows error otherwise.
pub fn check_removed(device: &ID3D12Device, error: windows::core::Error) -> Error {
    let code = error.code();
    if code == DXGI_ERROR_DEVICE_REMOVED || code == DXGI_ERROR_DEVICE_RESET {
        Error::DeviceRemoved {
            reason: removal_reason(device),
        }
    } else {
        Error::Windows(error)
    }
}
