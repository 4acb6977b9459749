use std::ffi::{c_void, CString};

use log::debug;
use windows::core::{s, Interface, PCSTR};
use windows::Win32::Foundation::{E_FAIL, HMODULE};
use windows::Win32::Graphics::Direct3D12::ID3D12GraphicsCommandList;
use windows::Win32::System::LibraryLoader::{GetProcAddress, LoadLibraryA};

type BeginEventOnCommandList = unsafe extern "system" fn(*mut c_void, u64, PCSTR);
type EndEventOnCommandList = unsafe extern "system" fn(*mut c_void);

/// Event markers from WinPixEventRuntime, resolved at runtime.
///
/// https://devblogs.microsoft.com/pix/winpixeventruntime/
pub struct Pix {
    begin_event: BeginEventOnCommandList,
    end_event: EndEventOnCommandList,
}

impl Pix {
    /// Loads `WinPixEventRuntime.dll` if it sits next to the executable.
    pub fn load() -> Option<Self> {
        Self::build()
            .inspect_err(|e| debug!("PIX markers disabled: {e}"))
            .ok()
    }

    pub fn build() -> windows::core::Result<Self> {
        let module = unsafe { LoadLibraryA(s!("WinPixEventRuntime.dll")) }?;

        let begin_event = lookup(module, s!("PIXBeginEventOnCommandList"))?;
        let end_event = lookup(module, s!("PIXEndEventOnCommandList"))?;

        // SAFETY: signatures match the exported C functions
        unsafe {
            Ok(Self {
                begin_event: std::mem::transmute::<_, BeginEventOnCommandList>(begin_event),
                end_event: std::mem::transmute::<_, EndEventOnCommandList>(end_event),
            })
        }
    }

    /// Must be paired with [`Pix::end_event`] on the same list.
    pub fn begin_event(&self, command_list: &ID3D12GraphicsCommandList, color: u64, name: &str) {
        // interior NULs would truncate the label anyway
        let label = CString::new(name.replace('\0', "")).unwrap_or_default();

        // the list must be cloned, or BeginEventOnCommandList crashes
        // https://www.polymonster.co.uk/blog/bulding-new-engine-in-rust-2
        let list = command_list.clone();
        unsafe { (self.begin_event)(list.as_raw(), color, PCSTR(label.as_ptr() as *const u8)) };
    }

    pub fn end_event(&self, command_list: &ID3D12GraphicsCommandList) {
        unsafe { (self.end_event)(command_list.as_raw()) };
    }
}

fn lookup(
    module: HMODULE,
    name: PCSTR,
) -> windows::core::Result<unsafe extern "system" fn() -> isize> {
    unsafe { GetProcAddress(module, name) }.ok_or_else(|| {
        let name = unsafe { name.to_string() }.unwrap_or_default();
        windows::core::Error::new(E_FAIL, &format!("`{name}` is not exported"))
    })
}

/// Packs an opaque ARGB marker color.
pub fn pix_color(red: u8, green: u8, blue: u8) -> u64 {
    0xff00_0000 | (u64::from(red) << 16) | (u64::from(green) << 8) | u64::from(blue)
}
