use std::ffi::CString;
use std::path::PathBuf;

use log::{info, warn};
use windows::core::{HSTRING, PCSTR};
use windows::Win32::Graphics::Direct3D::{Fxc::*, ID3DBlob};
use windows::Win32::Graphics::Direct3D12::D3D12_SHADER_BYTECODE;

use crate::{Error, Result};

pub struct ShaderConfig {
    pub path: PathBuf,
    pub entry_point: String,
    pub target: String,
}

pub struct Shader {
    blob: ID3DBlob,
}

impl Shader {
    /// Points into the blob; keep the shader alive while the bytecode is used.
    pub fn bytecode(&self) -> D3D12_SHADER_BYTECODE {
        D3D12_SHADER_BYTECODE {
            pShaderBytecode: unsafe { self.blob.GetBufferPointer() },
            BytecodeLength: unsafe { self.blob.GetBufferSize() },
        }
    }
}

/// Compiles one entry point of an HLSL file with the FXC compiler.
pub fn compile_file(config: &ShaderConfig, debug: bool) -> Result<Shader> {
    info!("compiling {:?} {}", config.path, config.entry_point);

    let shader_error = |message: String| Error::Shader {
        path: config.path.clone(),
        message,
    };

    let filename: HSTRING = config.path.as_os_str().into();
    let entry = CString::new(config.entry_point.as_str())
        .map_err(|e| shader_error(format!("bad entry point: {e}")))?;
    let target = CString::new(config.target.as_str())
        .map_err(|e| shader_error(format!("bad target: {e}")))?;

    let flags = if debug {
        D3DCOMPILE_DEBUG | D3DCOMPILE_SKIP_OPTIMIZATION
    } else {
        D3DCOMPILE_OPTIMIZATION_LEVEL3
    };

    let mut blob = None;
    let mut errors = None;
    let result = unsafe {
        D3DCompileFromFile(
            &filename,
            None,
            None,
            PCSTR(entry.as_ptr() as *const u8),
            PCSTR(target.as_ptr() as *const u8),
            flags,
            0,
            &mut blob,
            Some(&mut errors),
        )
    };

    let messages = errors.map(|errors: ID3DBlob| unsafe {
        String::from_utf8_lossy(std::slice::from_raw_parts(
            errors.GetBufferPointer() as *const u8,
            errors.GetBufferSize(),
        ))
        .trim_end_matches('\0')
        .to_string()
    });

    match (result, blob) {
        (Ok(()), Some(blob)) => {
            if let Some(warnings) = messages.filter(|m| !m.is_empty()) {
                warn!("{warnings}");
            }
            Ok(Shader { blob })
        }
        (Ok(()), None) => Err(shader_error("the compiler returned no bytecode".into())),
        (Err(e), _) => Err(shader_error(messages.unwrap_or_else(|| e.to_string()))),
    }
}
