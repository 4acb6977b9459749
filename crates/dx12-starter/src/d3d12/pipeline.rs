use std::ffi::CString;
use std::mem;
use std::path::Path;

use windows::core::PCSTR;
use windows::Win32::Graphics::{Direct3D12::*, Dxgi::Common::*};

use super::{
    device::Device,
    shader::{self, ShaderConfig},
    util::set_name_str,
};
use crate::vertex::Vertex;
use crate::{Error, Result};

/// Descriptors in the shader-visible heap.
pub mod view_slot {
    /// Scene constant buffer, bound through root parameter 0.
    pub const SCENE_CBV: u32 = 0;
    /// Owned by the UI collaborator.
    pub const UI: u32 = 1;
    pub const COUNT: u32 = 2;
}

pub const SHADER_FILE: &str = "shaders/shaders.hlsl";

/// State bound at the start of every frame.
pub struct Pipeline {
    root_signature: ID3D12RootSignature,
    pso: ID3D12PipelineState,
    view_heap: ID3D12DescriptorHeap,
    view_size: u32,
}

impl Pipeline {
    pub fn build(device: &Device, shader_dir: &Path, debug_shaders: bool) -> Result<Self> {
        let root_signature = create_root_signature(device, "root_signature")?;
        let pso = create_pso(
            device,
            &root_signature,
            &shader_dir.join(SHADER_FILE),
            debug_shaders,
        )?;
        let view_heap = device.create_descriptor_heap(
            D3D12_DESCRIPTOR_HEAP_TYPE_CBV_SRV_UAV,
            view_slot::COUNT,
            "view_heap",
        )?;
        let view_size = device.descriptor_size(D3D12_DESCRIPTOR_HEAP_TYPE_CBV_SRV_UAV);

        Ok(Self {
            root_signature,
            pso,
            view_heap,
            view_size,
        })
    }

    pub fn root_signature(&self) -> &ID3D12RootSignature {
        &self.root_signature
    }

    pub fn pso(&self) -> &ID3D12PipelineState {
        &self.pso
    }

    pub fn view_heap(&self) -> &ID3D12DescriptorHeap {
        &self.view_heap
    }

    pub fn view_cpu_handle(&self, slot: u32) -> D3D12_CPU_DESCRIPTOR_HANDLE {
        debug_assert!(slot < view_slot::COUNT);
        let mut handle = unsafe { self.view_heap.GetCPUDescriptorHandleForHeapStart() };
        handle.ptr += (self.view_size as usize) * (slot as usize);
        handle
    }
}

fn create_root_signature(device: &Device, name: &str) -> Result<ID3D12RootSignature> {
    let flags = D3D12_ROOT_SIGNATURE_FLAG_ALLOW_INPUT_ASSEMBLER_INPUT_LAYOUT
        | D3D12_ROOT_SIGNATURE_FLAG_DENY_HULL_SHADER_ROOT_ACCESS
        | D3D12_ROOT_SIGNATURE_FLAG_DENY_DOMAIN_SHADER_ROOT_ACCESS
        | D3D12_ROOT_SIGNATURE_FLAG_DENY_GEOMETRY_SHADER_ROOT_ACCESS;

    let ranges = [D3D12_DESCRIPTOR_RANGE1 {
        RangeType: D3D12_DESCRIPTOR_RANGE_TYPE_CBV,
        NumDescriptors: 1,
        BaseShaderRegister: 0,
        RegisterSpace: 0,
        // rewritten only while the GPU is drained
        Flags: D3D12_DESCRIPTOR_RANGE_FLAG_DATA_STATIC_WHILE_SET_AT_EXECUTE,
        OffsetInDescriptorsFromTableStart: view_slot::SCENE_CBV,
    }];

    let params = [D3D12_ROOT_PARAMETER1 {
        ParameterType: D3D12_ROOT_PARAMETER_TYPE_DESCRIPTOR_TABLE,
        Anonymous: D3D12_ROOT_PARAMETER1_0 {
            DescriptorTable: D3D12_ROOT_DESCRIPTOR_TABLE1 {
                NumDescriptorRanges: ranges.len() as u32,
                pDescriptorRanges: ranges.as_ptr(),
            },
        },
        ShaderVisibility: D3D12_SHADER_VISIBILITY_VERTEX,
    }];

    let desc = D3D12_VERSIONED_ROOT_SIGNATURE_DESC {
        Version: D3D_ROOT_SIGNATURE_VERSION_1_1,
        Anonymous: D3D12_VERSIONED_ROOT_SIGNATURE_DESC_0 {
            Desc_1_1: D3D12_ROOT_SIGNATURE_DESC1 {
                NumParameters: params.len() as u32,
                pParameters: params.as_ptr(),
                NumStaticSamplers: 0,
                pStaticSamplers: std::ptr::null(),
                Flags: flags,
            },
        },
    };

    let mut blob = None;
    let mut error = None;
    let serialized =
        unsafe { D3D12SerializeVersionedRootSignature(&desc, &mut blob, Some(&mut error)) };
    if let Some(e) = error {
        let message = unsafe { std::ffi::CStr::from_ptr(e.GetBufferPointer() as _) };
        return Err(Error::Backend(format!(
            "failed to serialize the root signature: {}",
            message.to_string_lossy()
        )));
    }
    serialized?;
    let blob = blob.ok_or_else(|| Error::Backend("empty root signature blob".into()))?;

    let root_signature: ID3D12RootSignature = unsafe {
        let data =
            std::slice::from_raw_parts(blob.GetBufferPointer() as *const u8, blob.GetBufferSize());
        device.get().CreateRootSignature(0, data)
    }?;
    set_name_str(&root_signature, name)?;

    Ok(root_signature)
}

fn attribute_format(components: u32) -> DXGI_FORMAT {
    match components {
        1 => DXGI_FORMAT_R32_FLOAT,
        2 => DXGI_FORMAT_R32G32_FLOAT,
        3 => DXGI_FORMAT_R32G32B32_FLOAT,
        _ => DXGI_FORMAT_R32G32B32A32_FLOAT,
    }
}

fn create_pso(
    device: &Device,
    root_signature: &ID3D12RootSignature,
    hlsl: &Path,
    debug_shaders: bool,
) -> Result<ID3D12PipelineState> {
    let vertex_shader = shader::compile_file(
        &ShaderConfig {
            path: hlsl.to_path_buf(),
            entry_point: "VSMain".into(),
            target: "vs_5_0".into(),
        },
        debug_shaders,
    )?;
    let pixel_shader = shader::compile_file(
        &ShaderConfig {
            path: hlsl.to_path_buf(),
            entry_point: "PSMain".into(),
            target: "ps_5_0".into(),
        },
        debug_shaders,
    )?;

    let semantics = Vertex::LAYOUT
        .iter()
        .map(|attribute| CString::new(attribute.semantic))
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::Backend(format!("bad vertex semantic: {e}")))?;
    let input_layout: Vec<D3D12_INPUT_ELEMENT_DESC> = Vertex::LAYOUT
        .iter()
        .zip(&semantics)
        .map(|(attribute, semantic)| D3D12_INPUT_ELEMENT_DESC {
            SemanticName: PCSTR(semantic.as_ptr() as *const u8),
            SemanticIndex: 0,
            Format: attribute_format(attribute.components),
            InputSlot: 0,
            AlignedByteOffset: attribute.offset,
            InputSlotClass: D3D12_INPUT_CLASSIFICATION_PER_VERTEX_DATA,
            InstanceDataStepRate: 0,
        })
        .collect();

    let mut render_target_blend: [D3D12_RENDER_TARGET_BLEND_DESC; 8] = Default::default();
    render_target_blend[0] = D3D12_RENDER_TARGET_BLEND_DESC {
        BlendEnable: false.into(),
        LogicOpEnable: false.into(),
        SrcBlend: D3D12_BLEND_ONE,
        DestBlend: D3D12_BLEND_ZERO,
        BlendOp: D3D12_BLEND_OP_ADD,
        SrcBlendAlpha: D3D12_BLEND_ONE,
        DestBlendAlpha: D3D12_BLEND_ZERO,
        BlendOpAlpha: D3D12_BLEND_OP_ADD,
        LogicOp: D3D12_LOGIC_OP_NOOP,
        RenderTargetWriteMask: D3D12_COLOR_WRITE_ENABLE_ALL.0 as u8,
    };

    let mut rtv_formats = [DXGI_FORMAT_UNKNOWN; 8];
    rtv_formats[0] = DXGI_FORMAT_R8G8B8A8_UNORM;

    let desc = D3D12_GRAPHICS_PIPELINE_STATE_DESC {
        pRootSignature: unsafe { mem::transmute_copy(root_signature) },
        VS: vertex_shader.bytecode(),
        PS: pixel_shader.bytecode(),

        BlendState: D3D12_BLEND_DESC {
            AlphaToCoverageEnable: false.into(),
            IndependentBlendEnable: false.into(),
            RenderTarget: render_target_blend,
        },
        SampleMask: u32::MAX,
        RasterizerState: D3D12_RASTERIZER_DESC {
            FillMode: D3D12_FILL_MODE_SOLID,
            CullMode: D3D12_CULL_MODE_BACK,
            DepthClipEnable: true.into(),
            ..Default::default()
        },
        // no depth buffer
        DepthStencilState: D3D12_DEPTH_STENCIL_DESC {
            DepthEnable: false.into(),
            StencilEnable: false.into(),
            ..Default::default()
        },

        InputLayout: D3D12_INPUT_LAYOUT_DESC {
            pInputElementDescs: input_layout.as_ptr(),
            NumElements: input_layout.len() as u32,
        },

        PrimitiveTopologyType: D3D12_PRIMITIVE_TOPOLOGY_TYPE_TRIANGLE,
        NumRenderTargets: 1,
        RTVFormats: rtv_formats,
        DSVFormat: DXGI_FORMAT_UNKNOWN,
        SampleDesc: DXGI_SAMPLE_DESC {
            Count: 1,
            Quality: 0,
        },

        ..Default::default()
    };

    let pso: ID3D12PipelineState = unsafe { device.get().CreateGraphicsPipelineState(&desc) }?;
    set_name_str(&pso, "scene_pso")?;
    Ok(pso)
}
