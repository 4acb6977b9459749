use std::mem::size_of;
use std::ptr::NonNull;

use log::debug;
use windows::Win32::Graphics::Direct3D12::*;

use super::{
    device::Device,
    pipeline::{view_slot, Pipeline},
    resource,
};
use crate::camera::{Camera, SceneConstants};
use crate::vertex::{cube_vertices, Vertex};
use crate::{frame, Error, Result};

/// The cube, plus the camera constants it is drawn with.
pub struct Scene {
    _vertex_buffer: ID3D12Resource,
    vbv: D3D12_VERTEX_BUFFER_VIEW,
    vertex_count: u32,

    constant_buffer: ID3D12Resource,
    // persistently mapped; the upload heap is write-combined, never read it
    constants: NonNull<SceneConstants>,
    camera: Camera,
}

impl Scene {
    pub fn build(device: &Device, pipeline: &Pipeline, width: u32, height: u32) -> Result<Self> {
        let vertices = cube_vertices();
        let vertex_buffer_size = std::mem::size_of_val(&vertices) as u64;
        let vertex_buffer = resource::create_upload_buffer(
            device.get(),
            vertex_buffer_size,
            Some(&vertices),
            "cube_vertices",
        )?;
        let vbv = D3D12_VERTEX_BUFFER_VIEW {
            BufferLocation: unsafe { vertex_buffer.GetGPUVirtualAddress() },
            SizeInBytes: vertex_buffer_size as u32,
            StrideInBytes: Vertex::STRIDE,
        };

        let constant_buffer_size =
            resource::align_constant_buffer_size(size_of::<SceneConstants>() as u64);
        let constant_buffer = resource::create_upload_buffer::<SceneConstants>(
            device.get(),
            constant_buffer_size,
            None,
            "scene_constants",
        )?;

        let cbv = D3D12_CONSTANT_BUFFER_VIEW_DESC {
            BufferLocation: unsafe { constant_buffer.GetGPUVirtualAddress() },
            SizeInBytes: constant_buffer_size as u32,
        };
        unsafe {
            device
                .get()
                .CreateConstantBufferView(Some(&cbv), pipeline.view_cpu_handle(view_slot::SCENE_CBV))
        };

        let mut mapped = std::ptr::null_mut();
        // an empty read range: the CPU never reads the buffer
        let read_range = D3D12_RANGE { Begin: 0, End: 0 };
        unsafe { constant_buffer.Map(0, Some(&read_range), Some(&mut mapped)) }?;
        let constants = NonNull::new(mapped as *mut SceneConstants)
            .ok_or_else(|| Error::Backend("mapping the scene constants returned null".into()))?;

        let mut scene = Self {
            _vertex_buffer: vertex_buffer,
            vbv,
            vertex_count: vertices.len() as u32,
            constant_buffer,
            constants,
            camera: Camera::default(),
        };
        scene.write_constants(width, height);
        Ok(scene)
    }

    pub fn vertex_buffer_view(&self) -> &D3D12_VERTEX_BUFFER_VIEW {
        &self.vbv
    }

    fn write_constants(&mut self, width: u32, height: u32) {
        let constants = SceneConstants::new(&self.camera, width, height);
        unsafe { self.constants.as_ptr().write(constants) };
    }
}

impl frame::Scene for Scene {
    fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    fn resize(&mut self, width: u32, height: u32) {
        debug!("updating scene constants for {width}x{height}");
        self.write_constants(width, height);
    }
}

impl Drop for Scene {
    fn drop(&mut self) {
        unsafe { self.constant_buffer.Unmap(0, None) };
    }
}
