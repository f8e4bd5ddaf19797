//! Per-frame GPU state.
//!
//! [`RenderData`] owns the uniform buffer every pipeline reads at group 0:
//! camera matrices, viewport resolution and elapsed time. The whole
//! [`PerFrameUniform`] record is replaced each frame, never patched.

use cgmath::EuclideanSpace;
use wgpu::util::DeviceExt;

use crate::{
    camera::ThirdPersonCamera,
    data_structures::library::{Lifecycle, LibraryError, Stage},
};

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PerFrameUniform {
    pub view_projection: [[f32; 4]; 4],
    pub cam_look_at: [f32; 3],
    // Due to uniforms requiring 16 byte (4 float) spacing, we need to use a padding field here
    _padding0: f32,
    pub cam_position: [f32; 3],
    _padding1: f32,
    pub cam_up: [f32; 3],
    _padding2: f32,
    pub resolution: [u32; 2],
    pub time: f32,
    _padding3: f32,
}

impl PerFrameUniform {
    pub fn new(camera: &ThirdPersonCamera, resolution: [u32; 2], time: f32) -> Self {
        Self {
            view_projection: camera.view_projection().into(),
            cam_look_at: camera.look_at.to_vec().into(),
            cam_position: camera.position().to_vec().into(),
            cam_up: camera.up.into(),
            resolution,
            time,
            ..bytemuck::Zeroable::zeroed()
        }
    }
}

pub fn per_frame_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: wgpu::BufferSize::new(
                    std::mem::size_of::<PerFrameUniform>() as u64
                ),
            },
            count: None,
        }],
        label: Some("per_frame_bind_group_layout"),
    })
}

#[derive(Debug)]
struct PerFrameResources {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

#[derive(Debug)]
pub struct RenderData {
    lifecycle: Lifecycle,
    staged: PerFrameUniform,
    gpu: Option<PerFrameResources>,
}

impl Default for RenderData {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderData {
    pub fn new() -> Self {
        Self {
            lifecycle: Lifecycle::new("RenderData"),
            staged: bytemuck::Zeroable::zeroed(),
            gpu: None,
        }
    }

    pub fn stage(&self) -> Stage {
        self.lifecycle.stage()
    }

    /// Stage the CPU-side record. No GPU objects are created here.
    pub fn begin(&mut self) -> Result<(), LibraryError> {
        self.lifecycle.begin()
    }

    /// Allocate the uniform buffer and bind it at group 0, binding 0.
    pub fn commit_to_gpu(&mut self, device: &wgpu::Device) -> Result<(), LibraryError> {
        self.lifecycle.ensure_building()?;
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Per Frame Buffer"),
            contents: bytemuck::cast_slice(&[self.staged]),
            // COPY_SRC lets the committed record be read back.
            usage: wgpu::BufferUsages::UNIFORM
                | wgpu::BufferUsages::COPY_DST
                | wgpu::BufferUsages::COPY_SRC,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &per_frame_layout(device),
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("per_frame_bind_group"),
        });
        self.gpu = Some(PerFrameResources { buffer, bind_group });
        self.lifecycle.commit()
    }

    /// Replace the whole per-frame record and push it to the GPU.
    pub fn display(
        &mut self,
        queue: &wgpu::Queue,
        record: PerFrameUniform,
    ) -> Result<(), LibraryError> {
        self.lifecycle.ensure_committed()?;
        self.staged = record;
        if let Some(gpu) = &self.gpu {
            queue.write_buffer(&gpu.buffer, 0, bytemuck::cast_slice(&[self.staged]));
        }
        Ok(())
    }

    /// The record most recently staged.
    pub fn record(&self) -> &PerFrameUniform {
        &self.staged
    }

    pub fn time(&self) -> f32 {
        self.staged.time
    }

    pub fn bind_group(&self) -> Result<&wgpu::BindGroup, LibraryError> {
        self.lifecycle.ensure_committed()?;
        self.gpu
            .as_ref()
            .map(|gpu| &gpu.bind_group)
            .ok_or(LibraryError::NotCommitted {
                library: self.lifecycle.label(),
                stage: self.stage(),
            })
    }

    pub fn buffer(&self) -> Result<&wgpu::Buffer, LibraryError> {
        self.lifecycle.ensure_committed()?;
        self.gpu
            .as_ref()
            .map(|gpu| &gpu.buffer)
            .ok_or(LibraryError::NotCommitted {
                library: self.lifecycle.label(),
                stage: self.stage(),
            })
    }
}
