//! GPU textures and texture creation utilities.
//!
//! This module provides [`Texture`], a wrapper around WGPU texture resources
//! used for depth buffers, and [`GpuVoxelTexture`], the GPU-resident copy of
//! a [`VoxelTexture`] with its full mip chain.

use crate::data_structures::voxel::{VoxelTexture, max_gpu_mip_levels};

/// A GPU texture with its default view.
#[derive(Clone, Debug)]
pub struct Texture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

impl Texture {
    /// Standard depth buffer texture format (32-bit float).
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    /// Create a depth texture for depth-testing during rendering.
    ///
    /// # Arguments
    ///
    /// * `size` is [width, height] of the texture in pixels
    /// * `label` is used as a debug label for the GPU resource
    pub fn create_depth_texture(device: &wgpu::Device, size: [u32; 2], label: &str) -> Self {
        let size = wgpu::Extent3d {
            width: size[0].max(1),
            height: size[1].max(1),
            depth_or_array_layers: 1,
        };
        let desc = wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[Self::DEPTH_FORMAT],
        };
        let texture = device.create_texture(&desc);
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Self { texture, view }
    }
}

/// Bind group layout for sampling one mip level of a voxel volume.
///
/// Binding 0 is the 3D texture view, binding 1 a sampler and binding 2 a
/// small uniform describing the level.
pub fn voxel_texture_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D3,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
        ],
        label: Some("voxel_texture_bind_group_layout"),
    })
}

/// A voxel volume resident on the GPU as a 3D texture with every mip level.
#[derive(Debug)]
pub struct GpuVoxelTexture {
    pub texture: wgpu::Texture,
    pub sampler: wgpu::Sampler,
    source_id: u64,
    mip_level_count: u32,
}

impl GpuVoxelTexture {
    pub const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

    pub fn upload(device: &wgpu::Device, queue: &wgpu::Queue, voxels: &VoxelTexture) -> Self {
        let base = voxels.level(0).dims();
        // The CPU chain may carry trailing 1x1x1 levels the GPU cannot hold.
        let mip_level_count = voxels.mip_level_count().min(max_gpu_mip_levels(base));
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(&format!("voxel texture {}", voxels.name())),
            size: wgpu::Extent3d {
                width: base[0],
                height: base[1],
                depth_or_array_layers: base[2],
            },
            mip_level_count,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D3,
            format: Self::FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        for (mip_level, grid) in voxels
            .levels()
            .iter()
            .take(mip_level_count as usize)
            .enumerate()
        {
            let [w, h, d] = grid.dims();
            queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    aspect: wgpu::TextureAspect::All,
                    texture: &texture,
                    mip_level: mip_level as u32,
                    origin: wgpu::Origin3d::ZERO,
                },
                bytemuck::cast_slice(grid.voxels()),
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(4 * w),
                    rows_per_image: Some(h),
                },
                wgpu::Extent3d {
                    width: w,
                    height: h,
                    depth_or_array_layers: d,
                },
            );
        }

        // Nearest keeps individual voxels crisp when stepping through levels.
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("voxel sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        Self {
            texture,
            sampler,
            source_id: voxels.id(),
            mip_level_count,
        }
    }

    /// Id of the [`VoxelTexture`] this was uploaded from.
    pub fn source_id(&self) -> u64 {
        self.source_id
    }

    /// Levels resident on the GPU.
    pub fn mip_level_count(&self) -> u32 {
        self.mip_level_count
    }

    /// A view restricted to a single mip level, clamped to the GPU chain.
    /// Levels past it are 1x1x1 and identical to the last resident one.
    pub fn level_view(&self, level: u32) -> wgpu::TextureView {
        self.texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("voxel level view"),
            dimension: Some(wgpu::TextureViewDimension::D3),
            base_mip_level: level.min(self.mip_level_count - 1),
            mip_level_count: Some(1),
            ..Default::default()
        })
    }
}
