use wgpu::util::DeviceExt;

use crate::{
    context::InitContext,
    data_structures::{
        texture::{GpuVoxelTexture, voxel_texture_layout},
        voxel::VoxelTexture,
    },
    demos::LevelDescriptor,
    engine::CoreEngine,
    libraries::shader::ShaderLibrary,
};

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LevelUniform {
    pub dims: [f32; 3],
    pub level: u32,
    pub steps: u32,
    _padding: [u32; 3],
}

impl LevelUniform {
    pub fn new(level: u32, dims: [u32; 3]) -> Self {
        let longest = dims.iter().copied().max().unwrap_or(1);
        Self {
            dims: dims.map(|d| d as f32),
            level,
            // Two samples per voxel along the longest axis.
            steps: (longest * 2).max(4),
            _padding: [0; 3],
        }
    }
}

#[derive(Debug)]
struct RaycasterResources {
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

/// Fullscreen raymarch through a single level of the voxel texture.
#[derive(Debug, Default)]
pub struct VoxelRaycaster {
    level: u32,
    dims: [u32; 3],
    texture_id: u64,
    uniform: Option<LevelUniform>,
    gpu: Option<RaycasterResources>,
    uploaded: Option<(u64, u32)>,
}

impl VoxelRaycaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rebuild(&mut self, texture: &VoxelTexture, level: u32) {
        let level = level.min(texture.mip_level_count() - 1);
        self.level = level;
        self.dims = texture.level(level).dims();
        self.texture_id = texture.id();
        self.uniform = Some(LevelUniform::new(level, self.dims));
    }

    pub fn needs_upload(&self) -> bool {
        self.uploaded != Some((self.texture_id, self.level))
    }

    /// Bind the level view of `voxels`. The view must come from the texture
    /// this mode was last rebuilt for.
    pub fn prepare(&mut self, gpu: &InitContext, voxels: &GpuVoxelTexture) {
        if !self.needs_upload() {
            return;
        }
        let Some(uniform) = self.uniform else {
            return;
        };
        if voxels.source_id() != self.texture_id {
            log::warn!(
                "voxel raycaster: GPU texture {} does not match rebuilt texture {}",
                voxels.source_id(),
                self.texture_id
            );
            return;
        }
        let uniform_buffer = match self.gpu.take() {
            Some(resources) => {
                gpu.queue.write_buffer(
                    &resources.uniform_buffer,
                    0,
                    bytemuck::cast_slice(&[uniform]),
                );
                resources.uniform_buffer
            }
            None => gpu
                .device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("Voxel Level Buffer"),
                    contents: bytemuck::cast_slice(&[uniform]),
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                }),
        };
        let view = voxels.level_view(self.level);
        let bind_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &voxel_texture_layout(&gpu.device),
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&voxels.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: uniform_buffer.as_entire_binding(),
                },
            ],
            label: Some("voxel_level_bind_group"),
        });
        self.gpu = Some(RaycasterResources {
            uniform_buffer,
            bind_group,
        });
        self.uploaded = Some((self.texture_id, self.level));
    }

    pub fn render(&self, pass: &mut wgpu::RenderPass<'_>, engine: &CoreEngine) -> anyhow::Result<()> {
        let Some(resources) = &self.gpu else {
            return Ok(());
        };
        let shaders = engine.shaders();
        let program = shaders.program(shaders.resolve(ShaderLibrary::VOXEL_RAYCASTER)?)?;
        pass.set_pipeline(&program.pipeline);
        pass.set_bind_group(0, engine.render_data().bind_group()?, &[]);
        pass.set_bind_group(1, &resources.bind_group, &[]);
        pass.draw(0..3, 0..1);
        Ok(())
    }

    pub fn descriptor(&self) -> LevelDescriptor {
        LevelDescriptor {
            level: self.level,
            dims: self.dims,
            texture_id: self.texture_id,
            instance_count: u32::from(self.uniform.is_some()),
        }
    }

    /// The uniform staged by the last rebuild.
    pub fn level_uniform(&self) -> Option<&LevelUniform> {
        self.uniform.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_structures::voxel::VoxelGrid;

    #[test]
    fn uniform_matches_the_shader_layout() {
        assert_eq!(std::mem::size_of::<LevelUniform>(), 32);
        let uniform = LevelUniform::new(3, [8, 8, 8]);
        assert_eq!(uniform.steps, 16);
        assert_eq!(LevelUniform::new(6, [1, 1, 1]).steps, 4);
    }

    #[test]
    fn rebuild_stages_the_new_level() {
        let texture = VoxelTexture::new(4, "t", VoxelGrid::new([16; 3]), 5);
        let mut demo = VoxelRaycaster::new();
        assert_eq!(demo.descriptor().instance_count, 0);
        demo.rebuild(&texture, 3);
        let uniform = demo.level_uniform().unwrap();
        assert_eq!(uniform.level, 3);
        assert_eq!(uniform.dims, [2.0; 3]);
        assert_eq!(demo.descriptor().texture_id, 4);
        assert!(demo.needs_upload());
    }
}
