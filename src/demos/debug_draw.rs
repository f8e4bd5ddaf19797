use wgpu::util::DeviceExt;

use crate::{
    context::InitContext,
    data_structures::{
        instance::{Instance, InstanceRaw},
        mesh::DrawMesh,
        voxel::VoxelTexture,
    },
    demos::LevelDescriptor,
    engine::CoreEngine,
    libraries::{mesh::MeshLibrary, shader::ShaderLibrary},
};

/// One shaded cube per occupied voxel of the active level.
#[derive(Debug, Default)]
pub struct DebugDraw {
    level: u32,
    dims: [u32; 3],
    texture_id: u64,
    instances: Vec<InstanceRaw>,
    instance_buffer: Option<wgpu::Buffer>,
    capacity: usize,
    uploaded: Option<(u64, u32)>,
}

impl DebugDraw {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recreate the cubes from `level` of `texture`. CPU only.
    pub fn rebuild(&mut self, texture: &VoxelTexture, level: u32) {
        let level = level.min(texture.mip_level_count() - 1);
        let grid = texture.level(level);
        let dims = grid.dims();
        let scale = dims.map(|d| 1.0 / d as f32);
        self.instances = grid
            .iter_occupied()
            .map(|(x, y, z, voxel)| {
                Instance {
                    position: [x as f32 * scale[0], y as f32 * scale[1], z as f32 * scale[2]]
                        .into(),
                    scale: scale.into(),
                    color: [
                        voxel[0] as f32 / 255.0,
                        voxel[1] as f32 / 255.0,
                        voxel[2] as f32 / 255.0,
                        1.0,
                    ],
                    ..Default::default()
                }
                .to_raw()
            })
            .collect();
        self.level = level;
        self.dims = dims;
        self.texture_id = texture.id();
        log::debug!(
            "debug draw: {} cubes at level {} of `{}`",
            self.instances.len(),
            level,
            texture.name()
        );
    }

    pub fn needs_upload(&self) -> bool {
        self.uploaded != Some((self.texture_id, self.level))
    }

    /// Push the rebuilt instances, growing the buffer when they no longer fit.
    pub fn prepare(&mut self, gpu: &InitContext) {
        if !self.needs_upload() {
            return;
        }
        let fits = self.instances.len() <= self.capacity;
        match self.instance_buffer.as_ref().filter(|_| fits) {
            Some(buffer) => {
                gpu.queue
                    .write_buffer(buffer, 0, bytemuck::cast_slice(&self.instances));
            }
            None => {
                // Buffers may not be empty, keep room for at least one cube.
                let mut contents = self.instances.clone();
                if contents.is_empty() {
                    contents.push(Instance::new().to_raw());
                }
                self.capacity = contents.len();
                self.instance_buffer = Some(gpu.device.create_buffer_init(
                    &wgpu::util::BufferInitDescriptor {
                        label: Some("Debug Draw Instance Buffer"),
                        contents: bytemuck::cast_slice(&contents),
                        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                    },
                ));
            }
        }
        self.uploaded = Some((self.texture_id, self.level));
    }

    pub fn render(&self, pass: &mut wgpu::RenderPass<'_>, engine: &CoreEngine) -> anyhow::Result<()> {
        let Some(buffer) = &self.instance_buffer else {
            return Ok(());
        };
        if self.instances.is_empty() {
            log::warn!("debug draw: level {} has no occupied voxels", self.level);
            return Ok(());
        }
        let shaders = engine.shaders();
        let meshes = engine.meshes();
        let program = shaders.program(shaders.resolve(ShaderLibrary::DEBUG_DRAW)?)?;
        let cube = meshes.mesh(meshes.resolve(MeshLibrary::CUBE)?)?;
        pass.set_pipeline(&program.pipeline);
        pass.set_bind_group(0, engine.render_data().bind_group()?, &[]);
        pass.set_vertex_buffer(1, buffer.slice(..));
        pass.draw_mesh_instanced(cube, 0..self.instances.len() as u32);
        Ok(())
    }

    pub fn descriptor(&self) -> LevelDescriptor {
        LevelDescriptor {
            level: self.level,
            dims: self.dims,
            texture_id: self.texture_id,
            instance_count: self.instances.len() as u32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_structures::voxel::VoxelGrid;

    #[test]
    fn one_cube_per_occupied_voxel() {
        let base = VoxelGrid::from_fn(8, |p| if p[1] < 0.25 { [10, 20, 30, 255] } else { [0; 4] });
        let texture = VoxelTexture::new(1, "floor", base, 4);
        let mut demo = DebugDraw::new();
        demo.rebuild(&texture, 0);
        assert_eq!(demo.descriptor().instance_count, 8 * 8 * 2);
        demo.rebuild(&texture, 2);
        let descriptor = demo.descriptor();
        assert_eq!(descriptor.dims, [2, 2, 2]);
        assert_eq!(descriptor.instance_count, texture.level(2).occupied() as u32);
        assert!(demo.needs_upload());
    }

    #[test]
    fn level_is_clamped_to_the_chain() {
        let texture = VoxelTexture::new(1, "x", VoxelGrid::new([4; 3]), 3);
        let mut demo = DebugDraw::new();
        demo.rebuild(&texture, 10);
        assert_eq!(demo.descriptor().level, 2);
        assert_eq!(demo.descriptor().instance_count, 0);
    }
}
