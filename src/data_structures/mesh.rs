//! Mesh descriptions and their GPU counterparts.
//!
//! A [`MeshDescription`] is the CPU-side vertex/index data declared while a
//! [`crate::libraries::mesh::MeshLibrary`] is building. Committing the library
//! turns each description into a [`GpuMesh`].

use std::ops::Range;

use wgpu::util::DeviceExt;

pub trait Vertex {
    fn desc() -> wgpu::VertexBufferLayout<'static>;
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

impl Vertex for MeshVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<MeshVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct MeshDescription {
    pub vertices: Vec<MeshVertex>,
    pub indices: Vec<u32>,
}

impl MeshDescription {
    /// Axis-aligned unit cube spanning `[0, 1]^3` with per-face normals.
    pub fn cube() -> Self {
        // (normal, four corners counter-clockwise seen from outside)
        let faces: [([f32; 3], [[f32; 3]; 4]); 6] = [
            ([1.0, 0.0, 0.0], [[1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [1.0, 1.0, 1.0], [1.0, 0.0, 1.0]]),
            ([-1.0, 0.0, 0.0], [[0.0, 0.0, 1.0], [0.0, 1.0, 1.0], [0.0, 1.0, 0.0], [0.0, 0.0, 0.0]]),
            ([0.0, 1.0, 0.0], [[0.0, 1.0, 1.0], [1.0, 1.0, 1.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]]),
            ([0.0, -1.0, 0.0], [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 0.0, 1.0], [0.0, 0.0, 1.0]]),
            ([0.0, 0.0, 1.0], [[0.0, 0.0, 1.0], [1.0, 0.0, 1.0], [1.0, 1.0, 1.0], [0.0, 1.0, 1.0]]),
            ([0.0, 0.0, -1.0], [[1.0, 0.0, 0.0], [0.0, 0.0, 0.0], [0.0, 1.0, 0.0], [1.0, 1.0, 0.0]]),
        ];
        let mut vertices = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);
        for (normal, corners) in faces {
            let base = vertices.len() as u32;
            vertices.extend(corners.iter().map(|&position| MeshVertex { position, normal }));
            indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }
        Self { vertices, indices }
    }

    /// Unit quad on the XZ plane centred on the origin, facing +Y.
    pub fn plane() -> Self {
        let normal = [0.0, 1.0, 0.0];
        let vertices = [
            [-0.5, 0.0, 0.5],
            [0.5, 0.0, 0.5],
            [0.5, 0.0, -0.5],
            [-0.5, 0.0, -0.5],
        ]
        .into_iter()
        .map(|position| MeshVertex { position, normal })
        .collect();
        Self {
            vertices,
            indices: vec![0, 1, 2, 0, 2, 3],
        }
    }

    /// UV sphere of radius 0.5 centred on the origin.
    pub fn sphere(rings: u32, segments: u32) -> Self {
        let rings = rings.max(2);
        let segments = segments.max(3);
        let mut vertices = Vec::with_capacity(((rings + 1) * (segments + 1)) as usize);
        for ring in 0..=rings {
            let theta = std::f32::consts::PI * ring as f32 / rings as f32;
            for segment in 0..=segments {
                let phi = std::f32::consts::TAU * segment as f32 / segments as f32;
                let normal = [theta.sin() * phi.cos(), theta.cos(), theta.sin() * phi.sin()];
                vertices.push(MeshVertex {
                    position: normal.map(|n| n * 0.5),
                    normal,
                });
            }
        }
        let stride = segments + 1;
        let mut indices = Vec::with_capacity((rings * segments * 6) as usize);
        for ring in 0..rings {
            for segment in 0..segments {
                let a = ring * stride + segment;
                let b = a + stride;
                indices.extend_from_slice(&[a, a + 1, b, a + 1, b + 1, b]);
            }
        }
        Self { vertices, indices }
    }

    /// Convert OBJ models (triangulated, single index) into one description.
    pub fn from_obj_models(models: &[tobj::Model]) -> Self {
        let mut description = Self::default();
        for m in models {
            let base = description.vertices.len() as u32;
            description
                .vertices
                .extend((0..m.mesh.positions.len() / 3).map(|i| MeshVertex {
                    position: [
                        m.mesh.positions[i * 3],
                        m.mesh.positions[i * 3 + 1],
                        m.mesh.positions[i * 3 + 2],
                    ],
                    normal: [
                        m.mesh.normals.get(i * 3).map_or(0.0, |f| *f),
                        m.mesh.normals.get(i * 3 + 1).map_or(1.0, |f| *f),
                        m.mesh.normals.get(i * 3 + 2).map_or(0.0, |f| *f),
                    ],
                }));
            description
                .indices
                .extend(m.mesh.indices.iter().map(|i| i + base));
        }
        description
    }

    pub fn upload(&self, device: &wgpu::Device, name: &str) -> anyhow::Result<GpuMesh> {
        if self.indices.is_empty() {
            anyhow::bail!("mesh has no indices");
        }
        if let Some(bad) = self
            .indices
            .iter()
            .find(|&&i| i as usize >= self.vertices.len())
        {
            anyhow::bail!(
                "index {} is out of bounds for {} vertices",
                bad,
                self.vertices.len()
            );
        }
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{:?} Vertex Buffer", name)),
            contents: bytemuck::cast_slice(&self.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{:?} Index Buffer", name)),
            contents: bytemuck::cast_slice(&self.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        Ok(GpuMesh {
            name: name.to_string(),
            vertex_buffer,
            index_buffer,
            num_elements: self.indices.len() as u32,
        })
    }
}

#[derive(Debug)]
pub struct GpuMesh {
    pub name: String,
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub num_elements: u32,
}

pub trait DrawMesh {
    fn draw_mesh_instanced(&mut self, mesh: &GpuMesh, instances: Range<u32>);
}

impl DrawMesh for wgpu::RenderPass<'_> {
    /// Draws `mesh` with whatever instance buffer is bound at slot 1.
    fn draw_mesh_instanced(&mut self, mesh: &GpuMesh, instances: Range<u32>) {
        self.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
        self.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        self.draw_indexed(0..mesh.num_elements, 0, instances);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cube_has_six_quads() {
        let cube = MeshDescription::cube();
        assert_eq!(cube.vertices.len(), 24);
        assert_eq!(cube.indices.len(), 36);
        assert!(cube.vertices.iter().all(|v| v
            .position
            .iter()
            .all(|c| (0.0..=1.0).contains(c))));
    }

    #[test]
    fn sphere_indices_stay_in_bounds() {
        let sphere = MeshDescription::sphere(8, 12);
        assert!(
            sphere
                .indices
                .iter()
                .all(|&i| (i as usize) < sphere.vertices.len())
        );
        assert_eq!(sphere.indices.len(), 8 * 12 * 6);
    }
}
