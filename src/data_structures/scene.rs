//! Scenes: objects and lights composed from library resources.
//!
//! A [`SceneDescription`] names meshes and shaders by identifier. Building a
//! [`Scene`] resolves every identifier into a typed handle up front, so a
//! scene that exists never refers to a missing resource. Objects that share a
//! mesh and a shader are drawn with a single instanced call.

use std::collections::{BTreeMap, HashMap};

use cgmath::{Deg, InnerSpace, One, Rotation3, Vector3};
use serde::Deserialize;
use thiserror::Error;
use wgpu::util::DeviceExt;

use crate::{
    context::InitContext,
    data_structures::{
        instance::{Instance, InstanceRaw},
        library::{Lifecycle, LibraryError, Stage},
        mesh::DrawMesh,
    },
    libraries::{
        mesh::{MeshHandle, MeshLibrary},
        shader::{BindingKind, ShaderHandle, ShaderLibrary, VertexInput},
    },
    pipelines::light::{self, LightRaw, LightUniform, MAX_LIGHTS},
    render_data::RenderData,
};

#[derive(Debug, Error)]
pub enum SceneError {
    #[error("object `{object}` refers to unknown {kind} `{name}`")]
    Unresolved {
        kind: &'static str,
        object: String,
        name: String,
    },
    #[error("object `{object}` uses shader `{shader}` which cannot draw scene objects")]
    IncompatibleShader { object: String, shader: String },
    #[error("scene declares {count} lights, at most {max} are supported", max = MAX_LIGHTS)]
    TooManyLights { count: usize },
    #[error("scene `{0}` is declared twice")]
    Duplicate(String),
    #[error(transparent)]
    Library(#[from] LibraryError),
    #[error("invalid scene description: {0}")]
    Parse(#[from] serde_json::Error),
}

fn one() -> [f32; 3] {
    [1.0; 3]
}

fn white() -> [f32; 4] {
    [1.0; 4]
}

fn white_light() -> [f32; 3] {
    [1.0; 3]
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct SceneDescription {
    /// Extra meshes by identifier, each loaded from an OBJ file under `assets/`.
    #[serde(default)]
    pub meshes: BTreeMap<String, String>,
    #[serde(default)]
    pub objects: Vec<ObjectDescription>,
    #[serde(default)]
    pub lights: Vec<LightDescription>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ObjectDescription {
    pub name: String,
    pub mesh: String,
    pub shader: String,
    #[serde(default)]
    pub position: [f32; 3],
    #[serde(default = "one")]
    pub scale: [f32; 3],
    #[serde(default)]
    pub rotation: Option<RotationDescription>,
    #[serde(default = "white")]
    pub color: [f32; 4],
    /// Degrees per second around the world Y axis.
    #[serde(default)]
    pub spin: f32,
}

#[derive(Clone, Copy, Debug, Deserialize)]
pub struct RotationDescription {
    pub axis: [f32; 3],
    pub degrees: f32,
}

#[derive(Clone, Copy, Debug, Deserialize)]
pub struct LightDescription {
    pub position: [f32; 3],
    #[serde(default = "white_light")]
    pub color: [f32; 3],
}

impl SceneDescription {
    pub fn from_json(json: &str) -> Result<Self, SceneError> {
        Ok(serde_json::from_str(json)?)
    }
}

#[derive(Debug)]
struct SceneObject {
    name: String,
    instance: Instance,
    rotation: cgmath::Quaternion<f32>,
    spin: f32,
}

#[derive(Debug)]
struct Batch {
    mesh: MeshHandle,
    shader: ShaderHandle,
    uses_lights: bool,
    objects: Vec<usize>,
    instance_buffer: Option<wgpu::Buffer>,
}

#[derive(Debug)]
struct LightResources {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

#[derive(Debug)]
pub struct Scene {
    name: String,
    source_name: String,
    lifecycle: Lifecycle,
    objects: Vec<SceneObject>,
    batches: Vec<Batch>,
    lights: Vec<LightRaw>,
    light_resources: Option<LightResources>,
    dirty: bool,
}

impl Scene {
    /// Resolve every identifier of `description` against the libraries.
    ///
    /// Both libraries must have begun; neither has to be committed.
    pub fn build(
        name: &str,
        source_name: &str,
        description: &SceneDescription,
        meshes: &MeshLibrary,
        shaders: &ShaderLibrary,
    ) -> Result<Self, SceneError> {
        if description.lights.len() > MAX_LIGHTS {
            return Err(SceneError::TooManyLights {
                count: description.lights.len(),
            });
        }

        let mut objects = Vec::with_capacity(description.objects.len());
        let mut batches: Vec<Batch> = Vec::new();
        let mut batch_index: HashMap<(MeshHandle, ShaderHandle), usize> = HashMap::new();
        for (i, object) in description.objects.iter().enumerate() {
            let mesh = meshes
                .resolve(&object.mesh)
                .map_err(|e| unresolved(e, "mesh", object))?;
            let shader = shaders
                .resolve(&object.shader)
                .map_err(|e| unresolved(e, "shader", object))?;
            let program = shaders.description(shader);
            if program.vertex_input != VertexInput::MeshInstanced
                || program.bindings.contains(&BindingKind::VoxelLevel)
            {
                return Err(SceneError::IncompatibleShader {
                    object: object.name.clone(),
                    shader: object.shader.clone(),
                });
            }

            let rotation = match object.rotation {
                Some(r) if Vector3::from(r.axis).magnitude2() > 0.0 => {
                    cgmath::Quaternion::from_axis_angle(
                        Vector3::from(r.axis).normalize(),
                        Deg(r.degrees),
                    )
                }
                _ => cgmath::Quaternion::one(),
            };
            objects.push(SceneObject {
                name: object.name.clone(),
                instance: Instance {
                    position: object.position.into(),
                    rotation,
                    scale: object.scale.into(),
                    color: object.color,
                },
                rotation,
                spin: object.spin,
            });

            let slot = *batch_index.entry((mesh, shader)).or_insert_with(|| {
                batches.push(Batch {
                    mesh,
                    shader,
                    uses_lights: program.bindings.contains(&BindingKind::Light),
                    objects: Vec::new(),
                    instance_buffer: None,
                });
                batches.len() - 1
            });
            batches[slot].objects.push(i);
        }

        let mut lifecycle = Lifecycle::new("Scene");
        lifecycle.begin()?;
        Ok(Self {
            name: name.to_string(),
            source_name: source_name.to_string(),
            lifecycle,
            objects,
            batches,
            lights: description
                .lights
                .iter()
                .map(|l| LightRaw::new(l.position, l.color))
                .collect(),
            light_resources: None,
            dirty: true,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    pub fn stage(&self) -> Stage {
        self.lifecycle.stage()
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn light_count(&self) -> usize {
        self.lights.len()
    }

    /// Number of instanced draw calls issued per frame.
    pub fn batch_count(&self) -> usize {
        self.batches.len()
    }

    pub fn object_instance(&self, name: &str) -> Option<&Instance> {
        self.objects
            .iter()
            .find(|o| o.name == name)
            .map(|o| &o.instance)
    }

    /// Advance animation to the time staged in `render_data`. CPU only.
    pub fn display(&mut self, render_data: &RenderData) {
        let time = render_data.time();
        for object in self.objects.iter_mut().filter(|o| o.spin != 0.0) {
            object.instance.rotation =
                cgmath::Quaternion::from_angle_y(Deg(object.spin * time)) * object.rotation;
            self.dirty = true;
        }
    }

    fn instance_data(&self, batch: &Batch) -> Vec<InstanceRaw> {
        batch
            .objects
            .iter()
            .map(|&i| self.objects[i].instance.to_raw())
            .collect()
    }

    /// Upload instance buffers and lights. Requires committed mesh and shader libraries.
    pub fn commit_to_gpu(
        &mut self,
        gpu: &InitContext,
        meshes: &MeshLibrary,
        shaders: &ShaderLibrary,
    ) -> Result<(), LibraryError> {
        self.lifecycle.ensure_building()?;
        for batch in &self.batches {
            meshes.mesh(batch.mesh)?;
            shaders.program(batch.shader)?;
        }

        let buffers: Vec<wgpu::Buffer> = self
            .batches
            .iter()
            .map(|batch| {
                gpu.device
                    .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some(&format!("{} Instance Buffer", self.name)),
                        contents: bytemuck::cast_slice(&self.instance_data(batch)),
                        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                    })
            })
            .collect();
        for (batch, buffer) in self.batches.iter_mut().zip(buffers) {
            batch.instance_buffer = Some(buffer);
        }

        let buffer = light::mk_buffer(&gpu.device, LightUniform::new(&self.lights));
        let bind_group = light::mk_bind_group(&gpu.device, &buffer);
        self.light_resources = Some(LightResources { buffer, bind_group });
        self.dirty = false;
        self.lifecycle.commit()
    }

    /// Push instance data changed by [`Scene::display`].
    pub fn write_to_buffers(&mut self, queue: &wgpu::Queue) {
        if !self.dirty || self.lifecycle.stage() != Stage::Committed {
            return;
        }
        for batch in &self.batches {
            if let Some(buffer) = &batch.instance_buffer {
                queue.write_buffer(buffer, 0, bytemuck::cast_slice(&self.instance_data(batch)));
            }
        }
        self.dirty = false;
    }

    pub fn draw(
        &self,
        pass: &mut wgpu::RenderPass<'_>,
        meshes: &MeshLibrary,
        shaders: &ShaderLibrary,
        render_data: &RenderData,
    ) -> Result<(), LibraryError> {
        self.lifecycle.ensure_committed()?;
        pass.set_bind_group(0, render_data.bind_group()?, &[]);
        for batch in &self.batches {
            let (Some(instances), Some(lights)) = (&batch.instance_buffer, &self.light_resources)
            else {
                continue;
            };
            pass.set_pipeline(&shaders.program(batch.shader)?.pipeline);
            if batch.uses_lights {
                pass.set_bind_group(1, &lights.bind_group, &[]);
            }
            pass.set_vertex_buffer(1, instances.slice(..));
            pass.draw_mesh_instanced(meshes.mesh(batch.mesh)?, 0..batch.objects.len() as u32);
        }
        Ok(())
    }

    pub fn light_buffer(&self) -> Option<&wgpu::Buffer> {
        self.light_resources.as_ref().map(|l| &l.buffer)
    }
}

fn unresolved(error: LibraryError, kind: &'static str, object: &ObjectDescription) -> SceneError {
    match error {
        LibraryError::Unresolved { name, .. } => SceneError::Unresolved {
            kind,
            object: object.name.clone(),
            name,
        },
        other => SceneError::Library(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const JSON: &str = r#"{
        "objects": [
            { "name": "floor", "mesh": "plane", "shader": "scene_basic", "scale": [4, 1, 4] },
            { "name": "a", "mesh": "cube", "shader": "scene_basic", "spin": 90 },
            { "name": "b", "mesh": "cube", "shader": "scene_basic", "position": [2, 0, 0],
              "rotation": { "axis": [1, 0, 0], "degrees": 45 } }
        ],
        "lights": [ { "position": [2, 5, 2] } ]
    }"#;

    fn libraries() -> (MeshLibrary, ShaderLibrary) {
        let mut meshes = MeshLibrary::new();
        let mut shaders = ShaderLibrary::new();
        meshes.begin().unwrap();
        shaders.begin().unwrap();
        (meshes, shaders)
    }

    #[test]
    fn objects_sharing_mesh_and_shader_are_batched() {
        let (meshes, shaders) = libraries();
        let description = SceneDescription::from_json(JSON).unwrap();
        let scene = Scene::build("main", "demo.json", &description, &meshes, &shaders).unwrap();
        assert_eq!(scene.object_count(), 3);
        assert_eq!(scene.batch_count(), 2);
        assert_eq!(scene.light_count(), 1);
        assert_eq!(scene.stage(), Stage::Building);
        assert_eq!(scene.object_instance("floor").unwrap().scale.x, 4.0);
    }

    #[test]
    fn bundled_stage_builds() {
        let (mut meshes, shaders) = libraries();
        let description =
            SceneDescription::from_json(include_str!("../../assets/scenes/stage.json")).unwrap();
        let obj_meshes =
            futures::executor::block_on(crate::resources::load_scene_meshes(&description))
                .unwrap();
        for obj in &obj_meshes {
            meshes.declare_obj(&obj.name, &obj.models).unwrap();
        }
        let scene =
            Scene::build("main", "scenes/stage.json", &description, &meshes, &shaders).unwrap();
        assert_eq!(scene.object_count(), 4);
        assert_eq!(scene.light_count(), 2);
    }

    #[test]
    fn unknown_mesh_is_reported_by_name() {
        let (meshes, shaders) = libraries();
        let mut description = SceneDescription::from_json(JSON).unwrap();
        description.objects[1].mesh = "teapot".into();
        let err = Scene::build("main", "demo.json", &description, &meshes, &shaders).unwrap_err();
        match err {
            SceneError::Unresolved { kind, object, name } => {
                assert_eq!(kind, "mesh");
                assert_eq!(object, "a");
                assert_eq!(name, "teapot");
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn raycaster_cannot_draw_objects() {
        let (meshes, shaders) = libraries();
        let mut description = SceneDescription::from_json(JSON).unwrap();
        description.objects[0].shader = ShaderLibrary::VOXEL_RAYCASTER.into();
        assert!(matches!(
            Scene::build("main", "demo.json", &description, &meshes, &shaders),
            Err(SceneError::IncompatibleShader { .. })
        ));
    }

    #[test]
    fn too_many_lights() {
        let (meshes, shaders) = libraries();
        let description = SceneDescription {
            objects: vec![],
            meshes: BTreeMap::new(),
            lights: vec![
                LightDescription {
                    position: [0.0; 3],
                    color: [1.0; 3]
                };
                MAX_LIGHTS + 1
            ],
        };
        assert!(matches!(
            Scene::build("main", "", &description, &meshes, &shaders),
            Err(SceneError::TooManyLights { count: 5 })
        ));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        assert!(matches!(
            SceneDescription::from_json("{ \"objects\": 3 }"),
            Err(SceneError::Parse(_))
        ));
    }

    #[test]
    fn display_spins_objects() {
        let (meshes, shaders) = libraries();
        let description = SceneDescription::from_json(JSON).unwrap();
        let mut scene = Scene::build("main", "", &description, &meshes, &shaders).unwrap();
        let before = scene.object_instance("a").unwrap().rotation;
        // Uncommitted render data still carries the staged time.
        let render_data = RenderData::new();
        scene.display(&render_data);
        assert_eq!(scene.object_instance("a").unwrap().rotation, before);
        assert!(scene.dirty);
    }

    #[test]
    fn draw_requires_commit() {
        let (meshes, shaders) = libraries();
        let scene = Scene::build("main", "", &SceneDescription::default(), &meshes, &shaders).unwrap();
        assert!(matches!(
            scene.lifecycle.ensure_committed(),
            Err(LibraryError::NotCommitted { .. })
        ));
    }
}
