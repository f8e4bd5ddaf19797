//! Orchestration of the resource libraries.
//!
//! [`CoreEngine::begin`] drives every library through its build phase and then
//! commits them in a fixed order:
//!
//! 1. shaders, render data, meshes and the scene library begin (CPU only)
//! 2. OBJ meshes are declared, then the scene is built from mesh and shader
//!    identifiers
//! 3. shaders and meshes are committed, then the scene, then render data
//!
//! Any ordering violation or unresolved identifier aborts `begin`.

use anyhow::Context as _;

use crate::{
    context::InitContext,
    data_structures::{library::Stage, scene::SceneDescription},
    libraries::{
        mesh::{MeshLibrary, ObjMesh},
        scene::{SceneId, SceneLibrary},
        shader::ShaderLibrary,
    },
    render_data::{PerFrameUniform, RenderData},
};

#[derive(Default)]
pub struct CoreEngine {
    meshes: MeshLibrary,
    shaders: ShaderLibrary,
    render_data: RenderData,
    scenes: SceneLibrary,
    scene: Option<SceneId>,
}

impl CoreEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare every library, build the scene `scene_id` and commit it all.
    ///
    /// `obj_meshes` are declared next to the built-in meshes before the scene
    /// resolves its identifiers.
    pub fn begin(
        &mut self,
        gpu: &InitContext,
        scene_id: &str,
        source_name: &str,
        description: &SceneDescription,
        obj_meshes: &[ObjMesh],
    ) -> anyhow::Result<()> {
        self.build(scene_id, source_name, description, obj_meshes)?;
        self.commit_to_gpu(gpu)
    }

    /// The CPU half of `begin`.
    fn build(
        &mut self,
        scene_id: &str,
        source_name: &str,
        description: &SceneDescription,
        obj_meshes: &[ObjMesh],
    ) -> anyhow::Result<()> {
        log::info!("CoreEngine: building resources");
        self.shaders.begin()?;
        self.render_data.begin()?;
        self.meshes.begin()?;
        self.scenes.begin()?;
        for obj in obj_meshes {
            self.meshes
                .declare_obj(&obj.name, &obj.models)
                .with_context(|| format!("declaring mesh `{}`", obj.name))?;
        }

        let scene = self
            .scenes
            .add_scene(
                &self.render_data,
                &self.meshes,
                &self.shaders,
                scene_id,
                source_name,
                description,
            )
            .with_context(|| format!("building scene `{scene_id}` from `{source_name}`"))?;
        self.scene = Some(scene);
        Ok(())
    }

    fn commit_to_gpu(&mut self, gpu: &InitContext) -> anyhow::Result<()> {
        log::info!("CoreEngine: committing resources to the GPU");
        self.shaders.commit_to_gpu(gpu)?;
        self.meshes.commit_to_gpu(gpu)?;
        self.scenes
            .commit_to_gpu(gpu, &self.meshes, &self.shaders)?;
        self.render_data.commit_to_gpu(&gpu.device)?;
        log::info!("CoreEngine: ready");
        Ok(())
    }

    /// Whether `begin` went through.
    pub fn is_committed(&self) -> bool {
        self.render_data.stage() == Stage::Committed
    }

    /// Advance the active scene to the current per-frame time.
    pub fn update_scene(&mut self, queue: &wgpu::Queue) {
        if let Some(id) = self.scene {
            let scene = self.scenes.get_mut(id);
            scene.display(&self.render_data);
            scene.write_to_buffers(queue);
        }
    }

    /// Replace the per-frame record.
    pub fn display(&mut self, queue: &wgpu::Queue, record: PerFrameUniform) -> anyhow::Result<()> {
        Ok(self.render_data.display(queue, record)?)
    }

    /// Draw the active scene.
    pub fn render(&self, pass: &mut wgpu::RenderPass<'_>) -> anyhow::Result<()> {
        if let Some(id) = self.scene {
            self.scenes
                .get(id)
                .draw(pass, &self.meshes, &self.shaders, &self.render_data)?;
        }
        Ok(())
    }

    pub fn meshes(&self) -> &MeshLibrary {
        &self.meshes
    }

    pub fn shaders(&self) -> &ShaderLibrary {
        &self.shaders
    }

    pub fn render_data(&self) -> &RenderData {
        &self.render_data
    }

    pub fn scenes(&self) -> &SceneLibrary {
        &self.scenes
    }

    pub fn active_scene(&self) -> Option<SceneId> {
        self.scene
    }
}
