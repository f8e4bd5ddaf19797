use std::collections::HashMap;

use crate::{
    context::InitContext,
    data_structures::{
        library::{Lifecycle, LibraryError, Stage},
        scene::{Scene, SceneDescription, SceneError},
    },
    libraries::{mesh::MeshLibrary, shader::ShaderLibrary},
    render_data::RenderData,
};

/// Index of a scene inside its [`SceneLibrary`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SceneId(usize);

/// Owns the scenes of an engine session. The engine only refers to them by [`SceneId`].
pub struct SceneLibrary {
    lifecycle: Lifecycle,
    scenes: Vec<Scene>,
    names: HashMap<String, SceneId>,
}

impl Default for SceneLibrary {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneLibrary {
    pub fn new() -> Self {
        Self {
            lifecycle: Lifecycle::new("SceneLibrary"),
            scenes: Vec::new(),
            names: HashMap::new(),
        }
    }

    pub fn stage(&self) -> Stage {
        self.lifecycle.stage()
    }

    pub fn begin(&mut self) -> Result<(), LibraryError> {
        self.lifecycle.begin()
    }

    /// Build a scene and keep it.
    ///
    /// Every identifier is resolved before anything is stored, so a failure
    /// leaves the library as it was.
    pub fn add_scene(
        &mut self,
        render_data: &RenderData,
        meshes: &MeshLibrary,
        shaders: &ShaderLibrary,
        scene_id: &str,
        source_name: &str,
        description: &SceneDescription,
    ) -> Result<SceneId, SceneError> {
        self.lifecycle.ensure_building()?;
        if render_data.stage() == Stage::Uninitialized {
            return Err(LibraryError::NotBegun {
                library: "RenderData",
            }
            .into());
        }
        if self.names.contains_key(scene_id) {
            return Err(SceneError::Duplicate(scene_id.to_string()));
        }
        let scene = Scene::build(scene_id, source_name, description, meshes, shaders)?;
        log::info!(
            "SceneLibrary: added `{}` from `{}` ({} objects, {} lights)",
            scene_id,
            source_name,
            scene.object_count(),
            scene.light_count()
        );
        let id = SceneId(self.scenes.len());
        self.scenes.push(scene);
        self.names.insert(scene_id.to_string(), id);
        Ok(id)
    }

    pub fn find(&self, scene_id: &str) -> Option<SceneId> {
        self.names.get(scene_id).copied()
    }

    pub fn get(&self, id: SceneId) -> &Scene {
        &self.scenes[id.0]
    }

    pub fn get_mut(&mut self, id: SceneId) -> &mut Scene {
        &mut self.scenes[id.0]
    }

    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }

    /// Commit every scene that is still building.
    pub fn commit_to_gpu(
        &mut self,
        gpu: &InitContext,
        meshes: &MeshLibrary,
        shaders: &ShaderLibrary,
    ) -> Result<(), LibraryError> {
        self.lifecycle.ensure_building()?;
        for scene in self
            .scenes
            .iter_mut()
            .filter(|s| s.stage() == Stage::Building)
        {
            scene.commit_to_gpu(gpu, meshes, shaders)?;
        }
        log::info!("SceneLibrary: committed {} scenes", self.scenes.len());
        self.lifecycle.commit()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_structures::scene::ObjectDescription;

    fn object(mesh: &str) -> ObjectDescription {
        ObjectDescription {
            name: "thing".into(),
            mesh: mesh.into(),
            shader: ShaderLibrary::SCENE_BASIC.into(),
            position: [0.0; 3],
            scale: [1.0; 3],
            rotation: None,
            color: [1.0; 4],
            spin: 0.0,
        }
    }

    fn begun() -> (RenderData, MeshLibrary, ShaderLibrary, SceneLibrary) {
        let mut render_data = RenderData::new();
        let mut meshes = MeshLibrary::new();
        let mut shaders = ShaderLibrary::new();
        let mut scenes = SceneLibrary::new();
        shaders.begin().unwrap();
        render_data.begin().unwrap();
        meshes.begin().unwrap();
        scenes.begin().unwrap();
        (render_data, meshes, shaders, scenes)
    }

    #[test]
    fn unresolved_mesh_stores_nothing() {
        let (render_data, meshes, shaders, mut scenes) = begun();
        let description = SceneDescription {
            objects: vec![object(MeshLibrary::CUBE), object("missing")],
            ..Default::default()
        };
        let err = scenes
            .add_scene(&render_data, &meshes, &shaders, "main", "main.json", &description)
            .unwrap_err();
        assert!(err.to_string().contains("missing"));
        assert!(scenes.is_empty());
        assert!(scenes.find("main").is_none());
    }

    #[test]
    fn scenes_are_found_by_id() {
        let (render_data, meshes, shaders, mut scenes) = begun();
        let description = SceneDescription {
            objects: vec![object(MeshLibrary::SPHERE)],
            ..Default::default()
        };
        let id = scenes
            .add_scene(&render_data, &meshes, &shaders, "main", "main.json", &description)
            .unwrap();
        assert_eq!(scenes.find("main"), Some(id));
        assert_eq!(scenes.get(id).source_name(), "main.json");
        assert!(matches!(
            scenes.add_scene(&render_data, &meshes, &shaders, "main", "again.json", &description),
            Err(SceneError::Duplicate(_))
        ));
    }

    #[test]
    fn add_scene_needs_begun_render_data() {
        let (_, meshes, shaders, mut scenes) = begun();
        let render_data = RenderData::new();
        assert!(matches!(
            scenes.add_scene(
                &render_data,
                &meshes,
                &shaders,
                "main",
                "",
                &SceneDescription::default()
            ),
            Err(SceneError::Library(LibraryError::NotBegun { .. }))
        ));
    }

    #[test]
    fn add_scene_needs_begin() {
        let (render_data, meshes, shaders, _) = begun();
        let mut scenes = SceneLibrary::new();
        assert!(matches!(
            scenes.add_scene(
                &render_data,
                &meshes,
                &shaders,
                "main",
                "",
                &SceneDescription::default()
            ),
            Err(SceneError::Library(LibraryError::NotBegun { .. }))
        ));
    }
}
