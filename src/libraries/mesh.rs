use crate::{
    context::InitContext,
    data_structures::{
        library::{Handle, Library, LibraryError, Stage},
        mesh::{GpuMesh, MeshDescription},
    },
};

pub type MeshHandle = Handle<MeshDescription>;

/// Models parsed from one OBJ file, to be declared under `name`.
#[derive(Clone, Debug)]
pub struct ObjMesh {
    pub name: String,
    pub models: Vec<tobj::Model>,
}

/// Owns every mesh of an engine session.
///
/// `begin` declares the built-in primitives; further meshes may be declared
/// until `commit_to_gpu` uploads all of them at once.
pub struct MeshLibrary {
    library: Library<MeshDescription, GpuMesh>,
}

impl Default for MeshLibrary {
    fn default() -> Self {
        Self::new()
    }
}

impl MeshLibrary {
    pub const CUBE: &'static str = "cube";
    pub const PLANE: &'static str = "plane";
    pub const SPHERE: &'static str = "sphere";

    pub fn new() -> Self {
        Self {
            library: Library::new("MeshLibrary"),
        }
    }

    pub fn stage(&self) -> Stage {
        self.library.stage()
    }

    pub fn begin(&mut self) -> Result<(), LibraryError> {
        if self.library.stage() == Stage::Building {
            return Ok(());
        }
        self.library.begin()?;
        self.library.declare(Self::CUBE, MeshDescription::cube())?;
        self.library.declare(Self::PLANE, MeshDescription::plane())?;
        self.library.declare(Self::SPHERE, MeshDescription::sphere(16, 24))?;
        Ok(())
    }

    pub fn declare(
        &mut self,
        name: &str,
        description: MeshDescription,
    ) -> Result<MeshHandle, LibraryError> {
        self.library.declare(name, description)
    }

    /// Declare a mesh from models loaded with [`crate::resources::load_obj_meshes`].
    pub fn declare_obj(
        &mut self,
        name: &str,
        models: &[tobj::Model],
    ) -> Result<MeshHandle, LibraryError> {
        self.library
            .declare(name, MeshDescription::from_obj_models(models))
    }

    pub fn resolve(&self, name: &str) -> Result<MeshHandle, LibraryError> {
        self.library.resolve(name)
    }

    pub fn description(&self, handle: MeshHandle) -> &MeshDescription {
        self.library.description(handle)
    }

    pub fn len(&self) -> usize {
        self.library.len()
    }

    pub fn is_empty(&self) -> bool {
        self.library.is_empty()
    }

    pub fn commit_to_gpu(&mut self, gpu: &InitContext) -> Result<(), LibraryError> {
        let device = &gpu.device;
        self.library
            .commit(|name, description| description.upload(device, name))?;
        log::info!("MeshLibrary: committed {} meshes", self.library.len());
        Ok(())
    }

    pub fn mesh(&self, handle: MeshHandle) -> Result<&GpuMesh, LibraryError> {
        self.library.resident(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn begin_declares_primitives_once() {
        let mut meshes = MeshLibrary::new();
        meshes.begin().unwrap();
        meshes.begin().unwrap();
        assert_eq!(meshes.len(), 3);
        let cube = meshes.resolve(MeshLibrary::CUBE).unwrap();
        assert_eq!(meshes.description(cube).indices.len(), 36);
    }

    #[test]
    fn custom_meshes_need_begin() {
        let mut meshes = MeshLibrary::new();
        assert!(matches!(
            meshes.declare("tri", MeshDescription::default()).unwrap_err(),
            LibraryError::NotBegun { .. }
        ));
        meshes.begin().unwrap();
        let tri = meshes.declare("tri", MeshDescription::plane()).unwrap();
        assert_eq!(meshes.resolve("tri").unwrap(), tri);
        assert!(meshes.mesh(tri).is_err());
    }
}
