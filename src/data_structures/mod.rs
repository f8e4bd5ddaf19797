//! Engine data structures: lifecycles, meshes, instances, scenes and voxels.
//!
//! - `library` holds the two-phase lifecycle and the generic handle library
//! - `mesh` contains mesh descriptions and their GPU buffers
//! - `instance` holds per-instance transformation and colour data
//! - `scene` describes and builds a scene of instanced objects and lights
//! - `texture` wraps depth and 3D voxel textures on the GPU
//! - `voxel` contains the CPU voxel grid and its mip chain

pub mod instance;
pub mod library;
pub mod mesh;
pub mod scene;
pub mod texture;
pub mod voxel;
