//! sparse-voxels
//!
//! A viewer for mip-mapped voxel textures built on a two-phase GPU resource
//! pipeline: every library first declares its resources on the CPU and then
//! commits them to the GPU in one fixed order. Two demo modes display the
//! selected mip level of a generated volume, one as instanced cubes and one
//! by raymarching a 3D texture.
//!
//! High-level modules
//! - `camera`: orbiting third-person camera
//! - `config`: start-up configuration of the viewer
//! - `context`: window, surface and device, plus a headless variant
//! - `data_structures`: lifecycles, meshes, instances, scenes, voxel grids
//! - `demos`: the demo modes and the selection state machine
//! - `engine`: orchestration of the resource libraries
//! - `flow`: application event loop
//! - `generator`: procedural and raw voxel texture presets
//! - `libraries`: mesh, shader and scene libraries
//! - `pipelines`: render pipeline helpers and WGSL sources
//! - `render_data`: the per-frame uniform record
//! - `resources`: asset loading for native and web
//!

pub mod camera;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod demos;
pub mod engine;
pub mod flow;
pub mod generator;
pub mod libraries;
pub mod pipelines;
pub mod render_data;
pub mod resources;

pub use config::DemoConfig;
pub use demos::DemoType;
pub use engine::CoreEngine;
pub use flow::run;
