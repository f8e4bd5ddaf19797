//! Render pipeline construction and the built-in WGSL programs.
//!
//! - `basic` builds a render pipeline from a layout, vertex layouts and a shader
//! - `light` holds the light uniform shared by scene shaders
//!
//! The `*.wgsl` sources in this directory are handed to the shader library by
//! identifier; nothing else in the crate reads shader text.

pub mod basic;
pub mod light;

pub const SCENE_BASIC_WGSL: &str = include_str!("scene_basic.wgsl");
pub const DEBUG_DRAW_WGSL: &str = include_str!("debug_draw.wgsl");
pub const VOXEL_RAYCASTER_WGSL: &str = include_str!("voxel_raycaster.wgsl");
