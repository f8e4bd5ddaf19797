//! Resource libraries sharing the two-phase (declare, then commit) lifecycle.
//!
//! - `mesh` owns vertex/index data and, once committed, the GPU buffers
//! - `shader` owns program declarations and, once committed, render pipelines
//! - `scene` owns scenes built from mesh and shader identifiers
//!
//! See [`crate::engine::CoreEngine`] for the order in which they are driven.

pub mod mesh;
pub mod scene;
pub mod shader;
