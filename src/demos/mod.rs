//! Interchangeable visualisations of the active voxel texture.
//!
//! Each mode derives its own GPU resources from a single mip level. A rebuild
//! updates the CPU side immediately and marks the mode dirty; [`Demo::prepare`]
//! uploads the result before the frame that samples it is rendered.

pub mod debug_draw;
pub mod selection;
pub mod voxel_demo;
pub mod voxel_raycaster;

use std::fmt;

use crate::{
    context::InitContext, data_structures::texture::GpuVoxelTexture,
    data_structures::voxel::VoxelTexture, engine::CoreEngine,
};

pub use debug_draw::DebugDraw;
pub use voxel_raycaster::VoxelRaycaster;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DemoType {
    DebugDraw,
    VoxelRaycaster,
}

impl DemoType {
    pub const ALL: [DemoType; 2] = [DemoType::DebugDraw, DemoType::VoxelRaycaster];

    pub fn ordinal(self) -> usize {
        match self {
            DemoType::DebugDraw => 0,
            DemoType::VoxelRaycaster => 1,
        }
    }

    pub fn from_ordinal(ordinal: usize) -> Option<Self> {
        Self::ALL.get(ordinal).copied()
    }
}

impl fmt::Display for DemoType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DemoType::DebugDraw => f.write_str("debug draw"),
            DemoType::VoxelRaycaster => f.write_str("voxel raycaster"),
        }
    }
}

/// What a demo mode currently derives its resources from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LevelDescriptor {
    pub level: u32,
    pub dims: [u32; 3],
    pub texture_id: u64,
    /// Instances drawn per frame.
    pub instance_count: u32,
}

#[derive(Debug)]
pub enum Demo {
    DebugDraw(DebugDraw),
    VoxelRaycaster(VoxelRaycaster),
}

impl Demo {
    pub fn new(demo_type: DemoType) -> Self {
        match demo_type {
            DemoType::DebugDraw => Demo::DebugDraw(DebugDraw::new()),
            DemoType::VoxelRaycaster => Demo::VoxelRaycaster(VoxelRaycaster::new()),
        }
    }

    pub fn demo_type(&self) -> DemoType {
        match self {
            Demo::DebugDraw(_) => DemoType::DebugDraw,
            Demo::VoxelRaycaster(_) => DemoType::VoxelRaycaster,
        }
    }

    /// Switch to `level` of `texture`.
    pub fn rebuild_for_level(&mut self, texture: &VoxelTexture, level: u32) {
        match self {
            Demo::DebugDraw(demo) => demo.rebuild(texture, level),
            Demo::VoxelRaycaster(demo) => demo.rebuild(texture, level),
        }
    }

    /// Switch to a new texture, keeping the current level.
    pub fn rebuild_for_texture(&mut self, texture: &VoxelTexture) {
        let level = self.descriptor().level;
        self.rebuild_for_level(texture, level);
    }

    /// Whether a rebuild is waiting for [`Demo::prepare`].
    pub fn needs_upload(&self) -> bool {
        match self {
            Demo::DebugDraw(demo) => demo.needs_upload(),
            Demo::VoxelRaycaster(demo) => demo.needs_upload(),
        }
    }

    pub fn prepare(&mut self, gpu: &InitContext, voxels: &GpuVoxelTexture) {
        match self {
            Demo::DebugDraw(demo) => demo.prepare(gpu),
            Demo::VoxelRaycaster(demo) => demo.prepare(gpu, voxels),
        }
    }

    pub fn render(&self, pass: &mut wgpu::RenderPass<'_>, engine: &CoreEngine) -> anyhow::Result<()> {
        if self.needs_upload() {
            anyhow::bail!("{} rendered before its rebuild was uploaded", self.demo_type());
        }
        match self {
            Demo::DebugDraw(demo) => demo.render(pass, engine),
            Demo::VoxelRaycaster(demo) => demo.render(pass, engine),
        }
    }

    pub fn descriptor(&self) -> LevelDescriptor {
        match self {
            Demo::DebugDraw(demo) => demo.descriptor(),
            Demo::VoxelRaycaster(demo) => demo.descriptor(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_structures::voxel::VoxelGrid;

    fn texture() -> VoxelTexture {
        let base = VoxelGrid::from_fn(8, |p| if p[0] < 0.5 { [255; 4] } else { [0; 4] });
        VoxelTexture::new(7, "half", base, 4)
    }

    #[test]
    fn ordinals_round_trip() {
        for demo_type in DemoType::ALL {
            assert_eq!(DemoType::from_ordinal(demo_type.ordinal()), Some(demo_type));
        }
        assert_eq!(DemoType::from_ordinal(2), None);
    }

    #[test]
    fn texture_rebuild_keeps_the_level() {
        let texture = texture();
        for demo_type in DemoType::ALL {
            let mut demo = Demo::new(demo_type);
            demo.rebuild_for_level(&texture, 2);
            demo.rebuild_for_texture(&texture);
            let descriptor = demo.descriptor();
            assert_eq!(descriptor.level, 2);
            assert_eq!(descriptor.dims, [2, 2, 2]);
            assert_eq!(descriptor.texture_id, 7);
            assert!(demo.needs_upload());
        }
    }
}
