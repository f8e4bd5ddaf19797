use crate::{demos::DemoType, generator::TexturePreset};

/// Start-up settings of the voxel viewer.
#[derive(Clone, Debug)]
pub struct DemoConfig {
    pub title: String,
    pub window_size: [u32; 2],
    /// Side of the cubic voxel grid at level 0.
    pub voxel_grid_length: u32,
    pub initial_texture: String,
    /// Keep every generated volume resident instead of regenerating on change.
    pub load_multiple_textures: bool,
    /// Build every demo mode up front and allow switching between them.
    pub load_all_demos: bool,
    pub initial_demo: DemoType,
    pub show_debug_output: bool,
    /// Seconds added to the per-frame time after each frame.
    pub frame_time_delta: f32,
    /// Density volume under `assets/` to register as an extra preset and select.
    pub raw_voxel_file: Option<String>,
    /// Scene description under `assets/` drawn below the active demo.
    pub scene_file: Option<String>,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            title: "Sparse Texture Voxels".to_string(),
            window_size: [600, 400],
            voxel_grid_length: 64,
            initial_texture: TexturePreset::SPHERE.to_string(),
            load_multiple_textures: true,
            load_all_demos: true,
            initial_demo: DemoType::DebugDraw,
            show_debug_output: false,
            frame_time_delta: 0.01,
            raw_voxel_file: Some("data/Bucky.raw".to_string()),
            scene_file: Some("scenes/stage.json".to_string()),
        }
    }
}
