//! Voxel volumes from named presets.
//!
//! The generator keeps an ordered list of presets and a current selection.
//! Changing the selection regenerates the volume together with its mip chain;
//! with `load_multiple` set every generated volume (and its GPU upload) is
//! kept so switching back is free.

use std::collections::HashMap;

use anyhow::bail;

use crate::{
    context::InitContext,
    data_structures::{
        library::LibraryError,
        texture::GpuVoxelTexture,
        voxel::{Voxel, VoxelGrid, VoxelTexture},
    },
};

/// 8-bit density samples of a cubic volume, x fastest.
#[derive(Clone, Debug, PartialEq)]
pub struct RawVolume {
    length: u32,
    density: Vec<u8>,
}

impl RawVolume {
    /// Interpret `bytes` as a cube of densities. The side is inferred from the length.
    pub fn from_bytes(bytes: Vec<u8>) -> anyhow::Result<Self> {
        let length = (bytes.len() as f64).cbrt().round() as u32;
        if length == 0 || (length as usize).pow(3) != bytes.len() {
            bail!("{} bytes do not form a cubic volume", bytes.len());
        }
        Ok(Self {
            length,
            density: bytes,
        })
    }

    pub fn length(&self) -> u32 {
        self.length
    }

    /// Nearest sample at `p` in `[0, 1]^3`.
    fn sample(&self, p: [f32; 3]) -> u8 {
        let n = self.length;
        let [x, y, z] = p.map(|c| ((c * n as f32) as u32).min(n - 1) as usize);
        let n = n as usize;
        self.density[x + n * (y + n * z)]
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum TexturePreset {
    Sphere,
    /// A solid box with a spherical cavity.
    Cube,
    Torus,
    MengerSponge,
    /// Density data registered at runtime, usually loaded from a file.
    Raw { name: String, volume: RawVolume },
}

impl TexturePreset {
    pub const SPHERE: &'static str = "sphere";
    pub const CUBE: &'static str = "cube";
    pub const TORUS: &'static str = "torus";
    pub const MENGER_SPONGE: &'static str = "menger_sponge";

    pub fn builtin() -> Vec<TexturePreset> {
        vec![
            TexturePreset::Sphere,
            TexturePreset::Cube,
            TexturePreset::Torus,
            TexturePreset::MengerSponge,
        ]
    }

    pub fn name(&self) -> &str {
        match self {
            TexturePreset::Sphere => Self::SPHERE,
            TexturePreset::Cube => Self::CUBE,
            TexturePreset::Torus => Self::TORUS,
            TexturePreset::MengerSponge => Self::MENGER_SPONGE,
            TexturePreset::Raw { name, .. } => name,
        }
    }

    /// Evaluate the preset at a point of the unit cube.
    pub fn sample(&self, p: [f32; 3]) -> Voxel {
        let [x, y, z] = p;
        let tint = |a: u8| [(x * 255.0) as u8, (y * 255.0) as u8, (z * 255.0) as u8, a];
        match self {
            TexturePreset::Sphere => {
                let d = length([x - 0.5, y - 0.5, z - 0.5]);
                if d <= 0.4 { tint(255) } else { [0; 4] }
            }
            TexturePreset::Cube => {
                let inside = p.iter().all(|c| (0.15..=0.85).contains(c));
                let cavity = length([x - 0.5, y - 0.5, z - 0.5]) < 0.3;
                if inside && !cavity {
                    [230, 140, 40, 255]
                } else {
                    [0; 4]
                }
            }
            TexturePreset::Torus => {
                let ring = length([x - 0.5, 0.0, z - 0.5]) - 0.3;
                if length([ring, y - 0.5, 0.0]) <= 0.12 {
                    tint(255)
                } else {
                    [0; 4]
                }
            }
            TexturePreset::MengerSponge => {
                if in_menger_sponge(p, 4) {
                    [200, 200, 220, 255]
                } else {
                    [0; 4]
                }
            }
            TexturePreset::Raw { volume, .. } => {
                let d = volume.sample(p);
                [d, d, d, d]
            }
        }
    }
}

fn length(v: [f32; 3]) -> f32 {
    (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
}

fn in_menger_sponge(p: [f32; 3], depth: u32) -> bool {
    let mut q = p;
    for _ in 0..depth {
        let digits = q.map(|c| ((c * 3.0) as u32).min(2));
        if digits.iter().filter(|&&d| d == 1).count() >= 2 {
            return false;
        }
        q = [0, 1, 2].map(|i| q[i] * 3.0 - digits[i] as f32);
    }
    true
}

#[derive(Default)]
pub struct VoxelTextureGenerator {
    grid_length: u32,
    mip_levels: u32,
    load_multiple: bool,
    begun: bool,
    presets: Vec<TexturePreset>,
    current: usize,
    textures: HashMap<usize, VoxelTexture>,
    uploads: HashMap<usize, GpuVoxelTexture>,
    next_id: u64,
}

impl VoxelTextureGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the built-in presets and generate the first one.
    pub fn begin(&mut self, grid_length: u32, mip_levels: u32, load_multiple: bool) {
        self.grid_length = grid_length.max(1);
        self.mip_levels = mip_levels.max(1);
        self.load_multiple = load_multiple;
        self.presets = TexturePreset::builtin();
        self.textures.clear();
        self.uploads.clear();
        self.current = 0;
        self.begun = true;
        if load_multiple {
            for index in 0..self.presets.len() {
                self.generate(index);
            }
        } else {
            self.generate(0);
        }
    }

    pub fn grid_length(&self) -> u32 {
        self.grid_length
    }

    pub fn mip_level_count(&self) -> u32 {
        self.mip_levels
    }

    pub fn preset_count(&self) -> usize {
        self.presets.len()
    }

    pub fn preset_names(&self) -> impl Iterator<Item = &str> {
        self.presets.iter().map(TexturePreset::name)
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_name(&self) -> Option<&str> {
        self.presets.get(self.current).map(TexturePreset::name)
    }

    /// Register a density volume as an extra preset. Re-adding a name replaces it.
    pub fn add_raw_preset(&mut self, name: &str, volume: RawVolume) -> Result<usize, LibraryError> {
        if !self.begun {
            return Err(LibraryError::NotBegun {
                library: "VoxelTextureGenerator",
            });
        }
        let preset = TexturePreset::Raw {
            name: name.to_string(),
            volume,
        };
        let index = match self.presets.iter().position(|p| p.name() == name) {
            Some(index) => {
                self.presets[index] = preset;
                self.textures.remove(&index);
                self.uploads.remove(&index);
                index
            }
            None => {
                self.presets.push(preset);
                self.presets.len() - 1
            }
        };
        if self.load_multiple || index == self.current {
            self.generate(index);
        }
        Ok(index)
    }

    /// Select a preset by name. Unknown names leave the selection alone.
    pub fn set_texture(&mut self, name: &str) -> bool {
        match self.presets.iter().position(|p| p.name() == name) {
            Some(index) => self.set_texture_index(index),
            None => {
                log::warn!("unknown voxel texture preset `{name}`");
                false
            }
        }
    }

    /// Select a preset by position in the list, wrapping around.
    pub fn set_texture_index(&mut self, index: usize) -> bool {
        if !self.begun || self.presets.is_empty() {
            return false;
        }
        let index = index % self.presets.len();
        if index == self.current {
            return false;
        }
        self.current = index;
        if !self.load_multiple {
            self.textures.clear();
            self.uploads.clear();
        }
        if !self.textures.contains_key(&index) {
            self.generate(index);
        }
        log::info!("voxel texture: {}", self.presets[index].name());
        true
    }

    pub fn set_next_texture(&mut self) -> bool {
        self.set_texture_index(self.current + 1)
    }

    pub fn set_previous_texture(&mut self) -> bool {
        let count = self.presets.len().max(1);
        self.set_texture_index(self.current + count - 1)
    }

    fn generate(&mut self, index: usize) {
        let preset = &self.presets[index];
        let base = VoxelGrid::from_fn(self.grid_length, |p| preset.sample(p));
        self.next_id += 1;
        let texture = VoxelTexture::new(self.next_id, preset.name(), base, self.mip_levels);
        log::debug!(
            "generated `{}`: {} levels, {} occupied voxels",
            texture.name(),
            texture.mip_level_count(),
            texture.level(0).occupied()
        );
        self.textures.insert(index, texture);
    }

    /// The volume of the current preset, `None` before `begin`.
    pub fn voxel_texture(&self) -> Option<&VoxelTexture> {
        self.textures.get(&self.current)
    }

    /// Make sure the current volume is on the GPU and return it.
    pub fn prepare(&mut self, gpu: &InitContext) -> Result<&GpuVoxelTexture, LibraryError> {
        let texture = self
            .textures
            .get(&self.current)
            .ok_or(LibraryError::NotBegun {
                library: "VoxelTextureGenerator",
            })?;
        let stale = self
            .uploads
            .get(&self.current)
            .is_none_or(|upload| upload.source_id() != texture.id());
        if stale {
            let upload = GpuVoxelTexture::upload(&gpu.device, &gpu.queue, texture);
            self.uploads.insert(self.current, upload);
        }
        self.uploads
            .get(&self.current)
            .ok_or(LibraryError::NotBegun {
                library: "VoxelTextureGenerator",
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preset_cycle_is_a_closed_loop() {
        let mut generator = VoxelTextureGenerator::new();
        generator.begin(16, 5, true);
        let start = generator.current_name().unwrap().to_string();
        let count = generator.preset_count();
        for _ in 0..count {
            assert!(generator.set_next_texture());
        }
        assert_eq!(generator.current_name().unwrap(), start);
        for _ in 0..count {
            assert!(generator.set_previous_texture());
        }
        assert_eq!(generator.current_name().unwrap(), start);
    }

    #[test]
    fn previous_from_first_wraps_to_last() {
        let mut generator = VoxelTextureGenerator::new();
        generator.begin(8, 4, false);
        assert!(generator.set_previous_texture());
        assert_eq!(
            generator.current_name(),
            Some(TexturePreset::MENGER_SPONGE)
        );
    }

    #[test]
    fn changing_preset_regenerates_the_chain() {
        let mut generator = VoxelTextureGenerator::new();
        generator.begin(16, 5, false);
        let first = generator.voxel_texture().unwrap().id();
        assert!(generator.set_texture(TexturePreset::TORUS));
        let torus = generator.voxel_texture().unwrap();
        assert_ne!(torus.id(), first);
        assert_eq!(torus.name(), TexturePreset::TORUS);
        assert_eq!(torus.mip_level_count(), 5);
        assert!(!generator.set_texture(TexturePreset::TORUS));
        assert!(!generator.set_texture("teapot"));
    }

    #[test]
    fn nothing_happens_before_begin() {
        let mut generator = VoxelTextureGenerator::new();
        assert!(!generator.set_next_texture());
        assert!(generator.voxel_texture().is_none());
        assert!(
            generator
                .add_raw_preset("x", RawVolume::from_bytes(vec![1; 8]).unwrap())
                .is_err()
        );
    }

    #[test]
    fn raw_volumes_are_resampled() {
        let mut bytes = vec![0u8; 8];
        bytes[7] = 200;
        let volume = RawVolume::from_bytes(bytes).unwrap();
        assert_eq!(volume.length(), 2);
        let mut generator = VoxelTextureGenerator::new();
        generator.begin(4, 3, true);
        let index = generator.add_raw_preset("data/tiny.raw", volume).unwrap();
        assert!(generator.set_texture("data/tiny.raw"));
        assert_eq!(generator.current_index(), index);
        let texture = generator.voxel_texture().unwrap();
        assert_eq!(texture.level(0).get(3, 3, 3), [200; 4]);
        assert_eq!(texture.level(0).get(0, 0, 0), [0; 4]);
        assert_eq!(texture.level(0).occupied(), 8);
    }

    #[test]
    fn non_cubic_raw_data_is_rejected() {
        assert!(RawVolume::from_bytes(vec![0; 10]).is_err());
        assert!(RawVolume::from_bytes(vec![]).is_err());
    }

    #[test]
    fn presets_are_not_empty() {
        for preset in TexturePreset::builtin() {
            let grid = VoxelGrid::from_fn(16, |p| preset.sample(p));
            assert!(grid.occupied() > 0, "{} is empty", preset.name());
            assert!(grid.occupied() < 16 * 16 * 16, "{} is full", preset.name());
        }
    }

    #[test]
    fn menger_sponge_has_holes() {
        assert!(in_menger_sponge([0.1, 0.1, 0.1], 3));
        assert!(!in_menger_sponge([0.5, 0.5, 0.1], 3));
    }
}
