//! The voxel viewer's state machine.
//!
//! [`VoxelDemo`] owns the texture generator, the [`Selection`] and the set of
//! loaded demo modes. Commands are applied synchronously: a command that
//! changes the level or the texture rebuilds every loaded mode before
//! returning, and [`VoxelDemo::prepare`] uploads those rebuilds before the
//! next render.

use crate::{
    config::DemoConfig,
    context::InitContext,
    data_structures::voxel::mip_level_count,
    demos::{
        Demo, DemoType, LevelDescriptor,
        selection::{DemoCommand, Selection},
    },
    engine::CoreEngine,
    generator::{RawVolume, VoxelTextureGenerator},
};

pub struct VoxelDemo {
    load_all_demos: bool,
    generator: VoxelTextureGenerator,
    selection: Selection,
    demos: Vec<Demo>,
}

impl VoxelDemo {
    /// Generate the initial texture and build the demo modes at level 0.
    ///
    /// `raw` is an optional `(name, volume)` registered as an extra preset
    /// and selected.
    pub fn begin(config: &DemoConfig, raw: Option<(String, RawVolume)>) -> anyhow::Result<Self> {
        let mip_levels = mip_level_count(config.voxel_grid_length);
        let mut generator = VoxelTextureGenerator::new();
        generator.begin(
            config.voxel_grid_length,
            mip_levels,
            config.load_multiple_textures,
        );
        let initial_known = generator
            .preset_names()
            .any(|name| name == config.initial_texture);
        if initial_known {
            generator.set_texture(&config.initial_texture);
        } else {
            log::warn!(
                "initial texture `{}` is not one of [{}], starting with `{}`",
                config.initial_texture,
                generator.preset_names().collect::<Vec<_>>().join(", "),
                generator.current_name().unwrap_or_default()
            );
        }
        if let Some((name, volume)) = raw {
            generator.add_raw_preset(&name, volume)?;
            generator.set_texture(&name);
        }

        let mut selection = Selection::new(
            mip_levels,
            generator.preset_count(),
            config.initial_demo,
        );
        selection.set_preset(generator.current_index());

        let loaded: Vec<DemoType> = if config.load_all_demos {
            DemoType::ALL.to_vec()
        } else {
            vec![config.initial_demo]
        };
        let mut demo = Self {
            load_all_demos: config.load_all_demos,
            generator,
            selection,
            demos: loaded.into_iter().map(Demo::new).collect(),
        };
        demo.rebuild_all(Some(0));
        log::info!(
            "voxel demo: {} levels, texture `{}`, demos {:?}",
            mip_levels,
            demo.generator.current_name().unwrap_or_default(),
            demo.loaded()
        );
        Ok(demo)
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn generator(&self) -> &VoxelTextureGenerator {
        &self.generator
    }

    pub fn loaded(&self) -> Vec<DemoType> {
        self.demos.iter().map(Demo::demo_type).collect()
    }

    pub fn demo(&self, demo_type: DemoType) -> Option<&Demo> {
        self.demos.iter().find(|d| d.demo_type() == demo_type)
    }

    pub fn descriptor(&self, demo_type: DemoType) -> Option<LevelDescriptor> {
        self.demo(demo_type).map(Demo::descriptor)
    }

    /// Apply one input command. Returns whether the selection changed.
    pub fn apply(&mut self, command: DemoCommand) -> bool {
        match command {
            DemoCommand::SelectDemo(ordinal) => {
                if !self.load_all_demos {
                    return false;
                }
                match DemoType::from_ordinal(ordinal) {
                    Some(demo_type) => self.selection.select_demo(demo_type),
                    None => false,
                }
            }
            DemoCommand::NextMipLevel | DemoCommand::PreviousMipLevel => {
                let changed = if command == DemoCommand::NextMipLevel {
                    self.selection.next_mip_level()
                } else {
                    self.selection.previous_mip_level()
                };
                if changed {
                    self.rebuild_all(Some(self.selection.mip_level()));
                }
                changed
            }
            DemoCommand::NextTexture | DemoCommand::PreviousTexture => {
                let changed = if command == DemoCommand::NextTexture {
                    self.selection.next_preset()
                } else {
                    self.selection.previous_preset()
                };
                if changed {
                    self.generator.set_texture_index(self.selection.preset());
                    self.rebuild_all(None);
                }
                changed
            }
        }
    }

    /// Select a preset by name, rebuilding every loaded mode on change.
    pub fn set_texture(&mut self, name: &str) -> bool {
        if !self.generator.set_texture(name) {
            return false;
        }
        self.selection.set_preset(self.generator.current_index());
        self.rebuild_all(None);
        true
    }

    /// Register a density volume as an extra preset.
    pub fn add_raw_preset(&mut self, name: &str, volume: RawVolume) -> anyhow::Result<()> {
        self.generator.add_raw_preset(name, volume)?;
        self.selection.set_preset_count(self.generator.preset_count());
        Ok(())
    }

    /// Rebuild every loaded mode, at `level` or at the level each one keeps.
    fn rebuild_all(&mut self, level: Option<u32>) {
        let Some(texture) = self.generator.voxel_texture() else {
            return;
        };
        for demo in &mut self.demos {
            match level {
                Some(level) => demo.rebuild_for_level(texture, level),
                None => demo.rebuild_for_texture(texture),
            }
        }
    }

    /// Upload the current texture and every pending rebuild.
    pub fn prepare(&mut self, gpu: &InitContext) -> anyhow::Result<()> {
        let voxels = self.generator.prepare(gpu)?;
        for demo in &mut self.demos {
            demo.prepare(gpu, voxels);
        }
        Ok(())
    }

    /// Draw the selected mode.
    pub fn render(&self, pass: &mut wgpu::RenderPass<'_>, engine: &CoreEngine) -> anyhow::Result<()> {
        match self.demo(self.selection.demo()) {
            Some(demo) => demo.render(pass, engine),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::TexturePreset;

    fn config() -> DemoConfig {
        DemoConfig {
            voxel_grid_length: 16,
            raw_voxel_file: None,
            ..Default::default()
        }
    }

    #[test]
    fn level_changes_rebuild_every_loaded_demo() {
        let mut demo = VoxelDemo::begin(&config(), None).unwrap();
        assert_eq!(demo.loaded(), DemoType::ALL.to_vec());
        assert!(demo.apply(DemoCommand::NextMipLevel));
        for demo_type in DemoType::ALL {
            let descriptor = demo.descriptor(demo_type).unwrap();
            assert_eq!(descriptor.level, 1);
            assert_eq!(descriptor.dims, [8, 8, 8]);
        }
        assert!(demo.demo(DemoType::VoxelRaycaster).unwrap().needs_upload());
    }

    #[test]
    fn single_demo_ignores_demo_selection() {
        let config = DemoConfig {
            load_all_demos: false,
            initial_demo: DemoType::VoxelRaycaster,
            ..config()
        };
        let mut demo = VoxelDemo::begin(&config, None).unwrap();
        assert_eq!(demo.loaded(), vec![DemoType::VoxelRaycaster]);
        assert!(!demo.apply(DemoCommand::SelectDemo(0)));
        assert_eq!(demo.selection().demo(), DemoType::VoxelRaycaster);
        assert!(demo.descriptor(DemoType::DebugDraw).is_none());
    }

    #[test]
    fn demo_selection_keeps_resources() {
        let mut demo = VoxelDemo::begin(&config(), None).unwrap();
        let before = demo.descriptor(DemoType::VoxelRaycaster);
        assert!(demo.apply(DemoCommand::SelectDemo(1)));
        assert!(!demo.apply(DemoCommand::SelectDemo(1)));
        assert!(!demo.apply(DemoCommand::SelectDemo(5)));
        assert_eq!(demo.descriptor(DemoType::VoxelRaycaster), before);
    }

    #[test]
    fn raw_volume_is_selected_at_start() {
        let volume = RawVolume::from_bytes(vec![255; 8]).unwrap();
        let demo = VoxelDemo::begin(&config(), Some(("data/cube.raw".into(), volume))).unwrap();
        assert_eq!(demo.generator().current_name(), Some("data/cube.raw"));
        assert_eq!(demo.selection().preset_count(), 5);
        assert_eq!(demo.selection().preset(), 4);
        let descriptor = demo.descriptor(DemoType::DebugDraw).unwrap();
        assert_eq!(descriptor.instance_count, 16 * 16 * 16);
    }

    #[test]
    fn unknown_initial_texture_falls_back_to_the_first_preset() {
        let config = DemoConfig {
            initial_texture: "teapot".into(),
            ..config()
        };
        let demo = VoxelDemo::begin(&config, None).unwrap();
        assert_eq!(demo.generator().current_name(), Some(TexturePreset::SPHERE));
        assert_eq!(demo.selection().preset(), 0);
    }

    #[test]
    fn initial_texture_is_selected_by_name() {
        let config = DemoConfig {
            initial_texture: TexturePreset::TORUS.into(),
            ..config()
        };
        let demo = VoxelDemo::begin(&config, None).unwrap();
        assert_eq!(demo.generator().current_name(), Some(TexturePreset::TORUS));
        assert_eq!(demo.selection().preset(), demo.generator().current_index());
    }

    #[test]
    fn set_texture_by_name_keeps_the_level() {
        let mut demo = VoxelDemo::begin(&config(), None).unwrap();
        demo.apply(DemoCommand::NextMipLevel);
        assert!(demo.set_texture(TexturePreset::TORUS));
        let descriptor = demo.descriptor(DemoType::DebugDraw).unwrap();
        assert_eq!(descriptor.level, 1);
        assert_eq!(
            descriptor.texture_id,
            demo.generator().voxel_texture().unwrap().id()
        );
    }
}
