use sparse_voxels::{
    DemoConfig, DemoType,
    demos::{selection::DemoCommand, voxel_demo::VoxelDemo},
    generator::TexturePreset,
};

fn config() -> DemoConfig {
    DemoConfig {
        raw_voxel_file: None,
        scene_file: None,
        ..Default::default()
    }
}

#[test]
fn level_and_texture_navigation() {
    let mut demo = VoxelDemo::begin(&config(), None).unwrap();
    assert_eq!(demo.selection().mip_level_count(), 7);
    assert_eq!(demo.generator().current_name(), Some(TexturePreset::SPHERE));

    for _ in 0..3 {
        assert!(demo.apply(DemoCommand::from_char('.').unwrap()));
    }
    assert_eq!(demo.selection().mip_level(), 3);
    for demo_type in DemoType::ALL {
        assert_eq!(demo.descriptor(demo_type).unwrap().dims, [8, 8, 8]);
    }

    let before = demo.generator().voxel_texture().unwrap().id();
    assert!(demo.apply(DemoCommand::from_char('\'').unwrap()));
    let after = demo.generator().voxel_texture().unwrap().id();
    assert_ne!(before, after);
    assert_eq!(demo.selection().mip_level(), 3);
    for demo_type in DemoType::ALL {
        let descriptor = demo.descriptor(demo_type).unwrap();
        assert_eq!(descriptor.level, 3);
        assert_eq!(descriptor.texture_id, after);
    }
}

#[test]
fn level_is_clamped_at_both_ends() {
    let mut demo = VoxelDemo::begin(&config(), None).unwrap();
    assert!(!demo.apply(DemoCommand::PreviousMipLevel));
    assert_eq!(demo.selection().mip_level(), 0);
    for _ in 0..10 {
        demo.apply(DemoCommand::NextMipLevel);
    }
    assert_eq!(demo.selection().mip_level(), 6);
    let descriptor = demo.descriptor(DemoType::DebugDraw).unwrap();
    assert_eq!(descriptor.dims, [1, 1, 1]);
    assert!(descriptor.instance_count <= 1);
}

#[test]
fn texture_cycle_is_a_closed_loop() {
    let mut demo = VoxelDemo::begin(&config(), None).unwrap();
    let count = demo.selection().preset_count();
    let start = demo.generator().current_name().map(str::to_string);
    for _ in 0..count {
        demo.apply(DemoCommand::NextTexture);
    }
    assert_eq!(demo.generator().current_name().map(str::to_string), start);
    demo.apply(DemoCommand::PreviousTexture);
    assert_eq!(demo.selection().preset(), count - 1);
}

#[test]
fn demo_selection_by_number() {
    let mut demo = VoxelDemo::begin(&config(), None).unwrap();
    assert_eq!(demo.selection().demo(), DemoType::DebugDraw);
    assert!(demo.apply(DemoCommand::from_char('2').unwrap()));
    assert_eq!(demo.selection().demo(), DemoType::VoxelRaycaster);
    assert!(!demo.apply(DemoCommand::from_char('9').unwrap()));
    assert_eq!(demo.selection().demo(), DemoType::VoxelRaycaster);
}
