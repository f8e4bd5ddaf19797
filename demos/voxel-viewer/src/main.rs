use sparse_voxels::{DemoConfig, DemoType};

fn main() -> anyhow::Result<()> {
    // `voxel-viewer [grid length] [debug-draw | voxel-raycaster]`
    let mut args = std::env::args().skip(1);
    let mut config = DemoConfig::default();
    if let Some(length) = args.next() {
        config.voxel_grid_length = length.parse()?;
    }
    if let Some(demo) = args.next() {
        config.initial_demo = match demo.as_str() {
            "debug-draw" => DemoType::DebugDraw,
            "voxel-raycaster" => DemoType::VoxelRaycaster,
            other => anyhow::bail!("unknown demo `{other}`"),
        };
    }
    sparse_voxels::run(config)
}
