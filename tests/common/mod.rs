#![allow(dead_code)]

use std::time::Duration;

use sparse_voxels::{
    context::InitContext,
    data_structures::scene::{LightDescription, ObjectDescription, SceneDescription},
    libraries::{mesh::MeshLibrary, shader::ShaderLibrary},
};

pub const COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

pub fn headless() -> InitContext {
    let _ = env_logger::builder().is_test(true).try_init();
    futures::executor::block_on(InitContext::headless(COLOR_FORMAT))
        .expect("a GPU adapter is required for integration tests")
}

pub fn small_scene() -> SceneDescription {
    SceneDescription {
        objects: vec![
            ObjectDescription {
                name: "floor".into(),
                mesh: MeshLibrary::PLANE.into(),
                shader: ShaderLibrary::SCENE_BASIC.into(),
                position: [0.5, -0.1, 0.5],
                scale: [4.0, 1.0, 4.0],
                rotation: None,
                color: [0.4, 0.4, 0.4, 1.0],
                spin: 0.0,
            },
            ObjectDescription {
                name: "marker".into(),
                mesh: MeshLibrary::SPHERE.into(),
                shader: ShaderLibrary::SCENE_BASIC.into(),
                position: [2.0, 0.2, 0.5],
                scale: [0.2; 3],
                rotation: None,
                color: [0.9, 0.2, 0.2, 1.0],
                spin: 1.0,
            },
        ],
        lights: vec![LightDescription {
            position: [2.0, 3.0, 2.0],
            color: [1.0, 1.0, 1.0],
        }],
        ..Default::default()
    }
}

/// Copy `buffer` into a mappable buffer and read it back.
pub fn read_buffer(gpu: &InitContext, buffer: &wgpu::Buffer) -> Vec<u8> {
    let size = buffer.size();
    let staging = gpu.device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("readback"),
        size,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });
    let mut encoder = gpu
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
    encoder.copy_buffer_to_buffer(buffer, 0, &staging, 0, size);
    gpu.queue.submit(std::iter::once(encoder.finish()));
    map_and_read(gpu, &staging)
}

pub fn map_and_read(gpu: &InitContext, staging: &wgpu::Buffer) -> Vec<u8> {
    let (tx, rx) = futures_intrusive::channel::shared::oneshot_channel();
    let slice = staging.slice(..);
    slice.map_async(wgpu::MapMode::Read, move |result| {
        tx.send(result).unwrap();
    });
    gpu.device
        .poll(wgpu::PollType::Wait {
            submission_index: None,
            timeout: Some(Duration::from_secs(3)),
        })
        .unwrap();
    futures::executor::block_on(rx.receive()).unwrap().unwrap();
    let data = slice.get_mapped_range().to_vec();
    staging.unmap();
    data
}
