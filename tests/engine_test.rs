#![cfg(feature = "integration-tests")]

mod common;

use sparse_voxels::{
    CoreEngine,
    camera::ThirdPersonCamera,
    data_structures::library::{LibraryError, Stage},
    libraries::mesh::MeshLibrary,
    render_data::PerFrameUniform,
};

#[test]
fn begin_commits_every_library() {
    let gpu = common::headless();
    let mut engine = CoreEngine::new();
    engine
        .begin(&gpu, "main", "scenes/test.json", &common::small_scene(), &[])
        .unwrap();

    assert!(engine.is_committed());
    assert_eq!(engine.meshes().stage(), Stage::Committed);
    assert_eq!(engine.shaders().stage(), Stage::Committed);
    assert_eq!(engine.scenes().stage(), Stage::Committed);
    let id = engine.active_scene().unwrap();
    assert_eq!(engine.scenes().get(id).stage(), Stage::Committed);
    assert!(engine.meshes().mesh(engine.meshes().resolve(MeshLibrary::CUBE).unwrap()).is_ok());
}

#[test]
fn second_begin_is_rejected() {
    let gpu = common::headless();
    let mut engine = CoreEngine::new();
    engine
        .begin(&gpu, "main", "scenes/test.json", &common::small_scene(), &[])
        .unwrap();
    let err = engine
        .begin(&gpu, "other", "scenes/test.json", &common::small_scene(), &[])
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<LibraryError>(),
        Some(LibraryError::AlreadyCommitted { .. })
    ));
}

#[test]
fn mesh_library_enforces_its_order() {
    let gpu = common::headless();
    let mut meshes = MeshLibrary::new();
    assert!(matches!(
        meshes.commit_to_gpu(&gpu),
        Err(LibraryError::NotBegun { .. })
    ));
    meshes.begin().unwrap();
    let cube = meshes.resolve(MeshLibrary::CUBE).unwrap();
    assert!(matches!(
        meshes.mesh(cube),
        Err(LibraryError::NotCommitted { .. })
    ));
    meshes.commit_to_gpu(&gpu).unwrap();
    assert!(matches!(
        meshes.commit_to_gpu(&gpu),
        Err(LibraryError::AlreadyCommitted { .. })
    ));
    assert!(meshes.mesh(cube).is_ok());
}

#[test]
fn display_replaces_the_whole_record() {
    let gpu = common::headless();
    let mut engine = CoreEngine::new();
    engine
        .begin(&gpu, "main", "scenes/test.json", &common::small_scene(), &[])
        .unwrap();

    let mut camera = ThirdPersonCamera::default();
    let first = PerFrameUniform::new(&camera, [640, 480], 0.5);
    engine.display(&gpu.queue, first).unwrap();

    camera.rotate(0.3, 0.1);
    camera.zoom(1.0);
    let second = PerFrameUniform::new(&camera, [320, 200], 0.51);
    engine.display(&gpu.queue, second).unwrap();
    engine.update_scene(&gpu.queue);

    let bytes = common::read_buffer(&gpu, engine.render_data().buffer().unwrap());
    assert_eq!(bytes.as_slice(), bytemuck::bytes_of(&second));
    assert_eq!(engine.render_data().time(), 0.51);
}

#[test]
fn obj_meshes_are_committed_with_the_builtins() {
    let gpu = common::headless();
    let mut description = common::small_scene();
    description
        .meshes
        .insert("tetrahedron".into(), "meshes/tetrahedron.obj".into());
    description.objects[1].mesh = "tetrahedron".into();
    let obj_meshes =
        futures::executor::block_on(sparse_voxels::resources::load_scene_meshes(&description))
            .unwrap();

    let mut engine = CoreEngine::new();
    engine
        .begin(&gpu, "main", "scenes/test.json", &description, &obj_meshes)
        .unwrap();
    let handle = engine.meshes().resolve("tetrahedron").unwrap();
    assert_eq!(engine.meshes().mesh(handle).unwrap().num_elements, 12);
}
