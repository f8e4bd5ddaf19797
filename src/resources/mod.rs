//! Loading of external files: scene descriptions, OBJ meshes and raw voxel data.
//!
//! Native builds read from `./assets/`, which `build.rs` copies next to the
//! binary. On wasm32 files are fetched relative to the page origin.

use std::io::{BufReader, Cursor};

use anyhow::Context as _;

use crate::{
    data_structures::scene::SceneDescription, generator::RawVolume, libraries::mesh::ObjMesh,
};

#[cfg(target_arch = "wasm32")]
fn format_url(file_name: &str) -> anyhow::Result<reqwest::Url> {
    let window = web_sys::window().context("no window")?;
    let origin = window
        .location()
        .origin()
        .map_err(|_| anyhow::anyhow!("page has no origin"))?;
    let base = reqwest::Url::parse(&format!("{}/assets/", origin))?;
    Ok(base.join(file_name)?)
}

pub async fn load_string(file_name: &str) -> anyhow::Result<String> {
    #[cfg(target_arch = "wasm32")]
    let txt = {
        let url = format_url(file_name)?;
        reqwest::get(url).await?.text().await?
    };
    #[cfg(not(target_arch = "wasm32"))]
    let txt = {
        let path = std::path::Path::new("./").join("assets").join(file_name);
        std::fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?
    };

    Ok(txt)
}

pub async fn load_binary(file_name: &str) -> anyhow::Result<Vec<u8>> {
    #[cfg(target_arch = "wasm32")]
    let data = {
        let url = format_url(file_name)?;
        reqwest::get(url).await?.bytes().await?.to_vec()
    };
    #[cfg(not(target_arch = "wasm32"))]
    let data = {
        let path = std::path::Path::new("./").join("assets").join(file_name);
        std::fs::read(&path).with_context(|| format!("reading {}", path.display()))?
    };

    Ok(data)
}

/// Parse an OBJ file into models. Materials are not used and are skipped.
pub async fn load_obj_meshes(file_name: &str) -> anyhow::Result<Vec<tobj::Model>> {
    let obj_text = load_string(file_name).await?;
    let mut obj_reader = BufReader::new(Cursor::new(obj_text));

    let (models, _) = tobj::load_obj_buf_async(
        &mut obj_reader,
        &tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        },
        |_| async move { Err(tobj::LoadError::OpenFileFailed) },
    )
    .await
    .with_context(|| format!("parsing {file_name}"))?;
    Ok(models)
}

pub async fn load_scene_description(file_name: &str) -> anyhow::Result<SceneDescription> {
    let json = load_string(file_name).await?;
    SceneDescription::from_json(&json).with_context(|| format!("parsing {file_name}"))
}

/// Load every OBJ mesh a scene description names.
pub async fn load_scene_meshes(description: &SceneDescription) -> anyhow::Result<Vec<ObjMesh>> {
    let mut meshes = Vec::with_capacity(description.meshes.len());
    for (name, file_name) in &description.meshes {
        let models = load_obj_meshes(file_name)
            .await
            .with_context(|| format!("loading mesh `{name}`"))?;
        meshes.push(ObjMesh {
            name: name.clone(),
            models,
        });
    }
    Ok(meshes)
}

/// Load a cubic volume of 8-bit densities.
pub async fn load_raw_voxels(file_name: &str) -> anyhow::Result<RawVolume> {
    let bytes = load_binary(file_name).await?;
    RawVolume::from_bytes(bytes).with_context(|| format!("reading voxels from {file_name}"))
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use super::*;

    #[test]
    fn missing_files_name_the_path() {
        let err = futures::executor::block_on(load_binary("does/not/exist.raw")).unwrap_err();
        assert!(format!("{err:#}").contains("exist.raw"));
    }

    #[test]
    fn bundled_obj_declares_a_mesh() {
        let models =
            futures::executor::block_on(load_obj_meshes("meshes/tetrahedron.obj")).unwrap();
        assert_eq!(models.len(), 1);
        assert_eq!(models[0].mesh.indices.len(), 12);

        let mut meshes = crate::libraries::mesh::MeshLibrary::new();
        meshes.begin().unwrap();
        let handle = meshes.declare_obj("tetrahedron", &models).unwrap();
        assert_eq!(meshes.resolve("tetrahedron").unwrap(), handle);
    }
}
