use std::borrow::Cow;

use crate::{
    context::InitContext,
    data_structures::{
        instance::InstanceRaw,
        library::{Handle, Library, LibraryError, Stage},
        mesh::{MeshVertex, Vertex},
        texture::voxel_texture_layout,
    },
    pipelines::{
        self,
        basic::{DepthMode, mk_render_pipeline},
        light,
    },
    render_data::per_frame_layout,
};

pub type ShaderHandle = Handle<ShaderDescription>;

/// Vertex buffers a program expects.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VertexInput {
    /// Vertices are generated in the shader from the vertex index.
    None,
    /// A [`MeshVertex`] buffer at slot 0.
    Mesh,
    /// A [`MeshVertex`] buffer at slot 0 and an [`InstanceRaw`] buffer at slot 1.
    MeshInstanced,
}

/// Bind group expected at the group index equal to its position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BindingKind {
    PerFrame,
    Light,
    VoxelLevel,
}

/// Everything needed to compile and link a program, without touching the GPU.
#[derive(Clone, Debug)]
pub struct ShaderDescription {
    pub label: String,
    pub source: Cow<'static, str>,
    pub vertex_input: VertexInput,
    pub bindings: Vec<BindingKind>,
    pub blend: Option<wgpu::BlendState>,
    pub depth: DepthMode,
    pub cull_mode: Option<wgpu::Face>,
}

impl ShaderDescription {
    fn link(&self, gpu: &InitContext) -> ShaderProgram {
        let device = &gpu.device;
        let layouts: Vec<wgpu::BindGroupLayout> = self
            .bindings
            .iter()
            .map(|binding| match binding {
                BindingKind::PerFrame => per_frame_layout(device),
                BindingKind::Light => light::mk_bind_group_layout(device),
                BindingKind::VoxelLevel => voxel_texture_layout(device),
            })
            .collect();
        let layout_refs: Vec<&wgpu::BindGroupLayout> = layouts.iter().collect();
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&format!("{} Pipeline Layout", self.label)),
            bind_group_layouts: &layout_refs,
            immediate_size: 0,
        });
        let vertex_layouts = match self.vertex_input {
            VertexInput::None => vec![],
            VertexInput::Mesh => vec![MeshVertex::desc()],
            VertexInput::MeshInstanced => vec![MeshVertex::desc(), InstanceRaw::desc()],
        };
        let pipeline = mk_render_pipeline(
            device,
            &layout,
            gpu.color_format,
            self.blend,
            self.depth,
            self.cull_mode,
            &vertex_layouts,
            wgpu::ShaderModuleDescriptor {
                label: Some(&self.label),
                source: wgpu::ShaderSource::Wgsl(self.source.clone()),
            },
        );
        ShaderProgram { pipeline }
    }
}

/// A linked program.
#[derive(Debug)]
pub struct ShaderProgram {
    pub pipeline: wgpu::RenderPipeline,
}

/// Owns every shader program of an engine session.
pub struct ShaderLibrary {
    library: Library<ShaderDescription, ShaderProgram>,
}

impl Default for ShaderLibrary {
    fn default() -> Self {
        Self::new()
    }
}

impl ShaderLibrary {
    pub const SCENE_BASIC: &'static str = "scene_basic";
    pub const DEBUG_DRAW: &'static str = "debug_draw";
    pub const VOXEL_RAYCASTER: &'static str = "voxel_raycaster";

    pub fn new() -> Self {
        Self {
            library: Library::new("ShaderLibrary"),
        }
    }

    pub fn stage(&self) -> Stage {
        self.library.stage()
    }

    /// Declare the built-in programs. Nothing is compiled until `commit_to_gpu`.
    pub fn begin(&mut self) -> Result<(), LibraryError> {
        if self.library.stage() == Stage::Building {
            return Ok(());
        }
        self.library.begin()?;
        self.library.declare(
            Self::SCENE_BASIC,
            ShaderDescription {
                label: Self::SCENE_BASIC.to_string(),
                source: Cow::Borrowed(pipelines::SCENE_BASIC_WGSL),
                vertex_input: VertexInput::MeshInstanced,
                bindings: vec![BindingKind::PerFrame, BindingKind::Light],
                blend: Some(wgpu::BlendState::REPLACE),
                depth: DepthMode::ReadWrite,
                cull_mode: Some(wgpu::Face::Back),
            },
        )?;
        self.library.declare(
            Self::DEBUG_DRAW,
            ShaderDescription {
                label: Self::DEBUG_DRAW.to_string(),
                source: Cow::Borrowed(pipelines::DEBUG_DRAW_WGSL),
                vertex_input: VertexInput::MeshInstanced,
                bindings: vec![BindingKind::PerFrame],
                blend: Some(wgpu::BlendState::REPLACE),
                depth: DepthMode::ReadWrite,
                cull_mode: Some(wgpu::Face::Back),
            },
        )?;
        self.library.declare(
            Self::VOXEL_RAYCASTER,
            ShaderDescription {
                label: Self::VOXEL_RAYCASTER.to_string(),
                source: Cow::Borrowed(pipelines::VOXEL_RAYCASTER_WGSL),
                vertex_input: VertexInput::None,
                bindings: vec![BindingKind::PerFrame, BindingKind::VoxelLevel],
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                depth: DepthMode::Overlay,
                cull_mode: None,
            },
        )?;
        Ok(())
    }

    pub fn declare(
        &mut self,
        name: &str,
        description: ShaderDescription,
    ) -> Result<ShaderHandle, LibraryError> {
        self.library.declare(name, description)
    }

    pub fn resolve(&self, name: &str) -> Result<ShaderHandle, LibraryError> {
        self.library.resolve(name)
    }

    pub fn description(&self, handle: ShaderHandle) -> &ShaderDescription {
        self.library.description(handle)
    }

    pub fn len(&self) -> usize {
        self.library.len()
    }

    pub fn is_empty(&self) -> bool {
        self.library.is_empty()
    }

    /// Compile and link every declared program.
    pub fn commit_to_gpu(&mut self, gpu: &InitContext) -> Result<(), LibraryError> {
        self.library
            .commit(|_, description| Ok(description.link(gpu)))?;
        log::info!("ShaderLibrary: linked {} programs", self.library.len());
        Ok(())
    }

    pub fn program(&self, handle: ShaderHandle) -> Result<&ShaderProgram, LibraryError> {
        self.library.resident(handle)
    }
}
