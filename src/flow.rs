//! Application event loop of the voxel viewer.
//!
//! [`run`] opens a window, builds the GPU context, runs [`CoreEngine::begin`]
//! and [`VoxelDemo::begin`] and then drives one frame per redraw:
//!
//! 1. input received since the last frame has already been applied
//!    (commands rebuild the demo modes synchronously)
//! 2. the per-frame record is built from the camera and replaces the old one
//! 3. the scene advances, pending demo rebuilds are uploaded
//! 4. the scene and the selected demo mode are rendered and presented
//! 5. the frame time advances by the configured delta

use std::sync::Arc;

use anyhow::Context as _;
use cgmath::{EuclideanSpace, InnerSpace};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalPosition,
    event::{ElementState, KeyEvent, MouseButton, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::Window,
};

use crate::{
    camera::ThirdPersonCamera,
    config::DemoConfig,
    context::{Context, InitContext},
    data_structures::scene::SceneDescription,
    demos::{selection::DemoCommand, voxel_demo::VoxelDemo},
    engine::CoreEngine,
    generator::RawVolume,
    render_data::PerFrameUniform,
    resources,
};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// Mouse buttons held down and the last cursor position.
#[derive(Debug, Default)]
struct MouseDrag {
    left: bool,
    right: bool,
    middle: bool,
    last: Option<PhysicalPosition<f64>>,
}

pub(crate) struct AppState {
    ctx: Context,
    gpu: InitContext,
    engine: CoreEngine,
    demo: VoxelDemo,
    camera: ThirdPersonCamera,
    mouse: MouseDrag,
    frame_time: f32,
    frame_time_delta: f32,
    frames: u32,
    last_report: instant::Instant,
}

impl AppState {
    async fn new(window: Arc<Window>, config: DemoConfig) -> anyhow::Result<Self> {
        let ctx = Context::new(window, config.show_debug_output).await?;
        let gpu = InitContext::from(&ctx);

        let (description, raw) = futures::join!(
            load_scene(config.scene_file.as_deref()),
            load_raw(config.raw_voxel_file.as_deref())
        );
        let description = description?;
        let obj_meshes = resources::load_scene_meshes(&description).await?;
        let source_name = config.scene_file.as_deref().unwrap_or("<empty>");

        let mut engine = CoreEngine::new();
        engine.begin(&gpu, "main", source_name, &description, &obj_meshes)?;
        let demo = VoxelDemo::begin(&config, raw)?;

        let mut camera = ThirdPersonCamera::default();
        camera.set_far_near_planes(0.01, 100.0);
        camera.look_at = cgmath::Point3::new(0.5, 0.5, 0.5);
        camera.zoom(-2.0);
        let [width, height] = ctx.size();
        camera.set_aspect_ratio(width, height);

        Ok(Self {
            ctx,
            gpu,
            engine,
            demo,
            camera,
            mouse: MouseDrag::default(),
            frame_time: 0.0,
            frame_time_delta: config.frame_time_delta,
            frames: 0,
            last_report: instant::Instant::now(),
        })
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.ctx.resize(width, height);
        self.camera.set_aspect_ratio(width, height);
    }

    fn keyboard(&mut self, code: KeyCode) {
        if let Some(command) = DemoCommand::from_key_code(code) {
            self.demo.apply(command);
        }
    }

    fn cursor_moved(&mut self, position: PhysicalPosition<f64>) {
        let Some(last) = self.mouse.last.replace(position) else {
            return;
        };
        let dx = (position.x - last.x) as f32;
        let dy = (position.y - last.y) as f32;
        let distance = self.camera.position().to_vec().magnitude();
        let rotate_amount = distance / 200.0;
        let zoom_amount = distance / 200.0;
        let pan_amount = distance / 500.0;
        if self.mouse.left {
            self.camera.rotate(-dx * rotate_amount, -dy * rotate_amount);
        }
        if self.mouse.right {
            self.camera.zoom(dy * zoom_amount);
        }
        if self.mouse.middle {
            self.camera.pan(-dx * pan_amount, dy * pan_amount);
        }
    }

    fn render(&mut self) -> anyhow::Result<()> {
        let record = PerFrameUniform::new(&self.camera, self.ctx.size(), self.frame_time);
        self.engine.display(&self.ctx.queue, record)?;
        self.engine.update_scene(&self.ctx.queue);
        self.demo.prepare(&self.gpu)?;

        let output = match self.ctx.surface.get_current_texture() {
            Ok(output) => output,
            // Reconfigure the surface if it's lost or outdated
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                let size = self.ctx.window.inner_size();
                self.resize(size.width, size.height);
                return Ok(());
            }
            Err(e) => return Err(e).context("acquiring the next frame"),
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.ctx.clear_colour),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.ctx.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });
            self.engine.render(&mut pass)?;
            self.demo.render(&mut pass, &self.engine)?;
        }
        self.ctx.queue.submit(std::iter::once(encoder.finish()));
        self.ctx.window.pre_present_notify();
        output.present();

        self.frame_time += self.frame_time_delta;
        self.report_frame_rate();
        Ok(())
    }

    fn report_frame_rate(&mut self) {
        self.frames += 1;
        let elapsed = self.last_report.elapsed();
        if elapsed.as_secs_f32() >= 1.0 {
            log::debug!(
                "{:.1} fps, demo {}, level {}",
                self.frames as f32 / elapsed.as_secs_f32(),
                self.demo.selection().demo(),
                self.demo.selection().mip_level()
            );
            self.frames = 0;
            self.last_report = instant::Instant::now();
        }
    }
}

async fn load_scene(file_name: Option<&str>) -> anyhow::Result<SceneDescription> {
    match file_name {
        Some(file_name) => resources::load_scene_description(file_name).await,
        None => Ok(SceneDescription::default()),
    }
}

/// The raw volume is optional; a missing file only costs the extra preset.
async fn load_raw(file_name: Option<&str>) -> Option<(String, RawVolume)> {
    let file_name = file_name?;
    match resources::load_raw_voxels(file_name).await {
        Ok(volume) => Some((file_name.to_string(), volume)),
        Err(e) => {
            log::warn!("skipping raw voxel preset: {e:#}");
            None
        }
    }
}

pub(crate) enum FlowEvent {
    #[allow(dead_code)]
    Initialized(Box<AppState>),
    #[allow(dead_code)]
    Failed(String),
}

pub struct App {
    #[cfg(not(target_arch = "wasm32"))]
    async_runtime: tokio::runtime::Runtime,
    #[allow(dead_code)]
    proxy: winit::event_loop::EventLoopProxy<FlowEvent>,
    config: DemoConfig,
    state: Option<AppState>,
    started: bool,
}

impl App {
    fn new(event_loop: &EventLoop<FlowEvent>, config: DemoConfig) -> anyhow::Result<Self> {
        Ok(Self {
            #[cfg(not(target_arch = "wasm32"))]
            async_runtime: tokio::runtime::Runtime::new()?,
            proxy: event_loop.create_proxy(),
            config,
            state: None,
            started: false,
        })
    }
}

impl ApplicationHandler<FlowEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.started {
            return;
        }
        self.started = true;

        #[allow(unused_mut)]
        let mut window_attributes = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(winit::dpi::LogicalSize::new(
                self.config.window_size[0],
                self.config.window_size[1],
            ));

        #[cfg(target_arch = "wasm32")]
        {
            use wasm_bindgen::JsCast;
            use winit::platform::web::WindowAttributesExtWebSys;

            const CANVAS_ID: &str = "canvas";

            let window = wgpu::web_sys::window().unwrap_throw();
            let document = window.document().unwrap_throw();
            let canvas = document.get_element_by_id(CANVAS_ID).unwrap_throw();
            let html_canvas_element = canvas.unchecked_into();
            window_attributes = window_attributes.with_canvas(Some(html_canvas_element));
        }

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("Unable to create a window: {e}");
                event_loop.exit();
                return;
            }
        };
        let init_future = AppState::new(window, self.config.clone());

        #[cfg(not(target_arch = "wasm32"))]
        {
            match self.async_runtime.block_on(init_future) {
                Ok(state) => {
                    state.ctx.window.request_redraw();
                    self.state = Some(state);
                }
                Err(e) => {
                    log::error!("Start-up failed: {e:#}");
                    event_loop.exit();
                }
            }
        }

        #[cfg(target_arch = "wasm32")]
        {
            let proxy = self.proxy.clone();
            wasm_bindgen_futures::spawn_local(async move {
                let event = match init_future.await {
                    Ok(state) => FlowEvent::Initialized(Box::new(state)),
                    Err(e) => FlowEvent::Failed(format!("{e:#}")),
                };
                if proxy.send_event(event).is_err() {
                    log::error!("Event loop closed during start-up");
                }
            });
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: FlowEvent) {
        match event {
            // This is the message from our wasm `spawn_local`
            FlowEvent::Initialized(state) => {
                let mut state = *state;
                let size = state.ctx.window.inner_size();
                state.resize(size.width, size.height);
                state.ctx.window.request_redraw();
                self.state = Some(state);
            }
            FlowEvent::Failed(message) => {
                log::error!("Start-up failed: {message}");
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let state = match &mut self.state {
            Some(state) => state,
            None => return,
        };

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => state.resize(size.width, size.height),
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => match code {
                KeyCode::Escape => event_loop.exit(),
                code => state.keyboard(code),
            },
            WindowEvent::MouseInput {
                state: button_state,
                button,
                ..
            } => {
                let pressed = button_state.is_pressed();
                match button {
                    MouseButton::Left => state.mouse.left = pressed,
                    MouseButton::Right => state.mouse.right = pressed,
                    MouseButton::Middle => state.mouse.middle = pressed,
                    _ => (),
                }
            }
            WindowEvent::CursorMoved { position, .. } => state.cursor_moved(position),
            WindowEvent::RedrawRequested => {
                if let Err(e) = state.render() {
                    log::error!("Unable to render: {e:#}");
                }
                state.ctx.window.request_redraw();
            }
            _ => {}
        }
    }
}

/// Open the viewer window and run until it is closed.
pub fn run(config: DemoConfig) -> anyhow::Result<()> {
    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Err(e) = env_logger::try_init() {
            println!("Warning: Could not initialize logger: {}", e);
        };
    }

    #[cfg(target_arch = "wasm32")]
    {
        console_log::init_with_level(log::Level::Info).unwrap_throw();
    }

    let event_loop: EventLoop<FlowEvent> = EventLoop::with_user_event().build()?;
    let mut app = App::new(&event_loop, config)?;
    event_loop.run_app(&mut app)?;

    Ok(())
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn run_web() -> Result<(), wasm_bindgen::JsValue> {
    run(DemoConfig::default()).map_err(|e| wasm_bindgen::JsValue::from_str(&format!("{e:#}")))
}
