use std::sync::Arc;

use anyhow::{Context as _, anyhow};
use glam::Vec2;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{ElementState, MouseButton, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, ModifiersState, PhysicalKey},
    window::{Window, WindowId},
};

mod config;
mod math;
mod renderer;
mod scene;
mod ui;

use config::PlotterConfig;
use renderer::{DragButton, GpuState, OrbitCamera, plan_frame};
use scene::SurfaceRegistry;
use ui::{UiActions, UiState, apply_theme, draw_help_overlay, draw_side_panel};

struct App {
    config: PlotterConfig,
    window: Option<Arc<Window>>,
    gpu: Option<GpuState>,
    egui_state: Option<egui_winit::State>,
    egui_renderer: Option<egui_wgpu::Renderer>,
    egui_ctx: egui::Context,

    registry: SurfaceRegistry,
    camera: OrbitCamera,
    ui_state: UiState,

    cursor: Vec2,
    modifiers: ModifiersState,
    fatal: Option<anyhow::Error>,
}

impl App {
    fn new(config: PlotterConfig) -> Self {
        let mut registry = SurfaceRegistry::new(config.grid, config.default_color);
        for startup in &config.startup_surfaces {
            let id = registry.add_surface();
            registry.set_color(id, startup.color);
            registry.set_formula(id, startup.formula);
        }

        Self {
            window: None,
            gpu: None,
            egui_state: None,
            egui_renderer: None,
            egui_ctx: egui::Context::default(),

            camera: OrbitCamera::new(&config.camera, config.projection),
            ui_state: UiState::new(&config),
            registry,

            cursor: Vec2::ZERO,
            modifiers: ModifiersState::empty(),
            fatal: None,
            config,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        log::error!("{error:#}");
        self.fatal = Some(error);
        event_loop.exit();
    }

    fn init_gpu(&mut self, window: Arc<Window>) -> anyhow::Result<()> {
        let mut gpu = pollster::block_on(GpuState::new(window.clone()))
            .context("failed to initialize the GPU")?;

        let egui_state = egui_winit::State::new(
            self.egui_ctx.clone(),
            self.egui_ctx.viewport_id(),
            &window,
            Some(window.scale_factor() as f32),
            None,
            Some(2048),
        );

        let egui_renderer =
            egui_wgpu::Renderer::new(&gpu.device, gpu.config.format, None, 1, false);

        apply_theme(&self.egui_ctx);

        // Startup surfaces are uploaded before the first frame
        gpu.sync_surfaces(&mut self.registry);

        self.window = Some(window);
        self.gpu = Some(gpu);
        self.egui_state = Some(egui_state);
        self.egui_renderer = Some(egui_renderer);
        Ok(())
    }

    fn handle_ui_actions(&mut self, actions: UiActions) {
        if !actions.is_empty() {
            actions.apply(&mut self.registry, &mut self.ui_state);
        }
        self.camera.projection = self.ui_state.projection;

        if let Some(gpu) = &mut self.gpu {
            gpu.sync_surfaces(&mut self.registry);
        }
    }

    fn render(&mut self, event_loop: &ActiveEventLoop) {
        let (Some(window), Some(egui_state)) = (&self.window, &mut self.egui_state) else {
            return;
        };

        let raw_input = egui_state.take_egui_input(window);

        let mut ui_actions = UiActions::default();
        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            ui_actions = draw_side_panel(ctx, &mut self.ui_state, &self.registry);
            if self.ui_state.show_help {
                draw_help_overlay(ctx, &self.camera);
            }
        });

        self.handle_ui_actions(ui_actions);

        let Some(gpu) = &mut self.gpu else { return };
        let Some(window) = &self.window else { return };
        let Some(egui_state) = &mut self.egui_state else {
            return;
        };
        let Some(egui_renderer) = &mut self.egui_renderer else {
            return;
        };

        egui_state.handle_platform_output(window, full_output.platform_output);

        let output = match gpu.acquire_frame() {
            Ok(Some(t)) => t,
            Ok(None) => return,
            Err(e) => {
                let error = anyhow::Error::new(e).context("lost the swapchain");
                self.fail(event_loop, error);
                return;
            }
        };

        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let plan = plan_frame(
            &self.registry,
            &self.camera,
            &self.ui_state.render_options(),
            gpu.aspect(),
        );

        let paint_jobs = self
            .egui_ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);

        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [gpu.config.width, gpu.config.height],
            pixels_per_point: full_output.pixels_per_point,
        };

        for (id, delta) in full_output.textures_delta.set {
            egui_renderer.update_texture(&gpu.device, &gpu.queue, id, &delta);
        }

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Main Encoder"),
            });

        egui_renderer.update_buffers(
            &gpu.device,
            &gpu.queue,
            &mut encoder,
            &paint_jobs,
            &screen_descriptor,
        );

        gpu.render_scene(&view, &mut encoder, &plan);

        {
            let render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("egui Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            let mut render_pass = render_pass.forget_lifetime();
            egui_renderer.render(&mut render_pass, &paint_jobs, &screen_descriptor);
        }

        for id in full_output.textures_delta.free {
            egui_renderer.free_texture(&id);
        }

        gpu.queue.submit(std::iter::once(encoder.finish()));
        output.present();
    }

    fn handle_key(&mut self, event_loop: &ActiveEventLoop, key: KeyCode, consumed: bool) {
        match key {
            KeyCode::KeyQ if self.modifiers.control_key() => {
                log::info!("exit requested");
                event_loop.exit();
            }
            KeyCode::Escape if !consumed => self.camera.release(),
            _ => {}
        }
    }

    fn handle_mouse_button(&mut self, button: MouseButton, state: ElementState, consumed: bool) {
        let button = match button {
            MouseButton::Left => DragButton::Left,
            MouseButton::Right => DragButton::Right,
            _ => return,
        };
        match state {
            // Presses over the panel belong to egui
            ElementState::Pressed if !consumed => {
                self.camera.pointer_down(button, self.cursor);
            }
            ElementState::Pressed => {}
            // Releases always reach the camera so a drag never sticks
            ElementState::Released => {
                self.camera.pointer_up(button);
            }
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let (width, height) = self.config.window_size;
        let window_attrs = Window::default_attributes()
            .with_title(self.config.window_title)
            .with_inner_size(PhysicalSize::new(width, height));

        let result = event_loop
            .create_window(window_attrs)
            .map_err(|e| anyhow!("failed to create the window: {e}"))
            .and_then(|window| self.init_gpu(Arc::new(window)));

        if let Err(e) = result {
            self.fail(event_loop, e);
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let mut consumed = false;
        if let (Some(egui_state), Some(window)) = (&mut self.egui_state, &self.window) {
            consumed = egui_state.on_window_event(window, &event).consumed;
        }

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),

            WindowEvent::Resized(size) => {
                if let Some(gpu) = &mut self.gpu {
                    gpu.resize(size);
                }
            }

            WindowEvent::ModifiersChanged(modifiers) => {
                self.modifiers = modifiers.state();
            }

            WindowEvent::KeyboardInput { event, .. } => {
                if event.state == ElementState::Pressed {
                    if let PhysicalKey::Code(key) = event.physical_key {
                        self.handle_key(event_loop, key, consumed);
                    }
                }
            }

            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = Vec2::new(position.x as f32, position.y as f32);
                self.camera.pointer_moved(self.cursor);
            }

            WindowEvent::MouseInput { button, state, .. } => {
                self.handle_mouse_button(button, state, consumed);
            }

            WindowEvent::Focused(false) => self.camera.release(),

            WindowEvent::RedrawRequested => self.render(event_loop),

            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = PlotterConfig::default();
    log::info!(
        "starting with grid extent {}, {} subdivisions",
        config.grid.grid_extent,
        config.grid.subdivisions
    );

    let event_loop = EventLoop::new().map_err(|e| anyhow!("failed to start the event loop: {e}"))?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(config);
    event_loop
        .run_app(&mut app)
        .map_err(|e| anyhow!("event loop exited with an error: {e}"))?;

    match app.fatal.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
