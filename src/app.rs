//! Window shell: owns the winit event loop and wires window input, the GPU
//! renderer and the asset loader to the [`Viewer`].

use std::sync::Arc;

use winit::{
    application::ApplicationHandler,
    dpi::{LogicalSize, PhysicalSize},
    event::{ElementState, KeyEvent, MouseButton, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{CursorIcon, Window, WindowAttributes},
};

use crate::config::ViewerConfig;
use crate::gfx::loader::AssetLoader;
use crate::gfx::rendering::RenderEngine;
use crate::interaction::CursorStyle;
use crate::ui::{material_panel, playback_hint, UiManager};
use crate::viewer::{FrameSink, FrameView, Viewer};

/// The GPU side of a frame: renderer, imgui overlay and the window whose
/// cursor the viewer controls.
pub struct GpuFrame<'a> {
    pub engine: &'a mut RenderEngine,
    pub ui: &'a mut UiManager,
    pub window: &'a Window,
}

impl FrameSink for GpuFrame<'_> {
    fn render(&mut self, frame: FrameView<'_>) {
        let FrameView {
            scene,
            material,
            camera,
            perf,
            playback,
        } = frame;

        self.engine.prepare(scene, material, camera);

        let ui_manager = &mut *self.ui;
        let window = self.window;
        self.engine
            .render_frame(|device, queue, encoder, color_attachment| {
                ui_manager.draw(device, queue, encoder, window, color_attachment, |ui| {
                    material_panel(ui, material);
                    perf.render_overlay(ui);
                    playback_hint(ui, playback);
                });
            });
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.engine.resize(width, height);
        self.ui.update_display_size(width, height);
    }

    fn set_cursor(&mut self, cursor: CursorStyle) {
        let icon = match cursor {
            CursorStyle::Pointer => CursorIcon::Pointer,
            CursorStyle::Default => CursorIcon::Default,
        };
        self.window.set_cursor(icon);
    }
}

/// Everything that only exists once the window is up.
struct Running {
    window: Arc<Window>,
    render_engine: RenderEngine,
    ui_manager: UiManager,
    viewer: Viewer,
}

pub struct VitrineApp {
    config: ViewerConfig,
    loader: AssetLoader,
    running: Option<Running>,
}

impl VitrineApp {
    /// Starts loading every asset right away; they are handed to the
    /// viewer as they finish, once the window exists.
    pub fn new(config: ViewerConfig) -> Self {
        let loader = AssetLoader::new();
        loader.load_model(config.assets.model.clone());
        loader.load_environment(config.assets.environment.clone());
        loader.load_texture(config.assets.texture.clone());

        Self {
            config,
            loader,
            running: None,
        }
    }

    fn start(&self, event_loop: &ActiveEventLoop) -> anyhow::Result<Running> {
        let window_config = &self.config.window;
        let window = Arc::new(
            event_loop.create_window(
                WindowAttributes::default()
                    .with_title(window_config.title.clone())
                    .with_inner_size(LogicalSize::new(window_config.width, window_config.height)),
            )?,
        );

        let PhysicalSize { width, height } = window.inner_size();
        let render_engine = pollster::block_on(RenderEngine::new(
            window.clone(),
            width,
            height,
            window_config.vsync,
            self.config.shadows.clone(),
        ))?;

        let mut ui_manager = UiManager::new(
            render_engine.device(),
            render_engine.queue(),
            render_engine.surface_format(),
            &window,
        );
        ui_manager.update_display_size(width, height);

        let viewer = Viewer::new(&self.config, width, height);

        Ok(Running {
            window,
            render_engine,
            ui_manager,
            viewer,
        })
    }
}

impl ApplicationHandler for VitrineApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.running.is_some() {
            return;
        }

        match self.start(event_loop) {
            Ok(running) => self.running = Some(running),
            Err(err) => {
                log::error!("cannot start the viewer: {err:#}");
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let Some(running) = self.running.as_mut() else {
            return;
        };
        let Running {
            window,
            render_engine,
            ui_manager,
            viewer,
        } = running;

        // Hover picking follows the pointer even over the panel.
        if let WindowEvent::CursorMoved { position, .. } = &event {
            viewer.pointer_moved(position.x, position.y);
        }

        // Handle UI input first
        let ui_captured = ui_manager.handle_window_event(window, window_id, &event);

        match event {
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(KeyCode::Escape),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => event_loop.exit(),
            WindowEvent::KeyboardInput { event, .. } if !ui_captured => {
                viewer.camera_mut().process_keyboard_event(&event);
            }
            WindowEvent::MouseInput { state, button, .. } => {
                // Releases always reach the camera so a drag never sticks.
                if !ui_captured || state == ElementState::Released {
                    viewer.camera_mut().process_mouse_button(button, state);
                }
                if button == MouseButton::Left && state == ElementState::Released && !ui_manager.wants_mouse() {
                    if let Some(playback) = viewer.click() {
                        log::info!("animation {playback:?}");
                    }
                }
            }
            WindowEvent::Resized(PhysicalSize { width, height }) => {
                let mut frame = GpuFrame {
                    engine: render_engine,
                    ui: ui_manager,
                    window,
                };
                viewer.resize(width, height, &mut frame);
            }
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::RedrawRequested => {
                for load_event in self.loader.poll() {
                    viewer.apply_load_event(load_event);
                }

                let mut frame = GpuFrame {
                    engine: render_engine,
                    ui: ui_manager,
                    window,
                };
                viewer.tick(&mut frame);

                let stats = render_engine.last_stats();
                viewer
                    .perf_mut()
                    .update_render_stats(stats.draw_calls, stats.vertex_count);
            }
            _ => (),
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: winit::event::DeviceId,
        event: winit::event::DeviceEvent,
    ) {
        let Some(running) = self.running.as_mut() else {
            return;
        };

        // Don't orbit while dragging a slider
        if running.ui_manager.wants_input() {
            return;
        }
        running.viewer.camera_mut().process_event(&event);
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(running) = &self.running {
            running.window.request_redraw();
        }
    }
}

/// Opens the window and runs until it is closed.
pub fn run(config: ViewerConfig) -> anyhow::Result<()> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = VitrineApp::new(config);
    event_loop.run_app(&mut app)?;
    Ok(())
}
