use std::path::PathBuf;
use std::sync::Arc;

use winit::{
    application::ApplicationHandler,
    event::{DeviceEvent, DeviceId, ElementState, KeyEvent, MouseButton, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::PhysicalKey,
    window::{CursorGrabMode, Window, WindowId},
};

use walkthrough::{
    controller::{clock::Stopwatch, input::native::key_code_name, Action, CaptureEvent, InputEvent, PointerCapture},
    logging,
    model::SceneManifest,
    ui, utils,
    view::{GpuContext, Renderer, UiFrame},
    Walkthrough, WalkthroughConfig, WalkthroughError,
};

/// Cursor grab on the native window; `Locked` where supported, else `Confined`.
struct WindowCapture<'a>(&'a Window);

impl PointerCapture for WindowCapture<'_> {
    fn request_capture(&self) -> walkthrough::Result<()> {
        self.0
            .set_cursor_grab(CursorGrabMode::Locked)
            .or_else(|_| self.0.set_cursor_grab(CursorGrabMode::Confined))
            .map_err(|e| WalkthroughError::Capture(e.to_string()))?;
        self.0.set_cursor_visible(false);
        Ok(())
    }

    fn release_capture(&self) {
        if let Err(e) = self.0.set_cursor_grab(CursorGrabMode::None) {
            tracing::debug!(error = %e, "cursor release failed");
        }
        self.0.set_cursor_visible(true);
    }
}

struct AppState {
    window: Arc<Window>,
    gpu: GpuContext,
    renderer: Renderer,
    walkthrough: Walkthrough,
    stopwatch: Stopwatch,
    egui_ctx: egui::Context,
    egui_state: egui_winit::State,
}

impl AppState {
    fn new(window: Arc<Window>, config: WalkthroughConfig) -> walkthrough::Result<Self> {
        let gpu = pollster::block_on(GpuContext::new_native(window.clone()))?;

        let manifest = SceneManifest::load_or_default(config.scene.as_deref());
        let asset_root = config
            .scene
            .as_deref()
            .and_then(|p| PathBuf::from(p).parent().map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("."));
        let mesh = utils::build_scene_mesh(&manifest, Some(&asset_root));
        let renderer = Renderer::new(&gpu, &manifest, &mesh);

        let size = window.inner_size();
        let mut walkthrough = Walkthrough::new(config, size.width, size.height)?;
        {
            let window = window.clone();
            walkthrough.subscribe_capture(move |event| {
                tracing::info!(?event, "capture changed");
                if event == CaptureEvent::Released {
                    WindowCapture(&window).release_capture();
                }
            });
        }

        let egui_ctx = egui::Context::default();
        let egui_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );

        Ok(Self {
            window,
            gpu,
            renderer,
            walkthrough,
            stopwatch: Stopwatch::start(),
            egui_ctx,
            egui_state,
        })
    }

    fn request_capture(&mut self) {
        if self.walkthrough.capture_enabled() {
            return;
        }
        match WindowCapture(&self.window).request_capture() {
            Ok(()) => {
                self.walkthrough.handle_event(&InputEvent::PointerLockChanged { locked: true });
            }
            Err(e) => tracing::warn!(error = %e, "pointer capture unavailable"),
        }
    }

    fn release_capture(&mut self) {
        if self.walkthrough.capture_enabled() {
            self.walkthrough.handle_event(&InputEvent::PointerLockChanged { locked: false });
        }
    }

    fn handle_window_event(&mut self, event_loop: &ActiveEventLoop, event: &WindowEvent) {
        // egui only sees input while the pointer is free
        if !self.walkthrough.capture_enabled() {
            let _ = self.egui_state.on_window_event(&self.window, event);
        }

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::KeyboardInput {
                event: KeyEvent { physical_key: PhysicalKey::Code(code), state, repeat, .. },
                ..
            } => {
                let name = key_code_name(*code);
                let input = match state {
                    ElementState::Pressed => InputEvent::KeyDown(name),
                    ElementState::Released => InputEvent::KeyUp(name),
                };
                let action = self.walkthrough.handle_event(&input);
                if action == Some(Action::Release) && *state == ElementState::Pressed && !repeat {
                    self.release_capture();
                }
            }
            WindowEvent::MouseInput { state: ElementState::Pressed, button: MouseButton::Left, .. } => {
                self.request_capture();
            }
            WindowEvent::Focused(false) => {
                self.walkthrough.handle_event(&InputEvent::FocusLost);
                self.release_capture();
            }
            WindowEvent::Occluded(occluded) => {
                self.walkthrough
                    .handle_event(&InputEvent::VisibilityChanged { visible: !occluded });
            }
            WindowEvent::Resized(size) => {
                self.gpu.resize(size.width, size.height);
                self.renderer.resize(&self.gpu.device, size.width, size.height);
                self.walkthrough
                    .handle_event(&InputEvent::Resized { width: size.width, height: size.height });
            }
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            _ => {}
        }
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        self.walkthrough.advance(self.stopwatch.now());

        let raw_input = self.egui_state.take_egui_input(&self.window);
        let output = ui::build_ui(&self.egui_ctx, raw_input, &self.walkthrough);
        self.egui_state.handle_platform_output(&self.window, output.platform_output);
        let primitives = self.egui_ctx.tessellate(output.shapes, output.pixels_per_point);
        let ui_frame = UiFrame {
            primitives,
            textures_delta: output.textures_delta,
            pixels_per_point: output.pixels_per_point,
        };

        match self.renderer.render(&self.gpu, self.walkthrough.view_proj(), ui_frame) {
            Ok(()) => {}
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => self.gpu.reconfigure(),
            Err(wgpu::SurfaceError::OutOfMemory) => {
                tracing::error!("out of GPU memory, exiting");
                event_loop.exit();
            }
            Err(e) => tracing::warn!(error = ?e, "frame skipped"),
        }
    }
}

struct App {
    config: Option<WalkthroughConfig>,
    state: Option<AppState>,
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }
        let Some(config) = self.config.take() else { return };

        let attributes = Window::default_attributes()
            .with_title("Walkthrough")
            .with_inner_size(winit::dpi::LogicalSize::new(1280, 720));
        let window = match event_loop.create_window(attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                tracing::error!(error = %e, "failed to create window");
                event_loop.exit();
                return;
            }
        };

        match AppState::new(window, config) {
            Ok(state) => self.state = Some(state),
            Err(e) => {
                tracing::error!(error = %e, "renderer init failed");
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        let Some(state) = self.state.as_mut() else { return };
        if state.window.id() != window_id {
            return;
        }
        state.handle_window_event(event_loop, &event);
    }

    fn device_event(&mut self, _event_loop: &ActiveEventLoop, _device_id: DeviceId, event: DeviceEvent) {
        let Some(state) = self.state.as_mut() else { return };
        if let DeviceEvent::MouseMotion { delta: (dx, dy) } = event {
            if state.walkthrough.capture_enabled() {
                state
                    .walkthrough
                    .handle_event(&InputEvent::MouseMove { dx: dx as f32, dy: dy as f32 });
            }
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(state) = &self.state {
            state.window.request_redraw();
        }
    }
}

fn main() {
    logging::init();

    let config = WalkthroughConfig::from_env();
    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(e) => {
            tracing::error!(error = %e, "failed to create event loop");
            std::process::exit(1);
        }
    };

    let mut app = App { config: Some(config), state: None };
    if let Err(e) = event_loop.run_app(&mut app) {
        tracing::error!(error = %e, "event loop terminated");
        std::process::exit(1);
    }
}
