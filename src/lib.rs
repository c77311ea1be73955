// Re-export all public modules so they can be used from main.rs
pub mod config;
pub mod error;
pub mod frame_loop;
pub mod logging;
pub mod ui;
pub mod utils;

// MVC Architecture
pub mod model;
pub mod view;
pub mod controller;

pub use config::WalkthroughConfig;
pub use error::{Result, WalkthroughError};
pub use frame_loop::Walkthrough;

#[cfg(target_arch = "wasm32")]
mod web {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use wasm_bindgen::closure::Closure;
    use wasm_bindgen::{JsCast, JsValue};
    use web_sys::{Document, Event, EventTarget, HtmlCanvasElement, KeyboardEvent, MouseEvent, Window};

    use crate::controller::clock::performance_now;
    use crate::controller::input::{wasm as web_input, Action, InputEvent};
    use crate::controller::PointerCapture;
    use crate::model::SceneManifest;
    use crate::view::{GpuContext, Renderer, UiFrame};
    use crate::frame_loop::LoopSlot;
    use crate::{ui, utils, Walkthrough, WalkthroughConfig, WalkthroughError};

    /// Pointer lock on the canvas.
    #[derive(Clone)]
    struct CanvasCapture {
        canvas: HtmlCanvasElement,
        document: Document,
    }

    impl PointerCapture for CanvasCapture {
        fn request_capture(&self) -> crate::Result<()> {
            self.canvas.request_pointer_lock();
            Ok(())
        }

        fn release_capture(&self) {
            self.document.exit_pointer_lock();
        }
    }

    impl CanvasCapture {
        fn is_captured(&self) -> bool {
            let canvas: &web_sys::Element = self.canvas.as_ref();
            self.document.pointer_lock_element().is_some_and(|el| el == *canvas)
        }
    }

    type Listener = Closure<dyn FnMut(Event)>;

    /// DOM listeners that are removed again when the set is dropped.
    #[derive(Default)]
    struct ListenerSet {
        entries: Vec<(EventTarget, &'static str, Listener)>,
    }

    impl ListenerSet {
        fn add(
            &mut self,
            target: &EventTarget,
            event: &'static str,
            handler: impl FnMut(Event) + 'static,
        ) -> Result<(), JsValue> {
            let closure: Listener = Closure::wrap(Box::new(handler) as Box<dyn FnMut(Event)>);
            target.add_event_listener_with_callback(event, closure.as_ref().unchecked_ref())?;
            self.entries.push((target.clone(), event, closure));
            Ok(())
        }
    }

    impl Drop for ListenerSet {
        fn drop(&mut self) {
            for (target, event, closure) in self.entries.drain(..) {
                let _ = target.remove_event_listener_with_callback(event, closure.as_ref().unchecked_ref());
            }
        }
    }

    pub async fn start() -> Result<(), JsValue> {
        crate::logging::init();
        let (window, document, canvas, pixel_ratio) = init_canvas()?;
        setup_app(window, document, canvas, pixel_ratio).await
    }

    async fn setup_app(
        window: Window,
        document: Document,
        canvas: HtmlCanvasElement,
        pixel_ratio: f32,
    ) -> Result<(), JsValue> {
        let (width, height) = (canvas.width(), canvas.height());
        let gpu = GpuContext::new(&canvas, width, height).await?;

        let config = WalkthroughConfig::default();
        let manifest = SceneManifest::default();
        let mesh = utils::build_scene_mesh(&manifest, None);
        let renderer = Renderer::new(&gpu, &manifest, &mesh);

        let walkthrough = Rc::new(RefCell::new(Walkthrough::new(config, width, height)?));
        walkthrough.borrow_mut().subscribe_capture(|event| tracing::info!(?event, "capture changed"));

        let capture = CanvasCapture { canvas: canvas.clone(), document: document.clone() };
        let listeners = setup_input_listeners(&window, &document, &capture, walkthrough.clone())?;
        tracing::info!(width, height, pixel_ratio, "walkthrough started");

        let frame = FrameState {
            window: window.clone(),
            canvas,
            pixel_ratio,
            gpu,
            renderer,
            walkthrough,
            egui_ctx: egui::Context::default(),
            _listeners: listeners,
        };
        AnimationLoop::new(window, frame).start()
    }

    /// Setup all input event listeners with platform-agnostic abstractions
    fn setup_input_listeners(
        window: &Window,
        document: &Document,
        capture: &CanvasCapture,
        walkthrough: Rc<RefCell<Walkthrough>>,
    ) -> Result<ListenerSet, JsValue> {
        let mut listeners = ListenerSet::default();

        {
            let walkthrough = walkthrough.clone();
            let capture = capture.clone();
            listeners.add(document, "keydown", move |e: Event| {
                let Some(e) = e.dyn_ref::<KeyboardEvent>() else { return };
                let action = walkthrough.borrow_mut().handle_event(&web_input::keyboard_event_to_input(e, true));
                if action == Some(Action::Release) {
                    capture.release_capture();
                }
                if action.is_some() {
                    e.prevent_default();
                }
            })?;
        }

        {
            let walkthrough = walkthrough.clone();
            listeners.add(document, "keyup", move |e: Event| {
                let Some(e) = e.dyn_ref::<KeyboardEvent>() else { return };
                walkthrough.borrow_mut().handle_event(&web_input::keyboard_event_to_input(e, false));
            })?;
        }

        {
            let walkthrough = walkthrough.clone();
            let capture = capture.clone();
            listeners.add(document, "mousemove", move |e: Event| {
                let Some(e) = e.dyn_ref::<MouseEvent>() else { return };
                if capture.is_captured() {
                    walkthrough.borrow_mut().handle_event(&web_input::mouse_move_to_input(e));
                }
            })?;
        }

        {
            let capture_for_click = capture.clone();
            listeners.add(&capture.canvas, "click", move |_e: Event| {
                if !capture_for_click.is_captured() {
                    if let Err(e) = capture_for_click.request_capture() {
                        tracing::warn!(error = %e, "pointer lock request failed");
                    }
                }
            })?;
        }

        {
            let walkthrough = walkthrough.clone();
            let capture = capture.clone();
            listeners.add(document, "pointerlockchange", move |_e: Event| {
                let locked = capture.is_captured();
                walkthrough.borrow_mut().handle_event(&InputEvent::PointerLockChanged { locked });
            })?;
        }

        listeners.add(document, "pointerlockerror", |_e: Event| {
            tracing::warn!("pointer lock denied by the browser");
        })?;

        {
            let walkthrough = walkthrough.clone();
            listeners.add(window, "blur", move |_e: Event| {
                walkthrough.borrow_mut().handle_event(&InputEvent::FocusLost);
            })?;
        }

        {
            let doc = document.clone();
            listeners.add(document, "visibilitychange", move |_e: Event| {
                let visible = !doc.hidden();
                walkthrough.borrow_mut().handle_event(&InputEvent::VisibilityChanged { visible });
            })?;
        }

        Ok(listeners)
    }

    struct FrameState {
        window: Window,
        canvas: HtmlCanvasElement,
        pixel_ratio: f32,
        gpu: GpuContext,
        renderer: Renderer,
        walkthrough: Rc<RefCell<Walkthrough>>,
        egui_ctx: egui::Context,
        _listeners: ListenerSet,
    }

    impl FrameState {
        fn frame(&mut self) {
            self.handle_resize();

            let now = performance_now(&self.window);
            let mut walkthrough = self.walkthrough.borrow_mut();
            walkthrough.advance(now);

            let (width, height) = (self.gpu.config.width, self.gpu.config.height);
            let raw_input = ui::raw_input_for(width, height, self.pixel_ratio, now);
            let output = ui::build_ui(&self.egui_ctx, raw_input, &walkthrough);
            let primitives = self.egui_ctx.tessellate(output.shapes, output.pixels_per_point);
            let ui_frame = UiFrame {
                primitives,
                textures_delta: output.textures_delta,
                pixels_per_point: output.pixels_per_point,
            };

            match self.renderer.render(&self.gpu, walkthrough.view_proj(), ui_frame) {
                Ok(()) => {}
                Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => self.gpu.reconfigure(),
                Err(e) => tracing::warn!(error = ?e, "frame skipped"),
            }
        }

        /// Track the viewport and pixel ratio; the canvas fills the window.
        fn handle_resize(&mut self) {
            let Some((css_width, css_height, ratio)) = viewport_size(&self.window) else {
                return;
            };
            let (width, height) = ui::physical_size(css_width, css_height, ratio);
            let unchanged = width == self.gpu.config.width && height == self.gpu.config.height;
            if unchanged && ratio == self.pixel_ratio {
                return;
            }
            self.pixel_ratio = ratio;
            size_canvas(&self.canvas, css_width, css_height, width, height);
            self.gpu.resize(width, height);
            self.renderer.resize(&self.gpu.device, width, height);
            self.walkthrough
                .borrow_mut()
                .handle_event(&InputEvent::Resized { width, height });
        }
    }

    /// requestAnimationFrame loop; each frame schedules the next after it returns.
    struct AnimationLoop {
        window: Window,
        state: FrameState,
    }

    impl AnimationLoop {
        fn new(window: Window, state: FrameState) -> Self {
            Self { window, state }
        }

        /// Run until the page is hidden for good; `pagehide` drops the frame
        /// state, which deregisters every DOM listener.
        fn start(self) -> Result<(), JsValue> {
            let AnimationLoop { window, mut state } = self;
            let slot: LoopSlot<Closure<dyn FnMut()>> = LoopSlot::default();
            let pending: Rc<Cell<Option<i32>>> = Rc::new(Cell::new(None));

            {
                let slot_for_loop = slot.clone();
                let pending = pending.clone();
                let window_for_loop = window.clone();
                slot.install(Closure::wrap(Box::new(move || {
                    pending.set(None);
                    state.frame();

                    // Schedule next frame
                    let scheduled = slot_for_loop
                        .with(|cb| window_for_loop.request_animation_frame(cb.as_ref().unchecked_ref()));
                    match scheduled {
                        Some(Ok(handle)) => pending.set(Some(handle)),
                        Some(Err(e)) => tracing::error!(error = ?e, "requestAnimationFrame failed, stopping"),
                        None => {}
                    }
                }) as Box<dyn FnMut()>));
            }

            if let Some(handle) = slot.with(|cb| window.request_animation_frame(cb.as_ref().unchecked_ref())) {
                pending.set(Some(handle?));
            }

            let window_for_teardown = window.clone();
            let teardown = Closure::once_into_js(move || {
                if let Some(handle) = pending.take() {
                    let _ = window_for_teardown.cancel_animation_frame(handle);
                }
                if slot.teardown() {
                    tracing::info!("page hidden, walkthrough stopped");
                }
            });
            let options = web_sys::AddEventListenerOptions::new();
            options.set_once(true);
            window.add_event_listener_with_callback_and_add_event_listener_options(
                "pagehide",
                teardown.unchecked_ref(),
                &options,
            )?;
            Ok(())
        }
    }

    /// CSS viewport size and capped pixel ratio.
    fn viewport_size(window: &Window) -> Option<(f64, f64, f32)> {
        let css_width = window.inner_width().ok()?.as_f64()?;
        let css_height = window.inner_height().ok()?.as_f64()?;
        if css_width <= 0.0 || css_height <= 0.0 {
            return None;
        }
        Some((css_width, css_height, ui::capped_pixel_ratio(window.device_pixel_ratio())))
    }

    /// Drawing buffer in device pixels, displayed at the CSS size.
    fn size_canvas(canvas: &HtmlCanvasElement, css_width: f64, css_height: f64, width: u32, height: u32) {
        canvas.set_width(width);
        canvas.set_height(height);
        let style = canvas.style();
        let _ = style.set_property("width", &format!("{css_width}px"));
        let _ = style.set_property("height", &format!("{css_height}px"));
    }

    fn init_canvas() -> Result<(Window, Document, HtmlCanvasElement, f32), JsValue> {
        let window = web_sys::window().ok_or_else(|| js_error("no global `window`"))?;
        let document = window.document().ok_or_else(|| js_error("no document on window"))?;
        let body = document.body().ok_or_else(|| js_error("no body on document"))?;
        let canvas = document
            .create_element("canvas")?
            .dyn_into::<HtmlCanvasElement>()
            .map_err(|_| js_error("failed to create canvas"))?;
        let (css_width, css_height, ratio) = viewport_size(&window).unwrap_or((800.0, 600.0, 1.0));
        let (width, height) = ui::physical_size(css_width, css_height, ratio);
        size_canvas(&canvas, css_width, css_height, width, height);
        body.append_child(&canvas)?;
        Ok((window, document, canvas, ratio))
    }

    fn js_error(msg: impl std::fmt::Display) -> JsValue {
        JsValue::from_str(&msg.to_string())
    }

    impl From<WalkthroughError> for JsValue {
        fn from(e: WalkthroughError) -> Self {
            js_error(e)
        }
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen::prelude::wasm_bindgen(start)]
pub async fn start() -> Result<(), wasm_bindgen::JsValue> {
    web::start().await
}
