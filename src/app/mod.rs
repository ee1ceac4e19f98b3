//! Winit-based Application Shell
//!
//! - [`App`]: builder that opens the window and runs the event loop
//! - [`AppHandler`]: trait the application implements
//! - [`AppContext`]: everything a handler touches, passed by `&mut`
//!
//! # Example
//!
//! ```rust,ignore
//! use sss::app::{App, AppContext, AppHandler, default_controls};
//!
//! struct Viewer;
//!
//! impl AppHandler for Viewer {
//!     fn init(ctx: &mut AppContext) -> sss::errors::Result<Self> {
//!         ctx.renderer.load_model(&sss::assets::ModelAsset::unit_cube())?;
//!         Ok(Viewer)
//!     }
//!
//!     fn update(&mut self, ctx: &mut AppContext) {
//!         default_controls(ctx);
//!     }
//! }
//!
//! fn main() -> sss::errors::Result<()> {
//!     App::new().with_title("sss").run::<Viewer>()
//! }
//! ```

pub mod input;

pub use input::Input;

use std::sync::Arc;

use winit::application::ApplicationHandler;
use winit::event::{MouseButton, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::KeyCode;
pub use winit::window::{Window, WindowId};

use crate::errors::{Result, SssError};
use crate::renderer::backend::{WgpuBackend, WgpuContext};
use crate::renderer::{RenderConfig, Renderer, RendererSettings};
use crate::scene::{MoveDirection, SceneState};
use crate::utils::FrameTimer;

/// Everything the frame loop owns, handed to the [`AppHandler`] by
/// reference.
pub struct AppContext {
    pub window: Arc<Window>,
    pub renderer: Renderer<WgpuBackend>,
    pub scene: SceneState,
    pub config: RenderConfig,
    pub input: Input,
    pub timer: FrameTimer,
    /// Camera speed in world units per second for [`default_controls`].
    pub move_speed: f32,
    running: bool,
}

impl AppContext {
    /// Asks the loop to exit after the current event.
    pub fn stop(&mut self) {
        self.running = false;
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
    }
}

/// Application behaviour.
///
/// # Lifecycle
///
/// 1. [`init`](Self::init) once, after the renderer is ready
/// 2. [`on_event`](Self::on_event) for each window event
/// 3. [`update`](Self::update) each frame before rendering
pub trait AppHandler: Sized + 'static {
    /// An error here is fatal: it is logged and the loop exits.
    fn init(ctx: &mut AppContext) -> Result<Self>;

    /// Return `true` to consume the event and skip default handling of
    /// input. Resize, close and redraw are always handled.
    #[allow(unused_variables)]
    fn on_event(&mut self, ctx: &mut AppContext, event: &WindowEvent) -> bool {
        false
    }

    #[allow(unused_variables)]
    fn update(&mut self, ctx: &mut AppContext) {}
}

const MOVE_KEYS: [(KeyCode, MoveDirection); 6] = [
    (KeyCode::KeyW, MoveDirection::Front),
    (KeyCode::KeyS, MoveDirection::Back),
    (KeyCode::KeyD, MoveDirection::Right),
    (KeyCode::KeyA, MoveDirection::Left),
    (KeyCode::KeyE, MoveDirection::Up),
    (KeyCode::KeyQ, MoveDirection::Down),
];

const EXPOSURE_STEP: f32 = 0.1;

/// Default camera and configuration mapping.
///
/// WASD/QE move the camera, left-drag rotates it. B and T toggle blur and
/// transmittance, `+`/`-` adjust exposure.
pub fn default_controls(ctx: &mut AppContext) {
    let camera = &mut ctx.scene.camera;
    camera.set_speed(ctx.move_speed * ctx.timer.delta_seconds());
    for (key, direction) in MOVE_KEYS {
        if ctx.input.is_key_down(key) {
            camera.apply_move(direction);
        }
    }
    if ctx.input.is_button_pressed(MouseButton::Left) {
        let delta = ctx.input.cursor_delta;
        camera.apply_rotate(delta.x, -delta.y);
    }

    for (key, name) in [(KeyCode::KeyB, "enableBlur"), (KeyCode::KeyT, "enableTransmittance")] {
        if ctx.input.key_pressed(key) {
            match ctx.config.toggle(name) {
                Ok(on) => log::info!("{name}: {on}"),
                Err(e) => log::warn!("{e}"),
            }
        }
    }

    let mut exposure_step = 0.0;
    if ctx.input.key_pressed(KeyCode::Equal) || ctx.input.key_pressed(KeyCode::NumpadAdd) {
        exposure_step += EXPOSURE_STEP;
    }
    if ctx.input.key_pressed(KeyCode::Minus) || ctx.input.key_pressed(KeyCode::NumpadSubtract) {
        exposure_step -= EXPOSURE_STEP;
    }
    if exposure_step != 0.0 {
        match ctx.config.set("exposure", ctx.config.exposure() + exposure_step) {
            Ok(value) => log::info!("exposure: {value}"),
            Err(e) => log::warn!("{e}"),
        }
    }
}

/// Application builder.
///
/// ```rust,ignore
/// App::new()
///     .with_title("sss")
///     .with_size(1024, 576)
///     .with_settings(RendererSettings { vsync: false, ..Default::default() })
///     .run::<Viewer>()?;
/// ```
pub struct App {
    title: String,
    width: u32,
    height: u32,
    settings: RendererSettings,
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl App {
    #[must_use]
    pub fn new() -> Self {
        Self {
            title: "sss".into(),
            width: 1024,
            height: 576,
            settings: RendererSettings::default(),
        }
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Initial inner size in logical pixels.
    #[must_use]
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    #[must_use]
    pub fn with_settings(mut self, settings: RendererSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Blocks until the window closes or the loop is stopped.
    pub fn run<H: AppHandler>(self) -> Result<()> {
        let event_loop = EventLoop::new()?;
        event_loop.set_control_flow(ControlFlow::Poll);

        let mut runner = AppRunner::<H> {
            app: self,
            ctx: None,
            handler: None,
        };
        event_loop.run_app(&mut runner)?;
        Ok(())
    }
}

struct AppRunner<H: AppHandler> {
    app: App,
    ctx: Option<AppContext>,
    handler: Option<H>,
}

impl<H: AppHandler> AppRunner<H> {
    fn create_context(&self, window: Arc<Window>) -> Result<AppContext> {
        let size = window.inner_size();
        let settings = self.app.settings.clone();

        log::info!("Initializing Renderer Backend...");
        let gpu = pollster::block_on(WgpuContext::new(
            window.clone(),
            &settings,
            size.width,
            size.height,
        ))?;
        let (width, height) = gpu.size();
        let backend = WgpuBackend::new(gpu, &settings);

        let mut renderer = Renderer::new(backend, settings);
        renderer.init(width, height)?;

        let mut scene = SceneState::default();
        scene.camera.set_screen_size(width, height);
        let config = RenderConfig::default();
        scene.apply_config(&config);

        let mut input = Input::new();
        input.handle_resize(width, height);

        Ok(AppContext {
            window,
            renderer,
            scene,
            config,
            input,
            timer: FrameTimer::new(),
            move_speed: 1.0,
            running: true,
        })
    }

    fn redraw(ctx: &mut AppContext, handler: &mut H) {
        ctx.timer.tick();
        handler.update(ctx);
        ctx.scene.apply_config(&ctx.config);

        match ctx.renderer.render_frame(&ctx.scene, &ctx.config) {
            Ok(_) => {}
            Err(e @ SssError::SurfaceError(_)) => log::warn!("Frame skipped: {e}"),
            Err(e) => {
                log::error!("Frame error, stopping: {e}");
                ctx.stop();
            }
        }
        ctx.input.end_frame();
    }
}

impl<H: AppHandler> ApplicationHandler for AppRunner<H> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.ctx.is_some() {
            return;
        }

        let attributes = Window::default_attributes()
            .with_title(&self.app.title)
            .with_inner_size(winit::dpi::LogicalSize::new(self.app.width, self.app.height));
        let window = match event_loop.create_window(attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("Fatal Renderer Error: {e}");
                event_loop.exit();
                return;
            }
        };

        let mut ctx = match self.create_context(window) {
            Ok(ctx) => ctx,
            Err(e) => {
                log::error!("Fatal Renderer Error: {e}");
                event_loop.exit();
                return;
            }
        };
        match H::init(&mut ctx) {
            Ok(handler) => self.handler = Some(handler),
            Err(e) => {
                log::error!("Fatal Renderer Error: {e}");
                event_loop.exit();
                return;
            }
        }
        ctx.timer = FrameTimer::new();
        self.ctx = Some(ctx);
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        let (Some(ctx), Some(handler)) = (&mut self.ctx, &mut self.handler) else {
            return;
        };

        if !handler.on_event(ctx, &event) {
            ctx.input.process_window_event(&event);
        }

        match event {
            WindowEvent::CloseRequested => ctx.stop(),
            WindowEvent::Resized(size) => {
                ctx.scene.camera.set_screen_size(size.width, size.height);
                if let Err(e) = ctx.renderer.on_resize(size.width, size.height) {
                    log::error!("{e}");
                }
            }
            WindowEvent::RedrawRequested => {
                Self::redraw(ctx, handler);
                ctx.window.request_redraw();
            }
            _ => {}
        }

        if !ctx.is_running() {
            ctx.renderer.teardown();
            event_loop.exit();
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(ctx) = &self.ctx {
            ctx.window.request_redraw();
        }
    }
}
