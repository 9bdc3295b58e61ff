//! SolGfx demo
//!
//! Opens a window, brings up the Vulkan device and presentation layer and
//! clears the back buffer every frame. F2 toggles 4x MSAA, dragging with the
//! left button tints the clear color, Escape quits.

use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use sol_gfx::solgfx::log::install_log_bridge;
use sol_gfx::solgfx::{
    Error, FrameContext, FrameController, FrameHandler, FrameStats, GameTimer, GfxConfig, Gfx,
    Instance, PointerButton, PointerButtons, Result, SurfaceTarget,
};
use sol_gfx::{gfx_debug, gfx_info};
use sol_gfx_vulkan::{print_validation_stats_report, VulkanFactory};
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

const SOURCE: &str = "solgfx::demo";

/// Light steel blue
const CLEAR_COLOR: [f32; 4] = [0.69, 0.77, 0.87, 1.0];

/// Clears color and depth; the pointer tints the color while dragging
#[derive(Default)]
struct ClearRenderer {
    pointer_x: f64,
    dragging: bool,
}

impl FrameHandler for ClearRenderer {
    fn on_update(&mut self, _timer: &GameTimer) {}

    fn on_draw(&mut self, frame: &mut FrameContext<'_>) -> Result<()> {
        let mut color = CLEAR_COLOR;
        if self.dragging {
            let width = f64::from(frame.viewport().width).max(1.0);
            color[0] = (self.pointer_x / width).clamp(0.0, 1.0) as f32;
        }
        frame.clear_back_buffer(color)?;
        frame.clear_depth_stencil()
    }

    fn on_pointer_down(&mut self, button: PointerButton, x: f64, _y: f64) {
        if button == PointerButton::Left {
            self.dragging = true;
            self.pointer_x = x;
        }
    }

    fn on_pointer_up(&mut self, button: PointerButton, _x: f64, _y: f64) {
        if button == PointerButton::Left {
            self.dragging = false;
        }
    }

    fn on_pointer_move(&mut self, buttons: PointerButtons, x: f64, _y: f64) {
        if buttons.contains(PointerButtons::LEFT) {
            self.pointer_x = x;
        }
    }
}

struct DemoApp {
    config: GfxConfig,
    window: Option<Window>,
    controller: Option<FrameController>,
    renderer: ClearRenderer,
    timer: GameTimer,
    stats: FrameStats,
    buttons: PointerButtons,
    cursor: (f64, f64),
    focused: bool,
    exit_code: i32,
}

impl DemoApp {
    fn new(config: GfxConfig) -> Self {
        Self {
            config,
            window: None,
            controller: None,
            renderer: ClearRenderer::default(),
            timer: GameTimer::new(),
            stats: FrameStats::new(),
            buttons: PointerButtons::empty(),
            cursor: (0.0, 0.0),
            focused: true,
            exit_code: 0,
        }
    }

    /// Report a fatal error and stop the event loop
    fn fail(&mut self, event_loop: &ActiveEventLoop, err: &Error) {
        eprintln!("Fatal error during {}: {}", err.stage(), err);
        self.exit_code = err.exit_code();
        event_loop.exit();
    }

    fn create_controller(&self, window: &Window) -> Result<FrameController> {
        let display = window
            .display_handle()
            .map_err(|e| Error::FactoryCreation(format!("No display handle: {}", e)))?
            .as_raw();
        let native = window
            .window_handle()
            .map_err(|e| Error::SurfaceRebuild(format!("No window handle: {}", e)))?
            .as_raw();

        let factory = VulkanFactory::new(display, &self.config)?;
        let instance = Instance::initialize(Box::new(factory), self.config.prefer_high_performance)?;

        let size = window.inner_size();
        let mut controller = FrameController::new(self.config.clone());
        controller.initialize(
            instance,
            0,
            SurfaceTarget { display, window: native },
            size.width,
            size.height,
        )?;
        Ok(controller)
    }

    /// The timer runs only while the window is focused and visible
    fn update_pause(&mut self) {
        let minimized = self.controller.as_ref().map(|c| c.is_minimized()).unwrap_or(false);
        if self.focused && !minimized {
            self.timer.start();
        } else {
            self.timer.stop();
        }
    }

    fn draw(&mut self, event_loop: &ActiveEventLoop) {
        let Some(controller) = self.controller.as_mut() else {
            return;
        };
        self.timer.tick();
        if self.timer.is_paused() {
            return;
        }

        match controller.run_frame(&mut self.renderer, &self.timer) {
            Ok(true) => {
                if self.stats.record_frame(self.timer.total_time()) {
                    if let Some(window) = &self.window {
                        window.set_title(&self.stats.window_title(&self.config.app_name));
                    }
                }
            }
            Ok(false) => {}
            Err(e) => self.fail(event_loop, &e),
        }
    }

    fn resize(&mut self, event_loop: &ActiveEventLoop, size: PhysicalSize<u32>) {
        if let Some(controller) = self.controller.as_mut() {
            if let Err(e) = controller.on_resize(size.width, size.height) {
                self.fail(event_loop, &e);
                return;
            }
        }
        self.update_pause();
    }

    fn toggle_msaa(&mut self, event_loop: &ActiveEventLoop) {
        let Some(controller) = self.controller.as_mut() else {
            return;
        };
        let enable = !controller.msaa_4x();
        match controller.set_4x_msaa(enable) {
            Ok(_) => gfx_info!(SOURCE, "4x MSAA {}", if enable { "on" } else { "off" }),
            Err(e) => self.fail(event_loop, &e),
        }
    }

    fn shutdown(&mut self) {
        if let Some(mut controller) = self.controller.take() {
            if let Err(e) = controller.destroy() {
                eprintln!("Shutdown error during {}: {}", e.stage(), e);
                if self.exit_code == 0 {
                    self.exit_code = e.exit_code();
                }
            }
        }
        self.window = None;
        if self.config.enable_validation {
            print_validation_stats_report();
        }
    }
}

impl ApplicationHandler for DemoApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let attributes = Window::default_attributes()
            .with_title(self.config.app_name.clone())
            .with_inner_size(PhysicalSize::new(self.config.initial_width, self.config.initial_height));
        let window = match event_loop.create_window(attributes) {
            Ok(window) => window,
            Err(e) => {
                eprintln!("Failed to create window: {}", e);
                self.exit_code = 1;
                event_loop.exit();
                return;
            }
        };

        match self.create_controller(&window) {
            Ok(controller) => {
                gfx_info!(SOURCE, "Initialization complete, entering main loop");
                self.controller = Some(controller);
                self.window = Some(window);
                self.timer.reset();
            }
            Err(e) => self.fail(event_loop, &e),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                gfx_info!(SOURCE, "Close requested, shutting down");
                event_loop.exit();
            }
            WindowEvent::Resized(size) => self.resize(event_loop, size),
            WindowEvent::Focused(focused) => {
                self.focused = focused;
                self.update_pause();
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state != ElementState::Pressed || event.repeat {
                    return;
                }
                match event.physical_key {
                    PhysicalKey::Code(KeyCode::F2) => self.toggle_msaa(event_loop),
                    PhysicalKey::Code(KeyCode::Escape) => event_loop.exit(),
                    _ => {}
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = (position.x, position.y);
                self.renderer.on_pointer_move(self.buttons, position.x, position.y);
            }
            WindowEvent::MouseInput { state, button, .. } => {
                let button = PointerButton::from(button);
                let (x, y) = self.cursor;
                if state == ElementState::Pressed {
                    self.buttons.insert(PointerButtons::from(button));
                    self.renderer.on_pointer_down(button, x, y);
                } else {
                    self.buttons.remove(PointerButtons::from(button));
                    self.renderer.on_pointer_up(button, x, y);
                }
            }
            WindowEvent::RedrawRequested => self.draw(event_loop),
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        gfx_debug!(SOURCE, "Event loop exiting");
        self.shutdown();
    }
}

fn main() {
    let config = GfxConfig::from_env();
    Gfx::set_min_severity(config.min_log_severity);
    install_log_bridge(config.min_log_severity);

    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(e) => {
            eprintln!("Failed to create event loop: {}", e);
            std::process::exit(1);
        }
    };
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = DemoApp::new(config);
    if let Err(e) = event_loop.run_app(&mut app) {
        eprintln!("Event loop error: {}", e);
        if app.exit_code == 0 {
            app.exit_code = 1;
        }
    }

    // `process::exit` skips destructors
    app.shutdown();
    let exit_code = app.exit_code;
    drop(app);
    std::process::exit(exit_code);
}
