//! Interactive window.
//!
//! Each redraw runs one simulation frame, composes it on the CPU and hands
//! the image to the GPU for display. Hotkeys are described in
//! [`input`](crate::input).

use std::path::PathBuf;
use std::sync::Arc;

use image::RgbaImage;
use rand::rngs::StdRng;
use rand::SeedableRng;
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Fullscreen, Window, WindowId};

use crate::compositor::{save_png, Compositor};
use crate::error::SimulationError;
use crate::gpu::GpuState;
use crate::input::{Command, Input, MouseButton, RANDOMIZE_AMOUNT};
use crate::session::Session;

/// The interactive viewer.
pub struct Viewer {
    session: Session,
    compositor: Compositor,
    input: Input,
    last_frame: Option<RgbaImage>,
    window: Option<Arc<Window>>,
    gpu: Option<GpuState>,
    rng: StdRng,
    snapshot_dir: PathBuf,
    state_path: Option<PathBuf>,
    error: Option<SimulationError>,
    #[cfg(feature = "egui")]
    panel: crate::ui::PanelState,
}

impl Viewer {
    pub fn new(session: Session) -> Result<Self, SimulationError> {
        let settings = session.sim().settings();
        let compositor = Compositor::new(settings.render_size)?;
        let rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed ^ 0x5eed),
            None => StdRng::from_entropy(),
        };
        #[cfg(feature = "egui")]
        let panel = crate::ui::PanelState::new(settings);

        Ok(Self {
            session,
            compositor,
            input: Input::new(),
            last_frame: None,
            window: None,
            gpu: None,
            rng,
            snapshot_dir: PathBuf::from("."),
            state_path: None,
            error: None,
            #[cfg(feature = "egui")]
            panel,
        })
    }

    /// Directory PNG snapshots are written to.
    pub fn with_snapshot_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.snapshot_dir = dir.into();
        self
    }

    /// File the last state is written to when the window closes.
    pub fn with_state_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.state_path = Some(path.into());
        self
    }

    /// Open the window and run until it is closed.
    pub fn run(mut self) -> Result<Session, SimulationError> {
        let event_loop = EventLoop::new()?;
        event_loop.set_control_flow(ControlFlow::Poll);
        event_loop.run_app(&mut self)?;
        match self.error.take() {
            Some(e) => Err(e),
            None => Ok(self.session),
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: SimulationError) {
        tracing::error!("{}", error);
        self.error = Some(error);
        event_loop.exit();
    }

    fn save_state(&self) {
        if let Some(path) = &self.state_path {
            if let Err(e) = self.session.save_last_state(path) {
                tracing::warn!("failed to save last state: {}", e);
            }
        }
    }

    fn save_snapshot(&self) {
        let Some(frame) = &self.last_frame else {
            return;
        };
        let name = chrono::Local::now()
            .format("physarum-%Y%m%d-%H%M%S%.3f.png")
            .to_string();
        let path = self.snapshot_dir.join(name);
        match save_png(frame, &path) {
            Ok(()) => tracing::info!(path = %path.display(), "frame saved"),
            Err(e) => tracing::warn!("failed to save frame: {}", e),
        }
    }

    fn toggle_fullscreen(&self) {
        if let Some(window) = &self.window {
            let next = match window.fullscreen() {
                Some(_) => None,
                None => Some(Fullscreen::Borderless(None)),
            };
            window.set_fullscreen(next);
        }
    }

    fn apply_command(&mut self, command: Command) {
        match command {
            Command::SelectPreset(index) => {
                self.session.select_preset(index);
            }
            Command::Freeze => self.session.freeze(),
            Command::TogglePause => {
                let paused = self.session.sim_mut().toggle_paused();
                tracing::info!(paused, "updates toggled");
            }
            Command::SaveFrame => self.save_snapshot(),
            Command::Reset => {
                if let Err(e) = self.session.sim_mut().reset() {
                    tracing::warn!("reset failed: {}", e);
                }
                self.compositor.clear();
            }
            Command::LogParams => {
                tracing::info!("current parameters: {:?}", self.session.sim().params().as_slice());
            }
            Command::Randomize => self.session.randomize(RANDOMIZE_AMOUNT, &mut self.rng),
            Command::ConvergeFaster => {
                let rate = self.session.sim_mut().converge_faster();
                tracing::info!(rate, "convergence speed");
            }
            Command::ConvergeSlower => {
                let rate = self.session.sim_mut().converge_slower();
                tracing::info!(rate, "convergence speed");
            }
            Command::ToggleFullscreen => self.toggle_fullscreen(),
        }
    }

    /// Advance one frame and compose it.
    fn update(&mut self) {
        let commands: Vec<Command> = self.input.commands().collect();
        for command in commands {
            self.apply_command(command);
        }

        let zoom = self.session.sim().settings().canvas_zoom;
        let cursor = self.input.mouse_field(zoom);
        let pressed = self.input.mouse_held(MouseButton::Left);
        let pointer = self.session.sim_mut().pointer_mut();
        pointer.set_cursor(cursor.x, cursor.y);
        pointer.set_pressed(pressed);
        self.input.begin_frame();

        let render_size = self.session.sim().settings().render_size;
        if self.compositor.size() != render_size {
            if let Err(e) = self.compositor.resize(render_size) {
                tracing::warn!("keeping {}px canvas: {}", self.compositor.size(), e);
            }
        }

        let view = self.session.step();
        self.last_frame = Some(self.compositor.render(&view));
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        self.update();

        let zoom = self.session.sim().settings().canvas_zoom;
        let (Some(gpu), Some(window)) = (self.gpu.as_mut(), self.window.as_ref()) else {
            return;
        };
        if let Some(frame) = &self.last_frame {
            gpu.upload(frame);
        }
        gpu.set_zoom(zoom);

        #[cfg(feature = "egui")]
        let (result, ui_commands) = {
            let mut ui_commands = Vec::new();
            let session = &mut self.session;
            let panel = &mut self.panel;
            let result = gpu.render_with_ui(window, |ctx| {
                ui_commands.extend(crate::ui::panel(ctx, session, panel));
            });
            (result, ui_commands)
        };
        #[cfg(not(feature = "egui"))]
        let result = gpu.render();

        match result {
            Ok(()) => {}
            Err(wgpu::SurfaceError::Lost) | Err(wgpu::SurfaceError::Outdated) => gpu.reconfigure(),
            Err(wgpu::SurfaceError::OutOfMemory) => event_loop.exit(),
            Err(e) => tracing::warn!("render error: {:?}", e),
        }
        window.request_redraw();

        #[cfg(feature = "egui")]
        for command in ui_commands {
            self.apply_command(command);
        }
    }
}

impl ApplicationHandler for Viewer {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        let window_attrs = Window::default_attributes()
            .with_title("Physarum")
            .with_inner_size(winit::dpi::LogicalSize::new(900, 900));

        let window = match event_loop.create_window(window_attrs) {
            Ok(window) => Arc::new(window),
            Err(e) => return self.fail(event_loop, e.into()),
        };
        let size = window.inner_size();
        self.input.set_window_size(size.width, size.height);

        let settings = self.session.sim().settings();
        let gpu = pollster::block_on(GpuState::new(
            window.clone(),
            settings.render_size,
            settings.canvas_zoom,
        ));
        match gpu {
            Ok(gpu) => {
                self.gpu = Some(gpu);
                window.request_redraw();
                self.window = Some(window);
            }
            Err(e) => self.fail(event_loop, e.into()),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        #[cfg(feature = "egui")]
        if let (Some(gpu), Some(window)) = (self.gpu.as_mut(), self.window.as_ref()) {
            let egui = gpu.egui();
            if egui.on_window_event(window, &event) {
                return;
            }
            if egui.wants_keyboard() && matches!(event, WindowEvent::KeyboardInput { .. }) {
                return;
            }
        }

        self.input.handle_event(&event);

        match event {
            WindowEvent::CloseRequested => {
                self.save_state();
                event_loop.exit();
            }
            WindowEvent::Resized(physical_size) => {
                if let Some(gpu) = &mut self.gpu {
                    gpu.resize(physical_size);
                }
            }
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            _ => {}
        }
    }
}
