use std::sync::Arc;
use std::time::{Duration, Instant};

use winit::{
    application::ApplicationHandler,
    dpi::{PhysicalPosition, PhysicalSize},
    event::{ElementState, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::rendering::{GpuContext, ParticleKernels, Presented, Renderer};
use crate::simulation::controls::{Command, HeldControl, HeldKeys};
use crate::simulation::{Flow, Simulation};

const FPS_INTERVAL: Duration = Duration::from_secs(1);

// Field order is drop order: compute side first, then the renderer.
struct State {
    simulation: Simulation<ParticleKernels>,
    renderer: Renderer,
}

impl State {
    async fn new(window: Arc<Window>, config: &Config) -> Result<Self> {
        let connection = GpuContext::connect(window.clone(), config).await?;
        let kernels = ParticleKernels::new(connection.context.clone(), config)?;
        let renderer = Renderer::new(window, connection, config);
        let simulation = Simulation::new(
            kernels,
            config.particle_count,
            config.layout,
            config.aspect_ratio(),
        )?;

        Ok(Self {
            simulation,
            renderer,
        })
    }

    fn frame(&mut self, held: &HeldKeys) -> Result<Presented> {
        self.simulation.advance(held)?;

        let view = self.simulation.view_uniforms(self.renderer.viewport());
        let particles = self.simulation.particles()?;
        self.renderer.render(
            &view,
            self.simulation.background(),
            particles,
            self.simulation.particle_count(),
        )
    }
}

/// Counts presented frames and reports the rate once per interval.
#[derive(Debug)]
struct FpsCounter {
    frames: u32,
    since: Instant,
}

impl FpsCounter {
    fn starting_at(since: Instant) -> Self {
        Self { frames: 0, since }
    }

    fn tick(&mut self, now: Instant) -> Option<u32> {
        self.frames += 1;
        if now.duration_since(self.since) < FPS_INTERVAL {
            return None;
        }
        let frames = self.frames;
        self.frames = 0;
        self.since = now;
        Some(frames)
    }
}

fn fps_title(frames: u32) -> String {
    format!("{frames} FPS")
}

fn command_for(key: KeyCode) -> Option<Command> {
    match key {
        KeyCode::Space => Some(Command::TogglePause),
        KeyCode::Escape => Some(Command::Quit),
        KeyCode::KeyE => Some(Command::ToggleExplode),
        KeyCode::KeyC => Some(Command::ClearAttractors),
        KeyCode::KeyF => Some(Command::ToggleFreezeHue),
        KeyCode::KeyN => Some(Command::ToggleSpawn),
        KeyCode::Enter | KeyCode::NumpadEnter => Some(Command::Reset),
        _ => None,
    }
}

fn held_control_for(key: KeyCode) -> Option<HeldControl> {
    match key {
        KeyCode::KeyX => Some(HeldControl::Brighten),
        KeyCode::KeyZ => Some(HeldControl::Darken),
        KeyCode::ArrowLeft => Some(HeldControl::Saturate),
        KeyCode::ArrowRight => Some(HeldControl::Desaturate),
        KeyCode::ArrowUp => Some(HeldControl::RaiseValue),
        KeyCode::ArrowDown => Some(HeldControl::LowerValue),
        KeyCode::KeyW => Some(HeldControl::DollyIn),
        KeyCode::KeyS => Some(HeldControl::DollyOut),
        KeyCode::KeyD => Some(HeldControl::PanRight),
        KeyCode::KeyA => Some(HeldControl::PanLeft),
        KeyCode::Equal | KeyCode::NumpadAdd => Some(HeldControl::GrowPoints),
        KeyCode::Minus | KeyCode::NumpadSubtract => Some(HeldControl::ShrinkPoints),
        _ => None,
    }
}

/// Window pixels to [-1, 1] on both axes, y pointing up.
fn normalize_pointer(position: PhysicalPosition<f64>, size: PhysicalSize<u32>) -> (f32, f32) {
    let width = f64::from(size.width.max(1));
    let height = f64::from(size.height.max(1));
    let x = position.x * 2.0 / width - 1.0;
    let y = -(position.y * 2.0 / height - 1.0);
    (x as f32, y as f32)
}

fn scroll_amounts(delta: MouseScrollDelta) -> (f32, f32) {
    match delta {
        MouseScrollDelta::LineDelta(x, y) => (x, y),
        MouseScrollDelta::PixelDelta(position) => (position.x as f32, position.y as f32),
    }
}

pub(crate) struct App {
    config: Config,
    state: Option<State>,
    held: HeldKeys,
    fps: FpsCounter,
    fatal: Option<Error>,
}

impl App {
    fn new(config: Config) -> Self {
        Self {
            config,
            state: None,
            held: HeldKeys::new(),
            fps: FpsCounter::starting_at(Instant::now()),
            fatal: None,
        }
    }

    fn start(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let [width, height] = self.config.window_size;
        let window = Arc::new(
            event_loop.create_window(
                Window::default_attributes()
                    .with_title("FPS")
                    .with_inner_size(PhysicalSize::new(width, height)),
            )?,
        );

        log::info!(
            "starting with {} particles ({:?} layout)",
            self.config.particle_count,
            self.config.layout
        );
        let state = pollster::block_on(State::new(window.clone(), &self.config))?;
        self.state = Some(state);
        self.fps = FpsCounter::starting_at(Instant::now());

        window.request_redraw();
        Ok(())
    }

    fn handle(&mut self, event_loop: &ActiveEventLoop, event: WindowEvent) -> Result<()> {
        let Some(state) = self.state.as_mut() else {
            return Ok(());
        };

        match event {
            WindowEvent::CloseRequested => {
                log::info!("close requested");
                event_loop.exit();
            }
            WindowEvent::RedrawRequested => {
                if state.frame(&self.held)? == Presented::Yes {
                    if let Some(frames) = self.fps.tick(Instant::now()) {
                        state.renderer.get_window().set_title(&fps_title(frames));
                    }
                }
                // Emits a new redraw requested event.
                state.renderer.get_window().request_redraw();
            }
            WindowEvent::Resized(size) => {
                // Reconfigures the size of the surface. We do not re-render
                // here as this event is always followed up by redraw request.
                state.renderer.resize(size);
            }
            WindowEvent::CursorMoved { position, .. } => {
                let (x, y) = normalize_pointer(position, state.renderer.get_size());
                state.simulation.pointer_moved(x, y);
            }
            WindowEvent::MouseInput {
                state: ElementState::Pressed,
                button: MouseButton::Left,
                ..
            } => state.simulation.pin_attractor(),
            WindowEvent::MouseWheel { delta, .. } => {
                let (horizontal, vertical) = scroll_amounts(delta);
                if state.simulation.scroll(horizontal, vertical)? {
                    // Show the zoomed field straight away
                    state.frame(&self.held)?;
                }
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key_code),
                        state: key_state,
                        repeat,
                        ..
                    },
                ..
            } => match key_state {
                ElementState::Pressed => {
                    if let Some(control) = held_control_for(key_code) {
                        self.held.insert(control);
                    }
                    if let Some(command) = command_for(key_code).filter(|_| !repeat) {
                        log::debug!("{command:?}");
                        if state.simulation.apply(command)? == Flow::Exit {
                            event_loop.exit();
                        }
                    }
                }
                ElementState::Released => {
                    if let Some(control) = held_control_for(key_code) {
                        self.held.remove(&control);
                    }
                }
            },
            WindowEvent::Focused(false) => self.held.clear(),
            _ => (),
        }
        Ok(())
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: Error) {
        log::error!("{err}");
        if self.fatal.is_none() {
            self.fatal = Some(err);
        }
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() || self.fatal.is_some() {
            return;
        }
        if let Err(err) = self.start(event_loop) {
            self.fail(event_loop, err);
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        if self.fatal.is_some() {
            return;
        }
        if let Err(err) = self.handle(event_loop, event) {
            self.fail(event_loop, err);
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        let Some(state) = self.state.take() else {
            return;
        };
        if let Err(err) = state.renderer.flush() {
            log::error!("{err}");
        }
        let State {
            simulation,
            renderer,
        } = state;
        drop(simulation);
        drop(renderer);
        log::info!("shut down");
    }
}

pub(crate) fn run(config: Config) -> Result<()> {
    // Create event loop
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(config);
    event_loop.run_app(&mut app)?;

    match app.fatal {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
