use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use log::info;
use pollster::block_on;
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use spinning_cube::shader::{DEFAULT_FRAGMENT_SHADER, DEFAULT_VERTEX_SHADER};
use spinning_cube::uniforms::UNIFORM_NAMES;
use spinning_cube::{
    build_program, scene_vertices, start, FrameClock, LinkedProgram, Renderer, Scene, Session,
    ShaderSources, Viewport, WindowInitError, WindowSettings,
};

const USAGE: &str =
    "Usage: spinning-cube [--vertex <shader.wgsl>] [--fragment <shader.wgsl>] [--check-shaders]";

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let clock = FrameClock::start();
    let options = CliOptions::parse()?;
    let sources = ShaderSources::load(&options.vertex, &options.fragment)?;

    if options.check_only {
        print_program_summary(&build_program(&sources)?);
        return Ok(());
    }
    run_interactive(sources, clock)
}

fn print_program_summary(program: &LinkedProgram) {
    println!(
        "Linked shader program ({} / {})",
        program.vertex.entry_point, program.fragment.entry_point
    );
    for block in program.uniforms.blocks() {
        println!(
            " - block {} at binding {} ({} bytes, {:?})",
            block.name,
            block.binding,
            block.size,
            block.visibility()
        );
    }
    for name in UNIFORM_NAMES {
        println!("   {name}: {}", program.uniforms.location(name));
    }
}

fn run_interactive(sources: ShaderSources, clock: FrameClock) -> Result<()> {
    let event_loop =
        EventLoop::new().map_err(|err| WindowInitError::from_error("event loop", err))?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let settings = WindowSettings::default();
    let mut app = AppState {
        viewport: Viewport::new(settings.width, settings.height),
        settings,
        sources,
        session: None,
        clock,
        exit_requested: false,
        last_error: None,
    };

    event_loop
        .run_app(&mut app)
        .context("event loop terminated abnormally")?;

    if let Some(err) = app.last_error {
        return Err(err);
    }
    Ok(())
}

struct AppState {
    settings: WindowSettings,
    sources: ShaderSources,
    session: Option<Session<Renderer>>,
    viewport: Viewport,
    clock: FrameClock,
    exit_requested: bool,
    last_error: Option<anyhow::Error>,
}

impl AppState {
    fn init_renderer(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attributes = Window::default_attributes()
            .with_title(self.settings.title.clone())
            .with_inner_size(LogicalSize::new(self.settings.width, self.settings.height));
        let window = Arc::new(
            event_loop
                .create_window(attributes)
                .map_err(|err| WindowInitError::from_error("window", err))?,
        );

        self.viewport = Viewport::from(window.inner_size());
        info!(
            "Starting viewport: (width: {}, height: {})",
            self.viewport.width, self.viewport.height
        );

        let session = start(
            &self.sources,
            Scene::default(),
            self.viewport,
            self.clock.elapsed_secs(),
            |program| block_on(Renderer::new(window, program, &scene_vertices())),
        )?;
        self.session = Some(session);
        Ok(())
    }

    fn process_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) -> Result<()> {
        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };
        if window_id != session.target.window_id() {
            return Ok(());
        }

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                self.viewport.update(size.width, size.height);
                session.target.resize(size);
                info!(
                    "New viewport: (width: {}, height: {})",
                    size.width, size.height
                );
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(KeyCode::Escape),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => {
                self.exit_requested = true;
            }
            WindowEvent::RedrawRequested => {
                let elapsed = self.clock.elapsed_secs();
                if let Err(err) = session.render(self.viewport, elapsed) {
                    match err {
                        wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => {
                            let size = session.target.window().inner_size();
                            session.target.resize(size);
                        }
                        wgpu::SurfaceError::Timeout => {
                            info!("Surface timeout; retrying next frame");
                        }
                        other => return Err(anyhow!("rendering failed: {other}")),
                    }
                }
                if self.exit_requested {
                    event_loop.exit();
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        self.last_error = Some(err);
        event_loop.exit();
    }
}

impl ApplicationHandler for AppState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.session.is_some() || self.last_error.is_some() {
            return;
        }
        if let Err(err) = self.init_renderer(event_loop) {
            self.fail(event_loop, err);
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        if let Err(err) = self.process_event(event_loop, window_id, event) {
            self.fail(event_loop, err);
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(session) = self.session.as_ref() {
            session.target.window().request_redraw();
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
struct CliOptions {
    vertex: PathBuf,
    fragment: PathBuf,
    check_only: bool,
}

impl CliOptions {
    fn parse() -> Result<Self> {
        Self::from_args(env::args().skip(1))
    }

    fn from_args(args: impl IntoIterator<Item = String>) -> Result<Self> {
        let mut options = Self {
            vertex: PathBuf::from(DEFAULT_VERTEX_SHADER),
            fragment: PathBuf::from(DEFAULT_FRAGMENT_SHADER),
            check_only: false,
        };
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--vertex" => options.vertex = required_value(&mut args, &arg)?,
                "--fragment" => options.fragment = required_value(&mut args, &arg)?,
                "--check-shaders" => options.check_only = true,
                other => return Err(anyhow!("Unknown argument: {other}. {USAGE}")),
            }
        }
        Ok(options)
    }
}

fn required_value(args: &mut impl Iterator<Item = String>, flag: &str) -> Result<PathBuf> {
    args.next()
        .map(PathBuf::from)
        .ok_or_else(|| anyhow!("{flag} expects a path. {USAGE}"))
}
