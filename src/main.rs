//! Sheepcount - count sheep crossing a moonlit field
//!
//! A new sheep sets off every couple of seconds while a quiet two-tone
//! lullaby fades in. Pausing freezes the flock and lets the lullaby fade away.

use anyhow::{anyhow, Context};
use clap::Parser;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use winit::{
    application::ApplicationHandler,
    event::*,
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use sheepcount::audio::{render_to_wav, DeviceToneSource};
use sheepcount::cli::Args;
use sheepcount::field::{build_scene, Field, Vertex};
use sheepcount::params::{FieldParams, RenderConfig, SessionTiming, ToneParams};
use sheepcount::rendering::RenderSystem;
use sheepcount::session::{count_label, CountDisplay, SessionController, SessionEvent};

/// Count display backed by the window title
struct WindowTitle {
    window: Arc<Window>,
}

impl CountDisplay for WindowTitle {
    fn show(&mut self, text: &str) {
        self.window.set_title(text);
    }
}

type Session = SessionController<Field, WindowTitle, DeviceToneSource>;

/// Main application state
struct App {
    // Window and rendering
    window: Option<Arc<Window>>,
    render_system: Option<RenderSystem>,
    scene: Vec<Vertex>,

    // Session (created once the window exists)
    session: Option<Session>,

    // Configuration
    render_config: RenderConfig,
    field_params: FieldParams,
    timing: SessionTiming,
    tone_params: Option<ToneParams>,
    autostart: bool,

    // Time tracking
    last_advance: Instant,

    /// Setup failure surfaced after the event loop exits
    error: Option<anyhow::Error>,
}

impl App {
    fn new(args: &Args) -> anyhow::Result<Self> {
        Ok(Self {
            window: None,
            render_system: None,
            scene: Vec::new(),
            session: None,
            render_config: RenderConfig::default(),
            field_params: args.field_params()?,
            timing: args.session_timing()?,
            tone_params: args.tone_params(),
            autostart: args.autostart,
            last_advance: Instant::now(),
            error: None,
        })
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<()> {
        let window_attributes = Window::default_attributes()
            .with_title(count_label(0))
            .with_inner_size(winit::dpi::LogicalSize::new(
                self.render_config.window_width,
                self.render_config.window_height,
            ));
        let window = Arc::new(
            event_loop
                .create_window(window_attributes)
                .context("failed to create window")?,
        );

        let render_system = pollster::block_on(RenderSystem::new(
            Arc::clone(&window),
            self.render_config.max_sheep,
        ))
        .map_err(|e| anyhow!(e))
        .context("failed to initialise renderer")?;

        let session = SessionController::new(
            Field::new(self.field_params.clone()),
            WindowTitle {
                window: Arc::clone(&window),
            },
            self.tone_params.clone().map(DeviceToneSource::new),
            self.timing.clone(),
        );

        info!("S / Enter: start counting   P / Space: pause   Esc: quit");

        self.window = Some(window);
        self.render_system = Some(render_system);
        self.session = Some(session);
        self.last_advance = Instant::now();

        if self.autostart {
            self.dispatch(SessionEvent::StartRequested);
        }
        Ok(())
    }

    /// Bring timers and sheep up to `now`, feeding completions back to the session
    fn advance_to(&mut self, now: Instant) {
        let dt = now.saturating_duration_since(self.last_advance);
        self.last_advance = now;

        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.tick(now);
        for id in session.presentation_mut().advance(dt) {
            session.handle(SessionEvent::UnitCompleted(id), now);
        }
    }

    fn dispatch(&mut self, event: SessionEvent) {
        let now = Instant::now();
        self.advance_to(now);
        if let Some(session) = self.session.as_mut() {
            session.handle(event, now);
        }
    }

    /// Render a single frame
    fn render_frame(&mut self) {
        self.advance_to(Instant::now());

        let (Some(render_system), Some(session)) =
            (self.render_system.as_mut(), self.session.as_ref())
        else {
            return;
        };

        build_scene(
            session.presentation(),
            render_system.aspect_ratio(),
            self.render_config.max_sheep,
            &mut self.scene,
        );

        if let Err(e) = render_system.render(&self.scene) {
            error!("Render error: {:?}", e);
        }
    }
}

impl ApplicationHandler for App {
    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return; // Already initialized
        }

        if let Err(e) = self.init(event_loop) {
            self.error = Some(e);
            event_loop.exit();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => {
                if let Some(render_system) = self.render_system.as_mut() {
                    render_system.resize(size.width, size.height);
                }
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        state: ElementState::Pressed,
                        physical_key: PhysicalKey::Code(code),
                        repeat: false,
                        ..
                    },
                ..
            } => match code {
                KeyCode::Escape => event_loop.exit(),
                KeyCode::KeyS | KeyCode::Enter | KeyCode::NumpadEnter => {
                    self.dispatch(SessionEvent::StartRequested)
                }
                KeyCode::KeyP | KeyCode::Space => self.dispatch(SessionEvent::StopRequested),
                _ => {}
            },
            WindowEvent::RedrawRequested => self.render_frame(),
            _ => {}
        }
    }
}

/// Write the lullaby lifecycle to `path` without opening a device
fn render_tone(args: &Args, path: &Path) -> anyhow::Result<()> {
    let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let frames = render_to_wav(
        &ToneParams::default(),
        args.sample_rate,
        args.sustain()?,
        BufWriter::new(file),
    )?;
    info!(path = %path.display(), frames, "lullaby written");
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    if let Some(path) = &args.render_tone {
        return render_tone(&args, path);
    }

    info!("Sheepcount - initializing...");

    let mut app = App::new(&args)?;
    let event_loop = EventLoop::new().context("failed to create event loop")?;
    event_loop.run_app(&mut app).context("event loop failed")?;

    if let Some(e) = app.error.take() {
        return Err(e);
    }
    if let Some(session) = &app.session {
        info!(count = session.count(), "goodnight");
    }
    Ok(())
}
