mod ui;

use moodviz::audio::SourcePipe;
use moodviz::{Config, PerformanceMode, SurfaceKind, VisualizerEngine};
use nannou::prelude::*;
use std::cell::RefCell;
use std::env;
use std::path::Path;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use ui::bindings::{parse_key, Action};

/// How long a status notification stays on screen (seconds)
const NOTIFICATION_SECS: f32 = 2.0;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("moodviz=info")),
        )
        .init();

    nannou::app(model).update(update).run();
}

struct Model {
    /// The view callback only gets `&Model` but drawing advances surface state
    engine: RefCell<VisualizerEngine>,
    source: SourcePipe,
    fullscreen: bool,
    playing: bool,
    notification: Option<(String, f32)>,
}

impl Model {
    fn show_notification(&mut self, text: impl Into<String>, now: f32) {
        self.notification = Some((text.into(), now + NOTIFICATION_SECS));
    }

    fn surface_kind(&self) -> SurfaceKind {
        if self.fullscreen {
            SurfaceKind::Fullscreen
        } else {
            SurfaceKind::Inline
        }
    }
}

/// Value following `flag` on the command line, if any
fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

fn load_analysis(engine: &mut VisualizerEngine, path: &Path) -> moodviz::Result<()> {
    let json = std::fs::read_to_string(path)?;
    engine.set_track_analysis_json(&json)
}

fn model(app: &App) -> Model {
    let args: Vec<String> = env::args().collect();
    app.set_exit_on_escape(false);

    let window = app
        .new_window()
        .title("moodviz")
        .size(1024, 640)
        .min_size(320, 200)
        .view(view)
        .key_pressed(key_pressed)
        .resized(resized)
        .focused(focused)
        .unfocused(unfocused)
        .build();
    if let Err(err) = window {
        error!(%err, "failed to open window");
        std::process::exit(1);
    }

    let config = Config::load();
    let mut engine = VisualizerEngine::new(config.engine());

    if let Some(name) = flag_value(&args, "--mode") {
        // Rejection is logged by the engine; the configured mode stays
        let _ = engine.set_mode(name);
    }
    if let Some(path) = flag_value(&args, "--analysis") {
        match load_analysis(&mut engine, Path::new(path)) {
            Ok(()) => info!(path, "track analysis loaded"),
            Err(err) => warn!(path, %err, "ignoring track analysis"),
        }
    }

    let bounds = app.window_rect();
    engine.resize(SurfaceKind::Inline, bounds.w(), bounds.h());
    engine.set_playing(true);
    engine.start();

    let source = SourcePipe::new();
    if !source.is_capturing() {
        warn!("no capture device opened, showing idle frames");
    }

    info!(mode = %engine.mode(), performance = %engine.performance_mode(), "moodviz started");

    Model {
        engine: RefCell::new(engine),
        source,
        fullscreen: false,
        playing: true,
        notification: None,
    }
}

fn update(app: &App, model: &mut Model, update: Update) {
    let dt_ms = update.since_last.as_secs_f64() * 1000.0;
    model
        .engine
        .get_mut()
        .tick(dt_ms, Some(&mut model.source));

    if let Some((_, until)) = &model.notification {
        if app.time > *until {
            model.notification = None;
        }
    }
}

fn view(app: &App, model: &Model, frame: Frame) {
    let mut draw = app.draw();
    model
        .engine
        .borrow_mut()
        .draw(model.surface_kind(), Some(&mut draw));

    if let Some((text, _)) = &model.notification {
        let bounds = app.window_rect();
        draw.text(text)
            .x_y(0.0, bounds.top() - 30.0)
            .w(bounds.w())
            .font_size(18)
            .color(WHITE);
    }

    if let Err(err) = draw.to_frame(app, &frame) {
        error!(%err, "failed to submit frame");
    }
}

fn resized(_app: &App, model: &mut Model, size: Vec2) {
    let kind = model.surface_kind();
    model.engine.get_mut().resize(kind, size.x, size.y);
}

fn focused(_app: &App, model: &mut Model) {
    model.engine.get_mut().set_visibility(true);
}

fn unfocused(_app: &App, model: &mut Model) {
    model.engine.get_mut().set_visibility(false);
}

fn key_pressed(app: &App, model: &mut Model, key: Key) {
    let Some(action) = parse_key(key) else {
        return;
    };
    let now = app.time;

    match action {
        Action::Quit => app.quit(),
        Action::SelectMode(mode) => {
            model.engine.get_mut().set_render_mode(mode);
            model.show_notification(mode.as_str(), now);
        }
        Action::ToggleFullscreen => {
            model.fullscreen = !model.fullscreen;
            let fullscreen = model.fullscreen;
            let bounds = app.window_rect();
            {
                let engine = model.engine.get_mut();
                if fullscreen {
                    engine.stop();
                    engine.start_fullscreen();
                    engine.resize(SurfaceKind::Fullscreen, bounds.w(), bounds.h());
                } else {
                    engine.stop_fullscreen();
                    engine.start();
                    engine.resize(SurfaceKind::Inline, bounds.w(), bounds.h());
                }
            }
            app.main_window().set_fullscreen(fullscreen);
        }
        Action::TogglePlaying => {
            model.playing = !model.playing;
            let playing = model.playing;
            model.engine.get_mut().set_playing(playing);
            model.show_notification(if playing { "playing" } else { "paused" }, now);
        }
        Action::CyclePerformanceMode => {
            let engine = model.engine.get_mut();
            let next: PerformanceMode = engine.performance_mode().next();
            engine.set_performance_mode(next);
            model.show_notification(format!("performance: {next}"), now);
        }
        Action::NextDevice => match model.source.next_device() {
            Some(name) => model.show_notification(format!("device: {name}"), now),
            None => model.show_notification("no other device available", now),
        },
    }
}
