use moodviz::{
    Config, DrawOutcome, EngineConfig, FrameOutcome, MagnitudeSource, PerformanceMode, RenderMode,
    SurfaceKind, VisualizerEngine,
};
use moodviz_api::RecordingSurface;

const FRAME_MS: f64 = 1000.0 / 60.0;

fn running_engine(config: EngineConfig) -> VisualizerEngine {
    let mut engine = VisualizerEngine::with_seed(config, 1234);
    engine.resize(SurfaceKind::Inline, 800.0, 450.0);
    engine.set_playing(true);
    engine.start();
    engine
}

/// Loud low end, quiet everywhere else
fn kick_frame() -> Vec<u8> {
    let mut frame = vec![15u8; 256];
    frame[..31].iter_mut().for_each(|b| *b = 230);
    frame
}

/// Engine clock of every beat over `frames` frames of the same input
fn beat_times(
    engine: &mut VisualizerEngine,
    frame: &mut dyn MagnitudeSource,
    frames: usize,
) -> Vec<f64> {
    (0..frames)
        .filter_map(|_| match engine.tick(FRAME_MS, Some(&mut *frame)) {
            FrameOutcome::Rendered { beat: Some(beat) } => Some(beat.timestamp),
            _ => None,
        })
        .collect()
}

#[test]
fn first_beat_lands_during_warm_up() {
    let mut engine = running_engine(EngineConfig::default());
    let mut frame = kick_frame();
    let beats = beat_times(&mut engine, &mut frame, 3);
    assert_eq!(beats.len(), 1, "beats: {beats:?}");
}

#[test]
fn known_tempo_shortens_beat_spacing() {
    let mut engine = running_engine(EngineConfig::default());
    engine
        .set_track_analysis_json(r#"{"tempo": "120", "energy": 0.8}"#)
        .expect("valid payload");
    let mut frame = kick_frame();

    let beats = beat_times(&mut engine, &mut frame, 20);
    assert!(beats.len() >= 2, "beats: {beats:?}");
    let gap = beats[1] - beats[0];
    assert!(gap > 150.0 && gap <= 250.0, "gap {gap}");
}

#[test]
fn default_cooldown_without_tempo() {
    let mut engine = running_engine(EngineConfig::default());
    let mut frame = kick_frame();

    let beats = beat_times(&mut engine, &mut frame, 40);
    assert!(beats.len() >= 2, "beats: {beats:?}");
    assert!(beats.windows(2).all(|w| w[1] - w[0] > 250.0));
}

#[test]
fn every_mode_renders_a_frame() {
    let mut engine = running_engine(EngineConfig::default());
    let mut frame = kick_frame();

    for mode in RenderMode::ALL {
        engine.set_render_mode(mode);
        for _ in 0..10 {
            engine.tick(FRAME_MS, Some(&mut frame));
        }
        let mut surface = RecordingSurface::new();
        assert_eq!(
            engine.draw(SurfaceKind::Inline, Some(&mut surface)),
            DrawOutcome::Drawn,
            "{mode}"
        );
        assert!(surface.len() > 1, "{mode} drew nothing");
    }
}

#[test]
fn silent_source_falls_back_to_idle() {
    let mut engine = running_engine(EngineConfig::default());
    let mut frame = kick_frame();
    for _ in 0..30 {
        engine.tick(FRAME_MS, Some(&mut frame));
    }
    let loud = engine.signal().energy;

    let mut gone: Vec<u8> = Vec::new();
    for _ in 0..30 {
        assert_eq!(engine.tick(FRAME_MS, Some(&mut gone)), FrameOutcome::Idle);
    }
    assert!(engine.is_idle());
    assert!(engine.signal().energy < loud);
}

#[test]
fn background_host_stops_rendering() {
    let mut engine = running_engine(EngineConfig::default());
    let mut frame = kick_frame();
    assert!(matches!(
        engine.tick(FRAME_MS, Some(&mut frame)),
        FrameOutcome::Rendered { .. }
    ));

    engine.set_visibility(false);
    assert_eq!(
        engine.effective_performance_mode(),
        PerformanceMode::Background
    );
    assert_eq!(engine.tick(FRAME_MS, Some(&mut frame)), FrameOutcome::Skipped);

    engine.set_visibility(true);
    assert!(matches!(
        engine.tick(FRAME_MS, Some(&mut frame)),
        FrameOutcome::Rendered { .. }
    ));
}

#[test]
fn config_file_drives_engine() {
    let config = Config::from_toml_str(
        r#"
render_mode = "3d"
particle_capacity = 32
beat_cooldown_ms = 400.0
"#,
    )
    .expect("valid toml");
    let engine = running_engine(config.engine());
    assert_eq!(engine.mode(), RenderMode::Pseudo3d);
    assert_eq!(engine.beat_cooldown_ms(), 400.0);
}
