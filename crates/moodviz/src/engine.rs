//! The visualizer engine.
//!
//! One explicit [`VisualizerEngine`] value owns the whole pipeline:
//! scheduler gate, band analysis, beat detection, smoothing, palette and
//! the active render mode. The host drives it with [`VisualizerEngine::tick`]
//! once per display frame and then calls [`VisualizerEngine::draw`] for each
//! running surface. Nothing inside a frame returns an error. Missing audio
//! or a missing surface is reported through the outcome enums and logged.

use moodviz_api::{Rect, Surface};
use tracing::{debug, error, trace, warn};

use crate::audio::{
    BandEnergies, BeatDetector, BeatEvent, FrequencyAnalyzer, MagnitudeSource, SignalSmoother,
    SignalTargets, SmoothedSignal, Spectrum, TrackAnalysis,
};
use crate::error::Result;
use crate::palette::{Palette, PaletteResolver, Rgb};
use crate::renderer::{Frame, RenderMode, Renderer};
use crate::scheduler::{PerformanceMode, PerformanceScheduler, Subsystem};
use crate::utils::EngineConfig;

/// Longest frame step fed to the simulation (ms). The clock itself still
/// advances by the real delta.
const MAX_STEP_MS: f64 = 100.0;

/// Integrated loudness the live levels are calibrated for (dB)
const REFERENCE_LOUDNESS_DB: f32 = -14.0;
/// Share of the offline band summary mixed into the live band targets
const TRACK_BAND_WEIGHT: f32 = 0.2;

/// Volume gain that brings a quiet or hot master back toward the reference
fn loudness_gain(loudness_db: f32) -> f32 {
    10f32
        .powf((REFERENCE_LOUDNESS_DB - loudness_db) / 20.0)
        .clamp(0.7, 1.5)
}

/// Which drawing surface an operation targets
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SurfaceKind {
    /// Embedded surface inside the host UI
    Inline,
    /// Immersive full-window surface
    Fullscreen,
}

/// Result of one `tick`
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FrameOutcome {
    /// No surface is running
    Stopped,
    /// The scheduler held the visualizer back this frame
    Skipped,
    /// No audio available; the idle frame will be drawn
    Idle,
    Rendered { beat: Option<BeatEvent> },
}

/// Result of one `draw`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrawOutcome {
    Drawn,
    Idle,
    /// Surface not running or zero-sized
    Skipped,
    /// No surface was supplied; its loop has been stopped
    SurfaceUnavailable,
}

#[derive(Clone, Copy, Debug, Default)]
struct SurfaceState {
    running: bool,
    /// Next frame has been requested
    frame_pending: bool,
    bounds: Rect,
}

pub struct VisualizerEngine {
    scheduler: PerformanceScheduler,
    analyzer: FrequencyAnalyzer,
    beat_detector: BeatDetector,
    smoother: SignalSmoother,
    palettes: PaletteResolver,
    renderer: Renderer,

    track: Option<TrackAnalysis>,
    dominant: Option<Rgb>,

    inline: SurfaceState,
    fullscreen: SurfaceState,

    /// Monotonic engine clock (ms), advanced by `tick`
    clock_ms: f64,
    /// Time since the last simulated frame (ms), capped at `MAX_STEP_MS`
    pending_ms: f64,
    spectrum: Spectrum,
    last_beat: Option<BeatEvent>,
    palette: Palette,
    idle: bool,
}

impl VisualizerEngine {
    pub fn new(config: EngineConfig) -> Self {
        let renderer = Renderer::new(config.particle_capacity, config.physics);
        Self::with_renderer(config, renderer)
    }

    /// Engine with deterministic particle jitter, for tests and replays
    pub fn with_seed(config: EngineConfig, seed: u64) -> Self {
        let renderer = Renderer::with_seed(config.particle_capacity, config.physics, seed);
        Self::with_renderer(config, renderer)
    }

    fn with_renderer(config: EngineConfig, mut renderer: Renderer) -> Self {
        renderer.set_mode(config.render_mode);
        let palette = Palette::default();
        let mut smoother = SignalSmoother::with_config(config.smoothing);
        // Start on the neutral tone instead of sweeping in from hue 0
        smoother.set_color(palette.hue, palette.saturation);
        Self {
            scheduler: PerformanceScheduler::new(config.intervals),
            analyzer: FrequencyAnalyzer::new(),
            beat_detector: BeatDetector::with_config(config.beat),
            smoother,
            palettes: PaletteResolver::with_throttle(config.palette_throttle_ms),
            renderer,
            track: None,
            dominant: None,
            inline: SurfaceState::default(),
            fullscreen: SurfaceState::default(),
            clock_ms: 0.0,
            pending_ms: 0.0,
            spectrum: Spectrum::default(),
            last_beat: None,
            palette,
            idle: true,
        }
    }

    fn surface_mut(&mut self, kind: SurfaceKind) -> &mut SurfaceState {
        match kind {
            SurfaceKind::Inline => &mut self.inline,
            SurfaceKind::Fullscreen => &mut self.fullscreen,
        }
    }

    fn surface(&self, kind: SurfaceKind) -> &SurfaceState {
        match kind {
            SurfaceKind::Inline => &self.inline,
            SurfaceKind::Fullscreen => &self.fullscreen,
        }
    }

    fn start_surface(&mut self, kind: SurfaceKind) {
        let state = self.surface_mut(kind);
        if state.running {
            return;
        }
        state.running = true;
        state.frame_pending = true;
        debug!(surface = ?kind, "surface started");
    }

    fn stop_surface(&mut self, kind: SurfaceKind) {
        let state = self.surface_mut(kind);
        // Cancel the pending frame even if already stopped
        state.frame_pending = false;
        if !state.running {
            return;
        }
        state.running = false;
        debug!(surface = ?kind, "surface stopped");
    }

    pub fn start(&mut self) {
        self.start_surface(SurfaceKind::Inline);
    }

    pub fn stop(&mut self) {
        self.stop_surface(SurfaceKind::Inline);
    }

    /// Start the immersive surface. While it runs the effective performance
    /// mode is `Full` whenever the host is visible.
    pub fn start_fullscreen(&mut self) {
        self.start_surface(SurfaceKind::Fullscreen);
        self.scheduler.set_immersive(true);
    }

    pub fn stop_fullscreen(&mut self) {
        self.stop_surface(SurfaceKind::Fullscreen);
        self.scheduler.set_immersive(false);
    }

    pub fn is_running(&self, kind: SurfaceKind) -> bool {
        self.surface(kind).running
    }

    /// True when the host should schedule another frame
    pub fn wants_frame(&self) -> bool {
        self.inline.running || self.fullscreen.running
    }

    pub fn frame_pending(&self, kind: SurfaceKind) -> bool {
        self.surface(kind).frame_pending
    }

    /// Run one frame step. `dt_ms` is the time since the previous tick.
    pub fn tick(&mut self, dt_ms: f64, source: Option<&mut dyn MagnitudeSource>) -> FrameOutcome {
        let dt_ms = if dt_ms.is_finite() && dt_ms > 0.0 {
            dt_ms
        } else {
            0.0
        };
        // The clock keeps running without a surface; collaborators throttle on it
        self.clock_ms += dt_ms;

        if !self.wants_frame() {
            self.pending_ms = 0.0;
            return FrameOutcome::Stopped;
        }
        for state in [&mut self.inline, &mut self.fullscreen] {
            if state.running {
                state.frame_pending = true;
            }
        }

        if !self.scheduler.should_run_visualizer() {
            trace!(mode = %self.scheduler.effective_mode(), "visualizer paused");
            self.pending_ms = 0.0;
            return FrameOutcome::Skipped;
        }
        // Throttled ticks still count toward the next simulated step
        self.pending_ms = (self.pending_ms + dt_ms).min(MAX_STEP_MS);
        if !self.scheduler.should_update(Subsystem::Visualizer, self.clock_ms) {
            trace!("frame throttled");
            return FrameOutcome::Skipped;
        }
        let step_ms = std::mem::take(&mut self.pending_ms);

        let spectrum = match source {
            Some(source) if source.bin_count() > 0 => source
                .read_frame()
                .filter(|frame| !frame.is_empty())
                .map(|frame| self.analyzer.analyze(frame)),
            _ => None,
        };

        let Some(spectrum) = spectrum else {
            if !self.idle {
                debug!("no audio frame, showing idle frame");
            }
            self.idle = true;
            self.last_beat = None;
            self.spectrum = Spectrum::default();
            self.smoother.decay(step_ms);
            return FrameOutcome::Idle;
        };
        self.idle = false;
        self.spectrum = spectrum;

        let bands = spectrum.bands;
        let beat = self.beat_detector.process(bands.low_end(), self.clock_ms);
        if let Some(beat) = beat {
            trace!(confidence = beat.confidence, "beat");
        }
        self.last_beat = beat;

        let mood = self.track.as_ref().and_then(|t| t.mood.as_deref());
        self.palette = self.palettes.resolve(self.clock_ms, mood, self.dominant);

        let targets = self.targets(&spectrum);
        let danceability = self.track.as_ref().map(|t| t.danceability);
        let signal = self.smoother.update(&targets, step_ms, danceability);

        self.renderer.update(Frame {
            bands,
            signal,
            palette: self.palette,
            beat,
            dt: (step_ms / 1000.0) as f32,
            time: (self.clock_ms / 1000.0) as f32,
        });

        FrameOutcome::Rendered { beat }
    }

    /// Per-frame smoother targets from the live spectrum, shaped by the
    /// track analysis when one is set
    fn targets(&self, spectrum: &Spectrum) -> SignalTargets {
        let bands = &spectrum.bands;
        let mut bass = bands.low_end();
        let mut mid = bands.mids();
        let mut treble = bands.treble();
        let mut volume = spectrum.volume;
        let mut energy_scale = 1.0;
        let mut saturation = self.palette.saturation;

        if let Some(track) = &self.track {
            volume *= loudness_gain(track.loudness);
            energy_scale = 0.75 + 0.5 * track.energy;
            saturation *= 0.8 + 0.4 * track.valence;
            if let Some(offline) = track.frequency_bands {
                let live = 1.0 - TRACK_BAND_WEIGHT;
                bass = bass * live + offline.bass * TRACK_BAND_WEIGHT;
                mid = mid * live + offline.mid * TRACK_BAND_WEIGHT;
                treble = treble * live + offline.treble * TRACK_BAND_WEIGHT;
            }
        }

        SignalTargets {
            energy: (volume * 0.6 + bass * 0.4) * energy_scale,
            bass,
            mid,
            treble,
            volume,
            hue: self.palette.hue + (mid - 0.5) * self.palette.hue_range,
            saturation,
        }
    }

    /// Draw the current frame onto `surface`. Passing `None` means the host
    /// could not provide the surface; its loop is stopped.
    pub fn draw(&mut self, kind: SurfaceKind, surface: Option<&mut dyn Surface>) -> DrawOutcome {
        let state = *self.surface(kind);
        if !state.running {
            return DrawOutcome::Skipped;
        }
        self.surface_mut(kind).frame_pending = false;

        let Some(surface) = surface else {
            error!(surface = ?kind, "drawing surface unavailable, stopping");
            if kind == SurfaceKind::Fullscreen {
                self.stop_fullscreen();
            } else {
                self.stop_surface(kind);
            }
            return DrawOutcome::SurfaceUnavailable;
        };

        let drawn = if self.idle {
            self.renderer
                .draw_idle(surface, state.bounds, &self.palette.following(&self.smoother.signal()))
        } else {
            self.renderer.draw(surface, state.bounds)
        };

        match (drawn, self.idle) {
            (false, _) => {
                trace!(surface = ?kind, "zero-sized surface");
                DrawOutcome::Skipped
            }
            (true, true) => DrawOutcome::Idle,
            (true, false) => DrawOutcome::Drawn,
        }
    }

    /// Must be called whenever a surface changes size
    pub fn resize(&mut self, kind: SurfaceKind, width: f32, height: f32) {
        let (width, height) = (
            if width.is_finite() { width.max(0.0) } else { 0.0 },
            if height.is_finite() { height.max(0.0) } else { 0.0 },
        );
        debug!(surface = ?kind, width, height, "resize");
        self.surface_mut(kind).bounds = Rect::from_w_h(width, height);
    }

    pub fn set_track_analysis(&mut self, analysis: TrackAnalysis) {
        debug!(bpm = ?analysis.bpm, mood = ?analysis.mood, "track analysis set");
        // New track: the old bass history says nothing about it
        self.beat_detector.reset();
        self.beat_detector.set_bpm(analysis.bpm);
        self.track = Some(analysis);
        self.palettes.invalidate();
    }

    /// Parse and apply a JSON analysis payload. On error the current
    /// analysis is left untouched.
    pub fn set_track_analysis_json(&mut self, json: &str) -> Result<()> {
        let analysis = TrackAnalysis::from_json(json)?;
        self.set_track_analysis(analysis);
        Ok(())
    }

    pub fn clear_track_analysis(&mut self) {
        if self.track.take().is_some() {
            debug!("track analysis cleared");
            self.beat_detector.reset();
        }
        self.beat_detector.set_bpm(None);
        self.palettes.invalidate();
    }

    pub fn track_analysis(&self) -> Option<&TrackAnalysis> {
        self.track.as_ref()
    }

    /// Artwork color sample; takes priority over the mood palette
    pub fn set_dominant_color(&mut self, rgb: Rgb) {
        self.dominant = Some(rgb);
        self.palettes.invalidate();
    }

    pub fn clear_dominant_color(&mut self) {
        self.dominant = None;
        self.palettes.invalidate();
    }

    /// Switch render mode by name. Unknown names are rejected and the
    /// current mode is kept.
    pub fn set_mode(&mut self, name: &str) -> Result<RenderMode> {
        match name.parse::<RenderMode>() {
            Ok(mode) => {
                self.set_render_mode(mode);
                Ok(mode)
            }
            Err(err) => {
                warn!(%err, current = %self.renderer.mode(), "render mode rejected");
                Err(err)
            }
        }
    }

    pub fn set_render_mode(&mut self, mode: RenderMode) {
        self.renderer.set_mode(mode);
    }

    pub fn set_performance_mode(&mut self, mode: PerformanceMode) {
        self.scheduler.set_user_mode(mode);
    }

    /// Host visibility hook
    pub fn set_visibility(&mut self, visible: bool) {
        self.scheduler.set_visibility(visible);
    }

    pub fn set_playing(&mut self, playing: bool) {
        self.scheduler.set_playing(playing);
    }

    /// Throttle gate for collaborating displays (progress bar, lyrics)
    pub fn should_update(&mut self, subsystem: Subsystem) -> bool {
        self.scheduler.should_update(subsystem, self.clock_ms)
    }

    pub fn should_run_visualizer(&self) -> bool {
        self.scheduler.should_run_visualizer()
    }

    pub fn mode(&self) -> RenderMode {
        self.renderer.mode()
    }

    pub fn performance_mode(&self) -> PerformanceMode {
        self.scheduler.user_mode()
    }

    pub fn effective_performance_mode(&self) -> PerformanceMode {
        self.scheduler.effective_mode()
    }

    pub fn signal(&self) -> SmoothedSignal {
        self.smoother.signal()
    }

    pub fn bands(&self) -> BandEnergies {
        self.spectrum.bands
    }

    pub fn palette(&self) -> Palette {
        self.palette
    }

    pub fn active_particles(&self) -> usize {
        self.renderer.active_particles()
    }

    /// Beat fired on the last rendered frame, if any
    pub fn last_beat(&self) -> Option<BeatEvent> {
        self.last_beat
    }

    pub fn beat_cooldown_ms(&self) -> f64 {
        self.beat_detector.cooldown_ms()
    }

    pub fn clock_ms(&self) -> f64 {
        self.clock_ms
    }

    pub fn is_idle(&self) -> bool {
        self.idle
    }
}

impl Default for VisualizerEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}
