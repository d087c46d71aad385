//! Configuration file management.
//!
//! Handles loading user preferences from `~/.moodviz.toml`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::audio::{BeatDetectorConfig, SmootherConfig};
use crate::error::Result;
use crate::palette::DEFAULT_THROTTLE_MS;
use crate::particles::{Physics, DEFAULT_CAPACITY};
use crate::renderer::RenderMode;
use crate::scheduler::{SubsystemIntervals, UpdateIntervals};

const CONFIG_TEMPLATE: &str = r#"# moodviz configuration file

# Render mode at startup: bars, circular, waveform, particles, nebula, pseudo-3d
# render_mode = "bars"

# =============================================================================
# Particles
# =============================================================================

# particle_capacity = 400         # Fixed pool size
# gravity = 0.4                   # Surface units per second squared
# drag = 0.98                     # Velocity kept per frame (1.0 = no drag)

# =============================================================================
# Beat Detection
# =============================================================================

# beat_sensitivity = 1.25         # Standard deviations above the mean
# beat_cooldown_ms = 250          # Minimum spacing without a known BPM
# beat_bpm_fraction = 0.3         # Share of the beat period used as cooldown
# beat_history_len = 50           # Frames of bass history
# beat_min_threshold = 0.05       # Floor under the adaptive threshold

# =============================================================================
# Smoothing & Color
# =============================================================================

# smoothing_factor = 0.18         # Per-frame approach factor at 60fps
# color_smoothing_factor = 0.06   # Slower factor for hue and saturation
# danceability_boost = 1.6        # Faster energy response on danceable tracks
# danceability_threshold = 0.7
# palette_throttle_ms = 100

# =============================================================================
# Update Intervals (ms) per UI mode, [visualizer, progress, lyrics]
# =============================================================================
# 0 disables the subsystem in that mode.

# full_intervals = [16, 100, 100]
# compact_intervals = [0, 250, 200]
# mini_intervals = [0, 500, 0]
# background_intervals = [0, 1000, 0]
"#;

/// Engine construction parameters with every default resolved
#[derive(Clone, Debug, PartialEq)]
pub struct EngineConfig {
    pub render_mode: RenderMode,
    pub particle_capacity: usize,
    pub physics: Physics,
    pub beat: BeatDetectorConfig,
    pub smoothing: SmootherConfig,
    pub intervals: UpdateIntervals,
    pub palette_throttle_ms: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Config::default().engine()
    }
}

#[derive(Serialize, Deserialize, Default, Debug)]
pub struct Config {
    pub render_mode: Option<String>,

    pub particle_capacity: Option<usize>,
    pub gravity: Option<f32>,
    pub drag: Option<f32>,

    // Beat detection (flattened for simpler TOML)
    pub beat_sensitivity: Option<f32>,
    pub beat_cooldown_ms: Option<f64>,
    pub beat_bpm_fraction: Option<f64>,
    pub beat_history_len: Option<usize>,
    pub beat_min_threshold: Option<f32>,

    // Smoothing
    pub smoothing_factor: Option<f32>,
    pub color_smoothing_factor: Option<f32>,
    pub danceability_boost: Option<f32>,
    pub danceability_threshold: Option<f32>,
    pub palette_throttle_ms: Option<f64>,

    // Scheduler
    pub full_intervals: Option<[f64; 3]>,
    pub compact_intervals: Option<[f64; 3]>,
    pub mini_intervals: Option<[f64; 3]>,
    pub background_intervals: Option<[f64; 3]>,
}

impl Config {
    fn path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".moodviz.toml"))
    }

    /// Load from the home directory, writing a commented template on first
    /// run. Any problem falls back to defaults.
    pub fn load() -> Self {
        let path = match Self::path() {
            Some(p) => p,
            None => return Self::default(),
        };

        if !path.exists() {
            match fs::write(&path, CONFIG_TEMPLATE) {
                Ok(()) => info!(path = %path.display(), "created config template"),
                Err(err) => warn!(path = %path.display(), %err, "could not write config template"),
            }
        }

        match fs::read_to_string(&path) {
            Ok(content) => Self::from_toml_str(&content).unwrap_or_else(|err| {
                warn!(path = %path.display(), %err, "ignoring invalid config");
                Self::default()
            }),
            Err(err) => {
                warn!(path = %path.display(), %err, "could not read config");
                Self::default()
            }
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Configured start mode; unknown names fall back to the default mode
    pub fn render_mode(&self) -> RenderMode {
        match self.render_mode.as_deref().map(str::parse::<RenderMode>) {
            Some(Ok(mode)) => mode,
            Some(Err(err)) => {
                warn!(%err, "falling back to default render mode");
                RenderMode::default()
            }
            None => RenderMode::default(),
        }
    }

    pub fn particle_capacity(&self) -> usize {
        self.particle_capacity.unwrap_or(DEFAULT_CAPACITY)
    }

    pub fn physics(&self) -> Physics {
        let defaults = Physics::default();
        Physics {
            gravity: self.gravity.unwrap_or(defaults.gravity),
            drag: self.drag.unwrap_or(defaults.drag).clamp(0.0, 1.0),
        }
    }

    /// Get beat detection configuration with defaults
    pub fn beat(&self) -> BeatDetectorConfig {
        let defaults = BeatDetectorConfig::default();
        BeatDetectorConfig {
            sensitivity: self.beat_sensitivity.unwrap_or(defaults.sensitivity),
            default_cooldown_ms: self.beat_cooldown_ms.unwrap_or(defaults.default_cooldown_ms),
            bpm_cooldown_fraction: self
                .beat_bpm_fraction
                .unwrap_or(defaults.bpm_cooldown_fraction),
            history_len: self.beat_history_len.unwrap_or(defaults.history_len).max(1),
            min_threshold: self.beat_min_threshold.unwrap_or(defaults.min_threshold),
        }
    }

    /// Get smoothing configuration with defaults
    pub fn smoothing(&self) -> SmootherConfig {
        let defaults = SmootherConfig::default();
        SmootherConfig {
            factor: self.smoothing_factor.unwrap_or(defaults.factor),
            color_factor: self.color_smoothing_factor.unwrap_or(defaults.color_factor),
            danceability_boost: self.danceability_boost.unwrap_or(defaults.danceability_boost),
            danceability_threshold: self
                .danceability_threshold
                .unwrap_or(defaults.danceability_threshold),
        }
    }

    pub fn palette_throttle_ms(&self) -> f64 {
        self.palette_throttle_ms.unwrap_or(DEFAULT_THROTTLE_MS)
    }

    /// Get the scheduler's interval table with defaults
    pub fn intervals(&self) -> UpdateIntervals {
        let defaults = UpdateIntervals::default();
        let row = |configured: Option<[f64; 3]>, default: SubsystemIntervals| match configured {
            Some([visualizer, progress, lyrics]) => {
                SubsystemIntervals::new(visualizer, progress, lyrics)
            }
            None => default,
        };
        UpdateIntervals {
            full: row(self.full_intervals, defaults.full),
            compact: row(self.compact_intervals, defaults.compact),
            mini: row(self.mini_intervals, defaults.mini),
            background: row(self.background_intervals, defaults.background),
        }
    }

    /// Everything the engine needs, defaults filled in
    pub fn engine(&self) -> EngineConfig {
        EngineConfig {
            render_mode: self.render_mode(),
            particle_capacity: self.particle_capacity(),
            physics: self.physics(),
            beat: self.beat(),
            smoothing: self.smoothing(),
            intervals: self.intervals(),
            palette_throttle_ms: self.palette_throttle_ms(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;

    #[test]
    fn template_parses_to_defaults() {
        let config = Config::from_toml_str(CONFIG_TEMPLATE).expect("template is valid toml");
        assert_eq!(config.engine(), EngineConfig::default());
    }

    #[test]
    fn overrides_are_applied() {
        let config = Config::from_toml_str(
            r#"
            render_mode = "nebula"
            particle_capacity = 128
            beat_sensitivity = 2.0
            drag = 3.0
            compact_intervals = [33, 500, 0]
            "#,
        )
        .expect("valid toml");

        let engine = config.engine();
        assert_eq!(engine.render_mode, RenderMode::Nebula);
        assert_eq!(engine.particle_capacity, 128);
        assert_eq!(engine.beat.sensitivity, 2.0);
        assert_eq!(engine.beat.history_len, 50);
        assert_eq!(engine.physics.drag, 1.0);
        assert_eq!(engine.intervals.compact, SubsystemIntervals::new(33.0, 500.0, 0.0));
        assert_eq!(engine.intervals.full, UpdateIntervals::default().full);
    }

    #[test]
    fn unknown_render_mode_falls_back() {
        let config = Config::from_toml_str(r#"render_mode = "strobe""#).expect("valid toml");
        assert_eq!(config.render_mode(), RenderMode::Bars);
    }

    #[test]
    fn invalid_toml_is_a_config_error() {
        let err = Config::from_toml_str("particle_capacity = [").unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }
}
