//! Audio-reactive visualization engine.
//!
//! Reads one magnitude frame per display frame from a [`MagnitudeSource`],
//! turns it into band energies, beats and smoothed control signals, and
//! drives one of six interchangeable render modes onto any
//! [`moodviz_api::Surface`].

pub mod audio;
pub mod engine;
pub mod error;
pub mod palette;
pub mod particles;
pub mod renderer;
pub mod scheduler;
pub mod utils;

pub use audio::{BandEnergies, BeatEvent, FftMagnitudeSource, MagnitudeSource, SmoothedSignal, TrackAnalysis};
pub use engine::{DrawOutcome, FrameOutcome, SurfaceKind, VisualizerEngine};
pub use error::{EngineError, Result};
pub use palette::{Palette, Rgb};
pub use renderer::RenderMode;
pub use scheduler::{PerformanceMode, Subsystem};
pub use utils::{Config, EngineConfig};
