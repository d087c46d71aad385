mod analyzer;
mod smoother;
mod source;
#[cfg(feature = "app")]
mod source_pipe;
mod track_analysis;
pub mod utils;

pub use analyzer::{band_energies, band_ranges, BandEnergies, FrequencyAnalyzer, Spectrum, NUM_BANDS};
pub use smoother::{
    frame_factor, hue_delta, lerp_hue, wrap_hue, SignalSmoother, SignalTargets, SmoothedSignal,
    SmootherConfig, BASELINE_FRAME_MS,
};
pub use source::{FftMagnitudeSource, MagnitudeSource, DEFAULT_FFT_SIZE};
#[cfg(feature = "app")]
pub use source_pipe::SourcePipe;
pub use track_analysis::{TrackAnalysis, TrackBands};
pub use utils::{BeatDetector, BeatDetectorConfig, BeatEvent};
