mod beat_detector;

pub use beat_detector::{BeatDetector, BeatDetectorConfig, BeatEvent};
