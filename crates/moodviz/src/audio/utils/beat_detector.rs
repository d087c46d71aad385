//! Adaptive beat detection over the low end of the spectrum.
//!
//! Keeps a fixed-length circular history of combined sub-bass + bass energy.
//! A beat fires when the current energy rises above
//! `mean + sensitivity * stddev` of that history and the cooldown since the
//! previous beat has elapsed. When the track's BPM is known the cooldown is
//! derived from the beat period instead of the fixed default.

/// Configuration for beat detection
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BeatDetectorConfig {
    /// Standard deviations above the mean required to fire
    pub sensitivity: f32,
    /// Minimum spacing between beats when no BPM is known (ms)
    pub default_cooldown_ms: f64,
    /// Fraction of the beat period used as cooldown when BPM is known
    pub bpm_cooldown_fraction: f64,
    /// Number of samples in the rolling history
    pub history_len: usize,
    /// Floor under the adaptive threshold so silence plus noise never fires
    pub min_threshold: f32,
}

impl Default for BeatDetectorConfig {
    fn default() -> Self {
        Self {
            sensitivity: 1.25,
            default_cooldown_ms: 250.0,
            bpm_cooldown_fraction: 0.3,
            history_len: 50,
            min_threshold: 0.05,
        }
    }
}

/// A detected beat
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BeatEvent {
    /// Engine clock at detection (ms)
    pub timestamp: f64,
    /// How far above threshold the energy was, 0-1
    pub confidence: f32,
}

pub struct BeatDetector {
    config: BeatDetectorConfig,
    history: Vec<f32>,
    history_idx: usize,
    last_beat: Option<f64>,
    cooldown_ms: f64,
    threshold: f32,
}

impl BeatDetector {
    pub fn new() -> Self {
        Self::with_config(BeatDetectorConfig::default())
    }

    pub fn with_config(config: BeatDetectorConfig) -> Self {
        let history_len = config.history_len.max(1);
        Self {
            config,
            history: vec![0.0; history_len],
            history_idx: 0,
            last_beat: None,
            cooldown_ms: config.default_cooldown_ms,
            threshold: config.min_threshold,
        }
    }

    /// Feed one frame of low-end energy (0-1) observed at `now_ms`.
    ///
    /// Returns the beat if one fired this frame.
    pub fn process(&mut self, energy: f32, now_ms: f64) -> Option<BeatEvent> {
        let energy = if energy.is_finite() {
            energy.clamp(0.0, 1.0)
        } else {
            0.0
        };

        let len = self.history.len();
        self.history[self.history_idx] = energy;
        self.history_idx = (self.history_idx + 1) % len;

        let mean = self.history.iter().sum::<f32>() / len as f32;
        let variance = self
            .history
            .iter()
            .map(|&e| (e - mean) * (e - mean))
            .sum::<f32>()
            / len as f32;

        self.threshold =
            (mean + self.config.sensitivity * variance.sqrt()).max(self.config.min_threshold);

        let cooled_down = match self.last_beat {
            Some(last) => now_ms - last > self.cooldown_ms,
            None => true,
        };

        if energy > self.threshold && cooled_down {
            let confidence = ((energy - self.threshold) / self.threshold).clamp(0.0, 1.0);
            self.last_beat = Some(now_ms);
            Some(BeatEvent {
                timestamp: now_ms,
                confidence,
            })
        } else {
            None
        }
    }

    /// Derive the cooldown from a known tempo, or restore the default.
    pub fn set_bpm(&mut self, bpm: Option<f32>) {
        self.cooldown_ms = match bpm {
            Some(bpm) if bpm.is_finite() && bpm > 0.0 => {
                (60_000.0 / bpm as f64) * self.config.bpm_cooldown_fraction
            }
            _ => self.config.default_cooldown_ms,
        };
    }

    /// Current minimum spacing between beats (ms)
    pub fn cooldown_ms(&self) -> f64 {
        self.cooldown_ms
    }

    /// Threshold computed on the last `process` call
    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn last_beat(&self) -> Option<f64> {
        self.last_beat
    }

    /// Forget the history (track change)
    pub fn reset(&mut self) {
        self.history.iter_mut().for_each(|e| *e = 0.0);
        self.history_idx = 0;
        self.last_beat = None;
        self.threshold = self.config.min_threshold;
    }

    pub fn config(&self) -> &BeatDetectorConfig {
        &self.config
    }
}

impl Default for BeatDetector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME_MS: f64 = 1000.0 / 60.0;

    #[test]
    fn no_beat_on_silence() {
        let mut detector = BeatDetector::new();
        for i in 0..200 {
            assert!(detector.process(0.0, i as f64 * FRAME_MS).is_none());
        }
    }

    #[test]
    fn no_beat_on_low_noise() {
        let mut detector = BeatDetector::new();
        for i in 0..200 {
            let noise = if i % 2 == 0 { 0.02 } else { 0.0 };
            assert!(detector.process(noise, i as f64 * FRAME_MS).is_none());
        }
    }

    #[test]
    fn fires_within_warm_up_on_sustained_bass() {
        let mut detector = BeatDetector::new();
        let mut beats = Vec::new();
        for frame in 1..=5 {
            let now = frame as f64 * FRAME_MS;
            if let Some(beat) = detector.process(0.9, now) {
                beats.push((frame, beat));
            }
        }

        assert_eq!(beats.len(), 1, "exactly one beat inside the cooldown");
        let (frame, beat) = beats[0];
        assert!(frame <= 3);
        assert!(beat.confidence > 0.0 && beat.confidence <= 1.0);
    }

    #[test]
    fn bpm_derives_cooldown() {
        let mut detector = BeatDetector::new();
        assert_eq!(detector.cooldown_ms(), 250.0);

        detector.set_bpm(Some(120.0));
        assert!((detector.cooldown_ms() - 150.0).abs() < 1e-9);

        detector.set_bpm(None);
        assert_eq!(detector.cooldown_ms(), 250.0);

        detector.set_bpm(Some(0.0));
        assert_eq!(detector.cooldown_ms(), 250.0);
    }

    #[test]
    fn spike_after_quiet_passage() {
        let mut detector = BeatDetector::new();
        for i in 0..60 {
            detector.process(0.1, i as f64 * FRAME_MS);
        }
        let beat = detector.process(0.8, 60.0 * FRAME_MS);
        assert!(beat.is_some());
        assert_eq!(beat.map(|b| b.confidence), Some(1.0));
    }

    #[test]
    fn nan_energy_is_treated_as_silence() {
        let mut detector = BeatDetector::new();
        assert!(detector.process(f32::NAN, 0.0).is_none());
        assert!(detector.threshold().is_finite());
    }

    #[test]
    fn reset_allows_immediate_beat() {
        let mut detector = BeatDetector::new();
        assert!(detector.process(0.9, 0.0).is_some());
        assert!(detector.process(0.9, 10.0).is_none());
        detector.reset();
        assert!(detector.process(0.9, 20.0).is_some());
    }
}
