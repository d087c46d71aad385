//! Frame-rate independent exponential smoothing of control signals.
//!
//! Every signal moves toward its target by `(target - value) * factor`, where
//! `factor` is scaled from a per-frame value at 60 fps to the actual frame
//! time. Targets are clamped before interpolation, so each value stays inside
//! its bounds no matter what the analyzer produces.

/// Frame duration the per-frame factors are expressed against (ms)
pub const BASELINE_FRAME_MS: f64 = 1000.0 / 60.0;

/// Smoothed control signals consumed by the render modes
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SmoothedSignal {
    pub energy: f32,
    pub bass: f32,
    pub mid: f32,
    pub treble: f32,
    pub volume: f32,
    /// Degrees, [0, 360)
    pub hue: f32,
    pub saturation: f32,
}

impl Default for SmoothedSignal {
    fn default() -> Self {
        Self {
            energy: 0.0,
            bass: 0.0,
            mid: 0.0,
            treble: 0.0,
            volume: 0.0,
            hue: 0.0,
            saturation: 0.5,
        }
    }
}

/// Raw per-frame targets; out-of-range values are clamped on use
pub type SignalTargets = SmoothedSignal;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SmootherConfig {
    /// Per-frame interpolation factor at 60 fps for band/energy signals
    pub factor: f32,
    /// Per-frame factor for hue and saturation (slower, avoids flicker)
    pub color_factor: f32,
    /// Multiplier on energy/bass factor for highly danceable tracks
    pub danceability_boost: f32,
    /// Danceability above which the boost applies
    pub danceability_threshold: f32,
}

impl Default for SmootherConfig {
    fn default() -> Self {
        Self {
            factor: 0.18,
            color_factor: 0.06,
            danceability_boost: 1.6,
            danceability_threshold: 0.7,
        }
    }
}

/// Wrap any angle into [0, 360)
pub fn wrap_hue(hue: f32) -> f32 {
    let wrapped = hue.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Signed shortest angular distance from `from` to `to`, in (-180, 180]
pub fn hue_delta(from: f32, to: f32) -> f32 {
    let delta = (to - from).rem_euclid(360.0);
    if delta > 180.0 {
        delta - 360.0
    } else {
        delta
    }
}

/// Step `hue` toward `target` along the shorter arc
pub fn lerp_hue(hue: f32, target: f32, factor: f32) -> f32 {
    wrap_hue(hue + hue_delta(hue, target) * factor.clamp(0.0, 1.0))
}

/// Scale a 60 fps per-frame factor to an arbitrary frame time.
pub fn frame_factor(per_frame: f32, dt_ms: f64) -> f32 {
    let per_frame = per_frame.clamp(0.0, 1.0) as f64;
    if !(dt_ms.is_finite() && dt_ms > 0.0) {
        return 0.0;
    }
    let frames = dt_ms / BASELINE_FRAME_MS;
    (1.0 - (1.0 - per_frame).powf(frames)).clamp(0.0, 1.0) as f32
}

fn approach(value: f32, target: f32, factor: f32) -> f32 {
    if !target.is_finite() {
        return value;
    }
    let target = target.clamp(0.0, 1.0);
    value + (target - value) * factor
}

pub struct SignalSmoother {
    config: SmootherConfig,
    signal: SmoothedSignal,
}

impl SignalSmoother {
    pub fn new() -> Self {
        Self::with_config(SmootherConfig::default())
    }

    pub fn with_config(config: SmootherConfig) -> Self {
        Self {
            config,
            signal: SmoothedSignal::default(),
        }
    }

    /// Advance every signal one frame toward `targets`.
    ///
    /// `danceability` comes from the track analysis when one is set.
    pub fn update(
        &mut self,
        targets: &SignalTargets,
        dt_ms: f64,
        danceability: Option<f32>,
    ) -> SmoothedSignal {
        let base = frame_factor(self.config.factor, dt_ms);
        let color = frame_factor(self.config.color_factor, dt_ms);

        let boosted = match danceability {
            Some(d) if d > self.config.danceability_threshold => frame_factor(
                (self.config.factor * self.config.danceability_boost).min(1.0),
                dt_ms,
            ),
            _ => base,
        };

        let s = &mut self.signal;
        s.energy = approach(s.energy, targets.energy, boosted);
        s.bass = approach(s.bass, targets.bass, boosted);
        s.mid = approach(s.mid, targets.mid, base);
        s.treble = approach(s.treble, targets.treble, base);
        s.volume = approach(s.volume, targets.volume, base);
        s.saturation = approach(s.saturation, targets.saturation, color);
        if targets.hue.is_finite() {
            s.hue = lerp_hue(s.hue, wrap_hue(targets.hue), color);
        }

        self.signal
    }

    /// Relax the level signals toward zero, leaving color where it is
    pub fn decay(&mut self, dt_ms: f64) -> SmoothedSignal {
        let targets = SignalTargets {
            energy: 0.0,
            bass: 0.0,
            mid: 0.0,
            treble: 0.0,
            volume: 0.0,
            ..self.signal
        };
        self.update(&targets, dt_ms, None)
    }

    /// Jump the color signals straight to a tone (no easing)
    pub fn set_color(&mut self, hue: f32, saturation: f32) {
        self.signal.hue = wrap_hue(hue);
        self.signal.saturation = saturation.clamp(0.0, 1.0);
    }

    pub fn signal(&self) -> SmoothedSignal {
        self.signal
    }

    pub fn reset(&mut self) {
        self.signal = SmoothedSignal::default();
    }
}

impl Default for SignalSmoother {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn targets(level: f32, hue: f32) -> SignalTargets {
        SignalTargets {
            energy: level,
            bass: level,
            mid: level,
            treble: level,
            volume: level,
            hue,
            saturation: level,
        }
    }

    #[test]
    fn frame_factor_is_frame_rate_independent() {
        // One 33ms frame covers the same ground as two 16.7ms frames
        let mut a = 0.0f32;
        let f60 = frame_factor(0.2, BASELINE_FRAME_MS);
        a += (1.0 - a) * f60;
        a += (1.0 - a) * f60;

        let f30 = frame_factor(0.2, BASELINE_FRAME_MS * 2.0);
        let b = f30;
        assert!((a - b).abs() < 1e-5);
    }

    #[test]
    fn frame_factor_guards_bad_time() {
        assert_eq!(frame_factor(0.5, 0.0), 0.0);
        assert_eq!(frame_factor(0.5, -3.0), 0.0);
        assert_eq!(frame_factor(0.5, f64::NAN), 0.0);
        assert!(frame_factor(0.5, 10_000.0) <= 1.0);
    }

    #[test]
    fn out_of_range_targets_stay_bounded() {
        let mut smoother = SignalSmoother::new();
        for _ in 0..500 {
            let s = smoother.update(&targets(5.0, 725.0), 50.0, Some(1.0));
            assert!(s.energy <= 1.0 && s.bass <= 1.0 && s.volume <= 1.0);
            assert!((0.0..360.0).contains(&s.hue));
        }
        for _ in 0..500 {
            let s = smoother.update(&targets(-3.0, -90.0), 50.0, None);
            assert!(s.energy >= 0.0 && s.saturation >= 0.0);
            assert!((0.0..360.0).contains(&s.hue));
        }
    }

    #[test]
    fn hue_takes_short_way_across_zero() {
        let mut hue = 350.0f32;
        for _ in 0..100 {
            let next = lerp_hue(hue, 10.0, 0.1);
            // Never regresses toward 180
            assert!(next >= 350.0 - 1e-3 || next <= 10.0 + 1e-3, "hue went the long way: {}", next);
            hue = next;
        }
        assert!((hue - 10.0).abs() < 0.1);
    }

    #[test]
    fn hue_delta_is_signed_shortest() {
        assert_eq!(hue_delta(350.0, 10.0), 20.0);
        assert_eq!(hue_delta(10.0, 350.0), -20.0);
        assert_eq!(hue_delta(0.0, 180.0), 180.0);
        assert_eq!(wrap_hue(-1e-9), 0.0);
        assert_eq!(wrap_hue(360.0), 0.0);
    }

    #[test]
    fn danceable_tracks_respond_faster() {
        let mut plain = SignalSmoother::new();
        let mut dance = SignalSmoother::new();
        let t = targets(1.0, 0.0);

        let a = plain.update(&t, BASELINE_FRAME_MS, Some(0.2));
        let b = dance.update(&t, BASELINE_FRAME_MS, Some(0.95));
        assert!(b.energy > a.energy);
        assert!(b.bass > a.bass);
        // Non-energy signals are unaffected
        assert_eq!(a.treble, b.treble);
    }

    #[test]
    fn nan_target_keeps_previous_value() {
        let mut smoother = SignalSmoother::new();
        smoother.update(&targets(0.5, 90.0), 100.0, None);
        let before = smoother.signal();
        let after = smoother.update(&targets(f32::NAN, f32::NAN), 100.0, None);
        assert_eq!(before.energy, after.energy);
        assert_eq!(before.hue, after.hue);
    }

    #[test]
    fn decay_relaxes_levels() {
        let mut smoother = SignalSmoother::new();
        for _ in 0..60 {
            smoother.update(&targets(1.0, 120.0), BASELINE_FRAME_MS, None);
        }
        let loud = smoother.signal();
        for _ in 0..60 {
            smoother.decay(BASELINE_FRAME_MS);
        }
        let quiet = smoother.signal();
        assert!(quiet.energy < loud.energy * 0.1);
        assert!((quiet.hue - loud.hue).abs() < 1e-3);
    }
}
