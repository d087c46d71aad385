//! Per-subsystem update throttling driven by the UI performance mode.
//!
//! Each `(mode, subsystem)` pair has a minimum update interval. An interval
//! of zero switches the subsystem off in that mode. A hidden host forces the
//! `Background` mode whatever the user picked, and the user's choice comes
//! back as soon as the host is visible again.

use std::fmt;
use std::str::FromStr;

use tracing::debug;

use crate::error::EngineError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PerformanceMode {
    #[default]
    Full,
    Compact,
    Mini,
    Background,
}

impl PerformanceMode {
    pub const ALL: [PerformanceMode; 4] = [
        PerformanceMode::Full,
        PerformanceMode::Compact,
        PerformanceMode::Mini,
        PerformanceMode::Background,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PerformanceMode::Full => "full",
            PerformanceMode::Compact => "compact",
            PerformanceMode::Mini => "mini",
            PerformanceMode::Background => "background",
        }
    }

    /// Next user-selectable mode (background is never picked by hand)
    pub fn next(&self) -> Self {
        match self {
            PerformanceMode::Full => PerformanceMode::Compact,
            PerformanceMode::Compact => PerformanceMode::Mini,
            PerformanceMode::Mini | PerformanceMode::Background => PerformanceMode::Full,
        }
    }
}

impl fmt::Display for PerformanceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PerformanceMode {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|mode| mode.as_str() == s)
            .ok_or(EngineError::UnknownPerformanceMode(s))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Subsystem {
    Visualizer,
    ProgressDisplay,
    LyricsDisplay,
}

impl Subsystem {
    pub const ALL: [Subsystem; 3] = [
        Subsystem::Visualizer,
        Subsystem::ProgressDisplay,
        Subsystem::LyricsDisplay,
    ];

    fn index(self) -> usize {
        match self {
            Subsystem::Visualizer => 0,
            Subsystem::ProgressDisplay => 1,
            Subsystem::LyricsDisplay => 2,
        }
    }
}

/// Minimum spacing (ms) per subsystem within one mode; 0 disables
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SubsystemIntervals {
    pub visualizer: f64,
    pub progress: f64,
    pub lyrics: f64,
}

impl SubsystemIntervals {
    pub const fn new(visualizer: f64, progress: f64, lyrics: f64) -> Self {
        Self {
            visualizer,
            progress,
            lyrics,
        }
    }

    pub fn get(&self, subsystem: Subsystem) -> f64 {
        match subsystem {
            Subsystem::Visualizer => self.visualizer,
            Subsystem::ProgressDisplay => self.progress,
            Subsystem::LyricsDisplay => self.lyrics,
        }
    }
}

/// The full mode x subsystem interval table
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UpdateIntervals {
    pub full: SubsystemIntervals,
    pub compact: SubsystemIntervals,
    pub mini: SubsystemIntervals,
    pub background: SubsystemIntervals,
}

impl Default for UpdateIntervals {
    fn default() -> Self {
        Self {
            full: SubsystemIntervals::new(16.0, 100.0, 100.0),
            compact: SubsystemIntervals::new(0.0, 250.0, 200.0),
            mini: SubsystemIntervals::new(0.0, 500.0, 0.0),
            background: SubsystemIntervals::new(0.0, 1000.0, 0.0),
        }
    }
}

impl UpdateIntervals {
    pub fn for_mode(&self, mode: PerformanceMode) -> &SubsystemIntervals {
        match mode {
            PerformanceMode::Full => &self.full,
            PerformanceMode::Compact => &self.compact,
            PerformanceMode::Mini => &self.mini,
            PerformanceMode::Background => &self.background,
        }
    }

    pub fn get(&self, mode: PerformanceMode, subsystem: Subsystem) -> f64 {
        self.for_mode(mode).get(subsystem)
    }
}

pub struct PerformanceScheduler {
    intervals: UpdateIntervals,
    user_mode: PerformanceMode,
    visible: bool,
    playing: bool,
    /// An immersive surface is up; it overrides the UI mode while visible
    immersive: bool,
    effective: PerformanceMode,
    last_update: [Option<f64>; 3],
}

impl PerformanceScheduler {
    pub fn new(intervals: UpdateIntervals) -> Self {
        Self {
            intervals,
            user_mode: PerformanceMode::Full,
            visible: true,
            playing: false,
            immersive: false,
            effective: PerformanceMode::Full,
            last_update: [None; 3],
        }
    }

    pub fn intervals(&self) -> &UpdateIntervals {
        &self.intervals
    }

    pub fn user_mode(&self) -> PerformanceMode {
        self.user_mode
    }

    pub fn effective_mode(&self) -> PerformanceMode {
        self.effective
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn set_user_mode(&mut self, mode: PerformanceMode) {
        self.user_mode = mode;
        self.refresh();
    }

    pub fn set_visibility(&mut self, visible: bool) {
        self.visible = visible;
        self.refresh();
    }

    pub fn set_playing(&mut self, playing: bool) {
        self.playing = playing;
    }

    pub fn set_immersive(&mut self, immersive: bool) {
        self.immersive = immersive;
        self.refresh();
    }

    fn resolve(&self) -> PerformanceMode {
        if !self.visible {
            PerformanceMode::Background
        } else if self.immersive {
            PerformanceMode::Full
        } else {
            self.user_mode
        }
    }

    fn refresh(&mut self) {
        let mode = self.resolve();
        if mode != self.effective {
            debug!(from = %self.effective, to = %mode, "performance mode changed");
            // Stamps survive the change; the new mode's intervals apply to them
            self.effective = mode;
        }
    }

    /// True at most once per the subsystem's interval in the current mode.
    /// `now_ms` must come from a monotonic clock.
    pub fn should_update(&mut self, subsystem: Subsystem, now_ms: f64) -> bool {
        let interval = self.intervals.get(self.effective, subsystem);
        if !(interval > 0.0) {
            return false;
        }

        let slot = &mut self.last_update[subsystem.index()];
        let due = match *slot {
            Some(last) => now_ms - last >= interval,
            None => true,
        };
        if due {
            *slot = Some(now_ms);
        }
        due
    }

    /// Visualization only runs in full mode, on a visible host, while playing
    pub fn should_run_visualizer(&self) -> bool {
        self.effective == PerformanceMode::Full && self.visible && self.playing
    }
}

impl Default for PerformanceScheduler {
    fn default() -> Self {
        Self::new(UpdateIntervals::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hidden_forces_background_and_restores() {
        let mut scheduler = PerformanceScheduler::default();
        scheduler.set_user_mode(PerformanceMode::Compact);
        scheduler.set_visibility(false);
        assert_eq!(scheduler.effective_mode(), PerformanceMode::Background);

        scheduler.set_user_mode(PerformanceMode::Mini);
        assert_eq!(scheduler.effective_mode(), PerformanceMode::Background);

        scheduler.set_visibility(true);
        assert_eq!(scheduler.effective_mode(), PerformanceMode::Mini);
    }

    #[test]
    fn immersive_overrides_ui_mode_while_visible() {
        let mut scheduler = PerformanceScheduler::default();
        scheduler.set_user_mode(PerformanceMode::Mini);
        scheduler.set_immersive(true);
        assert_eq!(scheduler.effective_mode(), PerformanceMode::Full);

        scheduler.set_visibility(false);
        assert_eq!(scheduler.effective_mode(), PerformanceMode::Background);

        scheduler.set_visibility(true);
        scheduler.set_immersive(false);
        assert_eq!(scheduler.effective_mode(), PerformanceMode::Mini);
    }

    #[test]
    fn visualizer_gate_over_all_states() {
        let modes = [PerformanceMode::Full, PerformanceMode::Compact];
        for mode in modes {
            for visible in [true, false] {
                for playing in [true, false] {
                    let mut scheduler = PerformanceScheduler::default();
                    scheduler.set_user_mode(mode);
                    scheduler.set_visibility(visible);
                    scheduler.set_playing(playing);

                    let expected = mode == PerformanceMode::Full && visible && playing;
                    assert_eq!(
                        scheduler.should_run_visualizer(),
                        expected,
                        "mode={} visible={} playing={}",
                        mode,
                        visible,
                        playing
                    );
                }
            }
        }
    }

    #[test]
    fn once_per_interval() {
        let mut scheduler = PerformanceScheduler::default();
        let hits = (0..10)
            .filter(|i| scheduler.should_update(Subsystem::ProgressDisplay, *i as f64 * 9.0))
            .count();
        assert_eq!(hits, 1);
        assert!(scheduler.should_update(Subsystem::ProgressDisplay, 100.0));
    }

    #[test]
    fn zero_interval_never_runs() {
        let mut scheduler = PerformanceScheduler::default();
        scheduler.set_user_mode(PerformanceMode::Mini);
        for t in 0..5 {
            assert!(!scheduler.should_update(Subsystem::LyricsDisplay, t as f64 * 1000.0));
            assert!(!scheduler.should_update(Subsystem::Visualizer, t as f64 * 1000.0));
        }
    }

    #[test]
    fn mode_changes_do_not_regrant_within_interval() {
        let mut scheduler = PerformanceScheduler::default();
        scheduler.set_user_mode(PerformanceMode::Compact);
        assert!(scheduler.should_update(Subsystem::ProgressDisplay, 0.0));

        scheduler.set_visibility(false);
        scheduler.set_visibility(true);
        assert!(!scheduler.should_update(Subsystem::ProgressDisplay, 5.0));

        scheduler.set_user_mode(PerformanceMode::Full);
        assert!(!scheduler.should_update(Subsystem::ProgressDisplay, 10.0));
        // Full mode's 100 ms interval now applies to the stamp taken at 0
        assert!(scheduler.should_update(Subsystem::ProgressDisplay, 100.0));

        scheduler.set_user_mode(PerformanceMode::Compact);
        assert!(!scheduler.should_update(Subsystem::ProgressDisplay, 340.0));
        assert!(scheduler.should_update(Subsystem::ProgressDisplay, 350.0));
    }

    #[test]
    fn parse_modes() {
        assert_eq!("Mini".parse::<PerformanceMode>().ok(), Some(PerformanceMode::Mini));
        assert!("turbo".parse::<PerformanceMode>().is_err());
        assert_eq!(PerformanceMode::Mini.next(), PerformanceMode::Full);
    }
}
