//! Oscilloscope-style traces mirrored about the centre line.
//!
//! No time-domain samples reach the render modes, so the trace is
//! synthesized: each band contributes a sine at a band-proportional
//! frequency with the band's energy as amplitude. The result reads like a
//! scope trace and reacts to the same spectrum as every other mode.

use super::{ease, Emitter, Frame, Visualization};
use moodviz_api::{Rect, Surface};
use std::f32::consts::TAU;

use crate::audio::NUM_BANDS;
use crate::particles::ParticlePool;

/// Points per trace
const NUM_POINTS: usize = 160;
/// Stacked traces, drawn back to front with falling alpha
const NUM_TRACES: usize = 3;
/// Cycles across the width for each band
const BAND_CYCLES: [f32; NUM_BANDS] = [1.0, 2.0, 3.5, 5.0, 8.0, 12.0, 17.0];

pub struct Waveform {
    phase: [f32; NUM_BANDS],
    amplitudes: [f32; NUM_BANDS],
    /// Normalized trace, -1..1
    trace: Vec<f32>,
}

impl Default for Waveform {
    fn default() -> Self {
        Self {
            phase: [0.0; NUM_BANDS],
            amplitudes: [0.0; NUM_BANDS],
            trace: vec![0.0; NUM_POINTS],
        }
    }
}

impl Waveform {
    fn rebuild_trace(&mut self) {
        let total: f32 = self.amplitudes.iter().sum::<f32>().max(1.0);
        for (i, y) in self.trace.iter_mut().enumerate() {
            let x = i as f32 / (NUM_POINTS - 1) as f32;
            let mut sum = 0.0;
            for b in 0..NUM_BANDS {
                sum += self.amplitudes[b] * (x * BAND_CYCLES[b] * TAU + self.phase[b]).sin();
            }
            // Taper the ends so the trace meets the centre line
            let taper = (x * std::f32::consts::PI).sin();
            *y = (sum / total * taper).clamp(-1.0, 1.0);
        }
    }
}

impl Visualization for Waveform {
    fn update(&mut self, frame: &Frame, _emitter: &mut Emitter) {
        let bands = frame.bands.as_array();
        let speed = 1.0 + frame.signal.energy * 3.0;
        let follow = ease(0.5, frame.dt);
        for b in 0..NUM_BANDS {
            self.phase[b] = (self.phase[b] + frame.dt * speed * (1.0 + b as f32 * 0.7)) % TAU;
            self.amplitudes[b] += (bands[b] - self.amplitudes[b]) * follow;
        }
        self.rebuild_trace();
    }

    fn draw(&self, frame: &Frame, _particles: &ParticlePool, surface: &mut dyn Surface, bounds: Rect) {
        let palette = &frame.palette;
        let signal = &frame.signal;
        let amplitude = bounds.h * 0.4 * (0.3 + signal.volume * 0.7);
        let beat_boost = frame.beat.map(|b| b.confidence * 0.3).unwrap_or(0.0);

        for layer in (0..NUM_TRACES).rev() {
            let depth = layer as f32 / NUM_TRACES as f32;
            let scale = amplitude * (1.0 - depth * 0.35) * (1.0 + beat_boost);
            let alpha = 0.9 - depth * 0.6;
            let color = palette.gradient(1.0 - depth, signal.treble * 0.2, alpha);

            let upper: Vec<(f32, f32)> = self
                .trace
                .iter()
                .enumerate()
                .map(|(i, &y)| {
                    let x = bounds.left() + bounds.w * i as f32 / (NUM_POINTS - 1) as f32;
                    (x, bounds.y + y * scale)
                })
                .collect();
            let lower: Vec<(f32, f32)> = upper
                .iter()
                .map(|&(x, y)| (x, 2.0 * bounds.y - y))
                .collect();

            let weight = 1.0 + (1.0 - depth) * 2.0 * (0.5 + signal.energy);
            surface.polyline(&upper, weight, color);
            surface.polyline(&lower, weight, color.with_alpha(alpha * 0.6));
        }

        surface.line(
            bounds.left(),
            bounds.y,
            bounds.right(),
            bounds.y,
            1.0,
            palette.color(0.15),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::BandEnergies;
    use crate::particles::Physics;
    use moodviz_api::{DrawCommand, RecordingSurface};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn silence_is_flat_and_traces_mirror() {
        let mut waveform = Waveform::default();
        let mut pool = ParticlePool::new(1);
        let mut rng = StdRng::seed_from_u64(0);
        let mut emitter = Emitter {
            pool: &mut pool,
            rng: &mut rng,
            physics: Physics::default(),
        };

        let silent = Frame {
            dt: 1.0 / 60.0,
            ..Frame::default()
        };
        waveform.update(&silent, &mut emitter);
        assert!(waveform.trace.iter().all(|y| *y == 0.0));

        let loud = Frame {
            bands: BandEnergies::from_array([0.6; 7]),
            dt: 1.0 / 60.0,
            ..Frame::default()
        };
        for _ in 0..5 {
            waveform.update(&loud, &mut emitter);
        }
        assert!(waveform.trace.iter().any(|y| y.abs() > 0.05));
        assert!(waveform.trace.iter().all(|y| y.abs() <= 1.0));

        let mut surface = RecordingSurface::new();
        let bounds = Rect::new(0.0, 50.0, 400.0, 300.0);
        waveform.draw(&loud, &ParticlePool::new(1), &mut surface, bounds);
        let traces: Vec<&Vec<(f32, f32)>> = surface
            .commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Polyline { points, .. } => Some(points),
                _ => None,
            })
            .collect();
        assert_eq!(traces.len(), NUM_TRACES * 2);
        for (a, b) in traces[0].iter().zip(traces[1].iter()) {
            assert!(((a.1 - 50.0) + (b.1 - 50.0)).abs() < 1e-3);
        }
    }
}
