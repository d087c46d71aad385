//! Radial spokes around a pulsing core.
//!
//! The spoke ring rotates at a speed set by overall energy. Spoke lengths
//! follow the bands, mirrored so the ring is symmetric.

use super::{ease, sample_bands, Emitter, Frame, Visualization};
use moodviz_api::{Rect, Surface};
use std::f32::consts::TAU;

use crate::particles::ParticlePool;

/// Spokes around the full circle
const NUM_SPOKES: usize = 96;
/// Radians per second at zero energy
const BASE_SPIN: f32 = 0.15;
/// Extra radians per second at full energy
const ENERGY_SPIN: f32 = 1.6;

pub struct Circular {
    rotation: f32,
    lengths: [f32; NUM_SPOKES],
    /// Core radius pulse, 0-1
    pulse: f32,
}

impl Default for Circular {
    fn default() -> Self {
        Self {
            rotation: 0.0,
            lengths: [0.0; NUM_SPOKES],
            pulse: 0.0,
        }
    }
}

impl Visualization for Circular {
    fn update(&mut self, frame: &Frame, _emitter: &mut Emitter) {
        let signal = &frame.signal;
        self.rotation = (self.rotation + (BASE_SPIN + signal.energy * ENERGY_SPIN) * frame.dt) % TAU;

        let bands = frame.bands.as_array();
        let half = NUM_SPOKES / 2;
        let follow = ease(0.4, frame.dt);
        for i in 0..NUM_SPOKES {
            // Mirror: spoke 0 and spoke N-1 both show sub-bass
            let k = if i < half { i } else { NUM_SPOKES - 1 - i };
            let target = sample_bands(&bands, k as f32 / (half - 1) as f32);
            self.lengths[i] += (target - self.lengths[i]) * follow;
        }

        let beat_kick = frame.beat.map(|b| 0.5 + b.confidence * 0.5).unwrap_or(0.0);
        self.pulse = (self.pulse * (1.0 - ease(0.15, frame.dt)))
            .max(signal.bass)
            .max(beat_kick);
    }

    fn draw(&self, frame: &Frame, _particles: &ParticlePool, surface: &mut dyn Surface, bounds: Rect) {
        let palette = &frame.palette;
        let signal = &frame.signal;
        let radius = bounds.min_side() * 0.5;
        let inner = radius * (0.22 + self.pulse * 0.08);
        let reach = radius * (0.5 + signal.energy * 0.2);

        // Core glow
        surface.ellipse(
            bounds.x,
            bounds.y,
            inner * 2.4,
            inner * 2.4,
            palette.color(0.12 + self.pulse * 0.15),
        );
        surface.ellipse(bounds.x, bounds.y, inner * 2.0, inner * 2.0, palette.color(0.35));

        for (i, &length) in self.lengths.iter().enumerate() {
            let t = i as f32 / NUM_SPOKES as f32;
            let angle = self.rotation + t * TAU;
            let (sin, cos) = angle.sin_cos();
            let outer = inner + 2.0 + length * reach;

            let mirrored = if t < 0.5 { t * 2.0 } else { (1.0 - t) * 2.0 };
            let color = palette.gradient(mirrored, length * 0.25, 0.5 + length * 0.5);
            surface.line(
                bounds.x + cos * inner,
                bounds.y + sin * inner,
                bounds.x + cos * outer,
                bounds.y + sin * outer,
                1.5 + length * 3.0,
                color,
            );
        }

        // Treble ring
        if signal.treble > 0.1 {
            let ring_r = inner + reach * (0.9 + signal.treble * 0.3);
            let segments = 72;
            let ring: Vec<(f32, f32)> = (0..=segments)
                .map(|i| {
                    let a = -self.rotation * 0.5 + i as f32 / segments as f32 * TAU;
                    (bounds.x + ring_r * a.cos(), bounds.y + ring_r * a.sin())
                })
                .collect();
            surface.polyline(&ring, 1.0, palette.complementary().color(signal.treble * 0.5));
        }
    }
}
