//! Ambient two-tone nebula.
//!
//! Slow dust motes drift outward on a swirl, tinted with the palette and its
//! complement, over soft rotating clouds. Energy sets the emission rate and
//! beats release an extra shell of dust.

use super::{draw_particles, ease, Emitter, Frame, Visualization};
use moodviz_api::{Rect, Surface};
use rand::Rng;
use std::f32::consts::TAU;

use crate::particles::{ParticleConfig, ParticleKind, ParticlePool};

/// Dust per second at zero / full energy
const BASE_RATE: f32 = 20.0;
const ENERGY_RATE: f32 = 60.0;
/// Extra dust released on a beat
const BEAT_SHELL: usize = 24;
/// Background clouds
const NUM_CLOUDS: usize = 3;

#[derive(Default)]
pub struct Nebula {
    budget: f32,
    cloud_angle: f32,
    /// Cloud brightness, follows energy
    glow: f32,
}

impl Nebula {
    fn mote(frame: &Frame, emitter: &mut Emitter, radius: f32, outward: f32) -> bool {
        let rng = emitter.rng();
        let angle = rng.random_range(0.0..TAU);
        let swirl = 0.05 + frame.signal.mid * 0.2;
        let (sin, cos) = angle.sin_cos();
        // Tangential swirl plus a little outward drift
        let velocity = (-sin * swirl + cos * outward, cos * swirl + sin * outward);
        let palette = if rng.random_bool(0.35) {
            frame.palette.complementary()
        } else {
            frame.palette
        };
        let config = ParticleConfig {
            position: (cos * radius, sin * radius),
            velocity,
            size: rng.random_range(1.5..4.0),
            decay: rng.random_range(0.004..0.008),
            shrink: 0.0,
            color: palette.gradient(rng.random_range(0.0..1.0), 0.05, 0.7),
            rotation: 0.0,
            spin: 0.0,
            kind: ParticleKind::Dust,
        };
        emitter.spawn(&config).is_some()
    }
}

impl Visualization for Nebula {
    fn update(&mut self, frame: &Frame, emitter: &mut Emitter) {
        // Dust floats; no gravity
        emitter.step(frame.dt, 0.0);

        self.budget += frame.dt * (BASE_RATE + frame.signal.energy * ENERGY_RATE);
        while self.budget >= 1.0 {
            self.budget -= 1.0;
            let radius = emitter.rng().random_range(0.0..0.9);
            if !Self::mote(frame, emitter, radius, 0.02) {
                self.budget = 0.0;
                break;
            }
        }

        if let Some(beat) = frame.beat {
            let shell = 0.3 + beat.confidence * 0.2;
            for _ in 0..BEAT_SHELL {
                if !Self::mote(frame, emitter, shell, 0.15 + beat.confidence * 0.2) {
                    break;
                }
            }
        }

        self.cloud_angle = (self.cloud_angle + frame.dt * (0.05 + frame.signal.energy * 0.15)) % TAU;
        self.glow += (frame.signal.energy - self.glow) * ease(0.05, frame.dt);
    }

    fn draw(&self, frame: &Frame, particles: &ParticlePool, surface: &mut dyn Surface, bounds: Rect) {
        let radius = bounds.min_side() * 0.5;
        let complement = frame.palette.complementary();

        for i in 0..NUM_CLOUDS {
            let angle = self.cloud_angle + i as f32 * TAU / NUM_CLOUDS as f32;
            let offset = radius * 0.3;
            let palette = if i % 2 == 0 { &frame.palette } else { &complement };
            let size = radius * (1.1 + self.glow * 0.4);
            surface.ellipse(
                bounds.x + angle.cos() * offset,
                bounds.y + angle.sin() * offset,
                size,
                size,
                palette.color(0.05 + self.glow * 0.08),
            );
        }

        draw_particles(particles, surface, bounds);
    }
}
