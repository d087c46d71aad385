//! Beat-driven particle bursts.
//!
//! Every beat throws a ring of sparks out of the centre, sized by the beat's
//! confidence. Sustained loud passages also trickle slow orbs upward.

use super::{draw_particles, ease, Emitter, Frame, Visualization};
use moodviz_api::{Rect, Surface};
use rand::Rng;
use std::f32::consts::TAU;

use crate::particles::{ParticleConfig, ParticleKind, ParticlePool};

/// Sparks per beat at zero / full confidence
const MIN_BURST: usize = 12;
const MAX_BURST: usize = 48;
/// Volume above which orbs start trickling
const ORB_VOLUME: f32 = 0.6;
/// Orbs per second at full volume
const ORB_RATE: f32 = 40.0;

#[derive(Default)]
pub struct ParticleBurst {
    /// Fractional orbs carried between frames
    orb_budget: f32,
    /// Centre glow, 0-1
    glow: f32,
}

impl ParticleBurst {
    fn burst(frame: &Frame, confidence: f32, emitter: &mut Emitter) {
        let count = MIN_BURST + ((MAX_BURST - MIN_BURST) as f32 * confidence) as usize;
        let speed_scale = 0.6 + frame.signal.energy * 0.8;

        for _ in 0..count {
            let rng = emitter.rng();
            let angle = rng.random_range(0.0..TAU);
            let speed = rng.random_range(0.5..1.2) * speed_scale;
            let t = rng.random_range(0.0..1.0);
            let config = ParticleConfig {
                position: (0.0, 0.0),
                velocity: (angle.cos() * speed, angle.sin() * speed),
                size: rng.random_range(2.0..5.0) * (1.0 + confidence),
                decay: rng.random_range(0.012..0.025),
                shrink: 0.004,
                color: frame.palette.gradient(t, 0.15, 1.0),
                rotation: angle,
                spin: rng.random_range(-3.0..3.0),
                kind: ParticleKind::Spark,
            };
            if emitter.spawn(&config).is_none() {
                // Pool exhausted; the rest of this burst is dropped
                break;
            }
        }
    }

    fn trickle(&mut self, frame: &Frame, emitter: &mut Emitter) {
        let volume = frame.signal.volume;
        if volume <= ORB_VOLUME {
            self.orb_budget = 0.0;
            return;
        }
        self.orb_budget += frame.dt * ORB_RATE * (volume - ORB_VOLUME) / (1.0 - ORB_VOLUME);

        let complement = frame.palette.complementary();
        while self.orb_budget >= 1.0 {
            self.orb_budget -= 1.0;
            let rng = emitter.rng();
            let config = ParticleConfig {
                position: (rng.random_range(-0.6..0.6), rng.random_range(-0.9..-0.5)),
                velocity: (rng.random_range(-0.05..0.05), rng.random_range(0.3..0.6)),
                size: rng.random_range(4.0..9.0),
                decay: 0.008,
                shrink: 0.0,
                color: complement.gradient(rng.random_range(0.0..1.0), 0.1, 0.6),
                rotation: 0.0,
                spin: 0.0,
                kind: ParticleKind::Orb,
            };
            if emitter.spawn(&config).is_none() {
                self.orb_budget = 0.0;
                break;
            }
        }
    }
}

impl Visualization for ParticleBurst {
    fn update(&mut self, frame: &Frame, emitter: &mut Emitter) {
        // Reap first so this frame's spawns can reuse the slots
        emitter.step(frame.dt, 1.0);

        if let Some(beat) = frame.beat {
            Self::burst(frame, beat.confidence, emitter);
            self.glow = 1.0;
        }
        self.trickle(frame, emitter);

        self.glow = (self.glow * (1.0 - ease(0.1, frame.dt))).max(frame.signal.bass * 0.5);
    }

    fn draw(&self, frame: &Frame, particles: &ParticlePool, surface: &mut dyn Surface, bounds: Rect) {
        let r = bounds.min_side() * (0.05 + self.glow * 0.08);
        surface.ellipse(bounds.x, bounds.y, r * 2.0, r * 2.0, frame.palette.color(0.2 + self.glow * 0.4));
        draw_particles(particles, surface, bounds);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{BeatEvent, SmoothedSignal};
    use crate::particles::Physics;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn beat_frame(confidence: f32) -> Frame {
        Frame {
            beat: Some(BeatEvent {
                timestamp: 0.0,
                confidence,
            }),
            dt: 1.0 / 60.0,
            ..Frame::default()
        }
    }

    #[test]
    fn beat_spawns_burst_sized_by_confidence() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut pool = ParticlePool::new(200);
        let mut burst = ParticleBurst::default();
        let mut emitter = Emitter {
            pool: &mut pool,
            rng: &mut rng,
            physics: Physics::default(),
        };
        burst.update(&beat_frame(0.0), &mut emitter);
        assert_eq!(pool.active_count(), MIN_BURST);

        let mut pool = ParticlePool::new(200);
        let mut emitter = Emitter {
            pool: &mut pool,
            rng: &mut rng,
            physics: Physics::default(),
        };
        burst.update(&beat_frame(1.0), &mut emitter);
        assert_eq!(pool.active_count(), MAX_BURST);
        assert!(pool.iter().all(|p| p.kind == ParticleKind::Spark));
    }

    #[test]
    fn full_pool_is_backpressure() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut pool = ParticlePool::new(10);
        let mut burst = ParticleBurst::default();
        let mut emitter = Emitter {
            pool: &mut pool,
            rng: &mut rng,
            physics: Physics::default(),
        };
        burst.update(&beat_frame(1.0), &mut emitter);
        assert_eq!(pool.active_count(), 10);
        assert_eq!(pool.free_count(), 0);
    }

    #[test]
    fn loud_passages_trickle_orbs() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut pool = ParticlePool::new(200);
        let mut burst = ParticleBurst::default();
        let frame = Frame {
            signal: SmoothedSignal {
                volume: 1.0,
                ..SmoothedSignal::default()
            },
            dt: 1.0 / 60.0,
            ..Frame::default()
        };
        for _ in 0..30 {
            let mut emitter = Emitter {
                pool: &mut pool,
                rng: &mut rng,
                physics: Physics::default(),
            };
            burst.update(&frame, &mut emitter);
        }
        let orbs = pool.iter().filter(|p| p.kind == ParticleKind::Orb).count();
        assert!((15..=20).contains(&orbs), "{} orbs", orbs);
    }
}
