//! Fixed-capacity particle pool.
//!
//! All particle records are allocated up front. A slot is either on the free
//! list or on the active list, never both, so `active + free == capacity`
//! holds after every operation. Spawning from a full pool quietly returns
//! `None`: that is backpressure, not an error.

use moodviz_api::Color;

/// Default number of particle slots
pub const DEFAULT_CAPACITY: usize = 400;
/// Particles smaller than this are reaped
pub const MIN_SIZE: f32 = 0.5;
/// Per-frame rates are expressed against this frame duration (seconds)
const BASELINE_FRAME_SECS: f32 = 1.0 / 60.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParticleKind {
    /// Short-lived beat burst fragment
    Spark,
    /// Soft blob emitted on sustained volume
    Orb,
    /// Slow ambient nebula mote
    Dust,
}

/// Positions are in surface units: the origin is the surface centre and 1.0
/// is half its shorter side. Sizes are in pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Particle {
    pub position: (f32, f32),
    pub velocity: (f32, f32),
    pub size: f32,
    /// 1.0 at spawn, reaped at 0
    pub life: f32,
    /// Life lost per 60 fps frame
    pub decay: f32,
    /// Fraction of size lost per 60 fps frame
    pub shrink: f32,
    pub color: Color,
    pub rotation: f32,
    /// Radians per second
    pub spin: f32,
    pub kind: ParticleKind,
}

impl Default for Particle {
    fn default() -> Self {
        Self {
            position: (0.0, 0.0),
            velocity: (0.0, 0.0),
            size: 0.0,
            life: 0.0,
            decay: 0.0,
            shrink: 0.0,
            color: Color::WHITE,
            rotation: 0.0,
            spin: 0.0,
            kind: ParticleKind::Spark,
        }
    }
}

/// Initial state for a spawned particle
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ParticleConfig {
    pub position: (f32, f32),
    pub velocity: (f32, f32),
    pub size: f32,
    pub decay: f32,
    pub shrink: f32,
    pub color: Color,
    pub rotation: f32,
    pub spin: f32,
    pub kind: ParticleKind,
}

impl Default for ParticleConfig {
    fn default() -> Self {
        Self {
            position: (0.0, 0.0),
            velocity: (0.0, 0.0),
            size: 4.0,
            decay: 0.02,
            shrink: 0.0,
            color: Color::WHITE,
            rotation: 0.0,
            spin: 0.0,
            kind: ParticleKind::Spark,
        }
    }
}

/// Forces applied during `update`
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Physics {
    /// Downward acceleration in surface units/s² (positive pulls toward -y)
    pub gravity: f32,
    /// Velocity retained per 60 fps frame (1.0 = no drag)
    pub drag: f32,
}

impl Default for Physics {
    fn default() -> Self {
        Self {
            gravity: 0.4,
            drag: 0.98,
        }
    }
}

/// Handle to a pool slot
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ParticleId(usize);

pub struct ParticlePool {
    slots: Vec<Particle>,
    in_use: Vec<bool>,
    active: Vec<usize>,
    free: Vec<usize>,
}

impl ParticlePool {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![Particle::default(); capacity],
            in_use: vec![false; capacity],
            active: Vec::with_capacity(capacity),
            // Pop from the back, so hand out low indices first
            free: (0..capacity).rev().collect(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    pub fn is_full(&self) -> bool {
        self.free.is_empty()
    }

    /// Take a slot from the free list, or `None` when the pool is exhausted.
    pub fn spawn(&mut self, config: &ParticleConfig) -> Option<ParticleId> {
        let idx = self.free.pop()?;
        self.slots[idx] = Particle {
            position: config.position,
            velocity: config.velocity,
            size: config.size,
            life: 1.0,
            decay: config.decay,
            shrink: config.shrink,
            color: config.color,
            rotation: config.rotation,
            spin: config.spin,
            kind: config.kind,
        };
        self.in_use[idx] = true;
        self.active.push(idx);
        Some(ParticleId(idx))
    }

    /// Return an active particle to the free list. Ignores stale handles.
    pub fn recycle(&mut self, id: ParticleId) -> bool {
        let idx = id.0;
        if !self.in_use.get(idx).copied().unwrap_or(false) {
            return false;
        }
        if let Some(pos) = self.active.iter().position(|&a| a == idx) {
            self.active.swap_remove(pos);
        }
        self.in_use[idx] = false;
        self.free.push(idx);
        true
    }

    /// Retire every active particle
    pub fn recycle_all(&mut self) {
        for idx in self.active.drain(..) {
            self.in_use[idx] = false;
            self.free.push(idx);
        }
    }

    pub fn get(&self, id: ParticleId) -> Option<&Particle> {
        let idx = id.0;
        if self.in_use.get(idx).copied().unwrap_or(false) {
            Some(&self.slots[idx])
        } else {
            None
        }
    }

    /// Active particles, in no particular order
    pub fn iter(&self) -> impl Iterator<Item = &Particle> {
        self.active.iter().map(move |&idx| &self.slots[idx])
    }

    /// Integrate one frame and reap dead particles. Returns how many were reaped.
    pub fn update(&mut self, dt_secs: f32, physics: &Physics) -> usize {
        if !(dt_secs.is_finite() && dt_secs > 0.0) {
            return 0;
        }
        let frames = dt_secs / BASELINE_FRAME_SECS;
        let drag = physics.drag.clamp(0.0, 1.0).powf(frames);

        let slots = &mut self.slots;
        let in_use = &mut self.in_use;
        let free = &mut self.free;
        let before = self.active.len();

        self.active.retain(|&idx| {
            let p = &mut slots[idx];
            p.velocity.1 -= physics.gravity * dt_secs;
            p.velocity.0 *= drag;
            p.velocity.1 *= drag;
            p.position.0 += p.velocity.0 * dt_secs;
            p.position.1 += p.velocity.1 * dt_secs;
            p.rotation += p.spin * dt_secs;
            p.life -= p.decay * frames;
            p.size *= (1.0 - p.shrink * frames).max(0.0);

            let alive = p.life > 0.0 && p.size >= MIN_SIZE && p.life.is_finite();
            if !alive {
                in_use[idx] = false;
                free.push(idx);
            }
            alive
        });

        before - self.active.len()
    }
}

impl Default for ParticlePool {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conserved(pool: &ParticlePool) -> bool {
        pool.active_count() + pool.free_count() == pool.capacity()
    }

    #[test]
    fn spawn_until_full_then_backpressure() {
        let mut pool = ParticlePool::new(3);
        let config = ParticleConfig::default();
        assert!(pool.spawn(&config).is_some());
        assert!(pool.spawn(&config).is_some());
        assert!(pool.spawn(&config).is_some());
        assert!(pool.is_full());
        assert!(pool.spawn(&config).is_none());
        assert!(conserved(&pool));
    }

    #[test]
    fn recycle_returns_slot_once() {
        let mut pool = ParticlePool::new(2);
        let id = pool.spawn(&ParticleConfig::default()).expect("free slot");
        assert!(pool.recycle(id));
        assert!(!pool.recycle(id), "double recycle must be ignored");
        assert!(conserved(&pool));
        assert_eq!(pool.active_count(), 0);
        assert!(pool.get(id).is_none());
    }

    #[test]
    fn spawned_particle_starts_alive() {
        let mut pool = ParticlePool::new(1);
        let config = ParticleConfig {
            position: (3.0, 4.0),
            size: 6.0,
            kind: ParticleKind::Orb,
            ..ParticleConfig::default()
        };
        let id = pool.spawn(&config).expect("free slot");
        let p = pool.get(id).expect("active");
        assert_eq!(p.life, 1.0);
        assert_eq!(p.position, (3.0, 4.0));
        assert_eq!(p.kind, ParticleKind::Orb);
    }

    #[test]
    fn update_integrates_and_reaps() {
        let mut pool = ParticlePool::new(4);
        pool.spawn(&ParticleConfig {
            velocity: (60.0, 0.0),
            decay: 0.5,
            ..ParticleConfig::default()
        });
        pool.spawn(&ParticleConfig {
            decay: 0.001,
            ..ParticleConfig::default()
        });

        let physics = Physics {
            gravity: 0.0,
            drag: 1.0,
        };
        let reaped = pool.update(1.0 / 60.0, &physics);
        assert_eq!(reaped, 0);
        let moved = pool.iter().find(|p| p.decay == 0.5).expect("still alive");
        assert!((moved.position.0 - 1.0).abs() < 1e-4);
        assert!((moved.life - 0.5).abs() < 1e-4);

        let reaped = pool.update(1.0 / 60.0, &physics);
        assert_eq!(reaped, 1);
        assert_eq!(pool.active_count(), 1);
        assert!(conserved(&pool));
    }

    #[test]
    fn shrinking_particles_are_reaped() {
        let mut pool = ParticlePool::new(1);
        pool.spawn(&ParticleConfig {
            size: 1.0,
            decay: 0.0,
            shrink: 0.6,
            ..ParticleConfig::default()
        });
        pool.update(1.0 / 60.0, &Physics::default());
        assert_eq!(pool.active_count(), 0);
        assert_eq!(pool.free_count(), 1);
    }

    #[test]
    fn gravity_pulls_down() {
        let mut pool = ParticlePool::new(1);
        pool.spawn(&ParticleConfig {
            decay: 0.0,
            ..ParticleConfig::default()
        });
        pool.update(0.1, &Physics::default());
        let p = pool.iter().next().expect("alive");
        assert!(p.velocity.1 < 0.0);
        assert!(p.position.1 < 0.0);
    }

    #[test]
    fn recycle_all_empties_active_list() {
        let mut pool = ParticlePool::new(8);
        for _ in 0..5 {
            pool.spawn(&ParticleConfig::default());
        }
        pool.recycle_all();
        assert_eq!(pool.active_count(), 0);
        assert_eq!(pool.free_count(), 8);
    }

    #[test]
    fn bad_dt_is_ignored() {
        let mut pool = ParticlePool::new(1);
        pool.spawn(&ParticleConfig::default());
        assert_eq!(pool.update(f32::NAN, &Physics::default()), 0);
        assert_eq!(pool.update(-1.0, &Physics::default()), 0);
        assert_eq!(pool.iter().next().map(|p| p.life), Some(1.0));
    }
}
