pub mod bars;
pub mod circular;
pub mod nebula;
pub mod particle_burst;
pub mod wave_3d;
pub mod waveform;

use std::fmt;
use std::str::FromStr;

use moodviz_api::{Color, Rect, Surface};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::debug;

use crate::audio::{frame_factor, BandEnergies, BeatEvent, SmoothedSignal, NUM_BANDS};
use crate::error::EngineError;
use crate::palette::Palette;
use crate::particles::{ParticleConfig, ParticleId, ParticlePool, Physics};

pub use bars::Bars;
pub use circular::Circular;
pub use nebula::Nebula;
pub use particle_burst::ParticleBurst;
pub use wave_3d::Wave3d;
pub use waveform::Waveform;

/// The interchangeable visual styles
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum RenderMode {
    #[default]
    Bars,
    Circular,
    Waveform,
    Particles,
    Nebula,
    Pseudo3d,
}

impl RenderMode {
    pub const ALL: [RenderMode; 6] = [
        RenderMode::Bars,
        RenderMode::Circular,
        RenderMode::Waveform,
        RenderMode::Particles,
        RenderMode::Nebula,
        RenderMode::Pseudo3d,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RenderMode::Bars => "bars",
            RenderMode::Circular => "circular",
            RenderMode::Waveform => "waveform",
            RenderMode::Particles => "particles",
            RenderMode::Nebula => "nebula",
            RenderMode::Pseudo3d => "pseudo-3d",
        }
    }

    fn index(self) -> usize {
        match self {
            RenderMode::Bars => 0,
            RenderMode::Circular => 1,
            RenderMode::Waveform => 2,
            RenderMode::Particles => 3,
            RenderMode::Nebula => 4,
            RenderMode::Pseudo3d => 5,
        }
    }
}

impl fmt::Display for RenderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RenderMode {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        if name == "3d" || name == "pseudo3d" {
            return Ok(RenderMode::Pseudo3d);
        }
        Self::ALL
            .into_iter()
            .find(|mode| mode.as_str() == name)
            .ok_or_else(|| EngineError::UnknownMode(s.to_string()))
    }
}

/// Everything a render mode sees for one frame
#[derive(Clone, Copy, Debug, Default)]
pub struct Frame {
    pub bands: BandEnergies,
    pub signal: SmoothedSignal,
    pub palette: Palette,
    pub beat: Option<BeatEvent>,
    /// Seconds since the previous frame
    pub dt: f32,
    /// Seconds since the engine started
    pub time: f32,
}

/// Mutable particle access handed to a mode for the duration of `update`
pub struct Emitter<'a> {
    pool: &'a mut ParticlePool,
    rng: &'a mut StdRng,
    physics: Physics,
}

impl<'a> Emitter<'a> {
    pub fn spawn(&mut self, config: &ParticleConfig) -> Option<ParticleId> {
        self.pool.spawn(config)
    }

    /// Integrate and reap; `gravity_scale` lets a mode float or fall
    pub fn step(&mut self, dt: f32, gravity_scale: f32) -> usize {
        let physics = Physics {
            gravity: self.physics.gravity * gravity_scale,
            ..self.physics
        };
        self.pool.update(dt, &physics)
    }

    pub fn rng(&mut self) -> &mut StdRng {
        &mut *self.rng
    }

    pub fn is_full(&self) -> bool {
        self.pool.is_full()
    }
}

/// Trait that all render modes implement
pub trait Visualization {
    /// Derive this frame's drawing state. Particle changes happen here.
    fn update(&mut self, frame: &Frame, emitter: &mut Emitter);

    /// Draw the state from the last `update`
    fn draw(&self, frame: &Frame, particles: &ParticlePool, surface: &mut dyn Surface, bounds: Rect);
}

/// Interpolate the seven bands onto `pos` in 0-1
pub(crate) fn sample_bands(bands: &[f32; NUM_BANDS], pos: f32) -> f32 {
    let band_pos = pos.clamp(0.0, 1.0) * (NUM_BANDS - 1) as f32;
    let low = (band_pos as usize).min(NUM_BANDS - 1);
    let high = (low + 1).min(NUM_BANDS - 1);
    let t = band_pos - low as f32;
    bands[low] * (1.0 - t) + bands[high] * t
}

/// A 60 fps per-frame easing factor scaled to a frame of `dt` seconds
pub(crate) fn ease(per_frame: f32, dt: f32) -> f32 {
    frame_factor(per_frame, dt as f64 * 1000.0)
}

/// Particle position (surface units) to pixels
pub(crate) fn to_screen(bounds: Rect, pos: (f32, f32)) -> (f32, f32) {
    let scale = bounds.min_side() * 0.5;
    (bounds.x + pos.0 * scale, bounds.y + pos.1 * scale)
}

/// Draws every active particle as a soft dot
pub(crate) fn draw_particles(particles: &ParticlePool, surface: &mut dyn Surface, bounds: Rect) {
    for p in particles.iter() {
        let (x, y) = to_screen(bounds, p.position);
        let alpha = p.color.a * p.life.clamp(0.0, 1.0);
        let size = p.size * (0.5 + 0.5 * p.life);
        surface.ellipse(x, y, size * 2.2, size * 2.2, p.color.with_alpha(alpha * 0.25));
        surface.ellipse(x, y, size, size, p.color.with_alpha(alpha));
    }
}

const BACKGROUND: Color = Color::rgb(0.02, 0.02, 0.04);

/// Owns the render modes and the particle pool they share
pub struct Renderer {
    visualizations: Vec<Box<dyn Visualization>>,
    current: RenderMode,
    pool: ParticlePool,
    rng: StdRng,
    physics: Physics,
    frame: Frame,
}

impl Renderer {
    pub fn new(capacity: usize, physics: Physics) -> Self {
        Self::with_rng(capacity, physics, StdRng::from_os_rng())
    }

    /// Deterministic spawn jitter, for tests
    pub fn with_seed(capacity: usize, physics: Physics, seed: u64) -> Self {
        Self::with_rng(capacity, physics, StdRng::seed_from_u64(seed))
    }

    fn with_rng(capacity: usize, physics: Physics, rng: StdRng) -> Self {
        // Same order as RenderMode::ALL
        let visualizations: Vec<Box<dyn Visualization>> = vec![
            Box::new(Bars::default()),
            Box::new(Circular::default()),
            Box::new(Waveform::default()),
            Box::new(ParticleBurst::default()),
            Box::new(Nebula::default()),
            Box::new(Wave3d::default()),
        ];

        Self {
            visualizations,
            current: RenderMode::default(),
            pool: ParticlePool::new(capacity),
            rng,
            physics,
            frame: Frame::default(),
        }
    }

    pub fn mode(&self) -> RenderMode {
        self.current
    }

    /// Switch modes. Particles from the previous mode are retired immediately.
    pub fn set_mode(&mut self, mode: RenderMode) {
        self.pool.recycle_all();
        if mode != self.current {
            debug!(from = %self.current, to = %mode, "render mode changed");
            self.current = mode;
        }
    }

    pub fn pool(&self) -> &ParticlePool {
        &self.pool
    }

    pub fn active_particles(&self) -> usize {
        self.pool.active_count()
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    /// Advance the active mode. Modes color with the smoothed tone, never
    /// the raw palette.
    pub fn update(&mut self, frame: Frame) {
        self.frame = Frame {
            palette: frame.palette.following(&frame.signal),
            ..frame
        };
        let mut emitter = Emitter {
            pool: &mut self.pool,
            rng: &mut self.rng,
            physics: self.physics,
        };
        self.visualizations[self.current.index()].update(&self.frame, &mut emitter);
    }

    /// Draw the active mode. Returns false when the bounds are empty.
    pub fn draw(&self, surface: &mut dyn Surface, bounds: Rect) -> bool {
        if bounds.is_empty() {
            return false;
        }
        surface.background(BACKGROUND);
        self.visualizations[self.current.index()].draw(&self.frame, &self.pool, surface, bounds);
        true
    }

    /// Static frame shown while no audio is available
    pub fn draw_idle(&self, surface: &mut dyn Surface, bounds: Rect, palette: &Palette) -> bool {
        if bounds.is_empty() {
            return false;
        }
        surface.background(BACKGROUND);
        let radius = bounds.min_side() * 0.3;
        let segments = 96;
        let ring: Vec<(f32, f32)> = (0..=segments)
            .map(|i| {
                let angle = i as f32 / segments as f32 * std::f32::consts::TAU;
                (bounds.x + radius * angle.cos(), bounds.y + radius * angle.sin())
            })
            .collect();
        surface.polyline(&ring, 2.0, palette.color(0.25));
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use moodviz_api::RecordingSurface;

    fn loud_frame(beat: bool) -> Frame {
        let bands = BandEnergies::from_array([0.9, 0.8, 0.6, 0.5, 0.4, 0.3, 0.2]);
        Frame {
            bands,
            signal: SmoothedSignal {
                energy: 0.8,
                bass: 0.85,
                mid: 0.5,
                treble: 0.25,
                volume: 0.7,
                hue: 200.0,
                saturation: 0.7,
            },
            palette: Palette::default(),
            beat: beat.then_some(BeatEvent {
                timestamp: 0.0,
                confidence: 0.8,
            }),
            dt: 1.0 / 60.0,
            time: 1.0,
        }
    }

    #[test]
    fn parse_mode_names() {
        for mode in RenderMode::ALL {
            assert_eq!(mode.as_str().parse::<RenderMode>().ok(), Some(mode));
        }
        assert_eq!("3D".parse::<RenderMode>().ok(), Some(RenderMode::Pseudo3d));
        assert!(matches!(
            "strobe".parse::<RenderMode>(),
            Err(EngineError::UnknownMode(name)) if name == "strobe"
        ));
    }

    #[test]
    fn visualizations_line_up_with_modes() {
        let renderer = Renderer::with_seed(16, Physics::default(), 1);
        assert_eq!(renderer.visualizations.len(), RenderMode::ALL.len());
        for (i, mode) in RenderMode::ALL.iter().enumerate() {
            assert_eq!(mode.index(), i);
        }
    }

    #[test]
    fn every_mode_draws_something() {
        let bounds = Rect::from_w_h(640.0, 480.0);
        for mode in RenderMode::ALL {
            let mut renderer = Renderer::with_seed(200, Physics::default(), 7);
            renderer.set_mode(mode);
            for i in 0..10 {
                renderer.update(loud_frame(i % 4 == 0));
            }
            let mut surface = RecordingSurface::new();
            assert!(renderer.draw(&mut surface, bounds));
            assert!(surface.len() > 1, "{} drew nothing", mode);
        }
    }

    #[test]
    fn switching_mode_retires_particles() {
        let mut renderer = Renderer::with_seed(200, Physics::default(), 3);
        renderer.set_mode(RenderMode::Particles);
        renderer.update(loud_frame(true));
        assert!(renderer.active_particles() > 0);

        renderer.set_mode(RenderMode::Bars);
        assert_eq!(renderer.active_particles(), 0);
        assert_eq!(renderer.pool().free_count(), 200);
    }

    #[test]
    fn empty_bounds_skip_drawing() {
        let renderer = Renderer::with_seed(8, Physics::default(), 0);
        let mut surface = RecordingSurface::new();
        assert!(!renderer.draw(&mut surface, Rect::from_w_h(0.0, 100.0)));
        assert!(!renderer.draw_idle(&mut surface, Rect::default(), &Palette::default()));
        assert!(surface.is_empty());
    }

    #[test]
    fn modes_color_with_the_smoothed_tone() {
        let bounds = Rect::from_w_h(400.0, 300.0);
        for mode in RenderMode::ALL {
            let mut calm = Renderer::with_seed(64, Physics::default(), 9);
            let mut jumped = Renderer::with_seed(64, Physics::default(), 9);
            calm.set_mode(mode);
            jumped.set_mode(mode);

            let frame = loud_frame(true);
            let switched = Frame {
                palette: Palette {
                    hue: 15.0,
                    saturation: 0.95,
                    ..frame.palette
                },
                ..frame
            };
            calm.update(frame);
            jumped.update(switched);

            let mut a = RecordingSurface::new();
            let mut b = RecordingSurface::new();
            calm.draw(&mut a, bounds);
            jumped.draw(&mut b, bounds);
            assert_eq!(a.commands, b.commands, "{} used the raw palette", mode);
            assert_eq!(jumped.frame().palette.hue, 200.0);
        }
    }

    #[test]
    fn band_sampling_interpolates() {
        let bands = [0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0];
        assert_eq!(sample_bands(&bands, 0.0), 0.0);
        assert!((sample_bands(&bands, 1.0 / 12.0) - 0.5).abs() < 1e-5);
        assert_eq!(sample_bands(&bands, 1.0), 1.0);
    }
}
