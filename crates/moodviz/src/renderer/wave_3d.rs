//! Pseudo-3D terrain of stacked spectrum lines.
//!
//! Recent band snapshots are laid out as parallel lines at increasing
//! depth and projected with a perspective divide, so the spectrum history
//! scrolls away from the viewer like a landscape.

use super::{ease, sample_bands, Emitter, Frame, Visualization};
use moodviz_api::{Rect, Surface};

use crate::audio::NUM_BANDS;
use crate::particles::ParticlePool;

/// Depth layers kept in history
const NUM_LAYERS: usize = 24;
/// Points per layer
const POINTS_PER_LAYER: usize = 48;
/// Distance between layers (world units)
const LAYER_SPACING: f32 = 0.35;
/// Depth of the nearest layer
const NEAR_Z: f32 = 1.0;
/// Seconds between history shifts
const SCROLL_INTERVAL: f32 = 0.05;

pub struct Wave3d {
    /// Newest first
    history: Vec<[f32; NUM_BANDS]>,
    scroll_timer: f32,
    /// Camera lift on beats
    camera_bob: f32,
}

impl Default for Wave3d {
    fn default() -> Self {
        Self {
            history: vec![[0.0; NUM_BANDS]; NUM_LAYERS],
            scroll_timer: 0.0,
            camera_bob: 0.0,
        }
    }
}

/// Perspective projection of a world point onto the surface
fn project(bounds: Rect, x: f32, y: f32, z: f32, focal: f32) -> (f32, f32) {
    let z = z.max(0.01);
    (bounds.x + x * focal / z, bounds.y + y * focal / z)
}

impl Visualization for Wave3d {
    fn update(&mut self, frame: &Frame, _emitter: &mut Emitter) {
        self.scroll_timer += frame.dt;
        if self.scroll_timer >= SCROLL_INTERVAL {
            self.scroll_timer %= SCROLL_INTERVAL;
            self.history.rotate_right(1);
        }
        // The front layer always tracks the live bands
        self.history[0] = frame.bands.as_array();

        let kick = frame.beat.map(|b| b.confidence * 0.15).unwrap_or(0.0);
        self.camera_bob = (self.camera_bob * (1.0 - ease(0.12, frame.dt))).max(kick);
    }

    fn draw(&self, frame: &Frame, _particles: &ParticlePool, surface: &mut dyn Surface, bounds: Rect) {
        let palette = &frame.palette;
        let focal = bounds.min_side() * 0.5;
        let width = bounds.w / focal;
        let camera_y = 0.6 + self.camera_bob;
        let height_scale = 0.5 + frame.signal.energy * 0.4;

        // Back to front
        for (layer, bands) in self.history.iter().enumerate().rev() {
            let z = NEAR_Z + layer as f32 * LAYER_SPACING;
            let depth = layer as f32 / NUM_LAYERS as f32;

            let points: Vec<(f32, f32)> = (0..POINTS_PER_LAYER)
                .map(|i| {
                    let u = i as f32 / (POINTS_PER_LAYER - 1) as f32;
                    // Mirror so bass sits in the middle of the road
                    let band_pos = (u * 2.0 - 1.0).abs();
                    let h = sample_bands(bands, 1.0 - band_pos) * height_scale;
                    let x = (u - 0.5) * width * 1.2;
                    project(bounds, x, h - camera_y, z, focal)
                })
                .collect();

            let alpha = (1.0 - depth).powf(1.5) * 0.9;
            let color = palette.gradient(1.0 - depth, 0.1 * (1.0 - depth), alpha);
            surface.polyline(&points, 1.0 + (1.0 - depth) * 2.0, color);
        }

        // Horizon
        let (_, horizon) = project(
            bounds,
            0.0,
            -camera_y,
            NEAR_Z + NUM_LAYERS as f32 * LAYER_SPACING,
            focal,
        );
        surface.line(
            bounds.left(),
            horizon,
            bounds.right(),
            horizon,
            1.0,
            palette.complementary().color(0.2),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::BandEnergies;
    use crate::particles::Physics;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn farther_points_converge_on_centre() {
        let bounds = Rect::from_w_h(800.0, 600.0);
        let (near_x, _) = project(bounds, 1.0, 0.0, 1.0, 300.0);
        let (far_x, _) = project(bounds, 1.0, 0.0, 4.0, 300.0);
        assert_eq!(near_x, 300.0);
        assert_eq!(far_x, 75.0);
    }

    #[test]
    fn history_scrolls_back() {
        let mut wave = Wave3d::default();
        let mut pool = ParticlePool::new(1);
        let mut rng = StdRng::seed_from_u64(0);
        let mut emitter = Emitter {
            pool: &mut pool,
            rng: &mut rng,
            physics: Physics::default(),
        };

        let loud = Frame {
            bands: BandEnergies::from_array([1.0; 7]),
            dt: SCROLL_INTERVAL,
            ..Frame::default()
        };
        wave.update(&loud, &mut emitter);
        let quiet = Frame {
            dt: SCROLL_INTERVAL,
            ..Frame::default()
        };
        wave.update(&quiet, &mut emitter);

        assert_eq!(wave.history[0], [0.0; NUM_BANDS]);
        assert_eq!(wave.history[1], [1.0; NUM_BANDS]);
        assert_eq!(wave.history.len(), NUM_LAYERS);
    }
}
