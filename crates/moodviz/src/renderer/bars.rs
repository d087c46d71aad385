//! Classic spectrum bars.
//!
//! Bars are interpolated across the seven bands and colored along the
//! palette's hue range, with falling peak caps and a brief lift on beats.

use super::{ease, sample_bands, Emitter, Frame, Visualization};
use moodviz_api::{Rect, Surface};

use crate::audio::NUM_BANDS;
use crate::particles::ParticlePool;

/// Number of bars drawn
const NUM_BARS: usize = 32;
/// Peak cap fall speed (fraction of height per second)
const PEAK_FALL: f32 = 0.6;
/// Beat lift decay per second
const FLASH_DECAY: f32 = 4.0;

pub struct Bars {
    /// Current bar heights, 0-1
    heights: [f32; NUM_BARS],
    /// Peak caps, 0-1
    peaks: [f32; NUM_BARS],
    /// Beat flash, 0-1
    flash: f32,
}

impl Default for Bars {
    fn default() -> Self {
        Self {
            heights: [0.0; NUM_BARS],
            peaks: [0.0; NUM_BARS],
            flash: 0.0,
        }
    }
}

impl Visualization for Bars {
    fn update(&mut self, frame: &Frame, _emitter: &mut Emitter) {
        let bands: [f32; NUM_BANDS] = frame.bands.as_array();
        // Louder tracks push the whole field up a little
        let gain = 0.85 + frame.signal.energy * 0.3;
        let attack = ease(0.6, frame.dt);
        let release = ease(0.2, frame.dt);

        for i in 0..NUM_BARS {
            let pos = i as f32 / (NUM_BARS - 1) as f32;
            let target = (sample_bands(&bands, pos) * gain).clamp(0.0, 1.0);
            // Fast attack, slower release
            let h = &mut self.heights[i];
            *h = if target > *h {
                *h + (target - *h) * attack
            } else {
                *h + (target - *h) * release
            };

            let fallen = self.peaks[i] - PEAK_FALL * frame.dt;
            self.peaks[i] = fallen.max(*h);
        }

        self.flash = (self.flash - FLASH_DECAY * frame.dt).max(0.0);
        if let Some(beat) = frame.beat {
            self.flash = self.flash.max(0.4 + beat.confidence * 0.6);
        }
    }

    fn draw(&self, frame: &Frame, _particles: &ParticlePool, surface: &mut dyn Surface, bounds: Rect) {
        let palette = &frame.palette;
        let bar_slot = bounds.w / NUM_BARS as f32;
        let bar_width = (bar_slot * 0.8).max(1.0);
        let max_height = bounds.h * 0.85;
        let bottom = bounds.bottom();

        for i in 0..NUM_BARS {
            let t = i as f32 / (NUM_BARS - 1) as f32;
            let magnitude = self.heights[i];
            let x = bounds.left() + bar_slot * (i as f32 + 0.5);

            let height = (magnitude * (1.0 + self.flash * 0.15) * max_height).max(1.0);
            let color = palette.gradient(t, magnitude * 0.2 + self.flash * 0.1, 0.85);
            surface.rect(x, bottom + height * 0.5, bar_width, height, color);

            // Lighter band along the foot of the bar
            let reflection = height * 0.25;
            surface.rect(
                x,
                bottom + reflection * 0.5,
                bar_width,
                reflection,
                color.with_alpha(0.15),
            );

            let peak_y = bottom + self.peaks[i] * max_height;
            surface.rect(x, peak_y + 2.0, bar_width, 2.0, palette.gradient(t, 0.3, 0.9));
        }

        if self.flash > 0.05 {
            surface.rect(
                bounds.x,
                bounds.y,
                bounds.w,
                bounds.h,
                palette.color(self.flash * 0.08),
            );
        }
    }
}
