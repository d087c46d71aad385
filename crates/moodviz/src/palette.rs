//! Mood and artwork driven color palettes.
//!
//! A palette comes from one of two places: a dominant color sampled from the
//! track artwork (preferred when present) or the track's mood label mapped
//! through a fixed preset table. Recomputation is throttled so rapid calls
//! cannot make the colors flicker.

use moodviz_api::Color;

use crate::audio::{wrap_hue, SmoothedSignal};

/// Minimum wall-clock spacing between recomputations (ms)
pub const DEFAULT_THROTTLE_MS: f64 = 100.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Palette {
    /// Base hue in degrees, [0, 360)
    pub hue: f32,
    /// 0-1
    pub saturation: f32,
    /// 0-1
    pub lightness: f32,
    /// Spread (degrees) render modes may sweep across
    pub hue_range: f32,
}

impl Default for Palette {
    fn default() -> Self {
        NEUTRAL
    }
}

impl Palette {
    /// Opposite hue, same tone
    pub fn complementary(&self) -> Self {
        Self {
            hue: wrap_hue(self.hue + 180.0),
            ..*self
        }
    }

    /// This palette toned by the smoothed hue and saturation, so palette
    /// switches reach the screen gradually
    pub fn following(&self, signal: &SmoothedSignal) -> Self {
        Self {
            hue: wrap_hue(signal.hue),
            saturation: signal.saturation.clamp(0.0, 1.0),
            ..*self
        }
    }

    /// Color at position `t` (0-1) across the palette's hue range
    pub fn gradient(&self, t: f32, lightness_boost: f32, alpha: f32) -> Color {
        let hue = self.hue + (t.clamp(0.0, 1.0) - 0.5) * self.hue_range;
        Color::hsla(
            hue,
            self.saturation,
            (self.lightness + lightness_boost).clamp(0.0, 0.95),
            alpha,
        )
    }

    pub fn color(&self, alpha: f32) -> Color {
        Color::hsla(self.hue, self.saturation, self.lightness, alpha)
    }
}

const NEUTRAL: Palette = Palette {
    hue: 265.0,
    saturation: 0.6,
    lightness: 0.55,
    hue_range: 90.0,
};

/// Canonical mood presets
const MOOD_PRESETS: [(&str, Palette); 7] = [
    (
        "energetic",
        Palette {
            hue: 15.0,
            saturation: 0.9,
            lightness: 0.55,
            hue_range: 60.0,
        },
    ),
    (
        "happy",
        Palette {
            hue: 48.0,
            saturation: 0.85,
            lightness: 0.6,
            hue_range: 50.0,
        },
    ),
    (
        "calm",
        Palette {
            hue: 190.0,
            saturation: 0.55,
            lightness: 0.5,
            hue_range: 40.0,
        },
    ),
    (
        "sad",
        Palette {
            hue: 225.0,
            saturation: 0.45,
            lightness: 0.4,
            hue_range: 30.0,
        },
    ),
    (
        "aggressive",
        Palette {
            hue: 0.0,
            saturation: 0.95,
            lightness: 0.45,
            hue_range: 25.0,
        },
    ),
    (
        "romantic",
        Palette {
            hue: 330.0,
            saturation: 0.7,
            lightness: 0.6,
            hue_range: 40.0,
        },
    ),
    ("neutral", NEUTRAL),
];

/// Map synonyms onto the preset names
fn canonical_mood(mood: &str) -> &str {
    match mood {
        "upbeat" | "excited" | "party" => "energetic",
        "joyful" | "cheerful" | "bright" => "happy",
        "chill" | "relaxed" | "peaceful" | "ambient" => "calm",
        "melancholic" | "melancholy" | "somber" | "dark" => "sad",
        "angry" | "intense" | "heavy" => "aggressive",
        "love" | "tender" | "sensual" => "romantic",
        other => other,
    }
}

/// Preset for a mood label; unknown or missing moods are neutral
pub fn mood_palette(mood: Option<&str>) -> Palette {
    let Some(mood) = mood else {
        return NEUTRAL;
    };
    let key = mood.trim().to_lowercase();
    let key = canonical_mood(&key);
    MOOD_PRESETS
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, palette)| *palette)
        .unwrap_or(NEUTRAL)
}

/// 8-bit sRGB sample
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// RGB to (hue degrees, saturation 0-1, lightness 0-1)
pub fn rgb_to_hsl(rgb: Rgb) -> (f32, f32, f32) {
    let r = rgb.r as f32 / 255.0;
    let g = rgb.g as f32 / 255.0;
    let b = rgb.b as f32 / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let l = (max + min) / 2.0;
    let d = max - min;

    if d == 0.0 {
        return (0.0, 0.0, l);
    }

    let s = if l > 0.5 {
        d / (2.0 - max - min)
    } else {
        d / (max + min)
    };

    let h = if max == r {
        (g - b) / d + if g < b { 6.0 } else { 0.0 }
    } else if max == g {
        (b - r) / d + 2.0
    } else {
        (r - g) / d + 4.0
    };

    (wrap_hue(h * 60.0), s, l)
}

/// Palette built around an artwork color, kept vivid enough to read on black
pub fn dominant_palette(rgb: Rgb) -> Palette {
    let (hue, saturation, lightness) = rgb_to_hsl(rgb);
    Palette {
        hue,
        saturation: saturation.max(0.45),
        lightness: lightness.clamp(0.4, 0.65),
        hue_range: 45.0,
    }
}

/// Throttled palette source
pub struct PaletteResolver {
    throttle_ms: f64,
    last_update: Option<f64>,
    palette: Palette,
}

impl PaletteResolver {
    pub fn new() -> Self {
        Self::with_throttle(DEFAULT_THROTTLE_MS)
    }

    pub fn with_throttle(throttle_ms: f64) -> Self {
        Self {
            throttle_ms,
            last_update: None,
            palette: NEUTRAL,
        }
    }

    /// Current palette, recomputed at most once per throttle window.
    pub fn resolve(&mut self, now_ms: f64, mood: Option<&str>, dominant: Option<Rgb>) -> Palette {
        let due = match self.last_update {
            Some(last) => now_ms - last >= self.throttle_ms,
            None => true,
        };

        if due {
            self.palette = match dominant {
                Some(rgb) => dominant_palette(rgb),
                None => mood_palette(mood),
            };
            self.last_update = Some(now_ms);
        }

        self.palette
    }

    /// Force the next `resolve` to recompute (track change)
    pub fn invalidate(&mut self) {
        self.last_update = None;
    }

    pub fn palette(&self) -> Palette {
        self.palette
    }
}

impl Default for PaletteResolver {
    fn default() -> Self {
        Self::new()
    }
}
