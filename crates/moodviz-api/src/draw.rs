//! Immediate-mode drawing surface used by every render mode.
//!
//! The engine only ever talks to `dyn Surface`, so the same render modes can
//! target a nannou window, an offscreen recorder, or anything else that can
//! fill rectangles and stroke lines.

/// RGBA color, 0.0-1.0 per channel
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);

    /// Build a color from hue (degrees), saturation and lightness (0-1)
    pub fn hsla(hue: f32, saturation: f32, lightness: f32, alpha: f32) -> Self {
        let h = hue.rem_euclid(360.0) / 360.0;
        let s = saturation.clamp(0.0, 1.0);
        let l = lightness.clamp(0.0, 1.0);

        if s == 0.0 {
            return Self::rgba(l, l, l, alpha.clamp(0.0, 1.0));
        }

        let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
        let p = 2.0 * l - q;

        Self::rgba(
            hue_to_channel(p, q, h + 1.0 / 3.0),
            hue_to_channel(p, q, h),
            hue_to_channel(p, q, h - 1.0 / 3.0),
            alpha.clamp(0.0, 1.0),
        )
    }

    /// Same color with a different alpha
    pub fn with_alpha(self, a: f32) -> Self {
        Self {
            a: a.clamp(0.0, 1.0),
            ..self
        }
    }
}

fn hue_to_channel(p: f32, q: f32, t: f32) -> f32 {
    let t = t.rem_euclid(1.0);
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 0.5 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * (2.0 / 3.0 - t) * 6.0
    } else {
        p
    }
}

/// Something render modes can draw onto.
pub trait Surface {
    /// Fill the whole surface
    fn background(&mut self, color: Color);

    /// Filled rectangle centred on (x, y)
    fn rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Color);

    /// Filled ellipse centred on (x, y)
    fn ellipse(&mut self, x: f32, y: f32, w: f32, h: f32, color: Color);

    fn line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, weight: f32, color: Color);

    /// Connected line segments
    fn polyline(&mut self, points: &[(f32, f32)], weight: f32, color: Color);

    /// Filled polygon
    fn polygon(&mut self, points: &[(f32, f32)], color: Color);
}

/// One recorded call on a [`RecordingSurface`]
#[derive(Clone, Debug, PartialEq)]
pub enum DrawCommand {
    Background(Color),
    Rect { x: f32, y: f32, w: f32, h: f32, color: Color },
    Ellipse { x: f32, y: f32, w: f32, h: f32, color: Color },
    Line { from: (f32, f32), to: (f32, f32), weight: f32, color: Color },
    Polyline { points: Vec<(f32, f32)>, weight: f32, color: Color },
    Polygon { points: Vec<(f32, f32)>, color: Color },
}

/// Surface that keeps every draw call, for headless hosts and tests.
#[derive(Default, Debug)]
pub struct RecordingSurface {
    pub commands: Vec<DrawCommand>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Number of recorded ellipses (particles and glows are drawn as ellipses)
    pub fn ellipse_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::Ellipse { .. }))
            .count()
    }
}

impl Surface for RecordingSurface {
    fn background(&mut self, color: Color) {
        self.commands.push(DrawCommand::Background(color));
    }

    fn rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Color) {
        self.commands.push(DrawCommand::Rect { x, y, w, h, color });
    }

    fn ellipse(&mut self, x: f32, y: f32, w: f32, h: f32, color: Color) {
        self.commands.push(DrawCommand::Ellipse { x, y, w, h, color });
    }

    fn line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, weight: f32, color: Color) {
        self.commands.push(DrawCommand::Line {
            from: (x1, y1),
            to: (x2, y2),
            weight,
            color,
        });
    }

    fn polyline(&mut self, points: &[(f32, f32)], weight: f32, color: Color) {
        self.commands.push(DrawCommand::Polyline {
            points: points.to_vec(),
            weight,
            color,
        });
    }

    fn polygon(&mut self, points: &[(f32, f32)], color: Color) {
        self.commands.push(DrawCommand::Polygon {
            points: points.to_vec(),
            color,
        });
    }
}

#[cfg(feature = "nannou")]
mod nannou_surface {
    use super::{Color, Surface};
    use nannou::prelude::*;

    fn rgba(color: Color) -> nannou::color::Rgba {
        nannou::color::rgba(color.r, color.g, color.b, color.a)
    }

    impl Surface for nannou::Draw {
        fn background(&mut self, color: Color) {
            nannou::Draw::background(self).color(rgba(color));
        }

        fn rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Color) {
            nannou::Draw::rect(self)
                .x_y(x, y)
                .w_h(w, h)
                .color(rgba(color));
        }

        fn ellipse(&mut self, x: f32, y: f32, w: f32, h: f32, color: Color) {
            nannou::Draw::ellipse(self)
                .x_y(x, y)
                .w_h(w, h)
                .color(rgba(color));
        }

        fn line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, weight: f32, color: Color) {
            nannou::Draw::line(self)
                .start(pt2(x1, y1))
                .end(pt2(x2, y2))
                .weight(weight)
                .color(rgba(color));
        }

        fn polyline(&mut self, points: &[(f32, f32)], weight: f32, color: Color) {
            let pts: Vec<Point2> = points.iter().map(|(x, y)| pt2(*x, *y)).collect();
            nannou::Draw::polyline(self)
                .weight(weight)
                .points(pts)
                .color(rgba(color));
        }

        fn polygon(&mut self, points: &[(f32, f32)], color: Color) {
            let pts: Vec<Point2> = points.iter().map(|(x, y)| pt2(*x, *y)).collect();
            nannou::Draw::polygon(self).points(pts).color(rgba(color));
        }
    }
}
