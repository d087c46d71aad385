//! Surface bounds.

/// Centre-based rectangle in surface units (y grows upward, like nannou).
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    /// Rectangle of the given size centred on the origin
    pub fn from_w_h(w: f32, h: f32) -> Self {
        Self { x: 0.0, y: 0.0, w, h }
    }

    pub fn left(&self) -> f32 {
        self.x - self.w * 0.5
    }

    pub fn right(&self) -> f32 {
        self.x + self.w * 0.5
    }

    pub fn top(&self) -> f32 {
        self.y + self.h * 0.5
    }

    pub fn bottom(&self) -> f32 {
        self.y - self.h * 0.5
    }

    /// Length of the shorter side
    pub fn min_side(&self) -> f32 {
        self.w.min(self.h)
    }

    /// True when there is nothing to draw into
    pub fn is_empty(&self) -> bool {
        !(self.w > 0.0 && self.h > 0.0)
    }
}
