//! Drawing vocabulary for moodviz
//!
//! Shared by the engine and its hosts: colors, bounds and the `Surface`
//! trait that render modes draw onto.

pub mod draw;
pub mod rect;

pub use draw::{Color, DrawCommand, RecordingSurface, Surface};
pub use rect::Rect;
