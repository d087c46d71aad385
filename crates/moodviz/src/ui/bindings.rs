//! Keyboard bindings and input handling.
//!
//! Centralizes all keyboard shortcuts and key mapping logic.

use moodviz::RenderMode;
use nannou::prelude::*;

/// Actions that can be triggered by key presses
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    Quit,
    SelectMode(RenderMode),
    ToggleFullscreen,
    TogglePlaying,
    CyclePerformanceMode,
    NextDevice,
}

/// Number keys 1-6 pick the render mode in `RenderMode::ALL` order
fn mode_for_key(key: Key) -> Option<RenderMode> {
    let idx = match key {
        Key::Key1 => 0,
        Key::Key2 => 1,
        Key::Key3 => 2,
        Key::Key4 => 3,
        Key::Key5 => 4,
        Key::Key6 => 5,
        _ => return None,
    };
    RenderMode::ALL.get(idx).copied()
}

/// Parse a key into an action
pub fn parse_key(key: Key) -> Option<Action> {
    if let Some(mode) = mode_for_key(key) {
        return Some(Action::SelectMode(mode));
    }

    match key {
        Key::Q => Some(Action::Quit),
        Key::F => Some(Action::ToggleFullscreen),
        Key::Space => Some(Action::TogglePlaying),
        Key::M => Some(Action::CyclePerformanceMode),
        Key::D => Some(Action::NextDevice),
        _ => None,
    }
}
