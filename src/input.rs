//! Keyboard and pointer input for the viewer.
//!
//! [`Input`] folds raw winit events into per-frame state: characters typed
//! since the last frame, mouse buttons held and pressed, and the cursor
//! position. Typed characters are turned into [`Command`]s by
//! [`Command::from_char`]; preset keys follow the keyboard layout
//! `1..0 q..p a..l z..m` with shifted `Z..M` for the last seven presets.

use std::collections::HashSet;

use glam::Vec2;
use winit::event::{ElementState, MouseButton as WinitMouseButton, WindowEvent};
use winit::keyboard::{Key, NamedKey};

/// Preset hotkeys, in preset order.
pub const PRESET_KEYS: [char; 43] = [
    '1', '2', '3', '4', '5', '6', '7', '8', '9', '0', //
    'q', 'w', 'e', 'r', 't', 'y', 'u', 'i', 'o', 'p', //
    'a', 's', 'd', 'f', 'g', 'h', 'j', 'k', 'l', //
    'z', 'x', 'c', 'v', 'b', 'n', 'm', //
    'Z', 'X', 'C', 'V', 'B', 'N', 'M',
];

/// Amount used by the randomize hotkey.
pub const RANDOMIZE_AMOUNT: f32 = 0.5;

/// Mouse button identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

impl From<WinitMouseButton> for MouseButton {
    fn from(btn: WinitMouseButton) -> Self {
        match btn {
            WinitMouseButton::Right => MouseButton::Right,
            WinitMouseButton::Middle => MouseButton::Middle,
            _ => MouseButton::Left,
        }
    }
}

/// An action bound to a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    SelectPreset(usize),
    Freeze,
    TogglePause,
    SaveFrame,
    Reset,
    LogParams,
    Randomize,
    ConvergeFaster,
    ConvergeSlower,
    ToggleFullscreen,
}

impl Command {
    /// Command bound to a typed character, if any.
    pub fn from_char(c: char) -> Option<Command> {
        let command = match c {
            '\\' => Command::Freeze,
            'U' => Command::TogglePause,
            'S' => Command::SaveFrame,
            'R' => Command::Reset,
            'L' => Command::LogParams,
            '~' => Command::Randomize,
            '+' => Command::ConvergeFaster,
            '-' => Command::ConvergeSlower,
            ' ' => Command::ToggleFullscreen,
            _ => return PRESET_KEYS.iter().position(|&k| k == c).map(Command::SelectPreset),
        };
        Some(command)
    }
}

/// Map a window pixel position to field coordinates in `[0, 1)²`, y up.
///
/// The image is drawn as a centred square of side `min(width, height) *
/// zoom`; positions outside it wrap.
pub fn window_to_field(position: Vec2, window_size: (u32, u32), zoom: f32) -> Vec2 {
    let (w, h) = (window_size.0.max(1) as f32, window_size.1.max(1) as f32);
    let side = (w.min(h) * zoom).max(1.0);
    let origin = Vec2::new((w - side) * 0.5, (h - side) * 0.5);
    let local = (position - origin) / side;
    Vec2::new(local.x.rem_euclid(1.0), (1.0 - local.y).rem_euclid(1.0))
}

/// Input state tracking for keyboard and mouse.
#[derive(Debug, Default)]
pub struct Input {
    typed: Vec<char>,

    mouse_held: HashSet<MouseButton>,
    mouse_pressed: HashSet<MouseButton>,
    mouse_released: HashSet<MouseButton>,

    mouse_position: Vec2,
    window_size: (u32, u32),
}

impl Input {
    pub fn new() -> Self {
        Self {
            window_size: (800, 800),
            ..Default::default()
        }
    }

    // ========== Key Queries ==========

    /// Characters typed since the last [`begin_frame`](Self::begin_frame).
    pub fn typed(&self) -> &[char] {
        &self.typed
    }

    /// Commands typed since the last frame, in order.
    pub fn commands(&self) -> impl Iterator<Item = Command> + '_ {
        self.typed.iter().filter_map(|&c| Command::from_char(c))
    }

    // ========== Mouse Queries ==========

    pub fn mouse_pressed(&self, button: MouseButton) -> bool {
        self.mouse_pressed.contains(&button)
    }

    pub fn mouse_held(&self, button: MouseButton) -> bool {
        self.mouse_held.contains(&button)
    }

    pub fn mouse_released(&self, button: MouseButton) -> bool {
        self.mouse_released.contains(&button)
    }

    /// Cursor position in window pixels.
    pub fn mouse_position(&self) -> Vec2 {
        self.mouse_position
    }

    /// Cursor in field coordinates for a given canvas zoom.
    pub fn mouse_field(&self, zoom: f32) -> Vec2 {
        window_to_field(self.mouse_position, self.window_size, zoom)
    }

    // ========== Event Handling ==========

    /// Clear per-frame state.
    pub fn begin_frame(&mut self) {
        self.typed.clear();
        self.mouse_pressed.clear();
        self.mouse_released.clear();
    }

    pub fn set_window_size(&mut self, width: u32, height: u32) {
        self.window_size = (width, height);
    }

    /// Record a typed character directly.
    pub fn type_char(&mut self, c: char) {
        self.typed.push(c);
    }

    /// Process a winit window event.
    pub fn handle_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state != ElementState::Pressed || event.repeat {
                    return;
                }
                match &event.logical_key {
                    Key::Character(text) => self.typed.extend(text.chars()),
                    Key::Named(NamedKey::Space) => self.typed.push(' '),
                    _ => {}
                }
            }

            WindowEvent::MouseInput { state, button, .. } => {
                let btn = MouseButton::from(*button);
                match state {
                    ElementState::Pressed => {
                        self.mouse_pressed.insert(btn);
                        self.mouse_held.insert(btn);
                    }
                    ElementState::Released => {
                        self.mouse_held.remove(&btn);
                        self.mouse_released.insert(btn);
                    }
                }
            }

            WindowEvent::CursorMoved { position, .. } => {
                self.mouse_position = Vec2::new(position.x as f32, position.y as f32);
            }

            WindowEvent::Resized(size) => self.set_window_size(size.width, size.height),

            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========== Hotkey Tests ==========

    #[test]
    fn test_preset_keys_cover_every_builtin() {
        assert_eq!(PRESET_KEYS.len(), crate::presets::builtin_names().count());
        assert_eq!(Command::from_char('1'), Some(Command::SelectPreset(0)));
        assert_eq!(Command::from_char('0'), Some(Command::SelectPreset(9)));
        assert_eq!(Command::from_char('q'), Some(Command::SelectPreset(10)));
        assert_eq!(Command::from_char('m'), Some(Command::SelectPreset(35)));
        assert_eq!(Command::from_char('M'), Some(Command::SelectPreset(42)));
    }

    #[test]
    fn test_shifted_controls_shadow_presets() {
        assert_eq!(Command::from_char('u'), Some(Command::SelectPreset(16)));
        assert_eq!(Command::from_char('U'), Some(Command::TogglePause));
        assert_eq!(Command::from_char('S'), Some(Command::SaveFrame));
        assert_eq!(Command::from_char('R'), Some(Command::Reset));
        assert_eq!(Command::from_char('L'), Some(Command::LogParams));
    }

    #[test]
    fn test_control_keys() {
        assert_eq!(Command::from_char('\\'), Some(Command::Freeze));
        assert_eq!(Command::from_char('~'), Some(Command::Randomize));
        assert_eq!(Command::from_char('+'), Some(Command::ConvergeFaster));
        assert_eq!(Command::from_char('-'), Some(Command::ConvergeSlower));
        assert_eq!(Command::from_char(' '), Some(Command::ToggleFullscreen));
        assert_eq!(Command::from_char('A'), None);
        assert_eq!(Command::from_char('?'), None);
    }

    #[test]
    fn test_typed_cleared_each_frame() {
        let mut input = Input::new();
        input.type_char('3');
        input.type_char('U');
        let commands: Vec<_> = input.commands().collect();
        assert_eq!(commands, vec![Command::SelectPreset(2), Command::TogglePause]);
        input.begin_frame();
        assert!(input.typed().is_empty());
    }

    // ========== Pointer Mapping Tests ==========

    #[test]
    fn test_window_to_field_flips_y() {
        let size = (800, 800);
        let top_left = window_to_field(Vec2::new(0.0, 0.0), size, 1.0);
        assert!(top_left.x.abs() < 1e-6);
        assert!(top_left.y.abs() < 1e-6 || (top_left.y - 1.0).abs() < 1e-6);
        let near_bottom_left = window_to_field(Vec2::new(0.0, 799.0), size, 1.0);
        assert!(near_bottom_left.y < 0.01);
        let centre = window_to_field(Vec2::new(400.0, 400.0), size, 1.0);
        assert!((centre - Vec2::splat(0.5)).length() < 1e-6);
    }

    #[test]
    fn test_window_to_field_letterbox_and_zoom() {
        let centre = window_to_field(Vec2::new(600.0, 300.0), (1200, 600), 1.0);
        assert!((centre - Vec2::splat(0.5)).length() < 1e-6);
        // 400px zoomed square inside a 800px window: its right edge is at x = 600.
        let edge = window_to_field(Vec2::new(599.0, 400.0), (800, 800), 0.5);
        assert!(edge.x > 0.99);
    }
}
