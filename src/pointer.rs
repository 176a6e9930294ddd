//! Pointer input as seen by the agent update.
//!
//! The windowing layer reports a cursor in `[0, 1)²` (y up) and a button
//! state. Once per frame the cursor is pushed into a four-point history; agents
//! that respawn during the frame are placed along a Catmull-Rom segment
//! through that history, which turns a dragged pointer into a continuous
//! stream of new agents.

use glam::Vec2;

/// Cursor, button and recent path of the pointer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointerState {
    cursor: Vec2,
    pressed: bool,
    history: [Vec2; 4],
}

impl Default for PointerState {
    fn default() -> Self {
        Self::new()
    }
}

impl PointerState {
    pub fn new() -> Self {
        let center = Vec2::splat(0.5);
        Self {
            cursor: center,
            pressed: false,
            history: [center; 4],
        }
    }

    /// Move the cursor. Coordinates wrap into `[0, 1)`.
    pub fn set_cursor(&mut self, x: f32, y: f32) {
        self.cursor = Vec2::new(x.rem_euclid(1.0), y.rem_euclid(1.0));
    }

    pub fn set_pressed(&mut self, pressed: bool) {
        self.pressed = pressed;
    }

    pub fn cursor(&self) -> Vec2 {
        self.cursor
    }

    pub fn is_pressed(&self) -> bool {
        self.pressed
    }

    /// Record the cursor for this frame.
    ///
    /// The newest point is stored twice at the head of the history so it
    /// also acts as the leading tangent of the spline segment.
    pub fn advance(&mut self) {
        let [_, newest, previous, _] = self.history;
        self.history = [self.cursor, self.cursor, newest, previous];
    }

    /// Move the cursor and record it in one call.
    pub fn push(&mut self, x: f32, y: f32) {
        self.set_cursor(x, y);
        self.advance();
    }

    /// History as four points, newest first.
    pub fn history(&self) -> &[Vec2; 4] {
        &self.history
    }

    /// Catmull-Rom point at `t` in `[0, 1]` between the current and the
    /// previous cursor positions.
    pub fn spline(&self, t: f32) -> Vec2 {
        let [p0, p1, p2, p3] = self.history;
        let a = p0 * -0.5 + p1 * 1.5 + p2 * -1.5 + p3 * 0.5;
        let b = p0 + p1 * -2.5 + p2 * 2.0 + p3 * -0.5;
        let c = p0 * -0.5 + p2 * 0.5;
        let d = p1;
        ((a * t + b) * t + c) * t + d
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_shifts_history() {
        let mut pointer = PointerState::new();
        pointer.set_cursor(0.1, 0.2);
        pointer.advance();
        pointer.set_cursor(0.3, 0.4);
        pointer.advance();
        let h = pointer.history();
        assert_eq!(h[0], Vec2::new(0.3, 0.4));
        assert_eq!(h[1], Vec2::new(0.3, 0.4));
        assert_eq!(h[2], Vec2::new(0.1, 0.2));
        assert_eq!(h[3], Vec2::splat(0.5));

        pointer.set_cursor(0.5, 0.6);
        pointer.advance();
        let h = pointer.history();
        assert_eq!(h[2], Vec2::new(0.3, 0.4));
        assert_eq!(h[3], Vec2::new(0.1, 0.2));
    }

    #[test]
    fn test_spline_endpoints() {
        let mut pointer = PointerState::new();
        pointer.set_cursor(0.2, 0.2);
        pointer.advance();
        pointer.set_cursor(0.6, 0.4);
        pointer.advance();

        let start = pointer.spline(0.0);
        let end = pointer.spline(1.0);
        assert!((start - Vec2::new(0.6, 0.4)).length() < 1e-5);
        assert!((end - Vec2::new(0.2, 0.2)).length() < 1e-5);

        let mid = pointer.spline(0.5);
        assert!(mid.x > 0.2 && mid.x < 0.6);
    }

    #[test]
    fn test_stationary_pointer_spline_is_constant() {
        let mut pointer = PointerState::new();
        pointer.set_cursor(0.7, 0.1);
        for _ in 0..4 {
            pointer.advance();
        }
        for i in 0..=10 {
            let p = pointer.spline(i as f32 / 10.0);
            assert!((p - Vec2::new(0.7, 0.1)).length() < 1e-5);
        }
    }

    #[test]
    fn test_cursor_wraps() {
        let mut pointer = PointerState::new();
        pointer.set_cursor(1.25, -0.25);
        assert!((pointer.cursor() - Vec2::new(0.25, 0.75)).length() < 1e-6);
    }
}
