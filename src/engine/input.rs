// Input state tracking for keyboard and mouse
// Abstracts winit events into a queryable per-frame snapshot

use std::collections::HashSet;

use glam::Vec2;
use winit::event::{ElementState, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

use super::canvas::PaintInput;

/// Key that turns pointer movement over the 3D surface into brush strokes.
pub const PAINT_KEY: KeyCode = KeyCode::Space;

pub struct InputState {
    // Keyboard
    keys_held: HashSet<KeyCode>,

    // Mouse
    buttons_held: HashSet<MouseButton>,
    pub mouse_position: Vec2,
    cursor_seen: bool,

    // Accumulated this frame, reset in end_frame()
    pub mouse_delta: Vec2,
    pub scroll_delta: f32,
}

impl Default for InputState {
    fn default() -> Self {
        Self::new()
    }
}

impl InputState {
    pub fn new() -> Self {
        Self {
            keys_held: HashSet::new(),
            buttons_held: HashSet::new(),
            mouse_position: Vec2::ZERO,
            cursor_seen: false,
            mouse_delta: Vec2::ZERO,
            scroll_delta: 0.0,
        }
    }

    /// Feed a winit WindowEvent into the input state.
    /// Call this once per event before the app's own event handling.
    pub fn process_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(key) = event.physical_key {
                    match event.state {
                        ElementState::Pressed => { self.keys_held.insert(key); }
                        ElementState::Released => { self.keys_held.remove(&key); }
                    }
                }
            }
            WindowEvent::MouseInput { state, button, .. } => match state {
                ElementState::Pressed => { self.buttons_held.insert(*button); }
                ElementState::Released => { self.buttons_held.remove(button); }
            },
            WindowEvent::CursorMoved { position, .. } => {
                self.move_cursor(Vec2::new(position.x as f32, position.y as f32));
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let y = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 100.0,
                };
                self.scroll_delta += y;
            }
            // Releasing keys outside the window must not leave them stuck.
            WindowEvent::Focused(false) => {
                self.keys_held.clear();
                self.buttons_held.clear();
            }
            _ => {}
        }
    }

    /// Like `process_event`, for an event the UI has already seen.
    /// Presses and wheel steps the UI consumed stay with the UI; releases
    /// and cursor motion always land so nothing sticks or jumps.
    pub fn process_event_behind_ui(&mut self, event: &WindowEvent, ui_consumed: bool) {
        if ui_consumed && starts_action(event) {
            return;
        }
        self.process_event(event);
    }

    /// Call once per frame after update() and render() have consumed input.
    /// Resets per-frame accumulators.
    pub fn end_frame(&mut self) {
        self.scroll_delta = 0.0;
        self.mouse_delta = Vec2::ZERO;
    }

    /// True if the cursor moved since the last end_frame().
    pub fn cursor_moved(&self) -> bool {
        self.mouse_delta != Vec2::ZERO
    }

    pub fn is_key_held(&self, key: KeyCode) -> bool {
        self.keys_held.contains(&key)
    }

    pub fn is_button_held(&self, button: MouseButton) -> bool {
        self.buttons_held.contains(&button)
    }

    /// Paint snapshot for a cursor already mapped to canvas pixels.
    /// Strokes follow pointer motion: a still cursor deposits nothing,
    /// however long the paint key is held.
    pub fn paint_input(&self, canvas_cursor: Vec2) -> PaintInput {
        if self.is_key_held(PAINT_KEY) && self.cursor_moved() {
            PaintInput::drawing(canvas_cursor)
        } else {
            PaintInput::idle(canvas_cursor)
        }
    }

    fn move_cursor(&mut self, position: Vec2) {
        // The first report only tells us where the cursor is.
        if self.cursor_seen {
            self.mouse_delta += position - self.mouse_position;
        }
        self.cursor_seen = true;
        self.mouse_position = position;
    }
}

fn starts_action(event: &WindowEvent) -> bool {
    matches!(
        event,
        WindowEvent::KeyboardInput { event: KeyEvent { state: ElementState::Pressed, .. }, .. }
            | WindowEvent::MouseInput { state: ElementState::Pressed, .. }
            | WindowEvent::MouseWheel { .. }
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use winit::event::{DeviceId, TouchPhase};

    fn device() -> DeviceId {
        // SAFETY: only compared for equality, never handed to the platform.
        unsafe { DeviceId::dummy() }
    }

    fn mouse(state: ElementState) -> WindowEvent {
        WindowEvent::MouseInput { device_id: device(), state, button: MouseButton::Left }
    }

    #[test]
    fn cursor_delta_accumulates_within_a_frame() {
        let mut input = InputState::new();
        input.move_cursor(Vec2::new(10.0, 4.0));
        assert_eq!(input.mouse_delta, Vec2::ZERO);

        input.move_cursor(Vec2::new(12.0, 5.0));
        input.move_cursor(Vec2::new(15.0, 5.0));
        input.scroll_delta = 2.0;
        assert_eq!(input.mouse_delta, Vec2::new(5.0, 1.0));

        input.end_frame();
        assert_eq!(input.mouse_delta, Vec2::ZERO);
        assert_eq!(input.scroll_delta, 0.0);
        assert_eq!(input.mouse_position, Vec2::new(15.0, 5.0));
    }

    #[test]
    fn paint_input_needs_key_and_motion() {
        let mut input = InputState::new();
        let cursor = Vec2::new(3.0, 7.0);
        input.move_cursor(Vec2::new(100.0, 100.0));
        input.move_cursor(Vec2::new(101.0, 100.0));
        assert_eq!(input.paint_input(cursor), PaintInput::idle(cursor));

        input.keys_held.insert(PAINT_KEY);
        assert_eq!(input.paint_input(cursor), PaintInput::drawing(cursor));
    }

    #[test]
    fn still_cursor_never_paints() {
        let mut input = InputState::new();
        let cursor = Vec2::new(20.5, 20.5);
        input.keys_held.insert(PAINT_KEY);
        input.move_cursor(Vec2::new(50.0, 50.0));
        input.move_cursor(Vec2::new(52.0, 50.0));
        input.end_frame();

        for _ in 0..60 {
            assert!(!input.paint_input(cursor).is_drawing);
            input.end_frame();
        }

        input.move_cursor(Vec2::new(52.0, 50.0));
        assert!(!input.paint_input(cursor).is_drawing, "same position is not motion");
    }

    #[test]
    fn presses_consumed_by_the_ui_are_ignored() {
        let mut input = InputState::new();
        input.process_event_behind_ui(&mouse(ElementState::Pressed), true);
        assert!(!input.is_button_held(MouseButton::Left));

        input.process_event_behind_ui(&mouse(ElementState::Pressed), false);
        assert!(input.is_button_held(MouseButton::Left));

        input.process_event_behind_ui(&mouse(ElementState::Released), true);
        assert!(!input.is_button_held(MouseButton::Left));

        let wheel = WindowEvent::MouseWheel {
            device_id: device(),
            delta: MouseScrollDelta::LineDelta(0.0, 1.0),
            phase: TouchPhase::Moved,
        };
        input.process_event_behind_ui(&wheel, true);
        assert_eq!(input.scroll_delta, 0.0);
        input.process_event_behind_ui(&wheel, false);
        assert_eq!(input.scroll_delta, 1.0);
    }
}
