//! Input state accumulated from winit window events.

use glam::Vec2;
use rustc_hash::FxHashSet;
use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

#[derive(Default, Debug, Clone)]
pub struct Input {
    /// Cursor position inside the window, in physical pixels.
    pub cursor_position: Option<Vec2>,
    /// Cursor movement since the last frame.
    pub cursor_delta: Vec2,
    pub scroll_delta: Vec2,
    pub screen_size: Vec2,
    pub mouse_buttons: FxHashSet<MouseButton>,
    keys: FxHashSet<KeyCode>,
    pressed_this_frame: FxHashSet<KeyCode>,
}

impl Input {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears per-frame deltas and edge-triggered key presses.
    pub fn end_frame(&mut self) {
        self.cursor_delta = Vec2::ZERO;
        self.scroll_delta = Vec2::ZERO;
        self.pressed_this_frame.clear();
    }

    pub fn handle_resize(&mut self, width: u32, height: u32) {
        self.screen_size = Vec2::new(width as f32, height as f32);
    }

    pub fn handle_cursor_move(&mut self, x: f64, y: f64) {
        let position = Vec2::new(x as f32, y as f32);
        if let Some(previous) = self.cursor_position {
            self.cursor_delta += position - previous;
        }
        self.cursor_position = Some(position);
    }

    pub fn handle_mouse_input(&mut self, state: ElementState, button: MouseButton) {
        match state {
            ElementState::Pressed => {
                self.mouse_buttons.insert(button);
            }
            ElementState::Released => {
                self.mouse_buttons.remove(&button);
            }
        }
    }

    pub fn handle_mouse_wheel(&mut self, delta: MouseScrollDelta) {
        match delta {
            MouseScrollDelta::LineDelta(x, y) => self.scroll_delta += Vec2::new(x, y),
            MouseScrollDelta::PixelDelta(pos) => {
                self.scroll_delta += Vec2::new(pos.x as f32, pos.y as f32) * 0.1;
            }
        }
    }

    pub fn handle_key(&mut self, key: KeyCode, state: ElementState) {
        match state {
            ElementState::Pressed => {
                if self.keys.insert(key) {
                    self.pressed_this_frame.insert(key);
                }
            }
            ElementState::Released => {
                self.keys.remove(&key);
            }
        }
    }

    #[must_use]
    pub fn is_button_pressed(&self, button: MouseButton) -> bool {
        self.mouse_buttons.contains(&button)
    }

    /// Held down.
    #[must_use]
    pub fn is_key_down(&self, key: KeyCode) -> bool {
        self.keys.contains(&key)
    }

    /// Went down during the current frame.
    #[must_use]
    pub fn key_pressed(&self, key: KeyCode) -> bool {
        self.pressed_this_frame.contains(&key)
    }

    /// Feeds one window event into the input state.
    pub fn process_window_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::Resized(size) => self.handle_resize(size.width, size.height),
            WindowEvent::CursorMoved { position, .. } => {
                self.handle_cursor_move(position.x, position.y);
            }
            WindowEvent::CursorLeft { .. } => self.cursor_position = None,
            WindowEvent::MouseInput { state, button, .. } => {
                self.handle_mouse_input(*state, *button);
            }
            WindowEvent::MouseWheel { delta, .. } => self.handle_mouse_wheel(*delta),
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(code) = event.physical_key {
                    self.handle_key(code, event.state);
                }
            }
            WindowEvent::Focused(false) => {
                self.keys.clear();
                self.mouse_buttons.clear();
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_cursor_event_produces_no_delta() {
        let mut input = Input::new();
        input.handle_cursor_move(10.0, 10.0);
        assert_eq!(input.cursor_delta, Vec2::ZERO);
        input.handle_cursor_move(13.0, 6.0);
        assert_eq!(input.cursor_delta, Vec2::new(3.0, -4.0));
        input.end_frame();
        assert_eq!(input.cursor_delta, Vec2::ZERO);
    }

    #[test]
    fn key_press_is_edge_triggered() {
        let mut input = Input::new();
        input.handle_key(KeyCode::KeyB, ElementState::Pressed);
        assert!(input.key_pressed(KeyCode::KeyB));
        input.end_frame();

        // Key repeat while held does not re-trigger.
        input.handle_key(KeyCode::KeyB, ElementState::Pressed);
        assert!(!input.key_pressed(KeyCode::KeyB));
        assert!(input.is_key_down(KeyCode::KeyB));

        input.handle_key(KeyCode::KeyB, ElementState::Released);
        assert!(!input.is_key_down(KeyCode::KeyB));
    }
}
