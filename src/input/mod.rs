// src/input/mod.rs
use std::collections::HashSet;
use winit::event::{ElementState, KeyboardInput, MouseButton, MouseScrollDelta, VirtualKeyCode, WindowEvent};
use glam::Vec2;

pub struct InputManager {
    keys_pressed: HashSet<VirtualKeyCode>,
    keys_just_pressed: HashSet<VirtualKeyCode>,
    keys_just_released: HashSet<VirtualKeyCode>,

    mouse_buttons_pressed: HashSet<MouseButton>,
    mouse_position: Vec2,
    scroll_delta: Vec2,
}

/// Frozen copy of the input state handed to scripts for one frame.
#[derive(Debug, Clone, Default)]
pub struct InputSnapshot {
    pub down: HashSet<VirtualKeyCode>,
    pub just_pressed: HashSet<VirtualKeyCode>,
    pub just_released: HashSet<VirtualKeyCode>,
    pub mouse_buttons: HashSet<MouseButton>,
    pub mouse_position: Vec2,
    pub scroll_delta: Vec2,
}

impl Default for InputManager {
    fn default() -> Self {
        Self::new()
    }
}

impl InputManager {
    pub fn new() -> Self {
        Self {
            keys_pressed: HashSet::new(),
            keys_just_pressed: HashSet::new(),
            keys_just_released: HashSet::new(),
            mouse_buttons_pressed: HashSet::new(),
            mouse_position: Vec2::ZERO,
            scroll_delta: Vec2::ZERO,
        }
    }

    pub fn handle_window_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::KeyboardInput {
                input: KeyboardInput {
                    state,
                    virtual_keycode: Some(keycode),
                    ..
                },
                ..
            } => match state {
                ElementState::Pressed => self.press_key(*keycode),
                ElementState::Released => self.release_key(*keycode),
            },
            WindowEvent::MouseInput { state, button, .. } => match state {
                ElementState::Pressed => {
                    self.mouse_buttons_pressed.insert(*button);
                }
                ElementState::Released => {
                    self.mouse_buttons_pressed.remove(button);
                }
            },
            WindowEvent::CursorMoved { position, .. } => {
                self.mouse_position = Vec2::new(position.x as f32, position.y as f32);
            }
            WindowEvent::MouseWheel { delta, .. } => {
                self.scroll_delta += match delta {
                    MouseScrollDelta::LineDelta(x, y) => Vec2::new(*x, *y),
                    MouseScrollDelta::PixelDelta(pos) => Vec2::new(pos.x as f32, pos.y as f32),
                };
            }
            WindowEvent::Focused(false) => {
                // Keys released while unfocused never arrive.
                self.keys_pressed.clear();
                self.mouse_buttons_pressed.clear();
            }
            _ => {}
        }
    }

    pub fn press_key(&mut self, key: VirtualKeyCode) {
        // Key repeat sends Pressed again; only the first one counts.
        if self.keys_pressed.insert(key) {
            self.keys_just_pressed.insert(key);
        }
    }

    pub fn release_key(&mut self, key: VirtualKeyCode) {
        if self.keys_pressed.remove(&key) {
            self.keys_just_released.insert(key);
        }
    }

    /// Ends the frame: clears the edge-triggered state.
    pub fn update(&mut self) {
        self.keys_just_pressed.clear();
        self.keys_just_released.clear();
        self.scroll_delta = Vec2::ZERO;
    }

    pub fn is_key_pressed(&self, key: VirtualKeyCode) -> bool {
        self.keys_pressed.contains(&key)
    }

    pub fn is_key_just_pressed(&self, key: VirtualKeyCode) -> bool {
        self.keys_just_pressed.contains(&key)
    }

    pub fn is_key_just_released(&self, key: VirtualKeyCode) -> bool {
        self.keys_just_released.contains(&key)
    }

    pub fn snapshot(&self) -> InputSnapshot {
        InputSnapshot {
            down: self.keys_pressed.clone(),
            just_pressed: self.keys_just_pressed.clone(),
            just_released: self.keys_just_released.clone(),
            mouse_buttons: self.mouse_buttons_pressed.clone(),
            mouse_position: self.mouse_position,
            scroll_delta: self.scroll_delta,
        }
    }
}

/// Maps the key names scripts use onto winit key codes. Case-insensitive.
pub fn key_from_name(name: &str) -> Option<VirtualKeyCode> {
    use VirtualKeyCode::*;

    let lower = name.trim().to_ascii_lowercase();
    let key = match lower.as_str() {
        "a" => A, "b" => B, "c" => C, "d" => D, "e" => E, "f" => F, "g" => G,
        "h" => H, "i" => I, "j" => J, "k" => K, "l" => L, "m" => M, "n" => N,
        "o" => O, "p" => P, "q" => Q, "r" => R, "s" => S, "t" => T, "u" => U,
        "v" => V, "w" => W, "x" => X, "y" => Y, "z" => Z,
        "0" => Key0, "1" => Key1, "2" => Key2, "3" => Key3, "4" => Key4,
        "5" => Key5, "6" => Key6, "7" => Key7, "8" => Key8, "9" => Key9,
        "left" => Left, "right" => Right, "up" => Up, "down" => Down,
        "space" => Space,
        "return" | "enter" => Return,
        "escape" => Escape,
        "tab" => Tab,
        "backspace" => Back,
        "lshift" => LShift, "rshift" => RShift,
        "lctrl" => LControl, "rctrl" => RControl,
        "f1" => F1, "f2" => F2, "f3" => F3, "f4" => F4, "f5" => F5, "f6" => F6,
        "f7" => F7, "f8" => F8, "f9" => F9, "f10" => F10, "f11" => F11, "f12" => F12,
        _ => return None,
    };
    Some(key)
}

pub fn mouse_button_from_name(name: &str) -> Option<MouseButton> {
    match name.trim().to_ascii_lowercase().as_str() {
        "left" => Some(MouseButton::Left),
        "right" => Some(MouseButton::Right),
        "middle" => Some(MouseButton::Middle),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edges_last_one_frame() {
        let mut input = InputManager::new();
        input.press_key(VirtualKeyCode::Space);
        assert!(input.is_key_pressed(VirtualKeyCode::Space));
        assert!(input.is_key_just_pressed(VirtualKeyCode::Space));

        input.update();
        input.press_key(VirtualKeyCode::Space); // key repeat
        assert!(input.is_key_pressed(VirtualKeyCode::Space));
        assert!(!input.is_key_just_pressed(VirtualKeyCode::Space));

        input.release_key(VirtualKeyCode::Space);
        assert!(!input.is_key_pressed(VirtualKeyCode::Space));
        assert!(input.is_key_just_released(VirtualKeyCode::Space));

        input.update();
        assert!(!input.is_key_just_released(VirtualKeyCode::Space));
    }

    #[test]
    fn snapshot_is_detached() {
        let mut input = InputManager::new();
        input.press_key(VirtualKeyCode::Left);
        let snapshot = input.snapshot();
        input.release_key(VirtualKeyCode::Left);

        assert!(snapshot.down.contains(&VirtualKeyCode::Left));
        assert!(snapshot.just_pressed.contains(&VirtualKeyCode::Left));
        assert!(!input.is_key_pressed(VirtualKeyCode::Left));
    }

    #[test]
    fn key_names() {
        assert_eq!(key_from_name("A"), Some(VirtualKeyCode::A));
        assert_eq!(key_from_name("Enter"), Some(VirtualKeyCode::Return));
        assert_eq!(key_from_name("f2"), Some(VirtualKeyCode::F2));
        assert_eq!(key_from_name("7"), Some(VirtualKeyCode::Key7));
        assert_eq!(key_from_name("hyper"), None);
        assert_eq!(mouse_button_from_name("Right"), Some(MouseButton::Right));
    }
}
