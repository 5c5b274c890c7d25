//! Conversions from winit events to viewer events.
//!
//! Only compiled with the `winit-support` feature.

use crate::event::Event;
use crate::input::{ElementState, Key, KeyEvent, MouseButton, MouseScrollDelta, NamedKey};

pub fn convert_element_state(state: winit::event::ElementState) -> ElementState {
    match state {
        winit::event::ElementState::Pressed => ElementState::Pressed,
        winit::event::ElementState::Released => ElementState::Released,
    }
}

pub fn convert_mouse_button(button: winit::event::MouseButton) -> MouseButton {
    match button {
        winit::event::MouseButton::Left => MouseButton::Left,
        winit::event::MouseButton::Right => MouseButton::Right,
        winit::event::MouseButton::Middle => MouseButton::Middle,
        winit::event::MouseButton::Back => MouseButton::Back,
        winit::event::MouseButton::Forward => MouseButton::Forward,
        winit::event::MouseButton::Other(id) => MouseButton::Other(id),
    }
}

pub fn convert_mouse_scroll_delta(delta: winit::event::MouseScrollDelta) -> MouseScrollDelta {
    match delta {
        winit::event::MouseScrollDelta::LineDelta(x, y) => MouseScrollDelta::LineDelta(x, y),
        winit::event::MouseScrollDelta::PixelDelta(pos) => {
            MouseScrollDelta::PixelDelta(pos.x as f32, pos.y as f32)
        }
    }
}

pub fn convert_key(key: &winit::keyboard::Key) -> Key {
    match key {
        winit::keyboard::Key::Named(named) => {
            convert_named_key(*named).map_or(Key::Unidentified, Key::Named)
        }
        winit::keyboard::Key::Character(s) => {
            let mut chars = s.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Key::Character(c),
                _ => Key::Unidentified,
            }
        }
        _ => Key::Unidentified,
    }
}

pub fn convert_key_event(event: &winit::event::KeyEvent) -> KeyEvent {
    KeyEvent {
        logical_key: convert_key(&event.logical_key),
        state: convert_element_state(event.state),
        repeat: event.repeat,
    }
}

fn convert_named_key(key: winit::keyboard::NamedKey) -> Option<NamedKey> {
    use winit::keyboard::NamedKey as WK;
    let named = match key {
        WK::Escape => NamedKey::Escape,
        WK::Enter => NamedKey::Enter,
        WK::Tab => NamedKey::Tab,
        WK::Backspace => NamedKey::Backspace,
        WK::Delete => NamedKey::Delete,
        WK::Space => NamedKey::Space,
        WK::ArrowLeft => NamedKey::ArrowLeft,
        WK::ArrowRight => NamedKey::ArrowRight,
        WK::ArrowUp => NamedKey::ArrowUp,
        WK::ArrowDown => NamedKey::ArrowDown,
        WK::Home => NamedKey::Home,
        WK::End => NamedKey::End,
        WK::Control => NamedKey::Control,
        WK::Alt => NamedKey::Alt,
        WK::Shift => NamedKey::Shift,
        _ => return None,
    };
    Some(named)
}

pub fn convert_window_event(wevent: &winit::event::WindowEvent) -> Option<Event> {
    use winit::event::WindowEvent as WEvent;

    match wevent {
        WEvent::Resized(size) => Some(Event::Resized((size.width, size.height))),
        WEvent::KeyboardInput {
            event,
            is_synthetic,
            ..
        } => Some(Event::KeyboardInput {
            event: convert_key_event(event),
            is_synthetic: *is_synthetic,
        }),
        WEvent::CursorMoved { position, .. } => Some(Event::CursorMoved {
            position: (position.x, position.y),
        }),
        WEvent::MouseInput { state, button, .. } => Some(Event::MouseInput {
            state: convert_element_state(*state),
            button: convert_mouse_button(*button),
        }),
        WEvent::MouseWheel { delta, .. } => Some(Event::MouseWheel {
            delta: convert_mouse_scroll_delta(*delta),
        }),
        _ => None,
    }
}

pub fn convert_device_event(wevent: &winit::event::DeviceEvent) -> Option<Event> {
    match wevent {
        winit::event::DeviceEvent::MouseMotion { delta } => Some(Event::MouseMotion { delta: *delta }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_keys() {
        let escape = winit::keyboard::Key::Named(winit::keyboard::NamedKey::Escape);
        assert_eq!(convert_key(&escape), Key::Named(NamedKey::Escape));

        let f5 = winit::keyboard::Key::Named(winit::keyboard::NamedKey::F5);
        assert_eq!(convert_key(&f5), Key::Unidentified);
    }

    #[test]
    fn test_character_keys() {
        let w = winit::keyboard::Key::Character("w".into());
        assert_eq!(convert_key(&w), Key::Character('w'));

        let composed = winit::keyboard::Key::Character("ab".into());
        assert_eq!(convert_key(&composed), Key::Unidentified);
    }

    #[test]
    fn test_pixel_scroll() {
        let delta = winit::event::MouseScrollDelta::PixelDelta(winit::dpi::PhysicalPosition::new(0.0, 200.0));
        assert_eq!(convert_mouse_scroll_delta(delta), MouseScrollDelta::PixelDelta(0.0, 200.0));
    }

    #[test]
    fn test_resize_event() {
        let event = winit::event::WindowEvent::Resized(winit::dpi::PhysicalSize::new(640, 480));
        assert!(matches!(convert_window_event(&event), Some(Event::Resized((640, 480)))));
    }
}
