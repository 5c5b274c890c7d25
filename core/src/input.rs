//! Input types independent of any windowing library. The winit and web
//! front ends convert their native events into these.

/// Pixels treated as one scroll line when normalizing wheel deltas.
pub const PIXELS_PER_LINE: f32 = 100.0;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ElementState {
    Pressed,
    Released,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    Back,
    Forward,
    Other(u16),
}

impl MouseButton {
    /// Browser `MouseEvent.button` numbering.
    pub fn from_dom_button(button: i16) -> Self {
        match button {
            0 => Self::Left,
            1 => Self::Middle,
            2 => Self::Right,
            3 => Self::Back,
            4 => Self::Forward,
            other => Self::Other(other.max(0) as u16),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum MouseScrollDelta {
    /// Scroll delta in lines
    LineDelta(f32, f32),
    /// Scroll delta in pixels
    PixelDelta(f32, f32),
}

impl MouseScrollDelta {
    /// Vertical scroll in lines, positive away from the user.
    pub fn vertical_lines(&self) -> f32 {
        match *self {
            Self::LineDelta(_, y) => y,
            Self::PixelDelta(_, y) => y / PIXELS_PER_LINE,
        }
    }
}

/// Logical key (with layout applied)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Named(NamedKey),
    Character(char),
    Unidentified,
}

impl Key {
    /// Map a DOM `KeyboardEvent.key` string.
    pub fn from_dom_key(key: &str) -> Self {
        let named = match key {
            "Escape" => NamedKey::Escape,
            "Enter" => NamedKey::Enter,
            "Tab" => NamedKey::Tab,
            "Backspace" => NamedKey::Backspace,
            "Delete" => NamedKey::Delete,
            " " => NamedKey::Space,
            "ArrowLeft" => NamedKey::ArrowLeft,
            "ArrowRight" => NamedKey::ArrowRight,
            "ArrowUp" => NamedKey::ArrowUp,
            "ArrowDown" => NamedKey::ArrowDown,
            "Home" => NamedKey::Home,
            "End" => NamedKey::End,
            "Shift" => NamedKey::Shift,
            "Control" => NamedKey::Control,
            "Alt" => NamedKey::Alt,
            _ => {
                let mut chars = key.chars();
                return match (chars.next(), chars.next()) {
                    (Some(c), None) => Self::Character(c),
                    _ => Self::Unidentified,
                };
            }
        };
        Self::Named(named)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum NamedKey {
    Escape,
    Enter,
    Tab,
    Backspace,
    Delete,
    Space,
    ArrowLeft,
    ArrowRight,
    ArrowUp,
    ArrowDown,
    Home,
    End,
    Control,
    Alt,
    Shift,
}

#[derive(Debug, Clone, PartialEq)]
pub struct KeyEvent {
    pub logical_key: Key,
    pub state: ElementState,
    /// Key held down and auto-repeating
    pub repeat: bool,
}

impl KeyEvent {
    /// A non-repeat press of `key`.
    pub fn is_press_of(&self, key: &Key) -> bool {
        self.state == ElementState::Pressed && !self.repeat && self.logical_key == *key
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_scroll_normalized_to_lines() {
        assert_eq!(MouseScrollDelta::LineDelta(0.0, 2.0).vertical_lines(), 2.0);
        assert_eq!(MouseScrollDelta::PixelDelta(0.0, -50.0).vertical_lines(), -0.5);
    }

    #[test]
    fn test_dom_keys() {
        assert_eq!(Key::from_dom_key("Escape"), Key::Named(NamedKey::Escape));
        assert_eq!(Key::from_dom_key("w"), Key::Character('w'));
        assert_eq!(Key::from_dom_key("F13"), Key::Unidentified);
    }

    #[test]
    fn test_dom_buttons() {
        assert_eq!(MouseButton::from_dom_button(0), MouseButton::Left);
        assert_eq!(MouseButton::from_dom_button(1), MouseButton::Middle);
        assert_eq!(MouseButton::from_dom_button(2), MouseButton::Right);
        assert_eq!(MouseButton::from_dom_button(7), MouseButton::Other(7));
    }

    #[test]
    fn test_repeat_is_not_a_press() {
        let mut event = KeyEvent {
            logical_key: Key::Character('r'),
            state: ElementState::Pressed,
            repeat: false,
        };
        assert!(event.is_press_of(&Key::Character('r')));
        event.repeat = true;
        assert!(!event.is_press_of(&Key::Character('r')));
    }
}
