//! Keystroke synthesis and clipboard capabilities
//!
//! The session drives the focused application exclusively through these two
//! traits: synthetic key presses and typed text via [`InputDevice`], and the
//! shared system clipboard via [`Clipboard`]. Concrete Linux adapters use
//! ydotool (uinput-based, works on all Wayland compositors) and
//! wl-clipboard.

pub mod wl_clipboard;
pub mod ydotool;

use crate::config::OutputConfig;
use crate::error::OutputError;

/// Keys the session and harvester need to synthesize
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Backspace,
    Home,
    Right,
    /// A plain character key, e.g. 'c' for the copy chord
    Char(char),
}

/// Modifier set held during a synthesized key press
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        ctrl: false,
        shift: false,
        alt: false,
        meta: false,
    };
    pub const CTRL: Modifiers = Modifiers {
        ctrl: true,
        ..Modifiers::NONE
    };
    pub const CTRL_SHIFT: Modifiers = Modifiers {
        ctrl: true,
        shift: true,
        ..Modifiers::NONE
    };

    /// True if every modifier set in `required` is also set in `self`
    pub fn contains(&self, required: Modifiers) -> bool {
        (!required.ctrl || self.ctrl)
            && (!required.shift || self.shift)
            && (!required.alt || self.alt)
            && (!required.meta || self.meta)
    }

    pub fn is_empty(&self) -> bool {
        !(self.ctrl || self.shift || self.alt || self.meta)
    }
}

/// Trait for synthetic keyboard input into the focused application
pub trait InputDevice: Send + Sync {
    /// Press and release a key while holding the given modifiers
    fn press_and_release(&self, key: Key, modifiers: Modifiers) -> Result<(), OutputError>;

    /// Type a literal string at the cursor position
    fn type_text(&self, text: &str) -> Result<(), OutputError>;
}

/// Trait for system clipboard access
pub trait Clipboard: Send + Sync {
    fn read(&self) -> Result<String, OutputError>;
    fn write(&self, text: &str) -> Result<(), OutputError>;
    fn clear(&self) -> Result<(), OutputError>;
}

/// Erase previously typed text by backspacing once per character
pub fn backspace_text(device: &dyn InputDevice, text: &str) -> Result<(), OutputError> {
    for _ in text.chars() {
        device.press_and_release(Key::Backspace, Modifiers::NONE)?;
    }
    Ok(())
}

/// Factory function for the configured input device adapter
pub fn create_input_device(config: &OutputConfig) -> Box<dyn InputDevice> {
    Box::new(ydotool::YdotoolDevice::new(config.key_delay_ms))
}

/// Factory function for the configured clipboard adapter
pub fn create_clipboard(_config: &OutputConfig) -> Box<dyn Clipboard> {
    Box::new(wl_clipboard::WlClipboard::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modifier_containment() {
        assert!(Modifiers::CTRL_SHIFT.contains(Modifiers::CTRL));
        assert!(Modifiers::CTRL.contains(Modifiers::NONE));
        assert!(!Modifiers::CTRL.contains(Modifiers::CTRL_SHIFT));
        assert!(Modifiers::NONE.is_empty());
        assert!(!Modifiers::CTRL.is_empty());
    }
}
