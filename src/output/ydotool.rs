//! ydotool-based input device
//!
//! Uses ydotool to synthesize keyboard input through the uinput kernel
//! interface, which works on all Wayland compositors.
//!
//! Requires:
//! - ydotool installed
//! - ydotoold daemon running (systemctl --user start ydotool)
//! - User in 'input' group
//!
//! Runs on the session worker thread, so plain blocking subprocesses are
//! fine here.

use super::{InputDevice, Key, Modifiers};
use crate::error::OutputError;
use std::process::{Command, Stdio};

// Linux input event codes (input-event-codes.h)
const KEY_LEFTCTRL: u16 = 29;
const KEY_LEFTSHIFT: u16 = 42;
const KEY_LEFTALT: u16 = 56;
const KEY_LEFTMETA: u16 = 125;
const KEY_BACKSPACE: u16 = 14;
const KEY_HOME: u16 = 102;
const KEY_RIGHT: u16 = 106;

/// ydotool-based input device
pub struct YdotoolDevice {
    /// Delay between keypresses in milliseconds (0 = fastest)
    key_delay_ms: u32,
}

impl YdotoolDevice {
    pub fn new(key_delay_ms: u32) -> Self {
        Self { key_delay_ms }
    }

    fn run_key_command(&self, args: &[String]) -> Result<(), OutputError> {
        let output = Command::new("ydotool")
            .arg("key")
            .args(args)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    OutputError::YdotoolNotFound
                } else {
                    OutputError::InjectionFailed(e.to_string())
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr.contains("socket") || stderr.contains("connect") || stderr.contains("daemon")
            {
                return Err(OutputError::YdotoolNotRunning);
            }
            return Err(OutputError::InjectionFailed(stderr.to_string()));
        }

        Ok(())
    }
}

/// Map a logical key to a Linux input event code
fn keycode(key: Key) -> Result<u16, OutputError> {
    match key {
        Key::Backspace => Ok(KEY_BACKSPACE),
        Key::Home => Ok(KEY_HOME),
        Key::Right => Ok(KEY_RIGHT),
        Key::Char(c) => char_keycode(c).ok_or(OutputError::UnmappedKey(c)),
    }
}

/// Keycodes for the plain character keys used in chords (copy, paste)
pub(crate) fn char_keycode(c: char) -> Option<u16> {
    let code = match c.to_ascii_lowercase() {
        'q' => 16, 'w' => 17, 'e' => 18, 'r' => 19, 't' => 20, 'y' => 21,
        'u' => 22, 'i' => 23, 'o' => 24, 'p' => 25,
        'a' => 30, 's' => 31, 'd' => 32, 'f' => 33, 'g' => 34, 'h' => 35,
        'j' => 36, 'k' => 37, 'l' => 38,
        'z' => 44, 'x' => 45, 'c' => 46, 'v' => 47, 'b' => 48, 'n' => 49,
        'm' => 50,
        _ => return None,
    };
    Some(code)
}

/// Modifier keycodes to hold for a chord, in press order
fn modifier_codes(modifiers: Modifiers) -> Vec<u16> {
    let mut codes = Vec::new();
    if modifiers.ctrl {
        codes.push(KEY_LEFTCTRL);
    }
    if modifiers.shift {
        codes.push(KEY_LEFTSHIFT);
    }
    if modifiers.alt {
        codes.push(KEY_LEFTALT);
    }
    if modifiers.meta {
        codes.push(KEY_LEFTMETA);
    }
    codes
}

/// Build the ydotool `key` argument list for a chord:
/// modifiers down, key down, key up, modifiers up in reverse order.
/// Same shape as the classic Ctrl+V sequence `29:1 47:1 47:0 29:0`.
fn chord_args(key_code: u16, modifiers: Modifiers) -> Vec<String> {
    let mods = modifier_codes(modifiers);
    let mut args = Vec::with_capacity(mods.len() * 2 + 2);
    for m in &mods {
        args.push(format!("{}:1", m));
    }
    args.push(format!("{}:1", key_code));
    args.push(format!("{}:0", key_code));
    for m in mods.iter().rev() {
        args.push(format!("{}:0", m));
    }
    args
}

impl InputDevice for YdotoolDevice {
    fn press_and_release(&self, key: Key, modifiers: Modifiers) -> Result<(), OutputError> {
        let code = keycode(key)?;
        self.run_key_command(&chord_args(code, modifiers))
    }

    fn type_text(&self, text: &str) -> Result<(), OutputError> {
        if text.is_empty() {
            return Ok(());
        }

        let mut cmd = Command::new("ydotool");
        cmd.arg("type");

        if self.key_delay_ms > 0 {
            cmd.arg("--key-delay").arg(self.key_delay_ms.to_string());
            cmd.arg("--key-hold").arg(self.key_delay_ms.to_string());
        }

        // The -- ensures text starting with - isn't treated as an option
        cmd.arg("--").arg(text);

        let output = cmd
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    OutputError::YdotoolNotFound
                } else {
                    OutputError::InjectionFailed(e.to_string())
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr.contains("socket") || stderr.contains("connect") || stderr.contains("daemon")
            {
                return Err(OutputError::YdotoolNotRunning);
            }
            return Err(OutputError::InjectionFailed(stderr.to_string()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chord_args_ctrl_v() {
        let args = chord_args(47, Modifiers::CTRL);
        assert_eq!(args, vec!["29:1", "47:1", "47:0", "29:0"]);
    }

    #[test]
    fn test_chord_args_ctrl_shift_home_releases_in_reverse() {
        let args = chord_args(KEY_HOME, Modifiers::CTRL_SHIFT);
        assert_eq!(
            args,
            vec!["29:1", "42:1", "102:1", "102:0", "42:0", "29:0"]
        );
    }

    #[test]
    fn test_keycode_mapping() {
        assert_eq!(keycode(Key::Char('c')).unwrap(), 46);
        assert_eq!(keycode(Key::Char('V')).unwrap(), 47);
        assert_eq!(keycode(Key::Backspace).unwrap(), 14);
        assert!(matches!(
            keycode(Key::Char('é')),
            Err(OutputError::UnmappedKey('é'))
        ));
    }
}
