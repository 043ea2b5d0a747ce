//! Keyboard event source using the Linux evdev interface
//!
//! Grabs every physical keyboard at the kernel level (EVIOCGRAB), so no
//! event reaches the compositor directly. Events the detector passes are
//! re-emitted through a uinput virtual device; swallowed events simply are
//! not. This is the only portable way to suppress the shortcut chord across
//! Wayland compositors.
//!
//! Requires read access to /dev/input/event* (user in the 'input' group)
//! and write access to /dev/uinput.

use super::{EventDecision, InputEventSource, KeyEvent};
use crate::error::InputError;
use crate::output::Modifiers;
use evdev::uinput::{VirtualDevice, VirtualDeviceBuilder};
use evdev::{AttributeSet, Device, InputEventKind};
use std::os::unix::io::AsRawFd;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

// input-event-codes.h modifier codes
const KEY_LEFTCTRL: u16 = 29;
const KEY_RIGHTCTRL: u16 = 97;
const KEY_LEFTSHIFT: u16 = 42;
const KEY_RIGHTSHIFT: u16 = 54;
const KEY_LEFTALT: u16 = 56;
const KEY_RIGHTALT: u16 = 100;
const KEY_LEFTMETA: u16 = 125;
const KEY_RIGHTMETA: u16 = 126;

/// Event source reading grabbed evdev keyboards and re-emitting passed
/// events via uinput
pub struct EvdevSource {
    devices: Vec<Device>,
    stop: Arc<AtomicBool>,
}

impl EvdevSource {
    /// Open and grab all keyboard devices.
    ///
    /// Fails if no keyboard is accessible, with a hint about the 'input'
    /// group when permissions are the cause.
    pub fn new(stop: Arc<AtomicBool>) -> Result<Self, InputError> {
        let mut devices = find_keyboard_devices()?;

        if devices.is_empty() {
            return Err(InputError::NoKeyboard);
        }

        for device in &mut devices {
            set_nonblocking(device)?;
            device.grab().map_err(|e| {
                InputError::Evdev(format!(
                    "Failed to grab {}: {}",
                    device.name().unwrap_or("unknown"),
                    e
                ))
            })?;
        }

        tracing::info!("Grabbed {} keyboard device(s)", devices.len());
        Ok(Self { devices, stop })
    }

    fn build_passthrough(&self) -> Result<VirtualDevice, InputError> {
        // The virtual device must advertise every key any grabbed keyboard
        // can produce, or re-emitted events get dropped by the kernel.
        let mut keys: AttributeSet<evdev::Key> = AttributeSet::new();
        for device in &self.devices {
            if let Some(supported) = device.supported_keys() {
                for key in supported.iter() {
                    keys.insert(key);
                }
            }
        }

        VirtualDeviceBuilder::new()
            .and_then(|b| b.name("echotype passthrough").with_keys(&keys))
            .and_then(|b| b.build())
            .map_err(|e| InputError::Evdev(format!("Failed to create uinput device: {}", e)))
    }
}

impl InputEventSource for EvdevSource {
    fn run(
        &mut self,
        handler: &mut dyn FnMut(&KeyEvent) -> EventDecision,
    ) -> Result<(), InputError> {
        let mut passthrough = self.build_passthrough()?;
        let mut modifiers = Modifiers::default();

        tracing::info!("Listening for keyboard events");

        while !self.stop.load(Ordering::Relaxed) {
            for device in &mut self.devices {
                let events = match device.fetch_events() {
                    Ok(events) => events.collect::<Vec<_>>(),
                    Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => continue,
                    Err(e) => {
                        return Err(InputError::Evdev(format!(
                            "Failed to read input events: {}",
                            e
                        )));
                    }
                };

                for event in events {
                    let key = match event.kind() {
                        InputEventKind::Key(key) => key,
                        // SYN/MSC events are regenerated by uinput on emit
                        _ => continue,
                    };

                    let pressed = event.value() != 0;
                    update_modifiers(&mut modifiers, key.code(), pressed);

                    let key_event = KeyEvent {
                        code: key.code(),
                        modifiers,
                        pressed,
                    };

                    match handler(&key_event) {
                        EventDecision::Pass => {
                            if let Err(e) = passthrough.emit(&[event]) {
                                tracing::warn!("Failed to re-emit key event: {}", e);
                            }
                        }
                        EventDecision::Swallow => {
                            tracing::trace!("Swallowed key event (code {})", key.code());
                        }
                    }
                }
            }

            std::thread::sleep(Duration::from_millis(2));
        }

        for device in &mut self.devices {
            if let Err(e) = device.ungrab() {
                tracing::warn!("Failed to ungrab device: {}", e);
            }
        }

        Ok(())
    }
}

impl Drop for EvdevSource {
    fn drop(&mut self) {
        for device in &mut self.devices {
            let _ = device.ungrab();
        }
    }
}

/// Track physical modifier key state into the logical modifier mask.
/// Autorepeat (value 2) keeps the key held, which maps to `pressed`.
fn update_modifiers(modifiers: &mut Modifiers, code: u16, pressed: bool) {
    match code {
        KEY_LEFTCTRL | KEY_RIGHTCTRL => modifiers.ctrl = pressed,
        KEY_LEFTSHIFT | KEY_RIGHTSHIFT => modifiers.shift = pressed,
        KEY_LEFTALT | KEY_RIGHTALT => modifiers.alt = pressed,
        KEY_LEFTMETA | KEY_RIGHTMETA => modifiers.meta = pressed,
        _ => {}
    }
}

fn set_nonblocking(device: &Device) -> Result<(), InputError> {
    let fd = device.as_raw_fd();
    // SAFETY: fcntl on a valid owned fd
    let result = unsafe {
        let flags = libc::fcntl(fd, libc::F_GETFL);
        if flags < 0 {
            flags
        } else {
            libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK)
        }
    };
    if result < 0 {
        return Err(InputError::Evdev(
            "Failed to set device non-blocking".to_string(),
        ));
    }
    Ok(())
}

/// Enumerate /dev/input and keep devices that look like real keyboards
fn find_keyboard_devices() -> Result<Vec<Device>, InputError> {
    let mut devices = Vec::new();
    let mut permission_denied = false;

    for (path, device) in evdev::enumerate() {
        if !is_keyboard(&device) {
            continue;
        }

        let name = device.name().unwrap_or("unknown").to_string();

        // Never grab our own passthrough or the ydotool virtual keyboard,
        // or synthesized output loops straight back into the detector.
        let lower = name.to_lowercase();
        if lower.contains("ydotool") || lower.contains("echotype") {
            tracing::debug!("Skipping virtual device: {} ({})", name, path.display());
            continue;
        }

        tracing::debug!("Found keyboard: {} ({})", name, path.display());
        devices.push(device);
    }

    // enumerate() silently skips unreadable devices; probe one node to
    // distinguish "no keyboard" from "no permission"
    if devices.is_empty() {
        if let Err(e) = std::fs::File::open("/dev/input/event0") {
            if e.kind() == std::io::ErrorKind::PermissionDenied {
                permission_denied = true;
            }
        }
    }

    if permission_denied {
        return Err(InputError::DeviceAccess(
            "Cannot read /dev/input devices. Add your user to the 'input' group:\n  \
             sudo usermod -aG input $USER\nthen log out and back in."
                .to_string(),
        ));
    }

    Ok(devices)
}

/// A device is a keyboard if it can produce letters and Enter
fn is_keyboard(device: &Device) -> bool {
    device
        .supported_keys()
        .map(|keys| {
            keys.contains(evdev::Key::KEY_A)
                && keys.contains(evdev::Key::KEY_Z)
                && keys.contains(evdev::Key::KEY_ENTER)
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_modifiers_tracks_both_sides() {
        let mut mods = Modifiers::default();

        update_modifiers(&mut mods, KEY_LEFTCTRL, true);
        assert!(mods.ctrl);
        update_modifiers(&mut mods, KEY_RIGHTSHIFT, true);
        assert!(mods.shift);
        update_modifiers(&mut mods, KEY_LEFTCTRL, false);
        assert!(!mods.ctrl);
        assert!(mods.shift);
    }

    #[test]
    fn test_update_modifiers_ignores_plain_keys() {
        let mut mods = Modifiers::default();
        update_modifiers(&mut mods, 47, true); // KEY_V
        assert!(mods.is_empty());
    }
}
