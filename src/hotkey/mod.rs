//! Hotkey detection module
//!
//! The [`EdgeDetector`] consumes the raw keyboard event stream and decides,
//! per event, whether it passes through to the focused application or is
//! swallowed. On the debounced press edge of the shortcut chord it starts a
//! session: the Idle→Capturing transition and the worker handoff both happen
//! without blocking, because the handler runs on the OS input-delivery
//! thread.
//!
//! The concrete Linux event source lives in [`evdev_source`]: it grabs
//! keyboard devices at the kernel level and re-emits passed-through events
//! via uinput, which is what makes "swallow" possible at all.

#[cfg(target_os = "linux")]
pub mod evdev_source;

use crate::config::HotkeyConfig;
use crate::error::InputError;
use crate::output::Modifiers;
use crate::state::SessionGate;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// One raw keyboard event as delivered by the event source
#[derive(Debug, Clone, Copy)]
pub struct KeyEvent {
    /// Platform key code (Linux input event code)
    pub code: u16,
    /// Modifier set held at the time of the event
    pub modifiers: Modifiers,
    /// true for key-down (including autorepeat), false for key-up
    pub pressed: bool,
}

/// Per-event verdict returned to the event source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventDecision {
    /// Deliver the event to the focused application
    Pass,
    /// Drop the event; the application never sees it
    Swallow,
}

/// Message asking the daemon to run one session
#[derive(Debug)]
pub struct SessionTrigger;

/// Trait for raw keyboard event delivery
///
/// The source calls the handler synchronously for every key event and must
/// honor its decision. The handler never blocks.
pub trait InputEventSource: Send {
    fn run(
        &mut self,
        handler: &mut dyn FnMut(&KeyEvent) -> EventDecision,
    ) -> Result<(), InputError>;
}

/// Factory function for the platform keyboard event source
#[cfg(target_os = "linux")]
pub fn create_event_source(
    stop: Arc<std::sync::atomic::AtomicBool>,
) -> Result<Box<dyn InputEventSource>, InputError> {
    Ok(Box::new(evdev_source::EvdevSource::new(stop)?))
}

#[cfg(not(target_os = "linux"))]
pub fn create_event_source(
    _stop: Arc<std::sync::atomic::AtomicBool>,
) -> Result<Box<dyn InputEventSource>, InputError> {
    Err(InputError::Evdev(
        "Keyboard capture is only supported on Linux".to_string(),
    ))
}

/// Debounced shortcut press detection with echo suppression
///
/// The chord is "trigger key held AND required modifiers held"; only the
/// transition of that conjunction from false to true counts as a press, so
/// the chord fires no matter which key completes it. After a detected
/// press, events for the trigger key are swallowed for a short cooldown
/// window so the key's character cannot leak into the focused application.
pub struct EdgeDetector {
    trigger_code: u16,
    required_modifiers: Modifiers,
    cooldown: Duration,
    /// Whether the trigger key is physically held right now
    trigger_held: bool,
    /// Whether the full chord was satisfied at the previous event
    chord_active: bool,
    /// Start of the most recent cooldown window
    cooldown_started: Option<Instant>,
    gate: Arc<SessionGate>,
    trigger_tx: mpsc::UnboundedSender<SessionTrigger>,
}

impl EdgeDetector {
    pub fn new(
        config: &HotkeyConfig,
        gate: Arc<SessionGate>,
        trigger_tx: mpsc::UnboundedSender<SessionTrigger>,
    ) -> Result<Self, InputError> {
        Ok(Self {
            trigger_code: config.trigger_code()?,
            required_modifiers: config.required_modifiers()?,
            cooldown: Duration::from_millis(config.cooldown_ms),
            trigger_held: false,
            chord_active: false,
            cooldown_started: None,
            gate,
            trigger_tx,
        })
    }

    /// Classify one event. Never blocks; all session work is handed off
    /// through the trigger channel.
    pub fn on_event(&mut self, event: &KeyEvent, now: Instant) -> EventDecision {
        let is_trigger = event.code == self.trigger_code;
        if is_trigger {
            self.trigger_held = event.pressed;
        }

        // The chord is evaluated on every event, so pressing the modifier
        // while the trigger key is already held still completes it.
        let chord = self.trigger_held && event.modifiers.contains(self.required_modifiers);
        let was_active = self.chord_active;
        self.chord_active = chord;

        if chord {
            // Every chord event re-stamps the cooldown so the trigger key
            // stays suppressed while held; only the edge starts a session.
            self.cooldown_started = Some(now);

            if !was_active {
                if self.gate.try_begin() {
                    tracing::info!("Shortcut pressed, starting session");
                    let _ = self.trigger_tx.send(SessionTrigger);
                } else {
                    // A session is already running; a second press is ignored.
                    tracing::debug!("Shortcut pressed while a session is active, ignoring");
                }
            }

            // Modifier events forming the chord pass through; only the
            // trigger key itself is kept from the focused application.
            return if is_trigger {
                EventDecision::Swallow
            } else {
                EventDecision::Pass
            };
        }

        // Trigger key outside the chord: swallow its up/down echo while the
        // cooldown window is open, so nothing leaks into the focused app.
        if is_trigger {
            if let Some(started) = self.cooldown_started {
                if now.duration_since(started) < self.cooldown {
                    return EventDecision::Swallow;
                }
            }
        }

        EventDecision::Pass
    }
}
