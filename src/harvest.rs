//! On-screen context harvesting
//!
//! Recovers the text immediately before the cursor in the focused field, to
//! bias transcription toward the vocabulary already on screen. The field
//! must look untouched afterward.
//!
//! The select/copy operations are driven through synthetic input events
//! whose effects are not synchronously observable, so the only robust
//! success detection is a settle delay plus bounded retry. A sentinel marker
//! typed into the field up front makes the harvester's own artifacts
//! erasable on every exit path, success or not.

use crate::config::HarvestConfig;
use crate::error::OutputError;
use crate::output::{backspace_text, Clipboard, InputDevice, Key, Modifiers};
use std::time::Duration;

/// Marker typed at the cursor before harvesting begins.
///
/// Short and distinctive: it shows the user something is happening, and its
/// known length lets the harvester backspace its own output away exactly.
pub const SENTINEL: &str = "<...>";

/// Run `op` up to `attempts` times, sleeping `backoff(attempt)` between
/// tries. Returns the first `Some` produced, or `None` once exhausted.
///
/// The backoff is injected so tests can run with zero delay.
pub fn retry<T, E>(
    attempts: u32,
    mut backoff: impl FnMut(u32),
    mut op: impl FnMut(u32) -> Result<Option<T>, E>,
) -> Result<Option<T>, E> {
    for attempt in 0..attempts {
        if let Some(value) = op(attempt)? {
            return Ok(Some(value));
        }
        if attempt + 1 < attempts {
            backoff(attempt);
        }
    }
    Ok(None)
}

/// Drives the input device and clipboard to copy out the text before the
/// cursor, leaving field content and cursor position unchanged.
pub struct Harvester<'a> {
    device: &'a dyn InputDevice,
    clipboard: &'a dyn Clipboard,
    config: &'a HarvestConfig,
}

impl<'a> Harvester<'a> {
    pub fn new(
        device: &'a dyn InputDevice,
        clipboard: &'a dyn Clipboard,
        config: &'a HarvestConfig,
    ) -> Self {
        Self {
            device,
            clipboard,
            config,
        }
    }

    fn settle(&self) {
        std::thread::sleep(Duration::from_millis(self.config.settle_ms));
    }

    /// One select/copy attempt. `Ok(None)` means the clipboard stayed empty.
    fn attempt(&self, attempt: u32) -> Result<Option<String>, OutputError> {
        tracing::debug!("Context harvest attempt {}", attempt + 1);

        // Select from the cursor back to the start of the field
        self.device
            .press_and_release(Key::Home, Modifiers::CTRL_SHIFT)?;
        self.settle();

        // Copy the selection
        self.device
            .press_and_release(Key::Char('c'), Modifiers::CTRL)?;
        self.settle();

        let copied = self.clipboard.read()?;
        self.settle();

        // Collapse the selection back to the cursor, past the sentinel
        self.device.press_and_release(Key::Right, Modifiers::NONE)?;

        if copied.is_empty() {
            Ok(None)
        } else {
            Ok(Some(copied))
        }
    }

    /// Harvest the text before the cursor.
    ///
    /// Exhausting all retries is not an error: the session degrades to empty
    /// context. Device and clipboard failures propagate; the session catches
    /// them further up.
    pub fn harvest(&self) -> Result<String, OutputError> {
        self.device.type_text(SENTINEL)?;

        let copied = self.select_and_copy();

        // The sentinel comes off the screen on every path, a failed copy
        // included; the copy error still wins if both go wrong.
        let erased = backspace_text(self.device, SENTINEL);
        self.settle();
        let copied = copied?;
        erased?;

        match copied {
            Some(text) => {
                let text = strip_sentinel(&text);
                tracing::debug!("Harvested {} chars of context", text.len());
                Ok(text)
            }
            None => {
                tracing::warn!(
                    "Context harvest exhausted after {} attempts, continuing without context",
                    self.config.max_retries
                );
                Ok(String::new())
            }
        }
    }

    /// Clear the clipboard and run the bounded select/copy retry loop.
    fn select_and_copy(&self) -> Result<Option<String>, OutputError> {
        self.clipboard.clear()?;
        let backoff =
            |_: u32| std::thread::sleep(Duration::from_millis(self.config.retry_delay_ms));
        retry(self.config.max_retries, backoff, |attempt| {
            self.attempt(attempt)
        })
    }
}

/// Drop the sentinel and everything after it from copied text.
///
/// The marker the harvester typed sits at the cursor, i.e. at the end of the
/// copied region, so cutting at the *last* occurrence removes exactly our
/// artifact. Earlier occurrences belong to the user's own text and are kept.
fn strip_sentinel(text: &str) -> String {
    match text.rfind(SENTINEL) {
        Some(idx) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Input device mock that models the focused field as a string with the
    /// cursor at its end. Chords are no-ops on content, exactly like the
    /// real select/copy chords.
    struct FieldDevice {
        field: Mutex<String>,
    }

    impl FieldDevice {
        fn new(content: &str) -> Self {
            Self {
                field: Mutex::new(content.to_string()),
            }
        }

        fn content(&self) -> String {
            self.field.lock().unwrap().clone()
        }
    }

    impl InputDevice for FieldDevice {
        fn press_and_release(&self, key: Key, _modifiers: Modifiers) -> Result<(), OutputError> {
            if key == Key::Backspace {
                self.field.lock().unwrap().pop();
            }
            Ok(())
        }

        fn type_text(&self, text: &str) -> Result<(), OutputError> {
            self.field.lock().unwrap().push_str(text);
            Ok(())
        }
    }

    /// Clipboard mock replaying a script of reads
    struct ScriptedClipboard {
        reads: Mutex<Vec<String>>,
        cleared: Mutex<u32>,
    }

    impl ScriptedClipboard {
        fn new(reads: Vec<&str>) -> Self {
            Self {
                reads: Mutex::new(reads.into_iter().map(String::from).collect()),
                cleared: Mutex::new(0),
            }
        }
    }

    impl Clipboard for ScriptedClipboard {
        fn read(&self) -> Result<String, OutputError> {
            let mut reads = self.reads.lock().unwrap();
            if reads.is_empty() {
                Ok(String::new())
            } else {
                Ok(reads.remove(0))
            }
        }

        fn write(&self, _text: &str) -> Result<(), OutputError> {
            Ok(())
        }

        fn clear(&self) -> Result<(), OutputError> {
            *self.cleared.lock().unwrap() += 1;
            Ok(())
        }
    }

    fn config() -> HarvestConfig {
        HarvestConfig {
            enabled: true,
            max_retries: 3,
            settle_ms: 0,
            retry_delay_ms: 0,
        }
    }

    #[test]
    fn test_harvest_first_attempt_success() {
        let device = FieldDevice::new("dear diary, today I");
        let clipboard = ScriptedClipboard::new(vec!["dear diary, today I<...>"]);
        let cfg = config();

        let text = Harvester::new(&device, &clipboard, &cfg).harvest().unwrap();

        assert_eq!(text, "dear diary, today I");
        assert_eq!(device.content(), "dear diary, today I", "field must be unchanged");
        assert_eq!(*clipboard.cleared.lock().unwrap(), 1);
    }

    #[test]
    fn test_harvest_retries_then_succeeds() {
        let device = FieldDevice::new("abc");
        let clipboard = ScriptedClipboard::new(vec!["", "abc<...>"]);
        let cfg = config();

        let text = Harvester::new(&device, &clipboard, &cfg).harvest().unwrap();

        assert_eq!(text, "abc");
        assert_eq!(device.content(), "abc");
    }

    #[test]
    fn test_harvest_exhausted_returns_empty_and_restores_field() {
        let device = FieldDevice::new("untouchable");
        let clipboard = ScriptedClipboard::new(vec![]);
        let cfg = config();

        let text = Harvester::new(&device, &clipboard, &cfg).harvest().unwrap();

        assert_eq!(text, "");
        // Net zero visible change: sentinel fully removed
        assert_eq!(device.content(), "untouchable");
    }

    #[test]
    fn test_sentinel_in_user_text_is_preserved() {
        let device = FieldDevice::new("I typed <...> myself");
        let clipboard = ScriptedClipboard::new(vec!["I typed <...> myself<...>"]);
        let cfg = config();

        let text = Harvester::new(&device, &clipboard, &cfg).harvest().unwrap();

        assert_eq!(text, "I typed <...> myself");
    }

    /// Clipboard whose reads always fail, as when wl-paste is broken
    struct FailingClipboard;

    impl Clipboard for FailingClipboard {
        fn read(&self) -> Result<String, OutputError> {
            Err(OutputError::ClipboardFailed("read failed".into()))
        }

        fn write(&self, _text: &str) -> Result<(), OutputError> {
            Ok(())
        }

        fn clear(&self) -> Result<(), OutputError> {
            Ok(())
        }
    }

    #[test]
    fn test_sentinel_erased_when_clipboard_fails() {
        let device = FieldDevice::new("user text");
        let cfg = config();

        let result = Harvester::new(&device, &FailingClipboard, &cfg).harvest();

        assert!(result.is_err());
        // The error propagates, but our artifact must not stay behind in
        // the focused field.
        assert_eq!(device.content(), "user text");
    }

    #[test]
    fn test_strip_sentinel_without_marker() {
        assert_eq!(strip_sentinel("plain text"), "plain text");
        assert_eq!(strip_sentinel(""), "");
    }

    #[test]
    fn test_retry_combinator_counts_attempts() {
        let mut calls = 0;
        let result: Result<Option<u32>, OutputError> = retry(3, |_| {}, |_| {
            calls += 1;
            Ok(None)
        });
        assert!(result.unwrap().is_none());
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_retry_combinator_stops_on_success() {
        let mut calls = 0;
        let result: Result<Option<u32>, OutputError> = retry(5, |_| {}, |attempt| {
            calls += 1;
            Ok((attempt == 1).then_some(42))
        });
        assert_eq!(result.unwrap(), Some(42));
        assert_eq!(calls, 2);
    }

    #[test]
    fn test_retry_combinator_propagates_errors() {
        let result: Result<Option<u32>, OutputError> = retry(3, |_| {}, |_| {
            Err(OutputError::InjectionFailed("boom".into()))
        });
        assert!(result.is_err());
    }
}
