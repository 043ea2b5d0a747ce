//! Session state shared between the input thread and the session worker
//!
//! Two flags cross the thread boundary: whether a session is active
//! (Idle/Capturing) and whether the active capture has been asked to stop.
//! The Idle→Capturing transition is a single compare-and-swap so that two
//! near-simultaneous shortcut presses can never both start a session.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Gate guarding the single-session invariant.
///
/// The hotkey edge detector calls [`SessionGate::try_begin`] on its thread;
/// exactly one caller wins when presses race. The session worker calls
/// [`SessionGate::finish`] as part of its guaranteed cleanup, whatever the
/// outcome of the session.
#[derive(Debug, Default)]
pub struct SessionGate {
    capturing: AtomicBool,
    cancel: AtomicBool,
}

impl SessionGate {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Atomically transition Idle→Capturing and arm a fresh cancel signal.
    ///
    /// Returns `false` if a session is already active; the caller must then
    /// not start a worker.
    pub fn try_begin(&self) -> bool {
        if self
            .capturing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            // The cancel flag belongs to the new session only.
            self.cancel.store(false, Ordering::Release);
            true
        } else {
            false
        }
    }

    /// Return to Idle. Called exactly once per session, from cleanup.
    pub fn finish(&self) {
        self.capturing.store(false, Ordering::Release);
    }

    /// Whether a session is currently active.
    pub fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::Acquire)
    }

    /// Ask the active capture loop to stop at its next frame boundary.
    ///
    /// Returns `true` if a session was active to receive the request.
    pub fn request_cancel(&self) -> bool {
        if self.is_capturing() {
            self.cancel.store(true, Ordering::Release);
            true
        } else {
            false
        }
    }

    /// Checked by the capture loop once per frame.
    pub fn cancel_requested(&self) -> bool {
        self.cancel.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_begin_finish_cycle() {
        let gate = SessionGate::new();
        assert!(!gate.is_capturing());
        assert!(gate.try_begin());
        assert!(gate.is_capturing());
        assert!(!gate.try_begin(), "second begin while capturing must fail");
        gate.finish();
        assert!(!gate.is_capturing());
        assert!(gate.try_begin());
    }

    #[test]
    fn test_begin_resets_cancel() {
        let gate = SessionGate::new();
        assert!(gate.try_begin());
        assert!(gate.request_cancel());
        assert!(gate.cancel_requested());
        gate.finish();
        assert!(gate.try_begin());
        assert!(!gate.cancel_requested(), "cancel must not leak across sessions");
    }

    #[test]
    fn test_cancel_requires_active_session() {
        let gate = SessionGate::new();
        assert!(!gate.request_cancel());
        assert!(!gate.cancel_requested());
    }

    #[test]
    fn test_concurrent_presses_start_one_session() {
        // Simulate many near-simultaneous shortcut presses racing the gate.
        for _ in 0..100 {
            let gate = SessionGate::new();
            let winners: usize = (0..8)
                .map(|_| {
                    let gate = gate.clone();
                    thread::spawn(move || gate.try_begin() as usize)
                })
                .collect::<Vec<_>>()
                .into_iter()
                .map(|h| h.join().unwrap())
                .sum();
            assert_eq!(winners, 1);
        }
    }
}
