//! Daemon orchestration
//!
//! Wires the keyboard tap, the edge detector and the session runner
//! together, then parks on a select loop handling session triggers and
//! signals. Sessions are blocking pipelines (subprocesses, audio reads,
//! HTTP), so each one runs via spawn_blocking; the event loop itself only
//! routes messages.
//!
//! Signals:
//! - SIGUSR2 requests the active recording to stop early
//! - SIGINT/SIGTERM shut the daemon down

use crate::config::Config;
use crate::error::{EchotypeError, Result};
use crate::hotkey::{self, EdgeDetector};
use crate::session::SessionRunner;
use crate::state::SessionGate;
use crate::{audio, output, transcribe, vad};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;

/// Main daemon struct
pub struct Daemon {
    config: Arc<Config>,
}

impl Daemon {
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Run the daemon until SIGINT/SIGTERM
    pub async fn run(&self) -> Result<()> {
        tracing::info!("Starting echotype daemon");

        let gate = SessionGate::new();
        let (trigger_tx, mut trigger_rx) = mpsc::unbounded_channel();

        let runner = Arc::new(SessionRunner {
            config: self.config.clone(),
            device: Arc::from(output::create_input_device(&self.config.output)),
            clipboard: Arc::from(output::create_clipboard(&self.config.output)),
            frames: Arc::from(audio::create_frame_source_factory(&self.config.audio)),
            vad: Arc::from(vad::create_vad(&self.config.vad)),
            transcriber: Arc::from(transcribe::create_transcriber(&self.config.transcribe)?),
            gate: gate.clone(),
        });

        // Keyboard tap on its own blocking thread; the detector runs inline
        // in the event callback.
        let stop = Arc::new(AtomicBool::new(false));
        let mut detector = EdgeDetector::new(&self.config.hotkey, gate.clone(), trigger_tx)?;
        let mut source = hotkey::create_event_source(stop.clone())?;
        let mut tap = tokio::task::spawn_blocking(move || {
            source.run(&mut |event| detector.on_event(event, Instant::now()))
        });

        tracing::info!(
            "Ready. Press {}+{} to dictate.",
            self.config.hotkey.modifiers.join("+"),
            self.config.hotkey.key
        );

        let mut sigusr2 = signal_stream(tokio::signal::unix::SignalKind::user_defined2())?;
        let mut sigterm = signal_stream(tokio::signal::unix::SignalKind::terminate())?;

        let result = loop {
            tokio::select! {
                trigger = trigger_rx.recv() => {
                    match trigger {
                        Some(_) => {
                            let runner = runner.clone();
                            tokio::task::spawn_blocking(move || runner.run());
                        }
                        None => {
                            break Err(EchotypeError::Input(
                                crate::error::InputError::Evdev(
                                    "Trigger channel closed".to_string(),
                                ),
                            ));
                        }
                    }
                }
                _ = sigusr2.recv() => {
                    if gate.request_cancel() {
                        tracing::info!("SIGUSR2: stopping active recording");
                    } else {
                        tracing::debug!("SIGUSR2 received with no active session");
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("SIGINT received, shutting down");
                    break Ok(());
                }
                _ = sigterm.recv() => {
                    tracing::info!("SIGTERM received, shutting down");
                    break Ok(());
                }
                tap_result = &mut tap => {
                    break match tap_result {
                        Ok(Ok(())) => Ok(()),
                        Ok(Err(e)) => Err(e.into()),
                        Err(e) => Err(EchotypeError::Input(
                            crate::error::InputError::Evdev(format!(
                                "Keyboard tap thread panicked: {}",
                                e
                            )),
                        )),
                    };
                }
            }
        };

        // Let the tap thread ungrab the keyboards before we exit.
        stop.store(true, Ordering::Relaxed);

        tracing::info!("Daemon stopped");
        result
    }
}

fn signal_stream(
    kind: tokio::signal::unix::SignalKind,
) -> Result<tokio::signal::unix::Signal> {
    tokio::signal::unix::signal(kind).map_err(EchotypeError::Io)
}
