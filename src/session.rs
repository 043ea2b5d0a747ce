//! Dictation session orchestration
//!
//! One session runs the full pipeline on a worker thread: clipboard
//! snapshot, optional context harvest, status marker, VAD-gated capture,
//! prompt assembly, remote transcription, paste. Whatever happens along the
//! way, the cleanup sequence runs: temp artifacts deleted, gate reset,
//! clipboard restored.
//!
//! On failure the session degrades rather than aborts the daemon: markers
//! are erased, an empty paste keeps the focused application consistent, and
//! the error is logged.

use crate::audio::{self, CaptureParams, CaptureResult, FrameSourceFactory};
use crate::config::Config;
use crate::error::EchotypeError;
use crate::harvest::Harvester;
use crate::output::{backspace_text, Clipboard, InputDevice, Key, Modifiers};
use crate::prompt;
use crate::state::SessionGate;
use crate::transcribe::Transcriber;
use crate::vad::VoiceActivity;
use std::sync::Arc;
use std::time::Duration;

/// Marker shown in the focused field while the microphone is open
pub const RECORDING_MARKER: &str = "<REC>";

/// Marker shown while waiting on the transcription service
pub const TRANSCRIBING_MARKER: &str = "<zzz>";

/// Tracks which status marker is currently typed into the focused field,
/// so exactly that text gets backspaced away later.
struct StatusMarker<'a> {
    device: &'a dyn InputDevice,
    pending: Option<&'static str>,
}

impl<'a> StatusMarker<'a> {
    fn new(device: &'a dyn InputDevice) -> Self {
        Self {
            device,
            pending: None,
        }
    }

    /// Replace the on-screen marker: erase the previous one, type the new one
    fn set(&mut self, marker: &'static str) -> Result<(), EchotypeError> {
        if let Some(previous) = self.pending.take() {
            backspace_text(self.device, previous)?;
        }
        self.device.type_text(marker)?;
        self.pending = Some(marker);
        Ok(())
    }

    /// Erase whatever marker is on screen, if any
    fn clear(&mut self) -> Result<(), EchotypeError> {
        if let Some(previous) = self.pending.take() {
            backspace_text(self.device, previous)?;
        }
        Ok(())
    }
}

/// Temp files holding the session's recording and transcript.
///
/// NamedTempFile deletes on close, so dropping or closing this struct is the
/// "delete artifacts" step of cleanup.
struct SessionArtifacts {
    audio: tempfile::NamedTempFile,
    transcript: tempfile::NamedTempFile,
}

impl SessionArtifacts {
    fn create() -> std::io::Result<Self> {
        let audio = tempfile::Builder::new()
            .prefix("echotype-")
            .suffix(".wav")
            .tempfile()?;
        let transcript = tempfile::Builder::new()
            .prefix("echotype-")
            .suffix(".txt")
            .tempfile()?;
        Ok(Self { audio, transcript })
    }

    fn write_audio(&self, wav: &[u8]) -> std::io::Result<()> {
        std::fs::write(self.audio.path(), wav)
    }

    fn write_transcript(&self, text: &str) -> std::io::Result<()> {
        std::fs::write(self.transcript.path(), text)
    }

    fn cleanup(self) {
        if let Err(e) = self.audio.close() {
            tracing::warn!("Failed to delete audio temp file: {}", e);
        }
        if let Err(e) = self.transcript.close() {
            tracing::warn!("Failed to delete transcript temp file: {}", e);
        }
    }
}

/// Runs dictation sessions on worker threads.
///
/// All capabilities are injected as trait objects so the orchestration logic
/// can be exercised without hardware or network.
pub struct SessionRunner {
    pub config: Arc<Config>,
    pub device: Arc<dyn InputDevice>,
    pub clipboard: Arc<dyn Clipboard>,
    pub frames: Arc<dyn FrameSourceFactory>,
    pub vad: Arc<dyn VoiceActivity>,
    pub transcriber: Arc<dyn Transcriber>,
    pub gate: Arc<SessionGate>,
}

impl SessionRunner {
    /// Run one complete session. Never propagates: every outcome ends with
    /// the cleanup sequence and the gate back at idle.
    pub fn run(&self) {
        tracing::info!("Session started");
        let started = std::time::Instant::now();

        let snapshot = match self.clipboard.read() {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!("Could not snapshot clipboard: {}", e);
                String::new()
            }
        };

        let mut marker = StatusMarker::new(&*self.device);
        let mut artifacts: Option<SessionArtifacts> = None;

        match self.run_pipeline(&mut marker, &mut artifacts) {
            Ok(text) => {
                if let Err(e) = self.paste(&text) {
                    tracing::error!("Failed to paste transcription: {}", e);
                } else {
                    tracing::info!(
                        "Session completed in {:.2}s ({} chars)",
                        started.elapsed().as_secs_f32(),
                        text.chars().count()
                    );
                }
            }
            Err(e) => {
                tracing::error!("Session failed: {}", e);
                if let Err(e) = marker.clear() {
                    tracing::warn!("Could not erase status marker: {}", e);
                }
                // Empty paste keeps the focused application's state
                // consistent with a no-op dictation.
                if let Err(e) = self.paste("") {
                    tracing::warn!("Could not paste empty fallback: {}", e);
                }
            }
        }

        // Cleanup runs on every path, in this order: artifacts, gate,
        // settle, clipboard restore.
        if let Some(artifacts) = artifacts.take() {
            artifacts.cleanup();
        }
        self.gate.finish();
        std::thread::sleep(Duration::from_millis(self.config.session.restore_delay_ms));
        if let Err(e) = self.clipboard.write(&snapshot) {
            tracing::warn!("Could not restore clipboard: {}", e);
        }
    }

    fn run_pipeline(
        &self,
        marker: &mut StatusMarker<'_>,
        artifacts: &mut Option<SessionArtifacts>,
    ) -> Result<String, EchotypeError> {
        let context = if self.config.harvest.enabled {
            Harvester::new(&*self.device, &*self.clipboard, &self.config.harvest).harvest()?
        } else {
            String::new()
        };

        marker.set(RECORDING_MARKER)?;

        let recording = self.record()?;
        if recording.is_empty() || recording.speech_frames() == 0 {
            tracing::info!("No speech captured, ending session");
            marker.clear()?;
            return Ok(String::new());
        }
        tracing::debug!(
            "Captured {:.2}s of audio ({} frames)",
            recording.duration_secs(),
            recording.frames().len()
        );

        let arts = artifacts.insert(SessionArtifacts::create()?);
        let wav = recording.encode_wav()?;
        arts.write_audio(&wav)?;

        let full_prompt = prompt::assemble(
            &self.config.prompt.initial_prompt,
            &context,
            self.config.prompt.max_words,
            self.config.prompt.max_chars,
        );

        marker.set(TRANSCRIBING_MARKER)?;

        let text = self
            .transcriber
            .transcribe(&wav, (!full_prompt.is_empty()).then_some(full_prompt.as_str()))?;
        arts.write_transcript(&text)?;

        marker.clear()?;
        Ok(text)
    }

    /// Open the frame source and capture until post-speech silence or an
    /// external cancel.
    fn record(&self) -> Result<CaptureResult, EchotypeError> {
        let params = CaptureParams {
            sample_rate: self.config.audio.sample_rate,
            frame_samples: self.config.audio.frame_samples(),
            silence_duration_secs: self.config.audio.silence_duration_secs,
        };

        let mut source = self.frames.open()?;
        let gate = &self.gate;
        let result = audio::capture(&mut *source, &*self.vad, &params, &|| {
            gate.cancel_requested()
        })?;
        Ok(result)
    }

    fn paste(&self, text: &str) -> Result<(), EchotypeError> {
        self.clipboard.write(text)?;
        self.device
            .press_and_release(Key::Char('v'), Modifiers::CTRL)?;
        Ok(())
    }
}
