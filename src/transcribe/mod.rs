//! Speech-to-text transcription module
//!
//! Transcription is remote-only: audio goes to an OpenAI-compatible Whisper
//! endpoint (Groq by default). The trait seam exists so sessions and tests
//! never depend on the network.

pub mod remote;

use crate::config::TranscribeConfig;
use crate::error::TranscribeError;

/// Trait for speech-to-text implementations
pub trait Transcriber: Send + Sync {
    /// Transcribe a WAV-encoded recording to text.
    ///
    /// `prompt` optionally biases the decoder toward expected vocabulary.
    fn transcribe(&self, wav: &[u8], prompt: Option<&str>) -> Result<String, TranscribeError>;
}

/// Factory function to create the configured transcriber
pub fn create_transcriber(
    config: &TranscribeConfig,
) -> Result<Box<dyn Transcriber>, TranscribeError> {
    tracing::info!(
        "Creating remote transcriber: endpoint={}, model={}",
        config.endpoint,
        config.model
    );
    Ok(Box::new(remote::RemoteTranscriber::new(config)?))
}
