//! Remote speech-to-text transcription via OpenAI-compatible API
//!
//! Sends WAV audio to a Groq or OpenAI-compatible transcription endpoint.
//! The request carries model, temperature, optional language, and the
//! optional context prompt assembled by the session.

use super::Transcriber;
use crate::config::{TranscribeConfig, TranscribeTask};
use crate::error::TranscribeError;
use std::time::Duration;

/// Remote transcriber using an OpenAI-compatible Whisper API
#[derive(Debug)]
pub struct RemoteTranscriber {
    /// Base endpoint URL (e.g., "https://api.groq.com/openai")
    endpoint: String,
    /// Model name to send to the server
    model: String,
    /// Language code, or None for auto-detection
    language: Option<String>,
    /// Sampling temperature (0 = deterministic)
    temperature: f32,
    /// Transcribe or translate-to-English
    task: TranscribeTask,
    /// Bearer token for authentication
    api_key: String,
    /// Request timeout
    timeout: Duration,
}

impl RemoteTranscriber {
    /// Create a new remote transcriber from config
    pub fn new(config: &TranscribeConfig) -> Result<Self, TranscribeError> {
        let endpoint = config.endpoint.clone();

        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            return Err(TranscribeError::ConfigError(format!(
                "endpoint must start with http:// or https://, got: {}",
                endpoint
            )));
        }

        if endpoint.starts_with("http://")
            && !endpoint.contains("localhost")
            && !endpoint.contains("127.0.0.1")
        {
            tracing::warn!(
                "Transcription endpoint uses HTTP without TLS. Audio will be transmitted unencrypted!"
            );
        }

        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("GROQ_API_KEY").ok())
            .ok_or(TranscribeError::MissingApiKey)?;

        let language = match config.language.as_str() {
            "auto" | "" => None,
            lang => Some(lang.to_string()),
        };

        Ok(Self {
            endpoint,
            model: config.model.clone(),
            language,
            temperature: config.temperature,
            task: config.task,
            api_key,
            timeout: Duration::from_secs(config.timeout_secs),
        })
    }

    /// Build the multipart form body for the API request
    fn build_multipart_body(&self, wav_data: &[u8], prompt: Option<&str>) -> (String, Vec<u8>) {
        let boundary = format!(
            "----EchotypeBoundary{}",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos()
        );

        let mut body = Vec::new();

        let mut text_field = |body: &mut Vec<u8>, name: &str, value: &str| {
            body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
            body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
            );
            body.extend_from_slice(value.as_bytes());
            body.extend_from_slice(b"\r\n");
        };

        text_field(&mut body, "model", &self.model);
        text_field(&mut body, "temperature", &self.temperature.to_string());
        text_field(&mut body, "response_format", "json");
        if let Some(ref lang) = self.language {
            text_field(&mut body, "language", lang);
        }
        if let Some(prompt) = prompt.filter(|p| !p.is_empty()) {
            text_field(&mut body, "prompt", prompt);
        }

        // File field last
        body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
        body.extend_from_slice(
            b"Content-Disposition: form-data; name=\"file\"; filename=\"audio.wav\"\r\n",
        );
        body.extend_from_slice(b"Content-Type: audio/wav\r\n\r\n");
        body.extend_from_slice(wav_data);
        body.extend_from_slice(b"\r\n");

        body.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());

        (boundary, body)
    }

    fn api_path(&self) -> &'static str {
        match self.task {
            TranscribeTask::Transcribe => "/v1/audio/transcriptions",
            TranscribeTask::Translate => "/v1/audio/translations",
        }
    }
}

impl Transcriber for RemoteTranscriber {
    fn transcribe(&self, wav: &[u8], prompt: Option<&str>) -> Result<String, TranscribeError> {
        if wav.is_empty() {
            return Err(TranscribeError::AudioFormat("Empty audio buffer".into()));
        }

        let start = std::time::Instant::now();
        let (boundary, body) = self.build_multipart_body(wav, prompt);
        let url = format!("{}{}", self.endpoint.trim_end_matches('/'), self.api_path());

        tracing::debug!("Sending {} bytes of audio to {}", wav.len(), url);

        let response = ureq::post(&url)
            .timeout(self.timeout)
            .set(
                "Content-Type",
                &format!("multipart/form-data; boundary={}", boundary),
            )
            .set("Authorization", &format!("Bearer {}", self.api_key))
            .send_bytes(&body)
            .map_err(|e| match e {
                ureq::Error::Status(code, resp) => TranscribeError::RemoteError {
                    status: code,
                    message: resp.into_string().unwrap_or_default(),
                },
                ureq::Error::Transport(t) => {
                    TranscribeError::NetworkError(format!("Request failed: {}", t))
                }
            })?;

        let json: serde_json::Value = response.into_json().map_err(|e| {
            TranscribeError::NetworkError(format!("Failed to parse response: {}", e))
        })?;

        let text = json
            .get("text")
            .and_then(|v| v.as_str())
            .ok_or_else(|| TranscribeError::NetworkError(format!(
                "Response missing 'text' field: {}",
                json
            )))?
            .trim()
            .to_string();

        tracing::info!(
            "Remote transcription completed in {:.2}s: {:?}",
            start.elapsed().as_secs_f32(),
            if text.chars().count() > 50 {
                format!("{}...", text.chars().take(50).collect::<String>())
            } else {
                text.clone()
            }
        );

        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TranscribeConfig;

    fn config() -> TranscribeConfig {
        TranscribeConfig {
            endpoint: "https://api.groq.com/openai".to_string(),
            model: "distil-whisper-large-v3-en".to_string(),
            api_key: Some("test-key".to_string()),
            language: "auto".to_string(),
            temperature: 0.0,
            task: TranscribeTask::Transcribe,
            timeout_secs: 30,
        }
    }

    #[test]
    fn test_config_validation_rejects_bad_endpoint() {
        let mut cfg = config();
        cfg.endpoint = "api.groq.com".to_string();
        assert!(RemoteTranscriber::new(&cfg).is_err());
    }

    #[test]
    fn test_auto_language_is_omitted() {
        let transcriber = RemoteTranscriber::new(&config()).unwrap();
        assert!(transcriber.language.is_none());

        let (_, body) = transcriber.build_multipart_body(b"RIFFxxxx", None);
        let body = String::from_utf8_lossy(&body);
        assert!(!body.contains("name=\"language\""));
    }

    #[test]
    fn test_explicit_language_is_sent() {
        let mut cfg = config();
        cfg.language = "en".to_string();
        let transcriber = RemoteTranscriber::new(&cfg).unwrap();

        let (_, body) = transcriber.build_multipart_body(b"RIFFxxxx", None);
        let body = String::from_utf8_lossy(&body);
        assert!(body.contains("name=\"language\""));
        assert!(body.contains("\r\nen\r\n"));
    }

    #[test]
    fn test_prompt_field_only_when_non_empty() {
        let transcriber = RemoteTranscriber::new(&config()).unwrap();

        let (_, with) = transcriber.build_multipart_body(b"RIFFxxxx", Some("context words"));
        assert!(String::from_utf8_lossy(&with).contains("name=\"prompt\""));

        let (_, empty) = transcriber.build_multipart_body(b"RIFFxxxx", Some(""));
        assert!(!String::from_utf8_lossy(&empty).contains("name=\"prompt\""));

        let (_, none) = transcriber.build_multipart_body(b"RIFFxxxx", None);
        assert!(!String::from_utf8_lossy(&none).contains("name=\"prompt\""));
    }

    #[test]
    fn test_multipart_body_shape() {
        let transcriber = RemoteTranscriber::new(&config()).unwrap();
        let (boundary, body) = transcriber.build_multipart_body(b"RIFFxxxx", None);
        let body = String::from_utf8_lossy(&body);

        assert!(body.starts_with(&format!("--{}", boundary)));
        assert!(body.trim_end().ends_with(&format!("--{}--", boundary)));
        assert!(body.contains("name=\"model\""));
        assert!(body.contains("name=\"temperature\""));
        assert!(body.contains("filename=\"audio.wav\""));
    }

    #[test]
    fn test_translate_task_changes_path() {
        let mut cfg = config();
        cfg.task = TranscribeTask::Translate;
        let transcriber = RemoteTranscriber::new(&cfg).unwrap();
        assert_eq!(transcriber.api_path(), "/v1/audio/translations");
    }
}
