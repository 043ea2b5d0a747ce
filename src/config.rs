//! Configuration loading and types for echotype
//!
//! Configuration is loaded in layers:
//! 1. Built-in defaults
//! 2. Config file (~/.config/echotype/config.toml)
//! 3. CLI arguments (highest priority)

use crate::error::{EchotypeError, InputError};
use crate::output::Modifiers;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file content
pub const DEFAULT_CONFIG: &str = r#"# Echotype Configuration
#
# Location: ~/.config/echotype/config.toml
# All settings can be overridden via CLI flags

[hotkey]
# Trigger key for the dictation shortcut
# Use `evtest` to find key names for your keyboard
key = "V"

# Modifiers that must be held with the trigger key: "ctrl", "shift", "alt", "meta"
modifiers = ["ctrl"]

# How long (ms) trigger-key events are suppressed after a shortcut press,
# so the key's character cannot leak into the focused application
cooldown_ms = 300

[audio]
# Audio input device ("default" uses system default)
# List devices with: pactl list sources short
device = "default"

# Sample rate in Hz (whisper expects 16000)
sample_rate = 16000

# Frame duration in ms; the VAD requires 10, 20, or 30
frame_ms = 30

# Seconds of continuous silence after speech that end the recording
silence_duration_secs = 2.0

[vad]
# Voice activity sensitivity (0.0 = detects whispers, 1.0 = requires loud speech)
sensitivity = 0.5

[harvest]
# Copy the text before the cursor out of the focused field and use it as
# transcription context. Leaves the field unchanged.
enabled = false

# Select/copy attempts before giving up (context degrades to empty)
max_retries = 3

# Delay (ms) after each synthetic input operation, letting the OS settle
settle_ms = 50

# Delay (ms) between failed harvest attempts
retry_delay_ms = 500

[prompt]
# Static prompt prepended to harvested context, biasing the transcription
# vocabulary (e.g. project jargon, names)
initial_prompt = ""

# Keep only the most recent N words of the combined prompt
max_words = 128

# Hard character budget imposed by the API
max_chars = 896

[transcribe]
# OpenAI-compatible API base URL
endpoint = "https://api.groq.com/openai"

# Model name to request
model = "distil-whisper-large-v3-en"

# API key; omit to use the GROQ_API_KEY environment variable
# api_key = "gsk_..."

# Language code, or "auto" to let the server detect it
language = "auto"

# Sampling temperature (0 = deterministic)
temperature = 0.0

# "transcribe" or "translate" (translate-to-English)
task = "transcribe"

# Request timeout in seconds
timeout_secs = 30

[output]
# Delay between synthesized keypresses in milliseconds
# 0 = fastest possible, increase if characters are dropped
key_delay_ms = 0

[session]
# Delay (ms) after pasting before the pre-session clipboard is restored
restore_delay_ms = 150
"#;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub hotkey: HotkeyConfig,
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub vad: VadConfig,
    #[serde(default)]
    pub harvest: HarvestConfig,
    #[serde(default)]
    pub prompt: PromptConfig,
    #[serde(default)]
    pub transcribe: TranscribeConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

/// Shortcut chord configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HotkeyConfig {
    /// Trigger key name (evdev KEY_* constant name, without the KEY_ prefix)
    #[serde(default = "default_hotkey_key")]
    pub key: String,

    /// Modifiers that must be held: "ctrl", "shift", "alt", "meta"
    #[serde(default = "default_hotkey_modifiers")]
    pub modifiers: Vec<String>,

    /// Echo-suppression window after a shortcut press, in milliseconds
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,
}

impl HotkeyConfig {
    /// Linux input event code of the trigger key
    pub fn trigger_code(&self) -> Result<u16, InputError> {
        keycode_for_name(&self.key)
    }

    /// Modifier mask the chord requires
    pub fn required_modifiers(&self) -> Result<Modifiers, InputError> {
        let mut mods = Modifiers::default();
        for name in &self.modifiers {
            match name.to_lowercase().as_str() {
                "ctrl" | "control" => mods.ctrl = true,
                "shift" => mods.shift = true,
                "alt" => mods.alt = true,
                "meta" | "super" | "cmd" => mods.meta = true,
                other => return Err(InputError::UnknownKey(other.to_string())),
            }
        }
        Ok(mods)
    }
}

/// Audio capture configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AudioConfig {
    /// PipeWire/PulseAudio device name, or "default"
    #[serde(default = "default_device")]
    pub device: String,

    /// Sample rate in Hz (whisper expects 16000)
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Frame duration in ms (the VAD requires 10, 20, or 30)
    #[serde(default = "default_frame_ms")]
    pub frame_ms: u32,

    /// Seconds of continuous post-speech silence that end the recording
    #[serde(default = "default_silence_duration")]
    pub silence_duration_secs: f64,
}

impl AudioConfig {
    /// Samples per frame (480 at the 16 kHz / 30 ms defaults)
    pub fn frame_samples(&self) -> usize {
        (self.sample_rate as u64 * self.frame_ms as u64 / 1000) as usize
    }
}

/// Voice activity detection configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VadConfig {
    /// 0.0 = very sensitive, 1.0 = requires loud speech
    #[serde(default = "default_sensitivity")]
    pub sensitivity: f32,
}

/// On-screen context harvesting configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HarvestConfig {
    /// Harvest context from the focused field before recording
    #[serde(default)]
    pub enabled: bool,

    /// Select/copy attempts before degrading to empty context
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Settle delay after each synthetic input operation, in milliseconds
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,

    /// Delay between failed attempts, in milliseconds
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

/// Transcription prompt configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PromptConfig {
    /// Static prompt prepended to harvested context
    #[serde(default)]
    pub initial_prompt: String,

    /// Word budget (most recent words are kept)
    #[serde(default = "default_max_words")]
    pub max_words: usize,

    /// Character budget applied after the word cap
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
}

/// Transcription task sent to the remote API
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TranscribeTask {
    #[default]
    Transcribe,
    Translate,
}

/// Remote speech-to-text configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TranscribeConfig {
    /// OpenAI-compatible API base URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Model name to request
    #[serde(default = "default_model")]
    pub model: String,

    /// API key; falls back to the GROQ_API_KEY environment variable
    #[serde(default)]
    pub api_key: Option<String>,

    /// Language code, or "auto"
    #[serde(default = "default_language")]
    pub language: String,

    /// Sampling temperature
    #[serde(default)]
    pub temperature: f32,

    #[serde(default)]
    pub task: TranscribeTask,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Keystroke synthesis configuration
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct OutputConfig {
    /// Delay between synthesized keypresses in milliseconds
    #[serde(default)]
    pub key_delay_ms: u32,
}

/// Session orchestration configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionConfig {
    /// Delay after pasting before the pre-session clipboard is restored,
    /// in milliseconds
    #[serde(default = "default_restore_delay_ms")]
    pub restore_delay_ms: u64,
}

fn default_hotkey_key() -> String {
    "V".to_string()
}
fn default_hotkey_modifiers() -> Vec<String> {
    vec!["ctrl".to_string()]
}
fn default_cooldown_ms() -> u64 {
    300
}
fn default_device() -> String {
    "default".to_string()
}
fn default_sample_rate() -> u32 {
    16_000
}
fn default_frame_ms() -> u32 {
    30
}
fn default_silence_duration() -> f64 {
    2.0
}
fn default_sensitivity() -> f32 {
    0.5
}
fn default_max_retries() -> u32 {
    3
}
fn default_settle_ms() -> u64 {
    50
}
fn default_retry_delay_ms() -> u64 {
    500
}
fn default_max_words() -> usize {
    128
}
fn default_max_chars() -> usize {
    896
}
fn default_endpoint() -> String {
    "https://api.groq.com/openai".to_string()
}
fn default_model() -> String {
    "distil-whisper-large-v3-en".to_string()
}
fn default_language() -> String {
    "auto".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_restore_delay_ms() -> u64 {
    150
}

impl Default for HotkeyConfig {
    fn default() -> Self {
        Self {
            key: default_hotkey_key(),
            modifiers: default_hotkey_modifiers(),
            cooldown_ms: default_cooldown_ms(),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device: default_device(),
            sample_rate: default_sample_rate(),
            frame_ms: default_frame_ms(),
            silence_duration_secs: default_silence_duration(),
        }
    }
}

impl Default for VadConfig {
    fn default() -> Self {
        Self {
            sensitivity: default_sensitivity(),
        }
    }
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_retries: default_max_retries(),
            settle_ms: default_settle_ms(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            initial_prompt: String::new(),
            max_words: default_max_words(),
            max_chars: default_max_chars(),
        }
    }
}

impl Default for TranscribeConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            api_key: None,
            language: default_language(),
            temperature: 0.0,
            task: TranscribeTask::default(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            restore_delay_ms: default_restore_delay_ms(),
        }
    }
}

impl Config {
    /// Default config file location (~/.config/echotype/config.toml)
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("echotype")
            .join("config.toml")
    }

    /// Load configuration: defaults, then the config file if present.
    ///
    /// A missing file is not an error (defaults apply); a malformed file is.
    pub fn load(path: Option<&Path>) -> Result<Self, EchotypeError> {
        let path = path.map(PathBuf::from).unwrap_or_else(Self::default_path);

        let config = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            toml::from_str(&content).map_err(|e| {
                EchotypeError::Config(format!("Failed to parse {}: {}", path.display(), e))
            })?
        } else {
            tracing::debug!("No config file at {}, using defaults", path.display());
            Config::default()
        };

        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints the type system cannot express
    pub fn validate(&self) -> Result<(), EchotypeError> {
        crate::vad::validate_frame(self.audio.frame_samples(), self.audio.sample_rate)
            .map_err(|e| EchotypeError::Config(e.to_string()))?;

        if self.audio.silence_duration_secs <= 0.0 {
            return Err(EchotypeError::Config(
                "audio.silence_duration_secs must be positive".to_string(),
            ));
        }

        self.hotkey.trigger_code().map_err(EchotypeError::Input)?;
        self.hotkey
            .required_modifiers()
            .map_err(EchotypeError::Input)?;

        Ok(())
    }
}

/// Map a key name to its Linux input event code.
///
/// Accepts evdev KEY_* names without the prefix, case-insensitively:
/// single letters, SCROLLLOCK, PAUSE, F13-F24 and a few navigation keys.
fn keycode_for_name(name: &str) -> Result<u16, InputError> {
    let normalized = name.trim().to_uppercase();
    let stripped = normalized.strip_prefix("KEY_").unwrap_or(&normalized);

    if stripped.len() == 1 {
        if let Some(c) = stripped.chars().next() {
            if let Some(code) = crate::output::ydotool::char_keycode(c) {
                return Ok(code);
            }
        }
    }

    let code = match stripped {
        "SCROLLLOCK" => 70,
        "PAUSE" => 119,
        "INSERT" => 110,
        "HOME" => 102,
        "END" => 107,
        "SPACE" => 57,
        "GRAVE" | "BACKTICK" => 41,
        "F13" => 183,
        "F14" => 184,
        "F15" => 185,
        "F16" => 186,
        "F17" => 187,
        "F18" => 188,
        "F19" => 189,
        "F20" => 190,
        "F21" => 191,
        "F22" => 192,
        "F23" => 193,
        "F24" => 194,
        _ => return Err(InputError::UnknownKey(name.to_string())),
    };
    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_string_parses_to_defaults() {
        let parsed: Config = toml::from_str(DEFAULT_CONFIG).unwrap();
        assert_eq!(parsed.hotkey.key, "V");
        assert_eq!(parsed.hotkey.modifiers, vec!["ctrl"]);
        assert_eq!(parsed.audio.sample_rate, 16_000);
        assert_eq!(parsed.audio.frame_ms, 30);
        assert_eq!(parsed.prompt.max_words, 128);
        assert_eq!(parsed.prompt.max_chars, 896);
        assert_eq!(parsed.transcribe.task, TranscribeTask::Transcribe);
        assert!(!parsed.harvest.enabled);
        parsed.validate().unwrap();
    }

    #[test]
    fn test_frame_samples() {
        let audio = AudioConfig::default();
        assert_eq!(audio.frame_samples(), 480);
    }

    #[test]
    fn test_trigger_code_and_modifiers() {
        let hotkey = HotkeyConfig::default();
        assert_eq!(hotkey.trigger_code().unwrap(), 47); // KEY_V
        assert_eq!(hotkey.required_modifiers().unwrap(), Modifiers::CTRL);
    }

    #[test]
    fn test_keycode_for_name_variants() {
        assert_eq!(keycode_for_name("v").unwrap(), 47);
        assert_eq!(keycode_for_name("KEY_V").unwrap(), 47);
        assert_eq!(keycode_for_name("ScrollLock").unwrap(), 70);
        assert_eq!(keycode_for_name("F13").unwrap(), 183);
        assert!(keycode_for_name("NOT_A_KEY").is_err());
    }

    #[test]
    fn test_validate_rejects_bad_frame_geometry() {
        let mut config = Config::default();
        config.audio.frame_ms = 25;
        assert!(config.validate().is_err());

        config.audio.frame_ms = 30;
        config.audio.sample_rate = 44_100;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_unknown_modifier() {
        let mut config = Config::default();
        config.hotkey.modifiers = vec!["hyper".to_string()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let parsed: Config = toml::from_str("[harvest]\nenabled = true\n").unwrap();
        assert!(parsed.harvest.enabled);
        assert_eq!(parsed.harvest.max_retries, 3);
        assert_eq!(parsed.transcribe.model, "distil-whisper-large-v3-en");
    }
}
