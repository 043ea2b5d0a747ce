//! Error types for echotype
//!
//! Uses thiserror for ergonomic error definitions with clear messages
//! that guide users toward fixing common issues.

use thiserror::Error;

/// Top-level error type for the echotype application
#[derive(Error, Debug)]
pub enum EchotypeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Input error: {0}")]
    Input(#[from] InputError),

    #[error("Audio capture error: {0}")]
    Audio(#[from] AudioError),

    #[error("Transcription error: {0}")]
    Transcribe(#[from] TranscribeError),

    #[error("Output error: {0}")]
    Output(#[from] OutputError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors related to keyboard event tapping
#[derive(Error, Debug)]
pub enum InputError {
    #[error("Cannot open input device '{0}'. Is the user in the 'input' group?\n  Run: sudo usermod -aG input $USER\n  Then log out and back in.")]
    DeviceAccess(String),

    #[error("Unknown key name: '{0}'. Use evtest or wev to find valid key names.")]
    UnknownKey(String),

    #[error("No keyboard device found in /dev/input/")]
    NoKeyboard,

    #[error("evdev error: {0}")]
    Evdev(String),
}

/// Errors related to audio capture
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Audio connection failed: {0}")]
    Connection(String),

    #[error("Audio device not found: '{0}'. List devices with: pactl list sources short")]
    DeviceNotFound(String),

    #[error("Audio stream error: {0}")]
    StreamError(String),

    #[error("Audio stream closed unexpectedly")]
    StreamClosed,

    #[error("Unsupported frame geometry: {samples} samples at {sample_rate} Hz (need 10/20/30 ms frames at 8/16/32/48 kHz)")]
    BadFrameGeometry { samples: usize, sample_rate: u32 },
}

/// Errors related to remote speech-to-text transcription
#[derive(Error, Debug)]
pub enum TranscribeError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("No API key configured. Set GROQ_API_KEY or [transcribe].api_key in the config file.")]
    MissingApiKey,

    #[error("Audio format error: {0}")]
    AudioFormat(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Remote server returned {status}: {message}")]
    RemoteError { status: u16, message: String },
}

/// Errors related to keystroke synthesis and the clipboard
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("ydotool daemon not running.\n  Start with: systemctl --user start ydotool\n  Enable at boot: systemctl --user enable ydotool")]
    YdotoolNotRunning,

    #[error("ydotool not found in PATH. Install via your package manager.")]
    YdotoolNotFound,

    #[error("wl-copy/wl-paste not found in PATH. Install wl-clipboard via your package manager.")]
    WlClipboardNotFound,

    #[error("No keycode mapping for character {0:?}")]
    UnmappedKey(char),

    #[error("Keystroke injection failed: {0}")]
    InjectionFailed(String),

    #[error("Clipboard access failed: {0}")]
    ClipboardFailed(String),
}

/// Result type alias using EchotypeError
pub type Result<T> = std::result::Result<T, EchotypeError>;

#[cfg(target_os = "linux")]
impl From<evdev::Error> for InputError {
    fn from(e: evdev::Error) -> Self {
        InputError::Evdev(e.to_string())
    }
}
