//! echotype - Push-to-talk voice dictation for Linux
//!
//! Echotype binds a keyboard shortcut to dictation: on the press edge of
//! the chord it opens the microphone, records until speech is followed by
//! silence, transcribes the audio through an OpenAI-compatible API, and
//! pastes the result into the focused application. Optionally the text
//! already on screen before the cursor is harvested and sent along as
//! context, biasing the transcription toward vocabulary in use.
//!
//! # Architecture
//!
//! - [`hotkey`] - grabbed-keyboard event tap and debounced chord detection
//! - [`audio`] - frame-pull microphone capture and WAV encoding
//! - [`vad`] - per-frame voice activity classification
//! - [`harvest`] - on-screen context recovery via select/copy
//! - [`prompt`] - context prompt assembly and budget truncation
//! - [`transcribe`] - remote speech-to-text client
//! - [`output`] - keystroke synthesis and clipboard adapters
//! - [`session`] - the per-dictation pipeline with guaranteed cleanup
//! - [`daemon`] - signal handling and the long-running event loop
//!
//! The keyboard tap, audio stream, subprocess calls and HTTP requests are
//! all blocking; sessions run on dedicated worker threads and only the
//! daemon's routing loop is async.

pub mod audio;
pub mod cli;
pub mod config;
pub mod daemon;
pub mod error;
pub mod harvest;
pub mod hotkey;
pub mod output;
pub mod prompt;
pub mod session;
pub mod state;
pub mod transcribe;
pub mod vad;

pub use config::Config;
pub use error::{EchotypeError, Result};
pub use session::SessionRunner;
pub use state::SessionGate;
