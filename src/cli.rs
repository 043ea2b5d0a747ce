// Command-line interface definitions for echotype
//
// This module is separate and free of crate-internal imports so build.rs
// can include it for man page generation.

use clap::{Parser, Subcommand};

/// Push-to-talk voice dictation for Linux
#[derive(Parser, Debug)]
#[command(name = "echotype")]
#[command(author, version)]
#[command(about = "Push-to-talk voice dictation for Wayland")]
#[command(long_about = "Echotype turns a keyboard shortcut into dictation: press the chord, \
speak, pause, and the transcription is pasted into the focused application.

Setup:
  1. Add your user to the 'input' group (keyboard tap)
  2. Start the ydotool daemon: systemctl --user start ydotool
  3. Set GROQ_API_KEY in your environment
  4. Run: echotype daemon")]
pub struct Cli {
    /// Path to config file (default: ~/.config/echotype/config.toml)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<std::path::PathBuf>,

    /// Increase logging verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long)]
    pub quiet: bool,

    /// Override the transcription model
    #[arg(long, value_name = "MODEL")]
    pub model: Option<String>,

    /// Override the shortcut trigger key (e.g. "V", "ScrollLock", "F13")
    #[arg(long, value_name = "KEY")]
    pub hotkey: Option<String>,

    /// Static prompt biasing transcription vocabulary
    #[arg(long, value_name = "TEXT")]
    pub initial_prompt: Option<String>,

    /// Harvest on-screen context before recording
    #[arg(long)]
    pub retrieve_context: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the dictation daemon (default)
    Daemon,

    /// Print the effective configuration as TOML
    Config,

    /// Transcribe a WAV file and print the text
    Transcribe {
        /// Path to a 16 kHz mono 16-bit WAV file
        file: std::path::PathBuf,
    },
}
