//! wl-clipboard-based clipboard access
//!
//! Uses wl-copy and wl-paste, which work on all Wayland compositors.
//!
//! Requires: wl-clipboard package installed

use super::Clipboard;
use crate::error::OutputError;
use std::io::Write;
use std::process::{Command, Stdio};

/// Clipboard adapter shelling out to wl-copy / wl-paste
pub struct WlClipboard;

impl WlClipboard {
    pub fn new() -> Self {
        Self
    }
}

impl Default for WlClipboard {
    fn default() -> Self {
        Self::new()
    }
}

fn map_spawn_err(e: std::io::Error) -> OutputError {
    if e.kind() == std::io::ErrorKind::NotFound {
        OutputError::WlClipboardNotFound
    } else {
        OutputError::ClipboardFailed(e.to_string())
    }
}

impl Clipboard for WlClipboard {
    fn read(&self) -> Result<String, OutputError> {
        let output = Command::new("wl-paste")
            .arg("--no-newline")
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .output()
            .map_err(map_spawn_err)?;

        // wl-paste exits non-zero when the clipboard is empty; that is a
        // normal outcome for the harvester, not an error.
        if !output.status.success() {
            return Ok(String::new());
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn write(&self, text: &str) -> Result<(), OutputError> {
        let mut child = Command::new("wl-copy")
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(map_spawn_err)?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(text.as_bytes())
                .map_err(|e| OutputError::ClipboardFailed(e.to_string()))?;
            // Close stdin to signal EOF
            drop(stdin);
        }

        let status = child
            .wait()
            .map_err(|e| OutputError::ClipboardFailed(e.to_string()))?;

        if !status.success() {
            return Err(OutputError::ClipboardFailed(
                "wl-copy exited with error".to_string(),
            ));
        }

        Ok(())
    }

    fn clear(&self) -> Result<(), OutputError> {
        let status = Command::new("wl-copy")
            .arg("--clear")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(map_spawn_err)?;

        if !status.success() {
            return Err(OutputError::ClipboardFailed(
                "wl-copy --clear exited with error".to_string(),
            ));
        }

        Ok(())
    }
}
