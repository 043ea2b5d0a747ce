//! Voice Activity Detection (VAD) module
//!
//! Classifies individual audio frames as speech or silence. The capture loop
//! uses this per-frame verdict to decide when the speaker has stopped
//! talking.
//!
//! Frame geometry is constrained the way WebRTC-style detectors require it:
//! frames must be 10, 20, or 30 ms long at 8, 16, 32, or 48 kHz.

mod energy;

pub use energy::EnergyVad;

use crate::config::VadConfig;
use crate::error::AudioError;

/// Trait for per-frame voice activity classification
pub trait VoiceActivity: Send + Sync {
    /// Classify one frame of mono 16-bit samples as speech or silence.
    ///
    /// Implementations may assume the frame geometry has been validated with
    /// [`validate_frame`].
    fn is_speech(&self, frame: &[i16], sample_rate: u32) -> bool;
}

/// Sample rates accepted by the frame-based detectors.
const SUPPORTED_RATES: [u32; 4] = [8_000, 16_000, 32_000, 48_000];

/// Frame durations (ms) accepted by the frame-based detectors.
const SUPPORTED_FRAME_MS: [u32; 3] = [10, 20, 30];

/// Check that a frame length is a valid 10/20/30 ms frame at the given rate.
pub fn validate_frame(samples: usize, sample_rate: u32) -> Result<(), AudioError> {
    if SUPPORTED_RATES.contains(&sample_rate) {
        for ms in SUPPORTED_FRAME_MS {
            if samples as u64 == (sample_rate as u64 * ms as u64) / 1000 {
                return Ok(());
            }
        }
    }
    Err(AudioError::BadFrameGeometry {
        samples,
        sample_rate,
    })
}

/// Create a VAD instance based on configuration
pub fn create_vad(config: &VadConfig) -> Box<dyn VoiceActivity> {
    Box::new(EnergyVad::new(config))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_frame_accepts_standard_geometries() {
        // 30ms at 16kHz: 480 samples (the capture default)
        assert!(validate_frame(480, 16_000).is_ok());
        // 10ms at 8kHz
        assert!(validate_frame(80, 8_000).is_ok());
        // 20ms at 48kHz
        assert!(validate_frame(960, 48_000).is_ok());
    }

    #[test]
    fn test_validate_frame_rejects_bad_geometries() {
        assert!(validate_frame(512, 16_000).is_err());
        assert!(validate_frame(480, 44_100).is_err());
        assert!(validate_frame(0, 16_000).is_err());
    }
}
