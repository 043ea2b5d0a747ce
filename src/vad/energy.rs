//! Energy-based Voice Activity Detection
//!
//! A simple but effective VAD that classifies a frame as speech when its RMS
//! energy exceeds a threshold. No model download required, and good enough
//! to detect the trailing pause that ends a dictation.

use crate::config::VadConfig;

use super::VoiceActivity;

/// Energy-based VAD using RMS amplitude analysis
pub struct EnergyVad {
    /// RMS energy threshold; frames at or above it are speech
    threshold: f32,
}

impl EnergyVad {
    /// Create a new energy-based VAD instance
    pub fn new(config: &VadConfig) -> Self {
        Self {
            threshold: map_sensitivity_to_energy(config.sensitivity),
        }
    }

    /// RMS of a frame, normalized to [0.0, 1.0]
    fn calculate_rms(frame: &[i16]) -> f32 {
        if frame.is_empty() {
            return 0.0;
        }
        let sum_squares: f64 = frame
            .iter()
            .map(|&s| {
                let x = s as f64 / i16::MAX as f64;
                x * x
            })
            .sum();
        (sum_squares / frame.len() as f64).sqrt() as f32
    }
}

/// Map config sensitivity (0.0-1.0) to an RMS energy threshold
///
/// - 0.0 = very sensitive (threshold ~0.001, detects quiet whispers)
/// - 0.5 = balanced (threshold ~0.01, filters room noise)
/// - 1.0 = aggressive (threshold ~0.1, requires louder speech)
fn map_sensitivity_to_energy(sensitivity: f32) -> f32 {
    let t = sensitivity.clamp(0.0, 1.0);
    0.001 * (100.0_f32).powf(t)
}

impl VoiceActivity for EnergyVad {
    fn is_speech(&self, frame: &[i16], _sample_rate: u32) -> bool {
        let rms = Self::calculate_rms(frame);
        let speech = rms >= self.threshold;
        tracing::trace!("frame rms={:.4} threshold={:.4} speech={}", rms, self.threshold, speech);
        speech
    }
}
