//! Audio capture module
//!
//! Defines the frame-pull contract the silence-gated capture loop runs
//! against, the capture result type, and WAV encoding of a finished
//! recording. The concrete cpal adapter lives in [`cpal_frames`].
//!
//! All audio is mono 16-bit at a fixed sample rate (16 kHz by default),
//! pulled in fixed-duration frames (30 ms = 480 samples) because the VAD
//! classifies frame by frame.

pub mod capture;
pub mod cpal_frames;

pub use capture::{capture, CaptureParams};

use crate::config::AudioConfig;
use crate::error::AudioError;
use std::io::Cursor;

/// One fixed-length block of mono 16-bit samples, tagged by the VAD.
#[derive(Debug, Clone)]
pub struct AudioFrame {
    pub samples: Vec<i16>,
    /// Verdict of the voice-activity classifier for this frame
    pub is_speech: bool,
}

/// Ordered frames forming one recording. Immutable once capture ends.
#[derive(Debug, Default)]
pub struct CaptureResult {
    frames: Vec<AudioFrame>,
    sample_rate: u32,
}

impl CaptureResult {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            frames: Vec::new(),
            sample_rate,
        }
    }

    pub(crate) fn push(&mut self, frame: AudioFrame) {
        self.frames.push(frame);
    }

    pub fn frames(&self) -> &[AudioFrame] {
        &self.frames
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of frames the VAD tagged as speech
    pub fn speech_frames(&self) -> usize {
        self.frames.iter().filter(|f| f.is_speech).count()
    }

    pub fn duration_secs(&self) -> f32 {
        let samples: usize = self.frames.iter().map(|f| f.samples.len()).sum();
        samples as f32 / self.sample_rate as f32
    }

    /// Encode the recording as a mono 16-bit PCM WAV byte buffer
    pub fn encode_wav(&self) -> Result<Vec<u8>, AudioError> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut buffer = Cursor::new(Vec::new());
        let mut writer = hound::WavWriter::new(&mut buffer, spec)
            .map_err(|e| AudioError::StreamError(format!("Failed to create WAV writer: {}", e)))?;

        for frame in &self.frames {
            for &sample in &frame.samples {
                writer
                    .write_sample(sample)
                    .map_err(|e| AudioError::StreamError(format!("Failed to write sample: {}", e)))?;
            }
        }

        writer
            .finalize()
            .map_err(|e| AudioError::StreamError(format!("Failed to finalize WAV: {}", e)))?;

        Ok(buffer.into_inner())
    }
}

/// Trait for pull-based audio frame sources
///
/// `next_frame` blocks until one full frame of samples is available; the
/// capture loop is paced by the hardware through this call.
pub trait FrameSource: Send {
    fn next_frame(&mut self) -> Result<Vec<i16>, AudioError>;
}

/// Opens a fresh frame source per session.
///
/// The microphone stream is opened when a session starts and torn down when
/// it ends, so the factory is the long-lived object, not the source.
pub trait FrameSourceFactory: Send + Sync {
    fn open(&self) -> Result<Box<dyn FrameSource>, AudioError>;
}

/// Factory function to create the frame source factory for the configured device
pub fn create_frame_source_factory(config: &AudioConfig) -> Box<dyn FrameSourceFactory> {
    Box::new(cpal_frames::CpalFrameSourceFactory::new(config))
}
