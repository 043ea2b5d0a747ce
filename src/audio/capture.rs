//! Silence-gated audio capture
//!
//! Pulls fixed-duration frames from a [`FrameSource`], classifies each with
//! the VAD, and stops on its own once the speaker has been silent for the
//! configured duration. Every frame is retained, silence included, so the
//! recording keeps its natural trailing pause.
//!
//! There is deliberately no timeout while waiting for first speech: if the
//! caller never speaks, capture blocks until externally cancelled. The stop
//! signal is checked once per frame, before the read, so cancellation
//! latency is one frame duration.

use super::{AudioFrame, CaptureResult, FrameSource};
use crate::error::AudioError;
use crate::vad::VoiceActivity;

/// Parameters of one capture run
#[derive(Debug, Clone, Copy)]
pub struct CaptureParams {
    pub sample_rate: u32,
    /// Samples per frame (30 ms at 16 kHz = 480)
    pub frame_samples: usize,
    /// Seconds of continuous post-speech silence that end the recording
    pub silence_duration_secs: f64,
}

impl CaptureParams {
    /// Consecutive silent frames after which recording stops.
    ///
    /// The seconds-to-frames conversion truncates: 2.0 s at 16 kHz with
    /// 480-sample frames is 66 frames, not 67. The duration is f64 end to
    /// end; at f32 precision 0.51 s would land just under 17 frames and
    /// truncate differently.
    pub fn silence_frame_threshold(&self) -> u64 {
        (self.silence_duration_secs * self.sample_rate as f64 / self.frame_samples as f64) as u64
    }
}

/// Record until the speaker has stopped talking or `stop` reports true.
///
/// Stop condition: at least one speech frame has been seen AND the count of
/// consecutive silent frames since the last speech frame exceeds
/// [`CaptureParams::silence_frame_threshold`]. The `stop` signal is checked
/// before every frame read and overrides the VAD state.
pub fn capture(
    source: &mut dyn FrameSource,
    vad: &dyn VoiceActivity,
    params: &CaptureParams,
    stop: &dyn Fn() -> bool,
) -> Result<CaptureResult, AudioError> {
    let threshold = params.silence_frame_threshold();
    let mut result = CaptureResult::new(params.sample_rate);
    let mut silent_frames: u64 = 0;
    let mut heard_speech = false;

    tracing::debug!(
        "Capture started (frame={} samples, silence threshold={} frames)",
        params.frame_samples,
        threshold
    );

    loop {
        if stop() {
            tracing::debug!("Capture stop requested externally");
            break;
        }

        let samples = source.next_frame()?;
        let is_speech = vad.is_speech(&samples, params.sample_rate);

        if is_speech {
            silent_frames = 0;
            heard_speech = true;
        } else {
            silent_frames += 1;
        }

        result.push(AudioFrame { samples, is_speech });

        if heard_speech && silent_frames > threshold {
            break;
        }
    }

    tracing::info!(
        "Capture finished: {:.2}s, {} frames ({} speech)",
        result.duration_secs(),
        result.frames().len(),
        result.speech_frames()
    );

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    /// Frame source that replays a script of speech/silence frames.
    /// Panics if read past the end, which doubles as a "stopped in time"
    /// assertion.
    struct ScriptedSource {
        script: Vec<bool>,
        pos: usize,
    }

    impl ScriptedSource {
        fn new(script: Vec<bool>) -> Self {
            Self { script, pos: 0 }
        }
    }

    impl FrameSource for ScriptedSource {
        fn next_frame(&mut self) -> Result<Vec<i16>, AudioError> {
            let is_speech = *self
                .script
                .get(self.pos)
                .expect("capture read past the scripted frames");
            self.pos += 1;
            // Loud frame for speech, flat frame for silence; the scripted
            // VAD below keys off the first sample.
            Ok(vec![if is_speech { 10_000 } else { 0 }; 480])
        }
    }

    struct FirstSampleVad;

    impl VoiceActivity for FirstSampleVad {
        fn is_speech(&self, frame: &[i16], _sample_rate: u32) -> bool {
            frame.first().map(|&s| s != 0).unwrap_or(false)
        }
    }

    fn params(silence_duration_secs: f64) -> CaptureParams {
        CaptureParams {
            sample_rate: 16_000,
            frame_samples: 480,
            silence_duration_secs,
        }
    }

    fn script(groups: &[(usize, bool)]) -> Vec<bool> {
        groups
            .iter()
            .flat_map(|&(n, v)| std::iter::repeat(v).take(n))
            .collect()
    }

    #[test]
    fn test_silence_threshold_truncates() {
        assert_eq!(params(2.0).silence_frame_threshold(), 66); // 66.67 -> 66
        assert_eq!(params(1.0).silence_frame_threshold(), 33); // 33.33 -> 33
        // Needs the f64 duration: 0.51f32 is ~0.50999999, which would give
        // 16.9999968 and truncate to 16 instead of 17.
        assert_eq!(params(0.51).silence_frame_threshold(), 17);
    }

    #[test]
    fn test_stops_after_silence_following_speech() {
        // 5 silent, 3 speech, then silence. Threshold 66 => stop on the
        // 67th consecutive silent frame after the last speech frame.
        let mut source = ScriptedSource::new(script(&[(5, false), (3, true), (67, false)]));
        let result = capture(&mut source, &FirstSampleVad, &params(2.0), &|| false).unwrap();

        assert_eq!(result.frames().len(), 5 + 3 + 67);
        assert_eq!(result.speech_frames(), 3);
        // Leading silence is retained even though it never counts toward
        // stopping (heard_speech gates stopping, not inclusion).
        assert!(!result.frames()[0].is_speech);
    }

    #[test]
    fn test_never_stops_before_first_speech() {
        // All-silent stream: the VAD alone must not end capture. Stop it
        // externally after 200 frames and check every frame was kept.
        let mut source = ScriptedSource::new(script(&[(300, false)]));
        let reads = Cell::new(0u32);
        let stop = move || {
            reads.set(reads.get() + 1);
            reads.get() > 200
        };
        let result = capture(&mut source, &FirstSampleVad, &params(1.0), &stop).unwrap();
        assert_eq!(result.frames().len(), 200);
        assert_eq!(result.speech_frames(), 0);
    }

    #[test]
    fn test_cancel_before_first_read_yields_empty_result() {
        let mut source = ScriptedSource::new(vec![]);
        let result = capture(&mut source, &FirstSampleVad, &params(2.0), &|| true).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_speech_resets_silence_counter() {
        // Silence runs shorter than the threshold interleaved with speech
        // must not stop capture early.
        let mut source = ScriptedSource::new(script(&[
            (2, true),
            (30, false),
            (1, true),
            (30, false),
            (1, true),
            (34, false),
        ]));
        let result = capture(&mut source, &FirstSampleVad, &params(1.0), &|| false).unwrap();
        // threshold = 33, final run of 34 silent frames ends it
        assert_eq!(result.frames().len(), 2 + 30 + 1 + 30 + 1 + 34);
    }

    #[test]
    fn test_source_error_propagates() {
        struct FailingSource;
        impl FrameSource for FailingSource {
            fn next_frame(&mut self) -> Result<Vec<i16>, AudioError> {
                Err(AudioError::StreamClosed)
            }
        }
        let err = capture(&mut FailingSource, &FirstSampleVad, &params(2.0), &|| false);
        assert!(matches!(err, Err(AudioError::StreamClosed)));
    }
}
