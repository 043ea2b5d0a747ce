//! cpal-based frame source
//!
//! Uses the cpal crate for cross-platform audio input. Works with PipeWire,
//! PulseAudio, and ALSA backends.
//!
//! Note: cpal::Stream is not Send, so the stream lives on a dedicated thread
//! and samples cross to the capture loop over a channel. The device may run
//! at a different rate or channel count than the 16 kHz mono the VAD needs;
//! the stream callback downmixes and linearly resamples before sending.

use super::{FrameSource, FrameSourceFactory};
use crate::config::AudioConfig;
use crate::error::AudioError;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

/// Long-lived factory; opens a fresh microphone stream per session
pub struct CpalFrameSourceFactory {
    config: AudioConfig,
}

impl CpalFrameSourceFactory {
    pub fn new(config: &AudioConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }
}

impl FrameSourceFactory for CpalFrameSourceFactory {
    fn open(&self) -> Result<Box<dyn FrameSource>, AudioError> {
        Ok(Box::new(CpalFrameSource::open(&self.config)?))
    }
}

/// One open microphone stream, consumed frame by frame
pub struct CpalFrameSource {
    rx: mpsc::Receiver<Vec<i16>>,
    pending: VecDeque<i16>,
    frame_samples: usize,
    stop: Arc<AtomicBool>,
}

impl CpalFrameSource {
    pub fn open(config: &AudioConfig) -> Result<Self, AudioError> {
        let frame_samples = config.frame_samples();
        let (tx, rx) = mpsc::channel::<Vec<i16>>();
        let (ready_tx, ready_rx) = mpsc::channel::<Result<(), AudioError>>();
        let stop = Arc::new(AtomicBool::new(false));

        let device_name = config.device.clone();
        let target_rate = config.sample_rate;
        let thread_stop = stop.clone();

        // The stream must be created and dropped on the same thread.
        thread::spawn(move || {
            let stream = match build_stream(&device_name, target_rate, tx) {
                Ok(stream) => {
                    let _ = ready_tx.send(Ok(()));
                    stream
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };

            if let Err(e) = stream.play() {
                tracing::error!("Failed to start audio stream: {}", e);
                return;
            }

            while !thread_stop.load(Ordering::Acquire) {
                thread::sleep(Duration::from_millis(10));
            }
            drop(stream);
            tracing::debug!("Audio stream thread exiting");
        });

        ready_rx
            .recv()
            .map_err(|_| AudioError::StreamClosed)
            .and_then(|r| r)?;

        Ok(Self {
            rx,
            pending: VecDeque::new(),
            frame_samples,
            stop,
        })
    }
}

impl FrameSource for CpalFrameSource {
    fn next_frame(&mut self) -> Result<Vec<i16>, AudioError> {
        while self.pending.len() < self.frame_samples {
            let chunk = self.rx.recv().map_err(|_| AudioError::StreamClosed)?;
            self.pending.extend(chunk);
        }
        Ok(self.pending.drain(..self.frame_samples).collect())
    }
}

impl Drop for CpalFrameSource {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
    }
}

/// Find an audio input device by name.
///
/// "default" uses the system default; anything else matches exactly first,
/// then as a case-insensitive substring, so both full cpal names and
/// PipeWire short names work.
fn find_device(host: &cpal::Host, device_name: &str) -> Result<cpal::Device, AudioError> {
    if device_name == "default" {
        return host
            .default_input_device()
            .ok_or_else(|| AudioError::DeviceNotFound("default".to_string()));
    }

    let devices: Vec<cpal::Device> = host
        .input_devices()
        .map_err(|e| AudioError::Connection(e.to_string()))?
        .collect();

    let search_lower = device_name.to_lowercase();

    for device in &devices {
        if device.name().map(|n| n == device_name).unwrap_or(false) {
            return find_again(host, device_name);
        }
    }
    for device in &devices {
        if let Ok(name) = device.name() {
            if name.to_lowercase().contains(&search_lower) {
                tracing::debug!(
                    "Found audio device by substring match: {} (searched for: {})",
                    name,
                    device_name
                );
                return find_again(host, &name);
            }
        }
    }

    Err(AudioError::DeviceNotFound(device_name.to_string()))
}

// cpal::Device is not Clone; re-run the iterator to return an owned handle.
fn find_again(host: &cpal::Host, exact_name: &str) -> Result<cpal::Device, AudioError> {
    host.input_devices()
        .map_err(|e| AudioError::Connection(e.to_string()))?
        .find(|d| d.name().map(|n| n == exact_name).unwrap_or(false))
        .ok_or_else(|| AudioError::DeviceNotFound(exact_name.to_string()))
}

fn build_stream(
    device_name: &str,
    target_rate: u32,
    tx: mpsc::Sender<Vec<i16>>,
) -> Result<cpal::Stream, AudioError> {
    let host = cpal::default_host();
    let device = find_device(&host, device_name)?;

    let supported = device
        .default_input_config()
        .map_err(|e| AudioError::Connection(e.to_string()))?;
    let source_rate = supported.sample_rate().0;
    let source_channels = supported.channels() as usize;

    tracing::debug!(
        "Opening input stream: {} ch @ {} Hz ({:?}), resampling to {} Hz mono",
        source_channels,
        source_rate,
        supported.sample_format(),
        target_rate
    );

    let stream_config: cpal::StreamConfig = supported.config();
    let resampler = Resampler::new(source_rate, target_rate);

    let stream = match supported.sample_format() {
        cpal::SampleFormat::F32 => {
            build_typed_stream::<f32>(&device, &stream_config, source_channels, resampler, tx)
        }
        cpal::SampleFormat::I16 => {
            build_typed_stream::<i16>(&device, &stream_config, source_channels, resampler, tx)
        }
        cpal::SampleFormat::U16 => {
            build_typed_stream::<u16>(&device, &stream_config, source_channels, resampler, tx)
        }
        other => {
            return Err(AudioError::Connection(format!(
                "Unsupported sample format: {:?}",
                other
            )))
        }
    }
    .map_err(|e| AudioError::StreamError(e.to_string()))?;

    Ok(stream)
}

fn build_typed_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    channels: usize,
    mut resampler: Resampler,
    tx: mpsc::Sender<Vec<i16>>,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: cpal::SizedSample,
    f32: cpal::FromSample<T>,
{
    device.build_input_stream(
        config,
        move |data: &[T], _| {
            let mono = downmix::<T>(data, channels);
            let out = resampler.process(&mono);
            if !out.is_empty() {
                let _ = tx.send(out);
            }
        },
        |e| tracing::error!("Audio stream error: {}", e),
        None,
    )
}

/// Average interleaved channels down to mono f32
fn downmix<T>(data: &[T], channels: usize) -> Vec<f32>
where
    T: cpal::SizedSample,
    f32: cpal::FromSample<T>,
{
    use cpal::Sample;
    data.chunks_exact(channels.max(1))
        .map(|frame| {
            let sum: f32 = frame.iter().map(|&s| f32::from_sample(s)).sum();
            sum / frame.len() as f32
        })
        .collect()
}

/// Streaming linear resampler with state carried across callback chunks
struct Resampler {
    step: f64,
    /// Fractional read position relative to `prev`
    pos: f64,
    /// Last sample of the previous chunk, for interpolation at the seam
    prev: f32,
    primed: bool,
}

impl Resampler {
    fn new(source_rate: u32, target_rate: u32) -> Self {
        Self {
            step: source_rate as f64 / target_rate as f64,
            pos: 0.0,
            prev: 0.0,
            primed: false,
        }
    }

    fn process(&mut self, input: &[f32]) -> Vec<i16> {
        if input.is_empty() {
            return Vec::new();
        }
        if self.step == 1.0 {
            return input.iter().map(|&s| to_i16(s)).collect();
        }

        if !self.primed {
            self.prev = input[0];
            self.primed = true;
        }

        // Positions are indexed with -1.0 meaning `prev`, 0.0 meaning input[0].
        let mut out = Vec::with_capacity((input.len() as f64 / self.step) as usize + 1);
        while self.pos < (input.len() - 1) as f64 {
            let (a, b, frac) = if self.pos < 0.0 {
                (self.prev, input[0], self.pos + 1.0)
            } else {
                let i = self.pos as usize;
                (input[i], input[i + 1], self.pos - i as f64)
            };
            out.push(to_i16(a + (b - a) * frac as f32));
            self.pos += self.step;
        }
        self.pos -= (input.len() - 1) as f64 + 1.0;
        self.prev = input[input.len() - 1];
        out
    }
}

fn to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
}
