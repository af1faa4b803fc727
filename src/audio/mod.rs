/// Audio output using cpal
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SizedSample};
use thiserror::Error;

use crate::sequencer::engine::Engine;

pub mod voice;

pub use voice::Voice;

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("no audio output device available")]
    NoDevice,
    #[error("unsupported sample format {0:?}")]
    UnsupportedFormat(cpal::SampleFormat),
    #[error("failed to query output config: {0}")]
    Config(#[from] cpal::DefaultStreamConfigError),
    #[error("failed to build audio stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),
    #[error("failed to start audio stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),
}

/// Owns the cpal stream; the engine lives inside the stream callback.
/// Dropping this stops audio.
pub struct AudioOutput {
    _stream: cpal::Stream,
    sample_rate: f32,
}

impl AudioOutput {
    /// Open the default output device, build the engine at the device sample
    /// rate via `build`, and start streaming.
    pub fn start<F>(build: F) -> Result<Self, AudioError>
    where
        F: FnOnce(f32) -> Engine,
    {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(AudioError::NoDevice)?;
        let supported = device.default_output_config()?;

        let sample_rate = supported.sample_rate().0 as f32;
        let channels = supported.channels() as usize;
        let sample_format = supported.sample_format();
        let config: cpal::StreamConfig = supported.into();

        log::info!(
            "audio device: {}",
            device.name().unwrap_or_else(|_| "unknown".to_string())
        );
        log::info!(
            "sample rate {} Hz, {} channels, format {:?}",
            sample_rate,
            channels,
            sample_format
        );

        let engine = build(sample_rate);

        let stream = match sample_format {
            cpal::SampleFormat::F32 => Self::build_stream::<f32>(&device, &config, channels, engine),
            cpal::SampleFormat::I16 => Self::build_stream::<i16>(&device, &config, channels, engine),
            cpal::SampleFormat::U16 => Self::build_stream::<u16>(&device, &config, channels, engine),
            other => return Err(AudioError::UnsupportedFormat(other)),
        }?;
        stream.play()?;

        Ok(Self {
            _stream: stream,
            sample_rate,
        })
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// The engine renders mono; the mono block is written to every channel
    /// of the interleaved output frame, converted to the device format.
    fn build_stream<T>(
        device: &cpal::Device,
        config: &cpal::StreamConfig,
        channels: usize,
        mut engine: Engine,
    ) -> Result<cpal::Stream, AudioError>
    where
        T: SizedSample + FromSample<f32>,
    {
        // Scratch buffer reused across callbacks; grows once to the device
        // block size, then the audio path is allocation-free.
        let mut mono: Vec<f32> = Vec::new();

        let stream = device.build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                let frames = data.len() / channels;
                if mono.len() < frames {
                    mono.resize(frames, 0.0);
                }
                engine.process(&mut mono[..frames]);

                for (frame, value) in data.chunks_mut(channels).zip(&mono) {
                    let converted = T::from_sample(*value);
                    for sample in frame.iter_mut() {
                        *sample = converted;
                    }
                }
            },
            |err| log::error!("audio stream error: {}", err),
            None,
        )?;

        Ok(stream)
    }
}
