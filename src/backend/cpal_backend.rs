//! OS audio output via cpal.
//!
//! cpal binds the build target's audio service (CoreAudio on macOS, WASAPI
//! on Windows, ALSA on Linux) and owns the render callback. The callback's
//! only job is draining the sample ring into the device buffer, converting
//! canonical samples to whatever device format was negotiated.

use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SizedSample};

use crate::error::{AuricaError, Result};
use crate::ring::SampleRing;
use crate::sample::{Sample, SILENCE};

use super::{Backend, StreamRequest};

const FALLBACK_FRAMES: usize = 512;

pub struct CpalBackend {
    stream: Option<cpal::Stream>,
    ring: Arc<SampleRing>,
    sample_rate: u32,
    channels: u16,
    bits: u16,
    buffer_frames: usize,
}

impl CpalBackend {
    pub fn new() -> Self {
        Self {
            stream: None,
            ring: Arc::new(SampleRing::new(0)),
            sample_rate: 0,
            channels: 0,
            bits: 0,
            buffer_frames: 0,
        }
    }

    /// Prefer a device config that matches the request natively; fall back
    /// to the device default otherwise.
    fn pick_config(
        device: &cpal::Device,
        request: &StreamRequest,
    ) -> Result<cpal::SupportedStreamConfig> {
        let default_config = device.default_output_config().map_err(|e| {
            AuricaError::Device(format!("failed to query default output config: {e}"))
        })?;

        let wanted_rate = cpal::SampleRate(request.sample_rate);
        if let Ok(mut ranges) = device.supported_output_configs() {
            if let Some(range) = ranges.find(|range| {
                range.channels() == request.channels
                    && range.min_sample_rate() <= wanted_rate
                    && range.max_sample_rate() >= wanted_rate
            }) {
                return Ok(range.with_sample_rate(wanted_rate));
            }
        }

        log::warn!(
            "requested {} Hz / {} ch not supported natively; using device default {} Hz / {} ch",
            request.sample_rate,
            request.channels,
            default_config.sample_rate().0,
            default_config.channels()
        );
        Ok(default_config)
    }

    fn build_stream<T>(&self, device: &cpal::Device, config: &cpal::StreamConfig) -> Result<cpal::Stream>
    where
        T: SizedSample + FromSample<Sample>,
    {
        let ring = self.ring.clone();
        let mut scratch: Vec<Sample> = Vec::new();

        let stream = device
            .build_output_stream(
                config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    scratch.resize(data.len(), SILENCE);
                    ring.drain(&mut scratch);
                    for (slot, sample) in data.iter_mut().zip(&scratch) {
                        *slot = T::from_sample(*sample);
                    }
                },
                move |err| {
                    log::error!("audio stream error: {err}");
                },
                None,
            )
            .map_err(|e| AuricaError::Device(format!("failed to build output stream: {e}")))?;

        Ok(stream)
    }
}

impl Default for CpalBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for CpalBackend {
    fn startup(&mut self, request: &StreamRequest) -> Result<()> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or_else(|| {
            AuricaError::Device("no default output device available".into())
        })?;

        let supported = Self::pick_config(&device, request)?;
        let sample_format = supported.sample_format();

        let (buffer_size, buffer_frames) = match supported.buffer_size() {
            cpal::SupportedBufferSize::Range { min, max } => {
                let frames = (FALLBACK_FRAMES as u32).clamp(*min, *max);
                (cpal::BufferSize::Fixed(frames), frames as usize)
            }
            cpal::SupportedBufferSize::Unknown => (cpal::BufferSize::Default, FALLBACK_FRAMES),
        };

        let config = cpal::StreamConfig {
            channels: supported.channels(),
            sample_rate: supported.sample_rate(),
            buffer_size,
        };

        self.sample_rate = config.sample_rate.0;
        self.channels = config.channels;
        self.bits = (sample_format.sample_size() * 8) as u16;
        self.buffer_frames = buffer_frames;
        self.ring = Arc::new(SampleRing::for_stream(self.sample_rate, self.channels));

        if request.exclusive_if_possible {
            log::info!("exclusive mode requested; the shared OS mixer is used instead");
        }

        let stream = match sample_format {
            cpal::SampleFormat::F32 => self.build_stream::<f32>(&device, &config)?,
            cpal::SampleFormat::I16 => self.build_stream::<i16>(&device, &config)?,
            cpal::SampleFormat::U16 => self.build_stream::<u16>(&device, &config)?,
            other => {
                return Err(AuricaError::Format(format!(
                    "unsupported device sample format {other:?}"
                )));
            }
        };

        stream
            .play()
            .map_err(|e| AuricaError::Device(format!("failed to start stream: {e}")))?;
        self.stream = Some(stream);

        if request.verbose {
            log::info!(
                "{}: {} Hz, {} channels, {} bits, {} frames per device buffer",
                self.name(),
                self.sample_rate,
                self.channels,
                self.bits,
                self.buffer_frames
            );
        }

        Ok(())
    }

    fn shutdown(&mut self) {
        if let Some(stream) = self.stream.take() {
            drop(stream);
            log::debug!("audio stream stopped");
        }
        self.ring.clear();
    }

    fn ring(&self) -> Arc<SampleRing> {
        self.ring.clone()
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn num_channels(&self) -> u16 {
        self.channels
    }

    fn bit_format(&self) -> u16 {
        self.bits
    }

    fn buffer_size_frames(&self) -> usize {
        self.buffer_frames
    }

    fn name(&self) -> &'static str {
        if cfg!(target_os = "macos") {
            "macOS : CoreAudio"
        } else if cfg!(target_os = "windows") {
            "Windows : WASAPI"
        } else if cfg!(target_os = "linux") {
            "Linux : ALSA"
        } else {
            "cpal"
        }
    }
}
