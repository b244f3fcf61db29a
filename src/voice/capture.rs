//! Audio capture from microphone

use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, FromSample, Sample, SampleFormat, SampleRate, SizedSample, Stream, StreamConfig};
use rubato::{FftFixedIn, Resampler};

use crate::{Error, Result};

/// Sample rate for audio capture (16kHz for speech)
pub const SAMPLE_RATE: u32 = 16000;

/// Input frames per resampler pass
const RESAMPLE_CHUNK: usize = 1024;

/// A pull-based stream of mono f32 samples
pub trait SampleSource {
    /// Samples per second
    fn sample_rate(&self) -> u32;

    /// Samples captured since the previous call, or `None` once the source is closed
    fn take_samples(&mut self) -> Option<Vec<f32>>;
}

/// Captures audio from the default input device
///
/// Samples are delivered as mono at [`SAMPLE_RATE`] whatever the device runs at.
pub struct AudioCapture {
    device: Device,
    config: StreamConfig,
    sample_format: SampleFormat,
    buffer: Arc<Mutex<Vec<f32>>>,
    resampler: Option<StreamResampler>,
    stream: Option<Stream>,
}

impl AudioCapture {
    /// Open the default input device, preferring 16kHz mono
    ///
    /// Falls back to the device's default config when it cannot run at 16kHz mono.
    ///
    /// # Errors
    ///
    /// Returns error if audio device cannot be opened
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();

        let device = host
            .default_input_device()
            .ok_or_else(|| Error::Audio("no input device available".to_string()))?;

        let preferred = device
            .supported_input_configs()
            .map_err(|e| Error::Audio(e.to_string()))?
            .find(|c| {
                c.channels() == 1
                    && c.min_sample_rate() <= SampleRate(SAMPLE_RATE)
                    && c.max_sample_rate() >= SampleRate(SAMPLE_RATE)
            })
            .map(|c| c.with_sample_rate(SampleRate(SAMPLE_RATE)));

        let supported = match preferred {
            Some(config) => config,
            None => device
                .default_input_config()
                .map_err(|e| Error::Audio(format!("no usable input config: {e}")))?,
        };

        let sample_format = supported.sample_format();
        let config = supported.config();
        let resampler = if config.sample_rate.0 == SAMPLE_RATE {
            None
        } else {
            Some(StreamResampler::new(config.sample_rate.0)?)
        };

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate = config.sample_rate.0,
            channels = config.channels,
            format = ?sample_format,
            "microphone opened"
        );

        Ok(Self {
            device,
            config,
            sample_format,
            buffer: Arc::new(Mutex::new(Vec::new())),
            resampler,
            stream: None,
        })
    }

    /// Start capturing audio
    ///
    /// # Errors
    ///
    /// Returns error if the input stream cannot be built or started
    pub fn start(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }

        let buffer = Arc::clone(&self.buffer);
        let stream = match self.sample_format {
            SampleFormat::F32 => build_stream::<f32>(&self.device, &self.config, buffer)?,
            SampleFormat::I16 => build_stream::<i16>(&self.device, &self.config, buffer)?,
            SampleFormat::U16 => build_stream::<u16>(&self.device, &self.config, buffer)?,
            other => {
                return Err(Error::Audio(format!("unsupported sample format {other:?}")));
            }
        };

        stream.play().map_err(|e| Error::Audio(e.to_string()))?;
        self.stream = Some(stream);

        tracing::debug!("audio capture started");
        Ok(())
    }

    /// Stop capturing audio
    pub fn stop(&mut self) {
        if self.stream.take().is_some() {
            tracing::debug!("audio capture stopped");
        }
    }

    /// Take the samples captured since the last call, as 16kHz mono
    #[must_use]
    pub fn take_buffer(&mut self) -> Vec<f32> {
        let raw = self
            .buffer
            .lock()
            .map(|mut buf| std::mem::take(&mut *buf))
            .unwrap_or_default();

        match &mut self.resampler {
            Some(resampler) => resampler.push(&raw),
            None => raw,
        }
    }

    /// Rate the device actually runs at
    #[must_use]
    pub const fn device_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    /// Channels the device actually delivers
    #[must_use]
    pub const fn device_channels(&self) -> u16 {
        self.config.channels
    }

    /// Check if currently capturing
    #[must_use]
    pub const fn is_capturing(&self) -> bool {
        self.stream.is_some()
    }
}

impl SampleSource for AudioCapture {
    fn sample_rate(&self) -> u32 {
        SAMPLE_RATE
    }

    fn take_samples(&mut self) -> Option<Vec<f32>> {
        self.is_capturing().then(|| self.take_buffer())
    }
}

impl Drop for AudioCapture {
    fn drop(&mut self) {
        self.stop();
    }
}

fn build_stream<T>(
    device: &Device,
    config: &StreamConfig,
    buffer: Arc<Mutex<Vec<f32>>>,
) -> Result<Stream>
where
    T: SizedSample,
    f32: FromSample<T>,
{
    let channels = usize::from(config.channels.max(1));

    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                if let Ok(mut buf) = buffer.lock() {
                    buf.extend(downmix(data, channels));
                }
            },
            |err| {
                tracing::error!(error = %err, "audio capture error");
            },
            None,
        )
        .map_err(|e| Error::Audio(e.to_string()))
}

/// Average interleaved frames down to mono f32
#[allow(clippy::cast_precision_loss)]
fn downmix<T>(data: &[T], channels: usize) -> impl Iterator<Item = f32> + '_
where
    T: Sample,
    f32: FromSample<T>,
{
    data.chunks_exact(channels).map(move |frame| {
        frame.iter().map(|s| s.to_sample::<f32>()).sum::<f32>() / channels as f32
    })
}

/// Streaming conversion from a device rate to [`SAMPLE_RATE`]
///
/// Leftover input shorter than one resampler pass is held for the next push.
pub struct StreamResampler {
    resampler: FftFixedIn<f32>,
    pending: Vec<f32>,
}

impl StreamResampler {
    /// # Errors
    ///
    /// Returns error if the rate pair is unsupported
    #[allow(clippy::cast_possible_truncation)]
    pub fn new(from_rate: u32) -> Result<Self> {
        let resampler = FftFixedIn::<f32>::new(
            from_rate as usize,
            SAMPLE_RATE as usize,
            RESAMPLE_CHUNK,
            2,
            1,
        )
        .map_err(|e| Error::Audio(format!("resampler init failed: {e}")))?;

        Ok(Self {
            resampler,
            pending: Vec::new(),
        })
    }

    /// Feed device-rate samples, returning whatever 16kHz output is ready
    pub fn push(&mut self, samples: &[f32]) -> Vec<f32> {
        self.pending.extend_from_slice(samples);

        let mut output = Vec::new();
        loop {
            let needed = self.resampler.input_frames_next();
            if self.pending.len() < needed {
                break;
            }

            let chunk: Vec<f32> = self.pending.drain(..needed).collect();
            match self.resampler.process(&[chunk], None) {
                Ok(resampled) => {
                    if let Some(mono) = resampled.first() {
                        output.extend_from_slice(mono);
                    }
                }
                Err(e) => tracing::warn!(error = %e, "resample failed, dropping chunk"),
            }
        }
        output
    }
}

/// Convert f32 samples to 16-bit PCM WAV bytes for STT APIs
///
/// # Errors
///
/// Returns error if WAV encoding fails
pub fn samples_to_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer =
            hound::WavWriter::new(&mut cursor, spec).map_err(|e| Error::Audio(e.to_string()))?;

        for &sample in samples {
            #[allow(clippy::cast_possible_truncation)]
            let sample_i16 = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
            writer
                .write_sample(sample_i16)
                .map_err(|e| Error::Audio(e.to_string()))?;
        }

        writer.finalize().map_err(|e| Error::Audio(e.to_string()))?;
    }

    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stereo_frames_average_to_mono() {
        let mono: Vec<f32> = downmix(&[0.2_f32, 0.4, -1.0, 1.0], 2).collect();
        assert_eq!(mono.len(), 2);
        assert!((mono[0] - 0.3).abs() < 1e-6);
        assert!(mono[1].abs() < 1e-6);
    }

    #[test]
    fn integer_samples_are_normalized() {
        let mono: Vec<f32> = downmix(&[i16::MAX, i16::MAX], 1).collect();
        assert!((mono[0] - 1.0).abs() < 1e-3);
    }

    #[test]
    fn resampler_converts_48k_to_16k() {
        let mut resampler = StreamResampler::new(48000).unwrap();

        // one second delivered in 10ms callbacks
        let mut output = Vec::new();
        for _ in 0..100 {
            output.extend(resampler.push(&[0.25; 480]));
        }

        assert!(output.len() > 15_000, "got {}", output.len());
        assert!(output.len() <= 16_000, "got {}", output.len());
    }
}
