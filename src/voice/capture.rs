//! Microphone capture
//!
//! Mono 16 kHz capture into a shared buffer that callers drain in chunks.
//! The cpal stream is released when the capture value is dropped, so
//! device ownership follows scope regardless of how the caller exits.

use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, Stream, StreamConfig};

use crate::{Error, Result};

/// Capture sample rate (16 kHz for speech)
pub const SAMPLE_RATE: u32 = 16_000;

/// Captures audio from the default input device
pub struct MicCapture {
    config: StreamConfig,
    shared: Arc<Mutex<Vec<f32>>>,
    stream: Option<Stream>,
}

impl MicCapture {
    /// Open the default input device
    ///
    /// # Errors
    ///
    /// Returns error if no device supports mono capture at 16 kHz
    pub fn open() -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| Error::Audio("no input device available".to_string()))?;

        let config = device
            .supported_input_configs()
            .map_err(|e| Error::Audio(e.to_string()))?
            .find(|c| {
                c.channels() == 1
                    && c.min_sample_rate() <= SampleRate(SAMPLE_RATE)
                    && c.max_sample_rate() >= SampleRate(SAMPLE_RATE)
            })
            .ok_or_else(|| Error::Audio("no mono 16kHz input config".to_string()))?
            .with_sample_rate(SampleRate(SAMPLE_RATE))
            .config();

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate = SAMPLE_RATE,
            "microphone opened"
        );

        Ok(Self {
            config,
            shared: Arc::new(Mutex::new(Vec::new())),
            stream: None,
        })
    }

    /// Begin streaming samples into the buffer
    ///
    /// # Errors
    ///
    /// Returns error if the input stream cannot be built or started
    pub fn start(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }

        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| Error::Audio("no input device".to_string()))?;

        let shared = Arc::clone(&self.shared);
        let stream = device
            .build_input_stream(
                &self.config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if let Ok(mut buf) = shared.lock() {
                        buf.extend_from_slice(data);
                    }
                },
                |err| {
                    tracing::error!(error = %err, "microphone stream error");
                },
                None,
            )
            .map_err(|e| Error::Audio(e.to_string()))?;

        stream.play().map_err(|e| Error::Audio(e.to_string()))?;
        self.stream = Some(stream);
        Ok(())
    }

    /// Stop streaming and release the device
    pub fn stop(&mut self) {
        self.stream.take();
    }

    /// Take everything captured since the last drain
    #[must_use]
    pub fn drain(&self) -> Vec<f32> {
        self.shared
            .lock()
            .map(|mut buf| std::mem::take(&mut *buf))
            .unwrap_or_default()
    }
}

/// Root-mean-square energy of a sample window
#[must_use]
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let mean = samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32;
    mean.sqrt()
}

/// Encode f32 samples as 16-bit PCM WAV bytes
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
        let mut writer = hound::WavWriter::new(&mut cursor, spec)
            .map_err(|e| Error::Audio(e.to_string()))?;
        for &sample in samples {
            #[allow(clippy::cast_possible_truncation)]
            let quantized = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
            writer
                .write_sample(quantized)
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
    fn rms_of_silence_is_zero() {
        assert!(rms(&[0.0; 256]) < 1e-6);
        assert!(rms(&[]) < 1e-6);
    }

    #[test]
    fn rms_of_constant_signal_is_its_amplitude() {
        let level = rms(&[0.5; 256]);
        assert!((level - 0.5).abs() < 1e-3);
    }

    #[test]
    fn wav_encoding_produces_riff_header() {
        let wav = samples_to_wav(&[0.0, 0.25, -0.25, 1.0], SAMPLE_RATE).unwrap();
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        // 44-byte header + 2 bytes per sample
        assert_eq!(wav.len(), 44 + 8);
    }
}
