//! Speech rendering for the avatar client
//!
//! Turns a line of text into the payload the browser plays: synthesized
//! audio, sped up by a fixed factor, re-encoded as WAV, base64-wrapped, and
//! paired with a viseme timeline and the playback duration the orchestrator
//! paces itself by.

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

use super::capture::samples_to_wav;
use super::tts::Synthesize;
use super::viseme::{self, VisemeCue};
use crate::{Error, Result};

/// Resampler chunk size
const RESAMPLE_CHUNK: usize = 1024;

/// Everything the client needs to play one spoken line
#[derive(Debug, Clone)]
pub struct SpeechPayload {
    /// The spoken text
    pub text: String,
    /// Base64-encoded WAV audio
    pub audio: String,
    /// Avatar animation tag
    pub animation: String,
    /// Avatar facial-expression tag
    pub expression: String,
    /// Mouth cues synchronized to the audio
    pub visemes: Vec<VisemeCue>,
    /// Playback duration of the rendered audio
    pub duration: Duration,
}

/// Renders text into a speech payload
#[async_trait]
pub trait RenderSpeech: Send + Sync {
    /// Synthesize and package one spoken line
    async fn render(&self, text: &str) -> Result<SpeechPayload>;
}

/// Speech renderer backed by a hosted synthesizer
pub struct SpeechRenderer {
    tts: Arc<dyn Synthesize>,
    speed: f32,
    animation: String,
    expression: String,
}

impl SpeechRenderer {
    /// Create a renderer with the given playback-speed transform and tags
    #[must_use]
    pub fn new(tts: Arc<dyn Synthesize>, speed: f32, animation: String, expression: String) -> Self {
        Self {
            tts,
            speed,
            animation,
            expression,
        }
    }
}

#[async_trait]
impl RenderSpeech for SpeechRenderer {
    async fn render(&self, text: &str) -> Result<SpeechPayload> {
        let mp3 = self.tts.synthesize(text).await?;
        let (samples, sample_rate) = decode_mp3(&mp3)?;

        let samples = if (self.speed - 1.0).abs() < f32::EPSILON {
            samples
        } else {
            stretch_tempo(&samples, self.speed)?
        };

        let duration =
            Duration::from_secs_f64(samples.len() as f64 / f64::from(sample_rate.max(1)));
        let visemes = viseme::timeline(&samples, sample_rate);
        let wav = samples_to_wav(&samples, sample_rate)?;
        let audio = base64::engine::general_purpose::STANDARD.encode(wav);

        tracing::debug!(
            chars = text.len(),
            duration_ms = duration.as_millis(),
            cues = visemes.len(),
            "speech rendered"
        );

        Ok(SpeechPayload {
            text: text.to_string(),
            audio,
            animation: self.animation.clone(),
            expression: self.expression.clone(),
            visemes,
            duration,
        })
    }
}

/// Decode MP3 bytes to mono f32 samples and their sample rate
///
/// # Errors
///
/// Returns error on malformed MP3 data or when no frames decode
pub fn decode_mp3(mp3: &[u8]) -> Result<(Vec<f32>, u32)> {
    let mut decoder = minimp3::Decoder::new(Cursor::new(mp3));
    let mut samples = Vec::new();
    let mut sample_rate = 0u32;

    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                if sample_rate == 0 {
                    #[allow(clippy::cast_sign_loss)]
                    {
                        sample_rate = frame.sample_rate as u32;
                    }
                }
                if frame.channels == 2 {
                    samples.extend(frame.data.chunks(2).map(|pair| {
                        let left = f32::from(pair[0]) / 32768.0;
                        let right = f32::from(pair.get(1).copied().unwrap_or(pair[0])) / 32768.0;
                        0.5 * (left + right)
                    }));
                } else {
                    samples.extend(frame.data.iter().map(|&s| f32::from(s) / 32768.0));
                }
            }
            Err(minimp3::Error::Eof) => break,
            Err(e) => return Err(Error::Audio(format!("MP3 decode error: {e}"))),
        }
    }

    if sample_rate == 0 {
        return Err(Error::Audio("no MP3 frames decoded".to_string()));
    }

    Ok((samples, sample_rate))
}

/// Time-compress samples by a playback-speed factor
///
/// Resamples by `1/speed` while keeping the declared sample rate, so a 1.2
/// factor plays back 1.2x faster and correspondingly shorter.
///
/// # Errors
///
/// Returns error if the resampler rejects the configuration
pub fn stretch_tempo(samples: &[f32], speed: f32) -> Result<Vec<f32>> {
    if samples.is_empty() {
        return Ok(Vec::new());
    }

    let params = SincInterpolationParameters {
        sinc_len: 128,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 128,
        window: WindowFunction::BlackmanHarris2,
    };

    let mut resampler = SincFixedIn::<f32>::new(
        f64::from(1.0 / speed),
        2.0,
        params,
        RESAMPLE_CHUNK,
        1,
    )
    .map_err(|e| Error::Audio(e.to_string()))?;

    let mut out = Vec::with_capacity(samples.len());
    for chunk in samples.chunks(RESAMPLE_CHUNK) {
        let processed = if chunk.len() == RESAMPLE_CHUNK {
            resampler
                .process(&[chunk], None)
                .map_err(|e| Error::Audio(e.to_string()))?
        } else {
            resampler
                .process_partial(Some(&[chunk]), None)
                .map_err(|e| Error::Audio(e.to_string()))?
        };
        if let Some(channel) = processed.into_iter().next() {
            out.extend(channel);
        }
    }

    // Flush the resampler's internal delay line
    let tail = resampler
        .process_partial::<&[f32]>(None, None)
        .map_err(|e| Error::Audio(e.to_string()))?;
    if let Some(channel) = tail.into_iter().next() {
        out.extend(channel);
    }

    Ok(out)
}
