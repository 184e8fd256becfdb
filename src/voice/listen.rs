//! Phrase capture
//!
//! Energy-threshold phrase detection over drained microphone chunks:
//! wait for speech onset (bounded), accumulate until trailing silence or the
//! phrase cap, then hand the samples to the transcriber. The blocking cpal
//! work runs on the blocking pool; the stream never crosses an await point.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use super::capture::{rms, samples_to_wav, MicCapture, SAMPLE_RATE};
use super::stt::Transcriber;
use crate::Result;

/// Floor for the speech energy threshold, whatever the room sounds like
const MIN_THRESHOLD: f32 = 0.01;

/// Multiplier applied to the calibrated ambient level
const AMBIENT_FACTOR: f32 = 2.0;

/// Ambient calibration window
const CALIBRATION: Duration = Duration::from_secs(1);

/// Poll interval while recording
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Result of one capture attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhraseOutcome {
    /// Recognized text
    Text(String),
    /// Speech was captured but not recognized
    Unintelligible,
    /// No speech began before the onset timeout
    Silence,
}

/// Timing bounds for phrase detection
#[derive(Debug, Clone, Copy)]
pub struct PhraseLimits {
    /// Maximum wait for speech to begin
    pub onset_timeout: Duration,
    /// Maximum phrase length once speech began
    pub max_phrase: Duration,
    /// Trailing silence that ends a phrase
    pub trailing_silence: Duration,
}

impl Default for PhraseLimits {
    fn default() -> Self {
        Self {
            onset_timeout: Duration::from_secs(10),
            max_phrase: Duration::from_secs(15),
            trailing_silence: Duration::from_millis(800),
        }
    }
}

/// Progress of an in-flight phrase
#[derive(Debug)]
pub enum PhraseProgress {
    /// Keep feeding chunks
    Continue,
    /// Phrase complete; captured samples
    Complete(Vec<f32>),
    /// Onset timeout elapsed without speech
    TimedOut,
}

/// Detector phase
#[derive(Debug, PartialEq, Eq)]
enum Phase {
    Waiting,
    Speaking,
}

/// Incremental energy-threshold phrase detector
///
/// Pure with respect to audio hardware; fed with drained sample chunks.
pub struct PhraseDetector {
    threshold: f32,
    onset_samples: usize,
    max_samples: usize,
    silence_samples: usize,
    phase: Phase,
    waited: usize,
    silence_run: usize,
    buffer: Vec<f32>,
}

impl PhraseDetector {
    /// Create a detector for the given threshold and limits
    #[must_use]
    pub fn new(threshold: f32, limits: PhraseLimits) -> Self {
        Self {
            threshold,
            onset_samples: duration_to_samples(limits.onset_timeout),
            max_samples: duration_to_samples(limits.max_phrase),
            silence_samples: duration_to_samples(limits.trailing_silence),
            phase: Phase::Waiting,
            waited: 0,
            silence_run: 0,
            buffer: Vec::new(),
        }
    }

    /// Feed one drained chunk
    pub fn push(&mut self, chunk: &[f32]) -> PhraseProgress {
        if chunk.is_empty() {
            return PhraseProgress::Continue;
        }

        let loud = rms(chunk) > self.threshold;

        match self.phase {
            Phase::Waiting => {
                if loud {
                    self.phase = Phase::Speaking;
                    self.buffer.extend_from_slice(chunk);
                    self.silence_run = 0;
                    tracing::trace!("speech onset");
                } else {
                    self.waited += chunk.len();
                    if self.waited >= self.onset_samples {
                        return PhraseProgress::TimedOut;
                    }
                }
            }
            Phase::Speaking => {
                self.buffer.extend_from_slice(chunk);
                if loud {
                    self.silence_run = 0;
                } else {
                    self.silence_run += chunk.len();
                }

                if self.silence_run >= self.silence_samples || self.buffer.len() >= self.max_samples
                {
                    tracing::trace!(samples = self.buffer.len(), "phrase complete");
                    return PhraseProgress::Complete(std::mem::take(&mut self.buffer));
                }
            }
        }

        PhraseProgress::Continue
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn duration_to_samples(d: Duration) -> usize {
    (d.as_secs_f64() * f64::from(SAMPLE_RATE)) as usize
}

/// Captures one spoken phrase per call
#[async_trait]
pub trait CapturePhrase: Send + Sync {
    /// Measure the ambient noise baseline
    async fn calibrate(&self);

    /// Record and transcribe one phrase
    async fn capture(&self) -> PhraseOutcome;
}

/// Phrase source backed by the default microphone and a hosted transcriber
pub struct MicPhraseSource {
    transcriber: Arc<Transcriber>,
    limits: PhraseLimits,
    threshold: Mutex<f32>,
}

impl MicPhraseSource {
    /// Create a phrase source with default limits
    #[must_use]
    pub fn new(transcriber: Arc<Transcriber>) -> Self {
        Self {
            transcriber,
            limits: PhraseLimits::default(),
            threshold: Mutex::new(MIN_THRESHOLD),
        }
    }
}

#[async_trait]
impl CapturePhrase for MicPhraseSource {
    async fn calibrate(&self) {
        match tokio::task::spawn_blocking(measure_ambient).await {
            Ok(Ok(ambient)) => {
                let threshold = (ambient * AMBIENT_FACTOR).max(MIN_THRESHOLD);
                tracing::debug!(ambient, threshold, "ambient noise calibrated");
                if let Ok(mut t) = self.threshold.lock() {
                    *t = threshold;
                }
            }
            Ok(Err(e)) => tracing::warn!(error = %e, "calibration failed, keeping threshold"),
            Err(e) => tracing::warn!(error = %e, "calibration task failed"),
        }
    }

    async fn capture(&self) -> PhraseOutcome {
        let threshold = self.threshold.lock().map_or(MIN_THRESHOLD, |t| *t);
        let limits = self.limits;

        let recorded =
            match tokio::task::spawn_blocking(move || record_phrase(threshold, limits)).await {
                Ok(Ok(samples)) => samples,
                Ok(Err(e)) => {
                    tracing::warn!(error = %e, "microphone capture failed");
                    return PhraseOutcome::Silence;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "capture task failed");
                    return PhraseOutcome::Silence;
                }
            };

        let Some(samples) = recorded else {
            tracing::debug!("no speech before onset timeout");
            return PhraseOutcome::Silence;
        };

        let wav = match samples_to_wav(&samples, SAMPLE_RATE) {
            Ok(wav) => wav,
            Err(e) => {
                tracing::warn!(error = %e, "wav encoding failed");
                return PhraseOutcome::Unintelligible;
            }
        };

        match self.transcriber.transcribe(&wav).await {
            Ok(text) => {
                let text = text.trim().to_string();
                if text.is_empty() {
                    PhraseOutcome::Unintelligible
                } else {
                    tracing::debug!(text = %text, "speech recognized");
                    PhraseOutcome::Text(text)
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "transcription failed");
                PhraseOutcome::Unintelligible
            }
        }
    }
}

/// Measure ambient RMS over the calibration window
fn measure_ambient() -> Result<f32> {
    let mut mic = MicCapture::open()?;
    mic.start()?;
    std::thread::sleep(CALIBRATION);
    let samples = mic.drain();
    mic.stop();
    Ok(rms(&samples))
}

/// Record one phrase, or `None` when the onset timeout elapses
fn record_phrase(threshold: f32, limits: PhraseLimits) -> Result<Option<Vec<f32>>> {
    let mut mic = MicCapture::open()?;
    mic.start()?;

    let mut detector = PhraseDetector::new(threshold, limits);
    let result = loop {
        std::thread::sleep(POLL_INTERVAL);
        let chunk = mic.drain();
        match detector.push(&chunk) {
            PhraseProgress::Continue => {}
            PhraseProgress::Complete(samples) => break Some(samples),
            PhraseProgress::TimedOut => break None,
        }
    };

    mic.stop();
    Ok(result)
}
