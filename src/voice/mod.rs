//! Voice processing module
//!
//! Microphone capture, phrase detection, hosted STT/TTS, and speech
//! rendering for the avatar client.

pub mod capture;
mod listen;
pub mod render;
mod stt;
mod tts;
pub mod viseme;

pub use capture::{rms, samples_to_wav, MicCapture, SAMPLE_RATE};
pub use listen::{
    CapturePhrase, MicPhraseSource, PhraseDetector, PhraseLimits, PhraseOutcome, PhraseProgress,
};
pub use render::{RenderSpeech, SpeechPayload, SpeechRenderer};
pub use stt::{SttProvider, Transcriber};
pub use tts::{HostedTts, Synthesize, TtsProvider};
pub use viseme::VisemeCue;
