//! Kiosk Gateway - face-aware voice receptionist for browser avatar clients
//!
//! This library provides the core functionality for the kiosk gateway:
//! - Face identification against an enrolled gallery
//! - Voice capture, phrase detection, and hosted STT
//! - Chat replies via a hosted completion API
//! - Speech rendering (TTS, tempo transform, viseme timeline)
//! - A WebSocket session protocol for browser avatar clients
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                 Browser avatar client                │
//! │     start-face / stop-face / speak-done  (ws)       │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                  Kiosk Gateway                       │
//! │  Identify  │  Listen  │  Reply  │  Render  │  Emit  │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │              Hosted services                         │
//! │  Face embed  │  STT  │  TTS  │  Chat completion     │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod face;
pub mod llm;
pub mod persona;
pub mod session;
pub mod voice;

pub use config::Config;
pub use error::{Error, Result};
pub use face::{FaceGallery, FaceIdentifier, GalleryEntry, IdentifyFace};
pub use llm::{ChatReplyGenerator, GenerateReply};
pub use persona::Persona;
pub use session::{
    ClientEvent, Orchestrator, ServerEvent, SessionControl, SessionTuning,
};
pub use voice::{
    CapturePhrase, PhraseOutcome, RenderSpeech, SpeechPayload, SpeechRenderer,
};
