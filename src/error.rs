//! Error types for the kiosk gateway

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for kiosk operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the kiosk gateway
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Gallery file missing (identification degrades to "unknown")
    #[error("gallery file not found: {}", .0.display())]
    MissingGallery(PathBuf),

    /// Gallery load/save error
    #[error("gallery error: {0}")]
    Gallery(String),

    /// Camera frame source error
    #[error("camera error: {0}")]
    Camera(String),

    /// Face embedding/matching error
    #[error("face error: {0}")]
    Face(String),

    /// Audio error
    #[error("audio error: {0}")]
    Audio(String),

    /// Speech-to-text error
    #[error("STT error: {0}")]
    Stt(String),

    /// Text-to-speech error
    #[error("TTS error: {0}")]
    Tts(String),

    /// Chat completion error
    #[error("chat error: {0}")]
    Chat(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}
