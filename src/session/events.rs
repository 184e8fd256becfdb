//! WebSocket session protocol
//!
//! JSON events with a kebab-case `type` tag, matching what the avatar
//! frontend listens for.

use serde::{Deserialize, Serialize};

use crate::voice::VisemeCue;

/// Control events from the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientEvent {
    /// Begin a session (identify, greet, listen)
    StartFace,
    /// End the session after the current turn
    StopFace,
    /// Client finished playing the last speak event
    SpeakDone,
}

/// Events emitted to every connected client
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerEvent {
    /// Informational status line
    Status { message: String },
    /// Begin mouth animation
    MouthMoveStart,
    /// End mouth animation
    MouthMoveStop,
    /// A spoken line with its audio and animation data
    Speak {
        text: String,
        /// Base64-encoded WAV audio
        audio: String,
        animation_tag: String,
        expression_tag: String,
        viseme_timeline: Vec<VisemeCue>,
    },
}

impl ServerEvent {
    /// Build a status event
    pub fn status(message: impl Into<String>) -> Self {
        Self::Status {
            message: message.into(),
        }
    }
}
