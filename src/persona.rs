//! Persona configuration
//!
//! The persona carries the fixed lines the kiosk speaks (greeting, farewell,
//! apologies) and the system instruction sent with every chat completion.
//! Loaded from a TOML file when one is configured, otherwise the embedded
//! default receptionist persona is used.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::Result;

/// Spoken-line inventory and chat instruction for the kiosk
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "snake_case")]
pub struct Persona {
    /// Display name
    pub name: String,

    /// System instruction sent with every chat completion
    pub system_prompt: String,

    /// Greeting template; `{name}` is replaced with the recognized label
    pub greeting: String,

    /// Spoken when a session is stopped
    pub farewell: String,

    /// Spoken when no face was recognized within the timeout
    pub unrecognized: String,

    /// Spoken when speech capture returned nothing usable
    pub unheard: String,

    /// Spoken between speech-recognition retries
    pub retry_prompt: String,

    /// Avatar animation tag attached to speak events
    pub animation: String,

    /// Avatar facial-expression tag attached to speak events
    pub expression: String,
}

impl Default for Persona {
    fn default() -> Self {
        Self {
            name: "Receptionist".to_string(),
            system_prompt: "You are a friendly front-desk assistant. Give concise, \
                            accurate, one-line answers about the organization you \
                            represent, and stay on topic."
                .to_string(),
            greeting: "Hi {name}! I'm your assistant. Is there anything you would \
                       like to know?"
                .to_string(),
            farewell: "Stopped recording. Goodbye!".to_string(),
            unrecognized: "Sorry, I could not recognize your face.".to_string(),
            unheard: "Sorry, I couldn't understand that.".to_string(),
            retry_prompt: "I didn't catch that. Please try again.".to_string(),
            animation: "Idle".to_string(),
            expression: "smile".to_string(),
        }
    }
}

impl Persona {
    /// Load a persona from a TOML file
    ///
    /// Missing fields fall back to the embedded default.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let persona = toml::from_str(&raw)?;
        Ok(persona)
    }

    /// Render the greeting for a recognized user
    #[must_use]
    pub fn greeting_for(&self, name: &str) -> String {
        self.greeting.replace("{name}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn greeting_substitutes_name() {
        let persona = Persona::default();
        let line = persona.greeting_for("Dana");
        assert!(line.contains("Dana"));
        assert!(!line.contains("{name}"));
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let persona: Persona =
            toml::from_str("name = \"Orin\"\ngreeting = \"Welcome back, {name}.\"").unwrap();
        assert_eq!(persona.name, "Orin");
        assert_eq!(persona.greeting_for("Lee"), "Welcome back, Lee.");
        assert_eq!(persona.farewell, Persona::default().farewell);
    }
}
