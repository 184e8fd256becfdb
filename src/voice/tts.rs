//! Text-to-speech via hosted synthesizers
//!
//! Synthesis returns MP3 bytes at the provider's natural pace; the renderer
//! applies the playback-speed transform afterwards.

use async_trait::async_trait;

use crate::{Error, Result};

/// TTS provider backend
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TtsProvider {
    OpenAi,
    ElevenLabs,
}

impl std::str::FromStr for TtsProvider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "elevenlabs" => Ok(Self::ElevenLabs),
            other => Err(Error::Config(format!("unknown TTS provider: {other}"))),
        }
    }
}

/// Synthesizes speech audio from text
#[async_trait]
pub trait Synthesize: Send + Sync {
    /// Synthesize `text`, returning MP3 bytes
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>>;
}

/// Hosted TTS client
pub struct HostedTts {
    client: reqwest::Client,
    provider: TtsProvider,
    api_key: String,
    voice: String,
    model: String,
}

impl HostedTts {
    /// Create a synthesizer for the given provider
    ///
    /// # Errors
    ///
    /// Returns error if the API key is missing
    pub fn new(provider: TtsProvider, api_key: String, voice: String, model: String) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config(format!(
                "API key required for {provider:?} TTS"
            )));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            provider,
            api_key,
            voice,
            model,
        })
    }

    async fn synthesize_openai(&self, text: &str) -> Result<Vec<u8>> {
        #[derive(serde::Serialize)]
        struct SpeechRequest<'a> {
            model: &'a str,
            input: &'a str,
            voice: &'a str,
        }

        let response = self
            .client
            .post("https://api.openai.com/v1/audio/speech")
            .bearer_auth(&self.api_key)
            .json(&SpeechRequest {
                model: &self.model,
                input: text,
                voice: &self.voice,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Tts(format!("OpenAI TTS error {status}: {body}")));
        }

        Ok(response.bytes().await?.to_vec())
    }

    async fn synthesize_elevenlabs(&self, text: &str) -> Result<Vec<u8>> {
        #[derive(serde::Serialize)]
        struct SpeechRequest<'a> {
            text: &'a str,
            model_id: &'a str,
        }

        let url = format!("https://api.elevenlabs.io/v1/text-to-speech/{}", self.voice);

        let response = self
            .client
            .post(&url)
            .header("xi-api-key", &self.api_key)
            .json(&SpeechRequest {
                text,
                model_id: &self.model,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Tts(format!("ElevenLabs TTS error {status}: {body}")));
        }

        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl Synthesize for HostedTts {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        tracing::debug!(chars = text.len(), provider = ?self.provider, "synthesizing speech");
        match self.provider {
            TtsProvider::OpenAi => self.synthesize_openai(text).await,
            TtsProvider::ElevenLabs => self.synthesize_elevenlabs(text).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_parses_known_names() {
        assert_eq!("openai".parse::<TtsProvider>().unwrap(), TtsProvider::OpenAi);
        assert_eq!(
            "ElevenLabs".parse::<TtsProvider>().unwrap(),
            TtsProvider::ElevenLabs
        );
        assert!("gtts".parse::<TtsProvider>().is_err());
    }

    #[test]
    fn empty_key_is_rejected() {
        let err = HostedTts::new(
            TtsProvider::OpenAi,
            String::new(),
            "alloy".into(),
            "tts-1".into(),
        );
        assert!(err.is_err());
    }
}
