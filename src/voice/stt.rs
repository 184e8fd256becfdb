//! Speech-to-text via hosted recognizers

use crate::{Error, Result};

/// Response from the Whisper transcription API
#[derive(serde::Deserialize)]
struct WhisperResponse {
    text: String,
}

/// Response from the Deepgram transcription API
#[derive(serde::Deserialize)]
struct DeepgramResponse {
    results: DeepgramResults,
}

#[derive(serde::Deserialize)]
struct DeepgramResults {
    channels: Vec<DeepgramChannel>,
}

#[derive(serde::Deserialize)]
struct DeepgramChannel {
    alternatives: Vec<DeepgramAlternative>,
}

#[derive(serde::Deserialize)]
struct DeepgramAlternative {
    transcript: String,
}

/// STT provider backend
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SttProvider {
    Whisper,
    Deepgram,
}

impl std::str::FromStr for SttProvider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "whisper" | "openai" => Ok(Self::Whisper),
            "deepgram" => Ok(Self::Deepgram),
            other => Err(Error::Config(format!("unknown STT provider: {other}"))),
        }
    }
}

/// Transcribes WAV audio to text
pub struct Transcriber {
    client: reqwest::Client,
    provider: SttProvider,
    api_key: String,
    model: String,
}

impl Transcriber {
    /// Create a transcriber for the given provider
    ///
    /// # Errors
    ///
    /// Returns error if the API key is missing
    pub fn new(provider: SttProvider, api_key: String, model: String) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config(format!(
                "API key required for {provider:?} STT"
            )));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            provider,
            api_key,
            model,
        })
    }

    /// Transcribe WAV bytes to text
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the response is malformed
    pub async fn transcribe(&self, wav: &[u8]) -> Result<String> {
        tracing::debug!(
            audio_bytes = wav.len(),
            provider = ?self.provider,
            "starting transcription"
        );
        match self.provider {
            SttProvider::Whisper => self.transcribe_whisper(wav).await,
            SttProvider::Deepgram => self.transcribe_deepgram(wav).await,
        }
    }

    async fn transcribe_whisper(&self, wav: &[u8]) -> Result<String> {
        let form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(wav.to_vec())
                    .file_name("audio.wav")
                    .mime_str("audio/wav")
                    .map_err(|e| Error::Stt(e.to_string()))?,
            )
            .text("model", self.model.clone());

        let response = self
            .client
            .post("https://api.openai.com/v1/audio/transcriptions")
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Whisper API error");
            return Err(Error::Stt(format!("Whisper API error {status}: {body}")));
        }

        let result: WhisperResponse = response.json().await?;
        tracing::info!(transcript = %result.text, "transcription complete");
        Ok(result.text)
    }

    async fn transcribe_deepgram(&self, wav: &[u8]) -> Result<String> {
        let url = format!(
            "https://api.deepgram.com/v1/listen?model={}&punctuate=true",
            self.model
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Token {}", self.api_key))
            .header("Content-Type", "audio/wav")
            .body(wav.to_vec())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Deepgram API error");
            return Err(Error::Stt(format!("Deepgram API error {status}: {body}")));
        }

        let result: DeepgramResponse = response.json().await?;
        let transcript = result
            .results
            .channels
            .first()
            .and_then(|c| c.alternatives.first())
            .map(|a| a.transcript.clone())
            .unwrap_or_default();

        tracing::info!(transcript = %transcript, "transcription complete");
        Ok(transcript)
    }
}
