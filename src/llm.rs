//! Chat replies via a hosted completion API
//!
//! One POST per reply against an OpenAI-compatible chat-completion endpoint.
//! Failures never reach the session loop: the caller always gets text, at
//! worst the fixed apology line.

use async_trait::async_trait;

use crate::{Error, Result};

/// Reply used when the completion API cannot be reached or answers badly
pub const FALLBACK_REPLY: &str = "Sorry, I couldn't get a response from the AI.";

#[derive(serde::Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(serde::Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(serde::Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(serde::Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(serde::Deserialize)]
struct ChoiceMessage {
    content: String,
}

/// Produces a reply for a user utterance
#[async_trait]
pub trait GenerateReply: Send + Sync {
    /// Generate a reply; degrades to a fixed apology, never errors
    async fn reply(&self, user_text: &str) -> String;
}

/// Reply generator backed by a chat-completion endpoint
pub struct ChatReplyGenerator {
    client: reqwest::Client,
    url: String,
    api_key: String,
    model: String,
    system_prompt: String,
}

impl ChatReplyGenerator {
    /// Create a generator for the given endpoint and persona instruction
    #[must_use]
    pub fn new(url: String, api_key: String, model: String, system_prompt: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
            api_key,
            model,
            system_prompt,
        }
    }

    async fn ask(&self, user_text: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &self.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_text,
                },
            ],
        };

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Chat(format!("completion error {status}: {body}")));
        }

        let result: ChatResponse = response.json().await?;
        let reply = result
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| Error::Chat("response carried no choices".to_string()))?
            .message
            .content
            .trim()
            .to_string();

        Ok(reply)
    }
}

#[async_trait]
impl GenerateReply for ChatReplyGenerator {
    async fn reply(&self, user_text: &str) -> String {
        match self.ask(user_text).await {
            Ok(reply) => {
                tracing::info!(reply = %reply, "completion received");
                reply
            }
            Err(e) => {
                tracing::error!(error = %e, "completion failed");
                FALLBACK_REPLY.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn network_failure_returns_the_apology() {
        // Port 9 (discard) is not listening; the connection fails fast
        let generator = ChatReplyGenerator::new(
            "http://127.0.0.1:9/v1/chat/completions".to_string(),
            "test-key".to_string(),
            "test-model".to_string(),
            "You are a test.".to_string(),
        );

        let reply = generator.reply("hello").await;
        assert_eq!(reply, FALLBACK_REPLY);
    }

    #[test]
    fn request_body_carries_system_then_user() {
        let request = ChatRequest {
            model: "m",
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: "be brief",
                },
                ChatMessage {
                    role: "user",
                    content: "hi",
                },
            ],
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"role\":\"system\""));
        assert!(json.find("system").unwrap() < json.find("user").unwrap());
    }

    #[test]
    fn response_content_is_trimmed_by_ask() {
        let raw = r#"{"choices":[{"message":{"content":"  hello there  "}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(
            parsed.choices[0].message.content.trim(),
            "hello there"
        );
    }
}
