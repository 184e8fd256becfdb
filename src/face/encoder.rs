//! Face embedding via a hosted face service
//!
//! The service accepts one image and returns zero or more detected faces,
//! each with a fixed-length embedding, in detection order:
//!
//! ```json
//! { "faces": [ { "embedding": [0.1, -0.2, ...] } ] }
//! ```

use async_trait::async_trait;

use crate::{Error, Result};

/// Response from the face-embedding service
#[derive(serde::Deserialize)]
struct EmbedResponse {
    faces: Vec<DetectedFace>,
}

#[derive(serde::Deserialize)]
struct DetectedFace {
    embedding: Vec<f32>,
}

/// Computes per-face embeddings for an image
#[async_trait]
pub trait FaceEncoder: Send + Sync {
    /// Detect faces and return one embedding per face, in detection order
    async fn encode(&self, image: &[u8]) -> Result<Vec<Vec<f32>>>;
}

/// Face encoder backed by a hosted embedding service
pub struct HttpFaceEncoder {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
}

impl HttpFaceEncoder {
    /// Create an encoder for an embedding service endpoint
    #[must_use]
    pub fn new(url: String, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
            api_key,
        }
    }
}

#[async_trait]
impl FaceEncoder for HttpFaceEncoder {
    async fn encode(&self, image: &[u8]) -> Result<Vec<Vec<f32>>> {
        let form = reqwest::multipart::Form::new().part(
            "image",
            reqwest::multipart::Part::bytes(image.to_vec())
                .file_name("frame.jpg")
                .mime_str("image/jpeg")
                .map_err(|e| Error::Face(e.to_string()))?,
        );

        let mut request = self.client.post(&self.url).multipart(form);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "face service error");
            return Err(Error::Face(format!("face service error {status}: {body}")));
        }

        let result: EmbedResponse = response.json().await?;
        tracing::debug!(faces = result.faces.len(), "frame encoded");

        Ok(result.faces.into_iter().map(|f| f.embedding).collect())
    }
}
