//! Camera frame acquisition
//!
//! Frames come from a snapshot endpoint exposed by the kiosk's camera
//! service (one JPEG per GET). The identification loop treats read failures
//! as "no frame this cycle".

use async_trait::async_trait;

use crate::{Error, Result};

/// Source of camera frames
#[async_trait]
pub trait FrameSource: Send + Sync {
    /// Grab one frame as encoded image bytes
    async fn grab(&self) -> Result<Vec<u8>>;
}

/// Fetches frames from an HTTP snapshot endpoint
pub struct HttpFrameSource {
    client: reqwest::Client,
    url: String,
}

impl HttpFrameSource {
    /// Create a frame source for a snapshot URL
    #[must_use]
    pub fn new(url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
        }
    }
}

#[async_trait]
impl FrameSource for HttpFrameSource {
    async fn grab(&self) -> Result<Vec<u8>> {
        let response = self.client.get(&self.url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Camera(format!("snapshot error {status}")));
        }

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Err(Error::Camera("empty snapshot".to_string()));
        }

        tracing::trace!(bytes = bytes.len(), "frame captured");
        Ok(bytes.to_vec())
    }
}
