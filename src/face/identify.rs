//! Face identification loop

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use super::gallery::FaceGallery;
use super::{FaceEncoder, FrameSource};

/// Pause between snapshot grabs
const FRAME_INTERVAL: Duration = Duration::from_millis(200);

/// Identifies a user by face
#[async_trait]
pub trait IdentifyFace: Send + Sync {
    /// Scan frames until a gallery match or the timeout; `None` on no match
    async fn identify(&self, timeout: Duration) -> Option<String>;
}

/// Matches camera frames against the enrolled gallery
pub struct FaceIdentifier {
    frames: Arc<dyn FrameSource>,
    encoder: Arc<dyn FaceEncoder>,
    gallery: Arc<FaceGallery>,
    tolerance: f32,
}

impl FaceIdentifier {
    /// Create an identifier over a frame source, encoder, and gallery
    #[must_use]
    pub fn new(
        frames: Arc<dyn FrameSource>,
        encoder: Arc<dyn FaceEncoder>,
        gallery: Arc<FaceGallery>,
        tolerance: f32,
    ) -> Self {
        Self {
            frames,
            encoder,
            gallery,
            tolerance,
        }
    }
}

#[async_trait]
impl IdentifyFace for FaceIdentifier {
    async fn identify(&self, timeout: Duration) -> Option<String> {
        if self.gallery.is_empty() {
            tracing::warn!("gallery is empty, skipping identification");
            return None;
        }

        let deadline = Instant::now() + timeout;

        while Instant::now() < deadline {
            match self.frames.grab().await {
                Err(e) => {
                    tracing::warn!(error = %e, "frame capture failed");
                }
                Ok(frame) => match self.encoder.encode(&frame).await {
                    Err(e) => {
                        tracing::warn!(error = %e, "frame encoding failed");
                    }
                    Ok(embeddings) => {
                        tracing::debug!(faces = embeddings.len(), "looking for a face");
                        for embedding in &embeddings {
                            if let Some((label, dist)) =
                                self.gallery.best_match(embedding, self.tolerance)
                            {
                                tracing::info!(label, distance = dist, "face recognized");
                                return Some(label.to_string());
                            }
                        }
                    }
                },
            }

            tokio::time::sleep(FRAME_INTERVAL).await;
        }

        tracing::debug!("identification timed out without a match");
        None
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::face::GalleryEntry;
    use crate::Result;

    struct StaticFrames;

    #[async_trait]
    impl FrameSource for StaticFrames {
        async fn grab(&self) -> Result<Vec<u8>> {
            Ok(vec![0xFF, 0xD8])
        }
    }

    struct FailingFrames {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl FrameSource for FailingFrames {
        async fn grab(&self) -> Result<Vec<u8>> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n == 0 {
                Err(crate::Error::Camera("read failed".to_string()))
            } else {
                Ok(vec![0xFF, 0xD8])
            }
        }
    }

    struct FixedEncoder {
        embeddings: Vec<Vec<f32>>,
    }

    #[async_trait]
    impl FaceEncoder for FixedEncoder {
        async fn encode(&self, _image: &[u8]) -> Result<Vec<Vec<f32>>> {
            Ok(self.embeddings.clone())
        }
    }

    fn gallery() -> Arc<FaceGallery> {
        Arc::new(FaceGallery::new(vec![GalleryEntry {
            label: "dana".to_string(),
            embedding: vec![0.0, 0.0, 0.0],
        }]))
    }

    #[tokio::test]
    async fn matching_probe_returns_label() {
        let identifier = FaceIdentifier::new(
            Arc::new(StaticFrames),
            Arc::new(FixedEncoder {
                embeddings: vec![vec![0.1, 0.0, 0.0]],
            }),
            gallery(),
            0.4,
        );

        let label = identifier.identify(Duration::from_secs(2)).await;
        assert_eq!(label.as_deref(), Some("dana"));
    }

    #[tokio::test]
    async fn distant_probe_times_out() {
        let identifier = FaceIdentifier::new(
            Arc::new(StaticFrames),
            Arc::new(FixedEncoder {
                embeddings: vec![vec![5.0, 5.0, 5.0]],
            }),
            gallery(),
            0.4,
        );

        let label = identifier.identify(Duration::from_millis(300)).await;
        assert!(label.is_none());
    }

    #[tokio::test]
    async fn failed_frames_are_skipped_not_fatal() {
        let identifier = FaceIdentifier::new(
            Arc::new(FailingFrames {
                calls: AtomicUsize::new(0),
            }),
            Arc::new(FixedEncoder {
                embeddings: vec![vec![0.0, 0.0, 0.0]],
            }),
            gallery(),
            0.4,
        );

        let label = identifier.identify(Duration::from_secs(2)).await;
        assert_eq!(label.as_deref(), Some("dana"));
    }

    #[tokio::test]
    async fn empty_gallery_returns_unknown() {
        let identifier = FaceIdentifier::new(
            Arc::new(StaticFrames),
            Arc::new(FixedEncoder {
                embeddings: vec![vec![0.0, 0.0, 0.0]],
            }),
            Arc::new(FaceGallery::empty()),
            0.4,
        );

        assert!(identifier.identify(Duration::from_secs(1)).await.is_none());
    }
}
