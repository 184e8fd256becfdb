//! Offline gallery enrollment
//!
//! Walks a labeled directory tree (`<dir>/<label>/*.jpg`), computes one
//! embedding per image, and builds the gallery the serving process loads at
//! startup. Images where no face is detected are skipped with a warning.

use std::path::Path;

use super::{FaceEncoder, FaceGallery, GalleryEntry};
use crate::Result;

/// Build a gallery from a directory of labeled sample images
///
/// Each subdirectory name becomes a label; the first detected face in each
/// image contributes one entry.
///
/// # Errors
///
/// Returns error if the directory tree cannot be read
pub async fn enroll_directory(dir: &Path, encoder: &dyn FaceEncoder) -> Result<FaceGallery> {
    let mut entries = Vec::new();

    let mut people: Vec<_> = std::fs::read_dir(dir)?
        .filter_map(std::result::Result::ok)
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    people.sort();

    for person_dir in people {
        let label = person_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut images: Vec<_> = std::fs::read_dir(&person_dir)?
            .filter_map(std::result::Result::ok)
            .map(|e| e.path())
            .filter(|p| p.is_file())
            .collect();
        images.sort();

        for image_path in images {
            let bytes = match std::fs::read(&image_path) {
                Ok(b) => b,
                Err(e) => {
                    tracing::warn!(path = %image_path.display(), error = %e, "unreadable image");
                    continue;
                }
            };

            match encoder.encode(&bytes).await {
                Err(e) => {
                    tracing::warn!(path = %image_path.display(), error = %e, "encoding failed");
                }
                Ok(embeddings) => match embeddings.into_iter().next() {
                    None => {
                        tracing::warn!(path = %image_path.display(), "no face found in image");
                    }
                    Some(embedding) => {
                        tracing::info!(label = %label, path = %image_path.display(), "enrolled");
                        entries.push(GalleryEntry {
                            label: label.clone(),
                            embedding,
                        });
                    }
                },
            }
        }
    }

    tracing::info!(entries = entries.len(), "enrollment complete");
    Ok(FaceGallery::new(entries))
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;

    /// Encoder that "detects" a face only in non-empty images
    struct StubEncoder;

    #[async_trait]
    impl FaceEncoder for StubEncoder {
        async fn encode(&self, image: &[u8]) -> Result<Vec<Vec<f32>>> {
            if image.is_empty() {
                Ok(vec![])
            } else {
                Ok(vec![vec![f32::from(image[0]), 0.0]])
            }
        }
    }

    #[tokio::test]
    async fn enrolls_one_entry_per_image_with_a_face() {
        let dir = tempfile::tempdir().unwrap();
        let dana = dir.path().join("dana");
        let lee = dir.path().join("lee");
        std::fs::create_dir(&dana).unwrap();
        std::fs::create_dir(&lee).unwrap();
        std::fs::write(dana.join("a.jpg"), [1u8]).unwrap();
        std::fs::write(dana.join("b.jpg"), [2u8]).unwrap();
        std::fs::write(lee.join("a.jpg"), [3u8]).unwrap();
        // No face detectable in an empty file
        std::fs::write(lee.join("blank.jpg"), []).unwrap();

        let gallery = enroll_directory(dir.path(), &StubEncoder).await.unwrap();
        assert_eq!(gallery.len(), 3);
        let (label, _) = gallery.best_match(&[3.0, 0.0], 0.1).unwrap();
        assert_eq!(label, "lee");
    }

    #[tokio::test]
    async fn empty_tree_builds_empty_gallery() {
        let dir = tempfile::tempdir().unwrap();
        let gallery = enroll_directory(dir.path(), &StubEncoder).await.unwrap();
        assert!(gallery.is_empty());
    }
}
