//! Enrolled face gallery
//!
//! A flat list of `(embedding, label)` pairs written by the offline
//! enrollment tool and loaded once at startup. Never mutated by the serving
//! process. Multiple entries may share a label (several sample images per
//! person).

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Gallery file schema version
const GALLERY_VERSION: u32 = 1;

/// One enrolled sample image
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GalleryEntry {
    /// Person label (directory name at enrollment time)
    pub label: String,

    /// Fixed-length identity embedding
    pub embedding: Vec<f32>,
}

/// On-disk gallery format
#[derive(Debug, Serialize, Deserialize)]
struct GalleryFile {
    version: u32,
    generated_at: chrono::DateTime<chrono::Utc>,
    entries: Vec<GalleryEntry>,
}

/// Set of enrolled faces loaded at startup
#[derive(Debug, Default)]
pub struct FaceGallery {
    entries: Vec<GalleryEntry>,
}

impl FaceGallery {
    /// Create a gallery from enrolled entries
    #[must_use]
    pub fn new(entries: Vec<GalleryEntry>) -> Self {
        Self { entries }
    }

    /// Create an empty gallery (identification always misses)
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load the gallery from its serialized file
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingGallery`] when the file does not exist, or a
    /// gallery error when it cannot be read or parsed
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::MissingGallery(path.to_path_buf()));
        }
        let raw = std::fs::read(path)?;
        let file: GalleryFile = serde_json::from_slice(&raw)
            .map_err(|e| Error::Gallery(format!("{}: {e}", path.display())))?;
        tracing::info!(
            path = %path.display(),
            entries = file.entries.len(),
            "face gallery loaded"
        );
        Ok(Self::new(file.entries))
    }

    /// Load the gallery, degrading a missing file to an empty gallery
    ///
    /// # Errors
    ///
    /// Returns error only when an existing file cannot be read or parsed
    pub fn load_or_empty(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Ok(gallery) => Ok(gallery),
            Err(Error::MissingGallery(p)) => {
                tracing::warn!(
                    path = %p.display(),
                    "no gallery file; identification will always return unknown"
                );
                Ok(Self::empty())
            }
            Err(e) => Err(e),
        }
    }

    /// Write the gallery to disk
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be written
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = GalleryFile {
            version: GALLERY_VERSION,
            generated_at: chrono::Utc::now(),
            entries: self.entries.clone(),
        };
        let raw = serde_json::to_vec_pretty(&file)?;
        std::fs::write(path, raw)?;
        tracing::info!(
            path = %path.display(),
            entries = self.entries.len(),
            "face gallery saved"
        );
        Ok(())
    }

    /// Number of enrolled entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the gallery has no entries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Find the closest entry within `tolerance` of the probe
    ///
    /// Returns the label and distance of the minimum-distance entry among
    /// those within tolerance, or `None` when every entry is farther away.
    #[must_use]
    pub fn best_match(&self, probe: &[f32], tolerance: f32) -> Option<(&str, f32)> {
        self.entries
            .iter()
            .map(|entry| (entry.label.as_str(), distance(&entry.embedding, probe)))
            .filter(|(_, dist)| *dist <= tolerance)
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }
}

/// Euclidean distance between two embeddings
///
/// Mismatched dimensions never match (infinite distance).
#[must_use]
pub fn distance(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return f32::INFINITY;
    }
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}
