// src/storage/documents.rs
use std::path::{Path, PathBuf};
use tracing::info;

use super::errors::{Result, StorageError};
use crate::core::identity::types::DocumentUpload;

/// Writes uploaded medical documents to disk as `<epoch-millis>-<name>`.
pub struct DocumentStore {
    root: PathBuf,
    max_bytes: usize,
}

impl DocumentStore {
    pub fn new(root: impl Into<PathBuf>, max_bytes: usize) -> Self {
        Self {
            root: root.into(),
            max_bytes,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    pub async fn ensure_dir(&self) -> Result<()> {
        if !self.root.exists() {
            tokio::fs::create_dir_all(&self.root).await?;
            info!("Created uploads directory {:?}", self.root);
        }
        Ok(())
    }

    /// Persists the upload and returns the stored path as recorded on the patient.
    pub async fn save(&self, upload: &DocumentUpload) -> Result<String> {
        if upload.bytes.len() > self.max_bytes {
            return Err(StorageError::DocumentTooLarge {
                size: upload.bytes.len(),
                limit: self.max_bytes,
            });
        }

        self.ensure_dir().await?;

        let stamp = chrono::Utc::now().timestamp_millis();
        let dest = self
            .root
            .join(format!("{}-{}", stamp, sanitize_file_name(&upload.file_name)));
        tokio::fs::write(&dest, &upload.bytes).await?;

        Ok(dest.to_string_lossy().into_owned())
    }
}

/// Keeps only the final path component and replaces anything outside a
/// conservative character set.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    match cleaned.trim_matches('.') {
        "" => "document".to_string(),
        trimmed => trimmed.to_string(),
    }
}
