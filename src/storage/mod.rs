// src/storage/mod.rs
mod documents;
mod errors;
mod memory;
mod rocks;

pub use documents::{sanitize_file_name, DocumentStore};
pub use errors::{Result, StorageError};
pub use memory::MemoryPatientStore;
pub use rocks::RocksPatientStore;

use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::core::identity::types::{BiometricIdentifier, PatientRecord};
use crate::utils::config::{StorageBackend, StorageConfig};

/// Persistence for patient records. Records are append-only.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PatientStore: Send + Sync {
    async fn insert(&self, record: &PatientRecord) -> Result<()>;

    /// Oldest record whose identifier is exactly `identifier`.
    async fn find_by_fingerprint(
        &self,
        identifier: &BiometricIdentifier,
    ) -> Result<Option<PatientRecord>>;

    /// All records, newest first.
    async fn list_recent(&self) -> Result<Vec<PatientRecord>>;

    async fn get(&self, id: &Uuid) -> Result<Option<PatientRecord>>;

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

pub fn open_store(config: &StorageConfig) -> Result<Arc<dyn PatientStore>> {
    Ok(match config.backend {
        StorageBackend::Rocksdb => Arc::new(RocksPatientStore::open(&config.path)?),
        StorageBackend::Memory => Arc::new(MemoryPatientStore::new()),
    })
}
