// src/storage/memory.rs
use async_trait::async_trait;
use parking_lot::RwLock;
use uuid::Uuid;

use super::errors::Result;
use super::PatientStore;
use crate::core::identity::types::{BiometricIdentifier, PatientRecord};

/// Insertion-ordered in-process store, used for `storage.backend = "memory"`.
#[derive(Default)]
pub struct MemoryPatientStore {
    records: RwLock<Vec<PatientRecord>>,
}

impl MemoryPatientStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[async_trait]
impl PatientStore for MemoryPatientStore {
    async fn insert(&self, record: &PatientRecord) -> Result<()> {
        self.records.write().push(record.clone());
        Ok(())
    }

    async fn find_by_fingerprint(
        &self,
        identifier: &BiometricIdentifier,
    ) -> Result<Option<PatientRecord>> {
        Ok(self
            .records
            .read()
            .iter()
            .find(|r| r.matches(identifier))
            .cloned())
    }

    async fn list_recent(&self) -> Result<Vec<PatientRecord>> {
        let mut records = self.records.read().clone();
        records.reverse();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    async fn get(&self, id: &Uuid) -> Result<Option<PatientRecord>> {
        Ok(self.records.read().iter().find(|r| &r.id == id).cloned())
    }
}
