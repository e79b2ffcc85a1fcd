// src/core/services/patient.rs
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    core::identity::{
        types::{BiometricIdentifier, PatientRecord, RegistrationRequest},
        validation::validate_registration,
    },
    storage::{DocumentStore, PatientStore},
    utils::error::{ClinicError, Result},
};

/// Server-side patient operations behind the REST API.
pub struct PatientService {
    store: Arc<dyn PatientStore>,
    documents: DocumentStore,
}

impl PatientService {
    pub fn new(store: Arc<dyn PatientStore>, documents: DocumentStore) -> Self {
        Self { store, documents }
    }

    pub fn documents(&self) -> &DocumentStore {
        &self.documents
    }

    pub async fn register(&self, request: RegistrationRequest) -> Result<PatientRecord> {
        let mut patient = validate_registration(&request)?;

        if let Some(document) = &request.document {
            let path = self.documents.save(document).await.map_err(|e| {
                error!("Failed to store document {}: {}", document.file_name, e);
                ClinicError::Storage(e)
            })?;
            patient.medical_document = Some(path);
        }

        let record = PatientRecord::create(patient);
        self.store.insert(&record).await?;

        info!("Registered patient {}", record.id);
        Ok(record)
    }

    /// Exact-match lookup; `Ok(None)` is the ordinary not-found outcome.
    pub async fn scan(&self, identifier: &BiometricIdentifier) -> Result<Option<PatientRecord>> {
        let found = self.store.find_by_fingerprint(identifier).await?;

        match &found {
            Some(record) => info!("Fingerprint scan matched patient {}", record.id),
            None => warn!("Fingerprint scan found no patient"),
        }

        Ok(found)
    }

    pub async fn list(&self) -> Result<Vec<PatientRecord>> {
        Ok(self.store.list_recent().await?)
    }

    pub async fn get(&self, id: &Uuid) -> Result<Option<PatientRecord>> {
        Ok(self.store.get(id).await?)
    }

    pub async fn close(&self) -> Result<()> {
        Ok(self.store.close().await?)
    }
}
