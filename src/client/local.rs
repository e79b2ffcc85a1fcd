// src/client/local.rs
use actix_web::ResponseError;
use async_trait::async_trait;
use uuid::Uuid;

use super::{ClientError, PatientApi};
use crate::api::ApiError;
use crate::core::identity::types::{BiometricIdentifier, PatientRecord, RegistrationRequest};
use crate::core::services::patient::PatientService;
use crate::utils::error::ClinicError;

/// Failures read the same as they would over HTTP.
fn server_error(error: ClinicError) -> ClientError {
    let error = ApiError::from(error);
    ClientError::Server {
        status: error.status_code().as_u16(),
        message: error.to_string(),
    }
}

#[async_trait]
impl PatientApi for PatientService {
    async fn register(&self, request: RegistrationRequest) -> Result<PatientRecord, ClientError> {
        PatientService::register(self, request)
            .await
            .map_err(server_error)
    }

    async fn scan(
        &self,
        identifier: &BiometricIdentifier,
    ) -> Result<Option<PatientRecord>, ClientError> {
        PatientService::scan(self, identifier)
            .await
            .map_err(server_error)
    }

    async fn list(&self) -> Result<Vec<PatientRecord>, ClientError> {
        PatientService::list(self).await.map_err(server_error)
    }

    async fn get(&self, id: &Uuid) -> Result<Option<PatientRecord>, ClientError> {
        PatientService::get(self, id).await.map_err(server_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{DocumentStore, MemoryPatientStore};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_validation_failure_reads_like_http() {
        let dir = tempfile::tempdir().unwrap();
        let service = PatientService::new(
            Arc::new(MemoryPatientStore::new()),
            DocumentStore::new(dir.path(), 1024),
        );
        let api: &dyn PatientApi = &service;

        let err = api
            .register(RegistrationRequest {
                name: "Bo".into(),
                age: "0".into(),
                gender: "Other".into(),
                blood_group: "B+".into(),
                fingerprint_data: "Z9".into(),
                document: None,
            })
            .await
            .unwrap_err();

        assert_eq!(
            err,
            ClientError::Server {
                status: 500,
                message: "Age must be between 1 and 120".into()
            }
        );
        assert!(api.scan(&"Z9".into()).await.unwrap().is_none());
    }
}
