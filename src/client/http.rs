// src/client/http.rs
use async_trait::async_trait;
use reqwest::{multipart, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{ClientError, PatientApi};
use crate::api::types::{ErrorResponse, PatientListResponse, PatientResponse, ScanRequest};
use crate::core::identity::types::{BiometricIdentifier, PatientRecord, RegistrationRequest};

const PATIENTS_PATH: &str = "/api/patients";

/// Talks to the REST surface of a running biodesk server.
pub struct HttpPatientApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpPatientApi {
    pub fn new(base_url: &str) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, PATIENTS_PATH, path)
    }

    async fn read<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
        if response.status().is_success() {
            return Ok(response.json().await?);
        }
        Err(Self::server_error(response).await)
    }

    /// A 404 carrying the error envelope is a miss; any other 404 means the
    /// base URL does not point at a patient service.
    async fn read_optional(
        response: reqwest::Response,
    ) -> Result<Option<PatientRecord>, ClientError> {
        if response.status() != StatusCode::NOT_FOUND {
            let body: PatientResponse = Self::read(response).await?;
            return Ok(Some(body.patient));
        }

        let body = response.bytes().await?;
        match serde_json::from_slice::<ErrorResponse>(&body) {
            Ok(envelope) if !envelope.success => Ok(None),
            _ => {
                warn!("Received 404 without an error envelope");
                Err(ClientError::Server {
                    status: StatusCode::NOT_FOUND.as_u16(),
                    message: "No patient service at this address".into(),
                })
            }
        }
    }

    async fn server_error(response: reqwest::Response) -> ClientError {
        let status = response.status();
        let message = match response.json::<ErrorResponse>().await {
            Ok(body) => body.message,
            Err(_) => status
                .canonical_reason()
                .unwrap_or("Unexpected response")
                .to_string(),
        };
        warn!("Patient service answered {}: {}", status, message);

        ClientError::Server {
            status: status.as_u16(),
            message,
        }
    }

    fn registration_form(request: RegistrationRequest) -> Result<multipart::Form, ClientError> {
        let mut form = multipart::Form::new()
            .text("name", request.name)
            .text("age", request.age)
            .text("gender", request.gender)
            .text("bloodGroup", request.blood_group)
            .text("fingerprintData", request.fingerprint_data.into_inner());

        if let Some(document) = request.document {
            let mut part = multipart::Part::bytes(document.bytes).file_name(document.file_name);
            if let Some(content_type) = document.content_type {
                part = part
                    .mime_str(&content_type)
                    .map_err(|e| ClientError::InvalidResponse(e.to_string()))?;
            }
            form = form.part("medicalDocument", part);
        }

        Ok(form)
    }
}

#[async_trait]
impl PatientApi for HttpPatientApi {
    async fn register(&self, request: RegistrationRequest) -> Result<PatientRecord, ClientError> {
        let form = Self::registration_form(request)?;
        let response = self.client.post(self.url("")).multipart(form).send().await?;

        let body: PatientResponse = Self::read(response).await?;
        debug!("Registered patient {}", body.patient.id);
        Ok(body.patient)
    }

    async fn scan(
        &self,
        identifier: &BiometricIdentifier,
    ) -> Result<Option<PatientRecord>, ClientError> {
        let response = self
            .client
            .post(self.url("/scan"))
            .json(&ScanRequest {
                fingerprint_data: identifier.to_string(),
            })
            .send()
            .await?;

        Self::read_optional(response).await
    }

    async fn list(&self) -> Result<Vec<PatientRecord>, ClientError> {
        let response = self.client.get(self.url("")).send().await?;
        let body: PatientListResponse = Self::read(response).await?;
        Ok(body.patients)
    }

    async fn get(&self, id: &Uuid) -> Result<Option<PatientRecord>, ClientError> {
        let response = self.client.get(self.url(&format!("/{}", id))).send().await?;
        Self::read_optional(response).await
    }
}
