// src/client/mod.rs
//! Front-desk side of the record service: the same four operations whether
//! the service is reached over HTTP or called in-process.

mod http;
mod local;

pub use http::HttpPatientApi;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::core::identity::types::{BiometricIdentifier, PatientRecord, RegistrationRequest};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ClientError {
    #[error("Failed to reach patient service: {0}")]
    Transport(String),

    #[error("{message}")]
    Server { status: u16, message: String },

    #[error("Invalid response from patient service: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            ClientError::InvalidResponse(error.to_string())
        } else {
            ClientError::Transport(error.to_string())
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PatientApi: Send + Sync {
    async fn register(&self, request: RegistrationRequest) -> Result<PatientRecord, ClientError>;

    /// `Ok(None)` when no record carries the identifier.
    async fn scan(
        &self,
        identifier: &BiometricIdentifier,
    ) -> Result<Option<PatientRecord>, ClientError>;

    /// Newest first.
    async fn list(&self) -> Result<Vec<PatientRecord>, ClientError>;

    async fn get(&self, id: &Uuid) -> Result<Option<PatientRecord>, ClientError>;
}
