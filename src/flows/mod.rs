// src/flows/mod.rs
//! Front-desk workflows driven by the shared sensor and the patient API.
//! Each flow collects user-facing notifications until they are taken.

pub mod lookup;
pub mod registration;

pub use lookup::{LookupFlow, LookupView};
pub use registration::{RegistrationFlow, RegistrationForm};

use thiserror::Error;

use crate::client::ClientError;
use crate::core::identity::validation::ValidationErrors;
use crate::sensor::SensorError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
}

impl Notification {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Info,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Error,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum FlowError {
    #[error("Please fill all required fields and capture fingerprint.")]
    Incomplete(ValidationErrors),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Sensor(#[from] SensorError),
}
