// src/api/types.rs
use serde::{Deserialize, Serialize};

use crate::core::identity::types::PatientRecord;

pub const REGISTERED_MESSAGE: &str = "Patient registered successfully";
pub const NOT_FOUND_MESSAGE: &str = "Patient not found";

/// `{success, message?, patient}` returned by register, scan and get.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub patient: PatientRecord,
}

impl PatientResponse {
    pub fn ok(patient: PatientRecord) -> Self {
        Self {
            success: true,
            message: None,
            patient,
        }
    }

    pub fn with_message(patient: PatientRecord, message: &str) -> Self {
        Self {
            success: true,
            message: Some(message.to_string()),
            patient,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientListResponse {
    pub success: bool,
    pub patients: Vec<PatientRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanRequest {
    #[serde(default)]
    pub fingerprint_data: String,
}
