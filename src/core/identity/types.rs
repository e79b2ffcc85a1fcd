// src/core/identity/types.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// String derived from a capture event; storage and lookup compare it with
/// exact string equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BiometricIdentifier(String);

impl BiometricIdentifier {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for BiometricIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BiometricIdentifier {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for BiometricIdentifier {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub const ALL: [Gender; 3] = [Gender::Male, Gender::Female, Gender::Other];

    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
            Gender::Other => "Other",
        }
    }
}

impl FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Gender::ALL
            .into_iter()
            .find(|g| g.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown gender '{}'", s))
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BloodGroup {
    #[serde(rename = "A+")]
    APositive,
    #[serde(rename = "A-")]
    ANegative,
    #[serde(rename = "B+")]
    BPositive,
    #[serde(rename = "B-")]
    BNegative,
    #[serde(rename = "AB+")]
    AbPositive,
    #[serde(rename = "AB-")]
    AbNegative,
    #[serde(rename = "O+")]
    OPositive,
    #[serde(rename = "O-")]
    ONegative,
}

impl BloodGroup {
    pub const ALL: [BloodGroup; 8] = [
        BloodGroup::APositive,
        BloodGroup::ANegative,
        BloodGroup::BPositive,
        BloodGroup::BNegative,
        BloodGroup::AbPositive,
        BloodGroup::AbNegative,
        BloodGroup::OPositive,
        BloodGroup::ONegative,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BloodGroup::APositive => "A+",
            BloodGroup::ANegative => "A-",
            BloodGroup::BPositive => "B+",
            BloodGroup::BNegative => "B-",
            BloodGroup::AbPositive => "AB+",
            BloodGroup::AbNegative => "AB-",
            BloodGroup::OPositive => "O+",
            BloodGroup::ONegative => "O-",
        }
    }
}

impl FromStr for BloodGroup {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase();
        BloodGroup::ALL
            .into_iter()
            .find(|g| g.as_str() == wanted)
            .ok_or_else(|| format!("unknown blood group '{}'", s))
    }
}

impl fmt::Display for BloodGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientRecord {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub age: u8,
    pub gender: Gender,
    pub blood_group: BloodGroup,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medical_document: Option<String>,
    pub fingerprint_data: BiometricIdentifier,
    pub created_at: DateTime<Utc>,
}

/// Validated registration payload, before the store assigns identity.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPatient {
    pub name: String,
    pub age: u8,
    pub gender: Gender,
    pub blood_group: BloodGroup,
    pub medical_document: Option<String>,
    pub fingerprint_data: BiometricIdentifier,
}

impl PatientRecord {
    pub fn create(patient: NewPatient) -> Self {
        Self {
            id: Uuid::now_v7(),
            name: patient.name,
            age: patient.age,
            gender: patient.gender,
            blood_group: patient.blood_group,
            medical_document: patient.medical_document,
            fingerprint_data: patient.fingerprint_data,
            created_at: Utc::now(),
        }
    }

    /// Last six characters of the id, upper-cased, as shown on the desk.
    pub fn short_id(&self) -> String {
        let simple = self.id.simple().to_string();
        simple[simple.len() - 6..].to_uppercase()
    }

    pub fn matches(&self, identifier: &BiometricIdentifier) -> bool {
        &self.fingerprint_data == identifier
    }
}

/// Uploaded supporting document carried with a registration.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentUpload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Everything a front desk submits to register one patient.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistrationRequest {
    pub name: String,
    pub age: String,
    pub gender: String,
    pub blood_group: String,
    pub fingerprint_data: BiometricIdentifier,
    pub document: Option<DocumentUpload>,
}
