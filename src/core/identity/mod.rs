// src/core/identity/mod.rs
pub mod normalizer;
pub mod types;
pub mod validation;

pub use normalizer::normalize;
pub use types::{
    BiometricIdentifier, BloodGroup, DocumentUpload, Gender, NewPatient, PatientRecord,
    RegistrationRequest,
};
