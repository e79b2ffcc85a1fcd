// src/core/services/mod.rs
pub mod patient;

pub use patient::PatientService;
