// src/api/mod.rs
//! REST surface over the patient record service.

mod error;
pub mod handlers;
pub mod types;

pub use error::ApiError;
