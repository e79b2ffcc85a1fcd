// src/utils/error.rs
use thiserror::Error;

use crate::core::identity::validation::ValidationErrors;
use crate::storage::StorageError;

#[derive(Debug, Error)]
pub enum ClinicError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Sensor error: {0}")]
    Sensor(String),

    #[error("Server error: {0}")]
    Server(String),
}

pub type Result<T> = std::result::Result<T, ClinicError>;
