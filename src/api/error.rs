// src/api/error.rs
use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use thiserror::Error;

use super::types::ErrorResponse;
use crate::utils::error::ClinicError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Internal(String),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            success: false,
            message: self.to_string(),
        })
    }
}

// Validation and persistence failures both surface as 500 with the message.
impl From<ClinicError> for ApiError {
    fn from(error: ClinicError) -> Self {
        match error {
            ClinicError::Validation(errors) => ApiError::Internal(errors.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<actix_multipart::MultipartError> for ApiError {
    fn from(error: actix_multipart::MultipartError) -> Self {
        ApiError::Internal(format!("Invalid multipart payload: {}", error))
    }
}
