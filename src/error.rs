//! Error handling module
//!
//! Centralized error types and HTTP response conversion.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::domain::ValidationError;
use crate::handlers::PipelineError;
use crate::store::StoreError;

/// Application-wide Result type
pub type AppResult<T> = Result<T, AppError>;

/// Guidance returned with timeout responses.
pub const TIMEOUT_SUGGESTION: &str =
    "Coba kurangi jumlah santri yang dipilih atau coba lagi dalam beberapa saat.";

/// Application error types
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Client errors (4xx)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Tidak ada tahun ajaran aktif")]
    NoActiveAcademicYear,

    #[error("Kelas tidak ditemukan: {0}")]
    ClassNotFound(uuid::Uuid),

    // Pipeline and store errors - 408 when caused by a timeout
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Store(#[from] StoreError),

    // Server errors (5xx)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code, details) = match &self {
            // 400 Bad Request
            AppError::InvalidRequest(msg) => {
                (StatusCode::BAD_REQUEST, "invalid_request", Some(msg.clone()))
            }
            AppError::Validation(err) => {
                (StatusCode::BAD_REQUEST, "validation_failed", Some(err.to_string()))
            }
            AppError::NoActiveAcademicYear => {
                (StatusCode::BAD_REQUEST, "no_active_academic_year", None)
            }
            AppError::ClassNotFound(id) => {
                (StatusCode::BAD_REQUEST, "class_not_found", Some(id.to_string()))
            }

            // 401 Unauthorized
            AppError::Unauthorized => {
                (StatusCode::UNAUTHORIZED, "unauthorized", None)
            }

            // Pipeline abort: 408 on timeout with retry guidance, else 500
            AppError::Pipeline(err) => {
                tracing::error!("Promotion pipeline error: {:?}", err);
                let details = format!(
                    "stage: {}, compensation: {}",
                    err.stage, err.compensation
                );
                if err.source.is_timeout() {
                    (
                        StatusCode::REQUEST_TIMEOUT,
                        "store_timeout",
                        Some(format!("{} {}", details, TIMEOUT_SUGGESTION)),
                    )
                } else {
                    (StatusCode::INTERNAL_SERVER_ERROR, "pipeline_failed", Some(details))
                }
            }
            AppError::Store(err) => {
                tracing::error!("Store error: {:?}", err);
                if err.is_timeout() {
                    (
                        StatusCode::REQUEST_TIMEOUT,
                        "store_timeout",
                        Some(TIMEOUT_SUGGESTION.to_string()),
                    )
                } else {
                    (StatusCode::INTERNAL_SERVER_ERROR, "store_error", None)
                }
            }

            // 500 Internal Server Error
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
            AppError::Config(e) => {
                tracing::error!("Config error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "config_error", None)
            }
        };

        let body = ErrorResponse {
            error: self.to_string(),
            error_code: error_code.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}
