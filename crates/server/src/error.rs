// crates/server/src/error.rs
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use headway_core::ProgressError;
use serde::Serialize;
use thiserror::Error;

use crate::notify::NotifyError;

/// Structured JSON error response for API errors
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: Some(details.into()),
        }
    }
}

/// API error types that map to HTTP status codes
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid progress update: {0}")]
    InvalidProgress(#[from] ProgressError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unknown or missing secret")]
    Unauthorized,

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Notification failed: {0}")]
    Notify(#[from] NotifyError),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_response) = match &self {
            ApiError::InvalidProgress(err) => {
                tracing::warn!(error = %err, "Rejected progress update");
                (
                    StatusCode::BAD_REQUEST,
                    ErrorResponse::with_details("Invalid progress update", err.to_string()),
                )
            }
            ApiError::BadRequest(msg) => {
                tracing::warn!(message = %msg, "Bad request");
                (
                    StatusCode::BAD_REQUEST,
                    ErrorResponse::with_details("Bad request", msg.clone()),
                )
            }
            ApiError::Unauthorized => {
                tracing::warn!("Update with unknown secret");
                (StatusCode::UNAUTHORIZED, ErrorResponse::new("Unauthorized"))
            }
            ApiError::TaskNotFound(name) => {
                tracing::debug!(name = %name, "Task not found");
                (
                    StatusCode::NOT_FOUND,
                    ErrorResponse::with_details("Task not found", format!("Task: {}", name)),
                )
            }
            ApiError::Notify(err) => {
                tracing::error!(error = %err, "Notification delivery failed");
                (
                    StatusCode::BAD_GATEWAY,
                    ErrorResponse::with_details("Notification failed", err.to_string()),
                )
            }
            ApiError::Internal(msg) => {
                tracing::error!(message = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new("Internal server error"),
                )
            }
        };

        (status, Json(error_response)).into_response()
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
