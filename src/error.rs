//! Error types for the study reader server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::content::ContentError;
use crate::library::LibraryError;

/// Application-wide result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Content error: {0}")]
    Content(#[from] ContentError),

    #[error("Library error: {0}")]
    Library(#[from] LibraryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone()),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
            AppError::Content(e) => match e {
                ContentError::NotFound(url) => (
                    StatusCode::NOT_FOUND,
                    "not_found",
                    format!("Content not found: {}", url),
                ),
                ContentError::InvalidPath(url) => (
                    StatusCode::BAD_REQUEST,
                    "bad_request",
                    format!("Invalid content path: {}", url),
                ),
                _ => {
                    tracing::error!("Content error: {}", e);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "content_error",
                        "Content error".to_string(),
                    )
                }
            },
            AppError::Library(e) => {
                tracing::error!("Library error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "library_error",
                    "Failed to read the library index".to_string(),
                )
            }
            AppError::Io(e) => {
                tracing::error!("IO error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "io_error",
                    "IO error".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error_type.to_string(),
            message,
            details: if cfg!(debug_assertions) {
                Some(self.to_string())
            } else {
                None
            },
        });

        (status, body).into_response()
    }
}
