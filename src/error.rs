//! Error types for the FormFill server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Application-wide result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Merge compatibility violated. Carries every violated rule so the
    /// operator can fix the whole group in one pass.
    #[error("Merge validation failed ({} issue(s))", .0.len())]
    MergeValidation(Vec<String>),

    /// A broken catalog invariant discovered at fill time. Fatal for the
    /// whole fill operation; never produces a partially filled document.
    #[error("Catalog corruption: {0}")]
    CatalogCorruption(String),

    /// Document-level render failure (the original PDF could not be loaded
    /// or the filled document could not be written).
    #[error("Render failed: {0}")]
    Render(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    issues: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, message, issues) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone(), None),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", msg.clone(), None)
            }
            AppError::MergeValidation(list) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "merge_validation_failed",
                "Fields are not compatible for merging".to_string(),
                Some(list.clone()),
            ),
            AppError::CatalogCorruption(msg) => {
                tracing::error!("Catalog corruption: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "catalog_corruption",
                    "Field catalog is in an inconsistent state".to_string(),
                    None,
                )
            }
            AppError::Render(msg) => {
                tracing::error!("Render failure: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "render_failed",
                    "Failed to render the document".to_string(),
                    None,
                )
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "database_error",
                    "Database error".to_string(),
                    None,
                )
            }
            AppError::Pdf(e) => {
                tracing::error!("PDF error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "pdf_error",
                    "Failed to process PDF document".to_string(),
                    None,
                )
            }
            AppError::Io(e) => {
                tracing::error!("IO error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "io_error",
                    "IO error".to_string(),
                    None,
                )
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error_type.to_string(),
            message,
            issues,
            details: if cfg!(debug_assertions) {
                Some(self.to_string())
            } else {
                None
            },
        });

        (status, body).into_response()
    }
}
