//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service and how it is
//! rendered as an HTTP response.

use crate::config::ConfigError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use flashcards_core::{FieldIssue, GenerationError, PortError, ReviewError};
use serde::{Deserialize, Serialize};
use tracing::error;
use utoipa::ToSchema;

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from one of the core service ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// A candidate review batch failed.
    #[error(transparent)]
    Review(#[from] ReviewError),

    /// A generation request failed.
    #[error(transparent)]
    Generation(#[from] GenerationError),

    /// The request body or query failed validation.
    #[error("Invalid request")]
    Validation(Vec<FieldIssue>),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// Represents an error from running database migrations.
    #[error("Migration Error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

//=========================================================================================
// Error Response Body
//=========================================================================================

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct IssueBody {
    pub field: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    pub message: String,
}

/// The single structured object returned for every failure.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    /// One of `validation`, `not_found`, `unauthenticated`, `conflict`, `upstream`, `internal`.
    pub kind: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<IssueBody>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing_ids: Vec<uuid::Uuid>,
}

impl ErrorBody {
    fn new(kind: &str, message: impl Into<String>) -> Self {
        Self {
            kind: kind.to_string(),
            message: message.into(),
            issues: Vec::new(),
            missing_ids: Vec::new(),
        }
    }

    fn with_issues(mut self, issues: &[FieldIssue]) -> Self {
        self.issues = issues
            .iter()
            .map(|issue| IssueBody {
                field: issue.field.clone(),
                index: issue.index,
                message: issue.message.clone(),
            })
            .collect();
        self
    }
}

impl ApiError {
    fn status_and_body(&self) -> (StatusCode, ErrorBody) {
        match self {
            ApiError::Review(err) => {
                let kind = err.kind().as_str();
                match err {
                    ReviewError::Validation(issues) => (
                        StatusCode::BAD_REQUEST,
                        ErrorBody::new(kind, "Invalid candidate actions").with_issues(issues),
                    ),
                    ReviewError::SessionNotFound => (
                        StatusCode::NOT_FOUND,
                        ErrorBody::new(kind, "Generation session not found"),
                    ),
                    ReviewError::CandidatesNotFound(ids) => {
                        let mut body = ErrorBody::new(kind, err.to_string());
                        body.missing_ids = ids.clone();
                        (StatusCode::NOT_FOUND, body)
                    }
                    ReviewError::Internal(_) => internal(),
                }
            }
            ApiError::Validation(issues) => (
                StatusCode::BAD_REQUEST,
                ErrorBody::new("validation", "Invalid request").with_issues(issues),
            ),
            ApiError::Generation(GenerationError::InvalidSourceText { .. }) => (
                StatusCode::BAD_REQUEST,
                ErrorBody::new("validation", self.to_string()).with_issues(&[FieldIssue::batch(
                    "source_text",
                    self.to_string(),
                )]),
            ),
            ApiError::Generation(GenerationError::Generator(_)) => (
                StatusCode::BAD_GATEWAY,
                ErrorBody::new("upstream", "Flashcard generation failed, please retry"),
            ),
            ApiError::Generation(GenerationError::Storage(port)) | ApiError::Port(port) => {
                match port {
                    PortError::NotFound(_) => {
                        (StatusCode::NOT_FOUND, ErrorBody::new("not_found", "Not found"))
                    }
                    PortError::Unauthorized => (
                        StatusCode::UNAUTHORIZED,
                        ErrorBody::new("unauthenticated", "Authentication required"),
                    ),
                    PortError::Conflict(message) => {
                        (StatusCode::CONFLICT, ErrorBody::new("conflict", message.clone()))
                    }
                    PortError::Unexpected(_) => internal(),
                }
            }
            _ => internal(),
        }
    }
}

fn internal() -> (StatusCode, ErrorBody) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        ErrorBody::new("internal", "An internal error occurred"),
    )
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }
        (status, Json(body)).into_response()
    }
}
