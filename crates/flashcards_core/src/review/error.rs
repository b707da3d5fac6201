//! Error types produced by the candidate review pipeline.

use std::fmt;
use uuid::Uuid;

use crate::ports::PortError;

/// One problem found in an incoming batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIssue {
    /// Path of the offending field, e.g. `actions[2].edited_back`.
    pub field: String,
    /// Position of the offending entry within the batch, if the issue is per entry.
    pub index: Option<usize>,
    pub message: String,
}

impl FieldIssue {
    pub fn batch(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            index: None,
            message: message.into(),
        }
    }

    pub fn entry(index: usize, field: &str, message: impl Into<String>) -> Self {
        Self {
            field: format!("actions[{}].{}", index, field),
            index: Some(index),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// The machine-checkable category of a [`ReviewError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Internal => "internal",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReviewError {
    #[error("Invalid candidate actions: {}", join(.0))]
    Validation(Vec<FieldIssue>),

    /// Used both for a missing session and for one owned by someone else.
    #[error("Generation session not found")]
    SessionNotFound,

    #[error("Candidates not found: {}", join(.0))]
    CandidatesNotFound(Vec<Uuid>),

    #[error("Failed to process candidate actions: {0}")]
    Internal(String),
}

impl ReviewError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ReviewError::Validation(_) => ErrorKind::Validation,
            ReviewError::SessionNotFound | ReviewError::CandidatesNotFound(_) => {
                ErrorKind::NotFound
            }
            ReviewError::Internal(_) => ErrorKind::Internal,
        }
    }
}

impl From<PortError> for ReviewError {
    fn from(err: PortError) -> Self {
        ReviewError::Internal(err.to_string())
    }
}

fn join<T: fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(|item| item.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
