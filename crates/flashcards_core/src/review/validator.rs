//! Structural checks on an incoming batch, run before any storage access.

use uuid::Uuid;

use super::error::{FieldIssue, ReviewError};
use super::{CandidateActionsRequest, ReviewAction, ValidatedAction, ValidatedBatch};
use crate::content::{check_back, check_front};

/// Largest number of actions accepted in one batch.
pub const MAX_BATCH_SIZE: usize = 100;

/// Validates the request shape and converts it into typed actions.
///
/// Every problem found is reported, not just the first. Repeated candidate ids
/// are allowed; later entries win when the batch is executed.
pub fn validate(request: &CandidateActionsRequest) -> Result<ValidatedBatch, ReviewError> {
    let mut issues = Vec::new();

    let session_id = match Uuid::parse_str(request.session_id.trim()) {
        Ok(id) => Some(id),
        Err(_) => {
            issues.push(FieldIssue::batch("session_id", "must be a valid UUID"));
            None
        }
    };

    if request.actions.is_empty() {
        issues.push(FieldIssue::batch("actions", "must contain at least 1 action"));
        return Err(ReviewError::Validation(issues));
    }
    if request.actions.len() > MAX_BATCH_SIZE {
        issues.push(FieldIssue::batch(
            "actions",
            format!(
                "must contain at most {} actions (max batch size), got {}",
                MAX_BATCH_SIZE,
                request.actions.len()
            ),
        ));
        return Err(ReviewError::Validation(issues));
    }

    let mut actions = Vec::with_capacity(request.actions.len());
    for (index, input) in request.actions.iter().enumerate() {
        let candidate_id = match Uuid::parse_str(input.candidate_id.trim()) {
            Ok(id) => Some(id),
            Err(_) => {
                issues.push(FieldIssue::entry(index, "candidate_id", "must be a valid UUID"));
                None
            }
        };

        let action = match input.action.as_str() {
            "accept" => Some(ReviewAction::Accept),
            "reject" => Some(ReviewAction::Reject),
            "edit" => {
                let front = edited_field(
                    index,
                    "edited_front",
                    input.edited_front.as_deref(),
                    check_front,
                    &mut issues,
                );
                let back = edited_field(
                    index,
                    "edited_back",
                    input.edited_back.as_deref(),
                    check_back,
                    &mut issues,
                );
                match (front, back) {
                    (Some(front), Some(back)) => Some(ReviewAction::Edit { front, back }),
                    _ => None,
                }
            }
            other => {
                issues.push(FieldIssue::entry(
                    index,
                    "action",
                    format!("'{}' is not one of accept, edit, reject", other),
                ));
                None
            }
        };

        if let (Some(candidate_id), Some(action)) = (candidate_id, action) {
            actions.push(ValidatedAction {
                index,
                candidate_id,
                action,
            });
        }
    }

    match session_id {
        Some(session_id) if issues.is_empty() => Ok(ValidatedBatch {
            session_id,
            actions,
        }),
        _ => Err(ReviewError::Validation(issues)),
    }
}

fn edited_field(
    index: usize,
    field: &str,
    value: Option<&str>,
    check: fn(&str) -> Result<(), String>,
    issues: &mut Vec<FieldIssue>,
) -> Option<String> {
    let Some(value) = value else {
        issues.push(FieldIssue::entry(index, field, "is required for edit"));
        return None;
    };
    match check(value) {
        Ok(()) => Some(value.to_string()),
        Err(message) => {
            issues.push(FieldIssue::entry(index, field, message));
            None
        }
    }
}
