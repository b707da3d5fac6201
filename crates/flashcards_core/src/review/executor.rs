//! State transition engine for review candidates.
//!
//! | action   | effect                                             | resulting state |
//! |----------|----------------------------------------------------|-----------------|
//! | `accept` | clear session link                                 | active          |
//! | `edit`   | overwrite front/back, clear session link           | active          |
//! | `reject` | set soft-delete mark, keep session link            | rejected        |
//!
//! Every transition also refreshes `updated_at` and appends one audit entry.
//! The soft-delete mark is only ever lifted to undo a reject applied earlier
//! in the same batch.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::{debug, error};
use uuid::Uuid;

use super::error::ReviewError;
use super::{ReviewAction, ValidatedAction};
use crate::domain::{EventLogEntry, EventType, Flashcard};
use crate::ports::ReviewTransaction;

/// Ids grouped by the final outcome applied to them. Each id sits in exactly
/// one list, placed by the last action that touched it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionOutcome {
    pub accepted: Vec<Uuid>,
    pub edited: Vec<Uuid>,
    pub rejected: Vec<Uuid>,
}

impl ExecutionOutcome {
    fn record(&mut self, action: &ReviewAction, id: Uuid) {
        for list in [&mut self.accepted, &mut self.edited, &mut self.rejected] {
            list.retain(|existing| *existing != id);
        }
        match action {
            ReviewAction::Accept => self.accepted.push(id),
            ReviewAction::Edit { .. } => self.edited.push(id),
            ReviewAction::Reject => self.rejected.push(id),
        }
    }

    pub fn accepted_unedited_count(&self) -> i32 {
        self.accepted.len() as i32
    }

    pub fn accepted_edited_count(&self) -> i32 {
        self.edited.len() as i32
    }
}

impl ReviewAction {
    pub fn event_type(&self) -> EventType {
        match self {
            ReviewAction::Accept => EventType::CandidatesAcceptedUnedited,
            ReviewAction::Edit { .. } => EventType::CandidatesAcceptedEdited,
            ReviewAction::Reject => EventType::CandidatesRejected,
        }
    }
}

/// Computes the record that results from applying `action` to `card`.
pub fn transition(card: &Flashcard, action: &ReviewAction, now: DateTime<Utc>) -> Flashcard {
    let mut next = card.clone();
    match action {
        ReviewAction::Accept => {
            next.generation_id = None;
        }
        ReviewAction::Edit { front, back } => {
            next.front = front.clone();
            next.back = back.clone();
            next.generation_id = None;
        }
        ReviewAction::Reject => {
            next.deleted_at = Some(now);
        }
    }
    next.updated_at = now;
    next
}

/// Applies every action in order and appends one audit entry per action.
///
/// `candidates` holds the authorized snapshot and is updated in place, so a
/// repeated id sees the result of its earlier action. Accepting or editing a
/// card rejected earlier in the batch puts back the delete mark it had when
/// the batch started, so the last action wins without reviving cards that
/// were already deleted. Any storage failure aborts the batch.
pub async fn execute(
    tx: &mut dyn ReviewTransaction,
    user_id: Uuid,
    session_id: Uuid,
    candidates: &mut HashMap<Uuid, Flashcard>,
    actions: &[ValidatedAction],
    now: DateTime<Utc>,
) -> Result<ExecutionOutcome, ReviewError> {
    let mut outcome = ExecutionOutcome::default();
    let marks_before: HashMap<Uuid, Option<DateTime<Utc>>> = candidates
        .iter()
        .map(|(id, card)| (*id, card.deleted_at))
        .collect();

    for entry in actions {
        let current = candidates
            .get(&entry.candidate_id)
            .ok_or_else(|| ReviewError::CandidatesNotFound(vec![entry.candidate_id]))?;
        let mut next = transition(current, &entry.action, now);
        if !matches!(entry.action, ReviewAction::Reject) {
            if let Some(mark) = marks_before.get(&entry.candidate_id) {
                next.deleted_at = *mark;
            }
        }

        tx.update_flashcard(&next).await.map_err(|e| {
            error!(candidate_id = %entry.candidate_id, "Failed to update candidate: {}", e);
            ReviewError::from(e)
        })?;

        let event = EventLogEntry {
            id: Uuid::new_v4(),
            user_id,
            flashcard_id: Some(next.id),
            event_type: entry.action.event_type(),
            source: next.source,
            generation_id: Some(session_id),
            created_at: now,
        };
        tx.append_event_log(&event).await.map_err(|e| {
            error!(candidate_id = %entry.candidate_id, "Failed to append audit entry: {}", e);
            ReviewError::from(e)
        })?;

        debug!(
            candidate_id = %entry.candidate_id,
            index = entry.index,
            event = %event.event_type,
            "Applied candidate action"
        );
        outcome.record(&entry.action, entry.candidate_id);
        candidates.insert(next.id, next);
    }

    Ok(outcome)
}
