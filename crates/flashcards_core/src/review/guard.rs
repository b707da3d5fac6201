//! Ownership guard: resolves the session and every referenced candidate in one
//! pass and decides whether the requesting user may act on them.
//!
//! Storage lookups here are unfiltered; all authorization decisions are made
//! by the pure functions in this module.

use std::collections::{HashMap, HashSet};
use tracing::warn;
use uuid::Uuid;

use super::error::ReviewError;
use crate::domain::{Flashcard, FlashcardState, GenerationSession};
use crate::ports::ReviewTransaction;

/// The snapshot every action in a batch is executed against.
#[derive(Debug, Clone)]
pub struct AuthorizedBatch {
    pub session: GenerationSession,
    pub candidates: HashMap<Uuid, Flashcard>,
}

/// Resolves and authorizes a batch before any mutation happens.
pub async fn authorize(
    tx: &mut dyn ReviewTransaction,
    user_id: Uuid,
    session_id: Uuid,
    candidate_ids: &[Uuid],
) -> Result<AuthorizedBatch, ReviewError> {
    let session = tx.get_session_by_id(session_id).await?;
    let session = check_session(session, user_id)?;

    let requested = distinct(candidate_ids);
    let cards = tx.get_flashcards_by_ids(&requested).await?;

    // Cards accepted in this session no longer carry the link; their
    // membership is established through the audit log instead.
    let unlinked: Vec<Uuid> = cards
        .iter()
        .filter(|card| card.user_id == user_id && card.state() == FlashcardState::Active)
        .map(|card| card.id)
        .collect();
    let reviewed = if unlinked.is_empty() {
        Vec::new()
    } else {
        tx.get_reviewed_flashcard_ids(session_id, &unlinked).await?
    };

    let candidates = select_candidates(&session, user_id, &requested, cards, &reviewed)?;
    Ok(AuthorizedBatch {
        session,
        candidates,
    })
}

/// A session owned by someone else is reported exactly like a missing one.
pub fn check_session(
    session: Option<GenerationSession>,
    user_id: Uuid,
) -> Result<GenerationSession, ReviewError> {
    match session {
        Some(session) if session.user_id == user_id => Ok(session),
        Some(session) => {
            warn!(
                session_id = %session.id,
                user_id = %user_id,
                "Rejected candidate review on a session owned by another user"
            );
            Err(ReviewError::SessionNotFound)
        }
        None => Err(ReviewError::SessionNotFound),
    }
}

/// Keeps the cards the user owns that belong to the session, and fails with
/// the requested ids that did not survive the filter, in request order.
pub fn select_candidates(
    session: &GenerationSession,
    user_id: Uuid,
    requested: &[Uuid],
    cards: Vec<Flashcard>,
    reviewed_in_session: &[Uuid],
) -> Result<HashMap<Uuid, Flashcard>, ReviewError> {
    let reviewed: HashSet<Uuid> = reviewed_in_session.iter().copied().collect();

    let candidates: HashMap<Uuid, Flashcard> = cards
        .into_iter()
        .filter(|card| card.user_id == user_id)
        .filter(|card| belongs_to_session(card, session.id, &reviewed))
        .map(|card| (card.id, card))
        .collect();

    let missing: Vec<Uuid> = requested
        .iter()
        .filter(|id| !candidates.contains_key(*id))
        .copied()
        .collect();

    if missing.is_empty() {
        Ok(candidates)
    } else {
        warn!(
            session_id = %session.id,
            missing = missing.len(),
            "Candidate review referenced unknown or foreign candidates"
        );
        Err(ReviewError::CandidatesNotFound(missing))
    }
}

fn belongs_to_session(card: &Flashcard, session_id: Uuid, reviewed: &HashSet<Uuid>) -> bool {
    match card.state() {
        FlashcardState::Candidate { session_id: linked } => linked == session_id,
        // A rejected card keeps its link; once the link is gone a deleted
        // card belongs to no session.
        FlashcardState::Rejected { .. } => card.generation_id == Some(session_id),
        FlashcardState::Active => reviewed.contains(&card.id),
    }
}

fn distinct(ids: &[Uuid]) -> Vec<Uuid> {
    let mut seen = HashSet::new();
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}
