//! crates/flashcards_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Upper bound on the length of a flashcard's front text, in characters.
pub const FRONT_MAX_LEN: usize = 200;
/// Upper bound on the length of a flashcard's back text, in characters.
pub const BACK_MAX_LEN: usize = 500;

//=========================================================================================
// Users and Auth
//=========================================================================================

// Represents a user - used throughout app
#[derive(Debug, Clone)]
pub struct User {
    pub user_id: Uuid,
    pub email: Option<String>,
}

// Only used internally for login/signup - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: Uuid,
    pub email: String,
    pub hashed_password: String,
}

// Represents a browser login session (auth cookie)
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub id: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

//=========================================================================================
// Generation Sessions
//=========================================================================================

/// The record grouping all candidates produced by one AI generation request.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationSession {
    pub id: Uuid,
    pub user_id: Uuid,
    pub source_text: String,
    pub model: String,
    pub created_at: DateTime<Utc>,
    pub generation_duration_ms: i64,
    pub accepted_unedited_count: Option<i32>,
    pub accepted_edited_count: Option<i32>,
}

/// Everything needed to persist a finished generation request.
#[derive(Debug, Clone)]
pub struct NewGeneration {
    pub user_id: Uuid,
    pub source_text: String,
    pub model: String,
    pub generation_duration_ms: i64,
    pub proposals: Vec<FlashcardProposal>,
}

/// A front/back pair proposed by the generation model, not yet persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlashcardProposal {
    pub front: String,
    pub back: String,
}

//=========================================================================================
// Flashcards
//=========================================================================================

/// Where a flashcard's content came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentSource {
    Manual,
    Ai,
}

impl ContentSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentSource::Manual => "manual",
            ContentSource::Ai => "ai",
        }
    }
}

impl fmt::Display for ContentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manual" => Ok(ContentSource::Manual),
            "ai" => Ok(ContentSource::Ai),
            other => Err(format!("unknown content source '{}'", other)),
        }
    }
}

/// A single flashcard row. The same record type holds both review candidates
/// and active cards; see [`Flashcard::state`] for how the two are told apart.
#[derive(Debug, Clone, PartialEq)]
pub struct Flashcard {
    pub id: Uuid,
    pub user_id: Uuid,
    pub front: String,
    pub back: String,
    pub source: ContentSource,
    pub prompt: Option<String>,
    pub generation_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// The lifecycle state of a flashcard, derived from its session link and
/// soft-delete mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashcardState {
    /// Linked to the generation session that produced it, awaiting review.
    Candidate { session_id: Uuid },
    /// Study-ready.
    Active,
    /// Soft-deleted, whether by rejection or explicit removal.
    Rejected { deleted_at: DateTime<Utc> },
}

impl FlashcardState {
    pub fn derive(generation_id: Option<Uuid>, deleted_at: Option<DateTime<Utc>>) -> Self {
        match (deleted_at, generation_id) {
            (Some(deleted_at), _) => FlashcardState::Rejected { deleted_at },
            (None, Some(session_id)) => FlashcardState::Candidate { session_id },
            (None, None) => FlashcardState::Active,
        }
    }
}

impl Flashcard {
    pub fn state(&self) -> FlashcardState {
        FlashcardState::derive(self.generation_id, self.deleted_at)
    }
}

/// Fields for a manually created flashcard.
#[derive(Debug, Clone)]
pub struct NewFlashcard {
    pub front: String,
    pub back: String,
}

/// A partial update to an active flashcard.
#[derive(Debug, Clone, Default)]
pub struct FlashcardUpdate {
    pub front: Option<String>,
    pub back: Option<String>,
}

/// One page of a user's active flashcards.
#[derive(Debug, Clone)]
pub struct FlashcardPage {
    pub items: Vec<Flashcard>,
    pub total: i64,
}

//=========================================================================================
// Audit Log
//=========================================================================================

/// The kind of review decision an audit entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    CandidatesAcceptedUnedited,
    CandidatesAcceptedEdited,
    CandidatesRejected,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::CandidatesAcceptedUnedited => "candidates_accepted_unedited",
            EventType::CandidatesAcceptedEdited => "candidates_accepted_edited",
            EventType::CandidatesRejected => "candidates_rejected",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "candidates_accepted_unedited" => Ok(EventType::CandidatesAcceptedUnedited),
            "candidates_accepted_edited" => Ok(EventType::CandidatesAcceptedEdited),
            "candidates_rejected" => Ok(EventType::CandidatesRejected),
            other => Err(format!("unknown event type '{}'", other)),
        }
    }
}

/// An append-only audit entry.
#[derive(Debug, Clone, PartialEq)]
pub struct EventLogEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub flashcard_id: Option<Uuid>,
    pub event_type: EventType,
    pub source: ContentSource,
    pub generation_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}
