//! crates/flashcards_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or APIs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    EventLogEntry, Flashcard, FlashcardPage, FlashcardProposal, FlashcardUpdate,
    GenerationSession, NewFlashcard, NewGeneration, User, UserCredentials,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- Auth Methods ---
    async fn create_user_with_email(&self, email: &str, hashed_password: &str)
        -> PortResult<User>;

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    /// Resolves an unexpired auth session to its user. Expired or unknown
    /// sessions yield `PortError::Unauthorized`.
    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;

    // --- Active Flashcards ---
    /// Lists the user's active cards, newest first. `page` is 1-based.
    async fn list_flashcards(&self, user_id: Uuid, page: u32, limit: u32)
        -> PortResult<FlashcardPage>;

    async fn get_flashcard(&self, user_id: Uuid, flashcard_id: Uuid) -> PortResult<Flashcard>;

    async fn create_flashcard(&self, user_id: Uuid, card: NewFlashcard) -> PortResult<Flashcard>;

    async fn update_flashcard(
        &self,
        user_id: Uuid,
        flashcard_id: Uuid,
        update: FlashcardUpdate,
    ) -> PortResult<Flashcard>;

    async fn soft_delete_flashcard(&self, user_id: Uuid, flashcard_id: Uuid) -> PortResult<()>;

    // --- Generation Sessions ---
    /// Persists a generation session together with one candidate per proposal.
    async fn create_generation(
        &self,
        generation: NewGeneration,
    ) -> PortResult<(GenerationSession, Vec<Flashcard>)>;

    async fn list_generations(&self, user_id: Uuid) -> PortResult<Vec<GenerationSession>>;

    async fn get_generation(&self, user_id: Uuid, generation_id: Uuid)
        -> PortResult<GenerationSession>;

    /// Cards still linked to the session and not soft-deleted.
    async fn get_candidates_for_generation(&self, generation_id: Uuid)
        -> PortResult<Vec<Flashcard>>;
}

/// The record store used by the candidate review pipeline.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Opens a unit of work spanning the whole review batch.
    async fn begin_review(&self) -> PortResult<Box<dyn ReviewTransaction>>;
}

/// A unit of work over the record store. Nothing written through it is
/// visible to other callers until `commit`; dropping it without committing
/// discards the writes.
#[async_trait]
pub trait ReviewTransaction: Send {
    /// Raw lookup by id, without any ownership filter.
    async fn get_session_by_id(&mut self, session_id: Uuid)
        -> PortResult<Option<GenerationSession>>;

    /// Raw lookup by ids, without any ownership or session filter. Unknown ids
    /// are simply absent from the result.
    async fn get_flashcards_by_ids(&mut self, ids: &[Uuid]) -> PortResult<Vec<Flashcard>>;

    /// The subset of `ids` that already have an audit entry for `session_id`.
    async fn get_reviewed_flashcard_ids(
        &mut self,
        session_id: Uuid,
        ids: &[Uuid],
    ) -> PortResult<Vec<Uuid>>;

    async fn update_flashcard(&mut self, card: &Flashcard) -> PortResult<()>;

    async fn append_event_log(&mut self, entry: &EventLogEntry) -> PortResult<()>;

    async fn update_session_counters(
        &mut self,
        session_id: Uuid,
        accepted_unedited: i32,
        accepted_edited: i32,
    ) -> PortResult<()>;

    async fn commit(self: Box<Self>) -> PortResult<()>;

    async fn rollback(self: Box<Self>) -> PortResult<()>;
}

#[async_trait]
pub trait FlashcardGenerationService: Send + Sync {
    /// The model identifier recorded on generation sessions.
    fn model_name(&self) -> &str;

    /// Proposes front/back pairs for the given study text.
    async fn generate_flashcards(&self, source_text: &str) -> PortResult<Vec<FlashcardProposal>>;
}
