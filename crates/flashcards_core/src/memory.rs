//! crates/flashcards_core/src/memory.rs
//!
//! An in-memory implementation of the storage ports, used by the test suites
//! and for running the API without a database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::domain::{
    AuthSession, ContentSource, EventLogEntry, Flashcard, FlashcardPage, FlashcardState,
    FlashcardUpdate, GenerationSession, NewFlashcard, NewGeneration, User, UserCredentials,
};
use crate::ports::{DatabaseService, PortError, PortResult, RecordStore, ReviewTransaction};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    users: Vec<UserCredentials>,
    auth_sessions: HashMap<String, AuthSession>,
    generations: Vec<GenerationSession>,
    flashcards: Vec<Flashcard>,
    events: Vec<EventLogEntry>,
}

impl MemoryState {
    fn active_card_mut(&mut self, user_id: Uuid, id: Uuid) -> PortResult<&mut Flashcard> {
        self.flashcards
            .iter_mut()
            .find(|c| c.id == id && c.user_id == user_id && c.state() == FlashcardState::Active)
            .ok_or_else(|| PortError::NotFound(format!("Flashcard {} not found", id)))
    }
}

/// Storage kept entirely in process memory.
///
/// Review transactions hold the store's lock for their whole lifetime and work
/// on a private copy of the data, which replaces the shared state on commit.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<MemoryState>>,
    review_reads: Arc<AtomicUsize>,
    failing_card: Arc<StdMutex<Option<Uuid>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of lookups issued through review transactions so far.
    pub fn review_reads(&self) -> usize {
        self.review_reads.load(Ordering::SeqCst)
    }

    /// Makes every later review update of `card_id` fail.
    pub fn fail_updates_of(&self, card_id: Uuid) {
        if let Ok(mut failing) = self.failing_card.lock() {
            *failing = Some(card_id);
        }
    }

    /// Raw lookup, ignoring ownership and state.
    pub async fn flashcard(&self, id: Uuid) -> Option<Flashcard> {
        let state = self.state.lock().await;
        state.flashcards.iter().find(|c| c.id == id).cloned()
    }

    /// Raw lookup, ignoring ownership.
    pub async fn generation(&self, id: Uuid) -> Option<GenerationSession> {
        let state = self.state.lock().await;
        state.generations.iter().find(|g| g.id == id).cloned()
    }

    pub async fn events(&self) -> Vec<EventLogEntry> {
        self.state.lock().await.events.clone()
    }
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for InMemoryStore {
    async fn create_user_with_email(&self, email: &str, hashed_password: &str) -> PortResult<User> {
        let mut state = self.state.lock().await;
        if state.users.iter().any(|u| u.email == email) {
            return Err(PortError::Conflict(format!("User {} already exists", email)));
        }
        let user_id = Uuid::new_v4();
        state.users.push(UserCredentials {
            user_id,
            email: email.to_string(),
            hashed_password: hashed_password.to_string(),
        });
        Ok(User {
            user_id,
            email: Some(email.to_string()),
        })
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let state = self.state.lock().await;
        state
            .users
            .iter()
            .find(|u| u.email == email)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", email)))
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        let mut state = self.state.lock().await;
        state.auth_sessions.insert(
            session_id.to_string(),
            AuthSession {
                id: session_id.to_string(),
                user_id,
                expires_at,
            },
        );
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        let state = self.state.lock().await;
        match state.auth_sessions.get(session_id) {
            Some(session) if session.expires_at > Utc::now() => Ok(session.user_id),
            _ => Err(PortError::Unauthorized),
        }
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        self.state.lock().await.auth_sessions.remove(session_id);
        Ok(())
    }

    async fn list_flashcards(
        &self,
        user_id: Uuid,
        page: u32,
        limit: u32,
    ) -> PortResult<FlashcardPage> {
        let state = self.state.lock().await;
        let mut active: Vec<Flashcard> = state
            .flashcards
            .iter()
            .filter(|c| c.user_id == user_id && c.state() == FlashcardState::Active)
            .cloned()
            .collect();
        active.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = active.len() as i64;
        let offset = (page.saturating_sub(1) as usize) * limit as usize;
        let items = active.into_iter().skip(offset).take(limit as usize).collect();
        Ok(FlashcardPage { items, total })
    }

    async fn get_flashcard(&self, user_id: Uuid, flashcard_id: Uuid) -> PortResult<Flashcard> {
        let mut state = self.state.lock().await;
        state.active_card_mut(user_id, flashcard_id).map(|c| c.clone())
    }

    async fn create_flashcard(&self, user_id: Uuid, card: NewFlashcard) -> PortResult<Flashcard> {
        let now = Utc::now();
        let card = Flashcard {
            id: Uuid::new_v4(),
            user_id,
            front: card.front,
            back: card.back,
            source: ContentSource::Manual,
            prompt: None,
            generation_id: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        self.state.lock().await.flashcards.push(card.clone());
        Ok(card)
    }

    async fn update_flashcard(
        &self,
        user_id: Uuid,
        flashcard_id: Uuid,
        update: FlashcardUpdate,
    ) -> PortResult<Flashcard> {
        let mut state = self.state.lock().await;
        let card = state.active_card_mut(user_id, flashcard_id)?;
        if let Some(front) = update.front {
            card.front = front;
        }
        if let Some(back) = update.back {
            card.back = back;
        }
        card.updated_at = Utc::now();
        Ok(card.clone())
    }

    async fn soft_delete_flashcard(&self, user_id: Uuid, flashcard_id: Uuid) -> PortResult<()> {
        let mut state = self.state.lock().await;
        let card = state.active_card_mut(user_id, flashcard_id)?;
        let now = Utc::now();
        card.deleted_at = Some(now);
        card.updated_at = now;
        Ok(())
    }

    async fn create_generation(
        &self,
        generation: NewGeneration,
    ) -> PortResult<(GenerationSession, Vec<Flashcard>)> {
        let now = Utc::now();
        let session = GenerationSession {
            id: Uuid::new_v4(),
            user_id: generation.user_id,
            source_text: generation.source_text,
            model: generation.model,
            created_at: now,
            generation_duration_ms: generation.generation_duration_ms,
            accepted_unedited_count: None,
            accepted_edited_count: None,
        };
        let candidates: Vec<Flashcard> = generation
            .proposals
            .into_iter()
            .map(|p| Flashcard {
                id: Uuid::new_v4(),
                user_id: generation.user_id,
                front: p.front,
                back: p.back,
                source: ContentSource::Ai,
                prompt: None,
                generation_id: Some(session.id),
                created_at: now,
                updated_at: now,
                deleted_at: None,
            })
            .collect();

        let mut state = self.state.lock().await;
        state.generations.push(session.clone());
        state.flashcards.extend(candidates.iter().cloned());
        Ok((session, candidates))
    }

    async fn list_generations(&self, user_id: Uuid) -> PortResult<Vec<GenerationSession>> {
        let state = self.state.lock().await;
        let mut sessions: Vec<GenerationSession> = state
            .generations
            .iter()
            .filter(|g| g.user_id == user_id)
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(sessions)
    }

    async fn get_generation(
        &self,
        user_id: Uuid,
        generation_id: Uuid,
    ) -> PortResult<GenerationSession> {
        let state = self.state.lock().await;
        state
            .generations
            .iter()
            .find(|g| g.id == generation_id && g.user_id == user_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Generation {} not found", generation_id)))
    }

    async fn get_candidates_for_generation(
        &self,
        generation_id: Uuid,
    ) -> PortResult<Vec<Flashcard>> {
        let state = self.state.lock().await;
        Ok(state
            .flashcards
            .iter()
            .filter(|c| c.state() == FlashcardState::Candidate { session_id: generation_id })
            .cloned()
            .collect())
    }
}

//=========================================================================================
// Review Unit of Work
//=========================================================================================

#[async_trait]
impl RecordStore for InMemoryStore {
    async fn begin_review(&self) -> PortResult<Box<dyn ReviewTransaction>> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        let failing_card = self.failing_card.lock().ok().and_then(|f| *f);
        Ok(Box::new(MemoryTransaction {
            guard,
            working,
            reads: self.review_reads.clone(),
            failing_card,
        }))
    }
}

struct MemoryTransaction {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
    reads: Arc<AtomicUsize>,
    failing_card: Option<Uuid>,
}

#[async_trait]
impl ReviewTransaction for MemoryTransaction {
    async fn get_session_by_id(
        &mut self,
        session_id: Uuid,
    ) -> PortResult<Option<GenerationSession>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.working.generations.iter().find(|g| g.id == session_id).cloned())
    }

    async fn get_flashcards_by_ids(&mut self, ids: &[Uuid]) -> PortResult<Vec<Flashcard>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .working
            .flashcards
            .iter()
            .filter(|c| ids.contains(&c.id))
            .cloned()
            .collect())
    }

    async fn get_reviewed_flashcard_ids(
        &mut self,
        session_id: Uuid,
        ids: &[Uuid],
    ) -> PortResult<Vec<Uuid>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let mut reviewed: Vec<Uuid> = self
            .working
            .events
            .iter()
            .filter(|e| e.generation_id == Some(session_id))
            .filter_map(|e| e.flashcard_id)
            .filter(|id| ids.contains(id))
            .collect();
        reviewed.sort();
        reviewed.dedup();
        Ok(reviewed)
    }

    async fn update_flashcard(&mut self, card: &Flashcard) -> PortResult<()> {
        if self.failing_card == Some(card.id) {
            return Err(PortError::Unexpected(format!("Injected failure updating {}", card.id)));
        }
        let stored = self
            .working
            .flashcards
            .iter_mut()
            .find(|c| c.id == card.id)
            .ok_or_else(|| PortError::NotFound(format!("Flashcard {} not found", card.id)))?;
        *stored = card.clone();
        Ok(())
    }

    async fn append_event_log(&mut self, entry: &EventLogEntry) -> PortResult<()> {
        self.working.events.push(entry.clone());
        Ok(())
    }

    async fn update_session_counters(
        &mut self,
        session_id: Uuid,
        accepted_unedited: i32,
        accepted_edited: i32,
    ) -> PortResult<()> {
        let session = self
            .working
            .generations
            .iter_mut()
            .find(|g| g.id == session_id)
            .ok_or_else(|| PortError::NotFound(format!("Generation {} not found", session_id)))?;
        session.accepted_unedited_count = Some(accepted_unedited);
        session.accepted_edited_count = Some(accepted_edited);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> PortResult<()> {
        let MemoryTransaction {
            mut guard, working, ..
        } = *self;
        *guard = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> PortResult<()> {
        Ok(())
    }
}
