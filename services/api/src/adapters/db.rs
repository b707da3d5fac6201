//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` and `RecordStore` ports from the `core` crate. It handles
//! all interactions with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use flashcards_core::domain::{
    ContentSource, EventLogEntry, Flashcard, FlashcardPage, FlashcardUpdate, GenerationSession,
    NewFlashcard, NewGeneration, User, UserCredentials,
};
use flashcards_core::ports::{
    DatabaseService, PortError, PortResult, RecordStore, ReviewTransaction,
};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

const FLASHCARD_COLUMNS: &str =
    "id, user_id, front, back, source, prompt, generation_id, created_at, updated_at, deleted_at";
const GENERATION_COLUMNS: &str = "id, user_id, source_text, model, created_at, \
     generation_duration_ms, accepted_unedited_count, accepted_edited_count";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the storage ports.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserCredentialsRecord {
    user_id: Uuid,
    email: String,
    hashed_password: String,
}
impl UserCredentialsRecord {
    fn to_domain(self) -> UserCredentials {
        UserCredentials {
            user_id: self.user_id,
            email: self.email,
            hashed_password: self.hashed_password,
        }
    }
}

#[derive(FromRow)]
struct GenerationRecord {
    id: Uuid,
    user_id: Uuid,
    source_text: String,
    model: String,
    created_at: DateTime<Utc>,
    generation_duration_ms: i64,
    accepted_unedited_count: Option<i32>,
    accepted_edited_count: Option<i32>,
}
impl GenerationRecord {
    fn to_domain(self) -> GenerationSession {
        GenerationSession {
            id: self.id,
            user_id: self.user_id,
            source_text: self.source_text,
            model: self.model,
            created_at: self.created_at,
            generation_duration_ms: self.generation_duration_ms,
            accepted_unedited_count: self.accepted_unedited_count,
            accepted_edited_count: self.accepted_edited_count,
        }
    }
}

#[derive(FromRow)]
struct FlashcardRecord {
    id: Uuid,
    user_id: Uuid,
    front: String,
    back: String,
    source: String,
    prompt: Option<String>,
    generation_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}
impl FlashcardRecord {
    fn to_domain(self) -> PortResult<Flashcard> {
        let source = self
            .source
            .parse::<ContentSource>()
            .map_err(PortError::Unexpected)?;
        Ok(Flashcard {
            id: self.id,
            user_id: self.user_id,
            front: self.front,
            back: self.back,
            source,
            prompt: self.prompt,
            generation_id: self.generation_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
            deleted_at: self.deleted_at,
        })
    }
}

fn cards_to_domain(records: Vec<FlashcardRecord>) -> PortResult<Vec<Flashcard>> {
    records.into_iter().map(FlashcardRecord::to_domain).collect()
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    async fn create_user_with_email(&self, email: &str, hashed_password: &str) -> PortResult<User> {
        let user_id = Uuid::new_v4();
        sqlx::query("INSERT INTO users (user_id, email, hashed_password) VALUES ($1, $2, $3)")
            .bind(user_id)
            .bind(email)
            .bind(hashed_password)
            .execute(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(db) if db.is_unique_violation() => {
                    PortError::Conflict(format!("User {} already exists", email))
                }
                other => unexpected(other),
            })?;
        Ok(User {
            user_id,
            email: Some(email.to_string()),
        })
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let record = sqlx::query_as::<_, UserCredentialsRecord>(
            "SELECT user_id, email, hashed_password FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::NotFound(format!("User {} not found", email)),
            _ => unexpected(e),
        })?;
        Ok(record.to_domain())
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query("INSERT INTO auth_sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(session_id)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        let user_id: Option<Uuid> = sqlx::query_scalar(
            "SELECT user_id FROM auth_sessions WHERE id = $1 AND expires_at > NOW()",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        user_id.ok_or(PortError::Unauthorized)
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn list_flashcards(
        &self,
        user_id: Uuid,
        page: u32,
        limit: u32,
    ) -> PortResult<FlashcardPage> {
        let offset = i64::from(page.saturating_sub(1)) * i64::from(limit);
        let records = sqlx::query_as::<_, FlashcardRecord>(&format!(
            "SELECT {} FROM flashcards \
             WHERE user_id = $1 AND generation_id IS NULL AND deleted_at IS NULL \
             ORDER BY created_at DESC, id LIMIT $2 OFFSET $3",
            FLASHCARD_COLUMNS
        ))
        .bind(user_id)
        .bind(i64::from(limit))
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM flashcards \
             WHERE user_id = $1 AND generation_id IS NULL AND deleted_at IS NULL",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(FlashcardPage {
            items: cards_to_domain(records)?,
            total,
        })
    }

    async fn get_flashcard(&self, user_id: Uuid, flashcard_id: Uuid) -> PortResult<Flashcard> {
        let record = sqlx::query_as::<_, FlashcardRecord>(&format!(
            "SELECT {} FROM flashcards \
             WHERE id = $1 AND user_id = $2 AND generation_id IS NULL AND deleted_at IS NULL",
            FLASHCARD_COLUMNS
        ))
        .bind(flashcard_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound(format!("Flashcard {} not found", flashcard_id)))?;
        record.to_domain()
    }

    async fn create_flashcard(&self, user_id: Uuid, card: NewFlashcard) -> PortResult<Flashcard> {
        let record = sqlx::query_as::<_, FlashcardRecord>(&format!(
            "INSERT INTO flashcards (id, user_id, front, back, source) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            FLASHCARD_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(&card.front)
        .bind(&card.back)
        .bind(ContentSource::Manual.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        record.to_domain()
    }

    async fn update_flashcard(
        &self,
        user_id: Uuid,
        flashcard_id: Uuid,
        update: FlashcardUpdate,
    ) -> PortResult<Flashcard> {
        let record = sqlx::query_as::<_, FlashcardRecord>(&format!(
            "UPDATE flashcards \
             SET front = COALESCE($3, front), back = COALESCE($4, back), updated_at = NOW() \
             WHERE id = $1 AND user_id = $2 AND generation_id IS NULL AND deleted_at IS NULL \
             RETURNING {}",
            FLASHCARD_COLUMNS
        ))
        .bind(flashcard_id)
        .bind(user_id)
        .bind(update.front)
        .bind(update.back)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound(format!("Flashcard {} not found", flashcard_id)))?;
        record.to_domain()
    }

    async fn soft_delete_flashcard(&self, user_id: Uuid, flashcard_id: Uuid) -> PortResult<()> {
        let result = sqlx::query(
            "UPDATE flashcards SET deleted_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND user_id = $2 AND generation_id IS NULL AND deleted_at IS NULL",
        )
        .bind(flashcard_id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Flashcard {} not found", flashcard_id)));
        }
        Ok(())
    }

    async fn create_generation(
        &self,
        generation: NewGeneration,
    ) -> PortResult<(GenerationSession, Vec<Flashcard>)> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        let session = sqlx::query_as::<_, GenerationRecord>(&format!(
            "INSERT INTO generations (id, user_id, source_text, model, generation_duration_ms) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            GENERATION_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(generation.user_id)
        .bind(&generation.source_text)
        .bind(&generation.model)
        .bind(generation.generation_duration_ms)
        .fetch_one(&mut *tx)
        .await
        .map_err(unexpected)?
        .to_domain();

        let mut candidates = Vec::with_capacity(generation.proposals.len());
        for proposal in &generation.proposals {
            let record = sqlx::query_as::<_, FlashcardRecord>(&format!(
                "INSERT INTO flashcards (id, user_id, front, back, source, generation_id) \
                 VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
                FLASHCARD_COLUMNS
            ))
            .bind(Uuid::new_v4())
            .bind(generation.user_id)
            .bind(&proposal.front)
            .bind(&proposal.back)
            .bind(ContentSource::Ai.as_str())
            .bind(session.id)
            .fetch_one(&mut *tx)
            .await
            .map_err(unexpected)?;
            candidates.push(record.to_domain()?);
        }

        tx.commit().await.map_err(unexpected)?;
        Ok((session, candidates))
    }

    async fn list_generations(&self, user_id: Uuid) -> PortResult<Vec<GenerationSession>> {
        let records = sqlx::query_as::<_, GenerationRecord>(&format!(
            "SELECT {} FROM generations WHERE user_id = $1 ORDER BY created_at DESC",
            GENERATION_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn get_generation(
        &self,
        user_id: Uuid,
        generation_id: Uuid,
    ) -> PortResult<GenerationSession> {
        let record = sqlx::query_as::<_, GenerationRecord>(&format!(
            "SELECT {} FROM generations WHERE id = $1 AND user_id = $2",
            GENERATION_COLUMNS
        ))
        .bind(generation_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound(format!("Generation {} not found", generation_id)))?;
        Ok(record.to_domain())
    }

    async fn get_candidates_for_generation(
        &self,
        generation_id: Uuid,
    ) -> PortResult<Vec<Flashcard>> {
        let records = sqlx::query_as::<_, FlashcardRecord>(&format!(
            "SELECT {} FROM flashcards \
             WHERE generation_id = $1 AND deleted_at IS NULL ORDER BY created_at ASC, id",
            FLASHCARD_COLUMNS
        ))
        .bind(generation_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        cards_to_domain(records)
    }
}

//=========================================================================================
// `RecordStore` Trait Implementation (review unit of work)
//=========================================================================================

#[async_trait]
impl RecordStore for DbAdapter {
    async fn begin_review(&self) -> PortResult<Box<dyn ReviewTransaction>> {
        let tx = self.pool.begin().await.map_err(unexpected)?;
        Ok(Box::new(PgReviewTransaction { tx }))
    }
}

/// A review batch running inside one Postgres transaction. Dropping it
/// without calling `commit` rolls the transaction back.
pub struct PgReviewTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl ReviewTransaction for PgReviewTransaction {
    async fn get_session_by_id(
        &mut self,
        session_id: Uuid,
    ) -> PortResult<Option<GenerationSession>> {
        let record = sqlx::query_as::<_, GenerationRecord>(&format!(
            "SELECT {} FROM generations WHERE id = $1 FOR UPDATE",
            GENERATION_COLUMNS
        ))
        .bind(session_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(unexpected)?;
        Ok(record.map(GenerationRecord::to_domain))
    }

    async fn get_flashcards_by_ids(&mut self, ids: &[Uuid]) -> PortResult<Vec<Flashcard>> {
        let records = sqlx::query_as::<_, FlashcardRecord>(&format!(
            "SELECT {} FROM flashcards WHERE id = ANY($1) FOR UPDATE",
            FLASHCARD_COLUMNS
        ))
        .bind(ids.to_vec())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(unexpected)?;
        cards_to_domain(records)
    }

    async fn get_reviewed_flashcard_ids(
        &mut self,
        session_id: Uuid,
        ids: &[Uuid],
    ) -> PortResult<Vec<Uuid>> {
        sqlx::query_scalar(
            "SELECT DISTINCT flashcard_id FROM generation_event_logs \
             WHERE generation_id = $1 AND flashcard_id = ANY($2)",
        )
        .bind(session_id)
        .bind(ids.to_vec())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(unexpected)
    }

    async fn update_flashcard(&mut self, card: &Flashcard) -> PortResult<()> {
        let result = sqlx::query(
            "UPDATE flashcards \
             SET front = $2, back = $3, generation_id = $4, deleted_at = $5, updated_at = $6 \
             WHERE id = $1 AND user_id = $7",
        )
        .bind(card.id)
        .bind(&card.front)
        .bind(&card.back)
        .bind(card.generation_id)
        .bind(card.deleted_at)
        .bind(card.updated_at)
        .bind(card.user_id)
        .execute(&mut *self.tx)
        .await
        .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Flashcard {} not found", card.id)));
        }
        Ok(())
    }

    async fn append_event_log(&mut self, entry: &EventLogEntry) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO generation_event_logs \
             (id, user_id, flashcard_id, event_type, source, generation_id, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(entry.id)
        .bind(entry.user_id)
        .bind(entry.flashcard_id)
        .bind(entry.event_type.as_str())
        .bind(entry.source.as_str())
        .bind(entry.generation_id)
        .bind(entry.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    async fn update_session_counters(
        &mut self,
        session_id: Uuid,
        accepted_unedited: i32,
        accepted_edited: i32,
    ) -> PortResult<()> {
        sqlx::query(
            "UPDATE generations SET accepted_unedited_count = $2, accepted_edited_count = $3 \
             WHERE id = $1",
        )
        .bind(session_id)
        .bind(accepted_unedited)
        .bind(accepted_edited)
        .execute(&mut *self.tx)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> PortResult<()> {
        self.tx.commit().await.map_err(unexpected)
    }

    async fn rollback(self: Box<Self>) -> PortResult<()> {
        self.tx.rollback().await.map_err(unexpected)
    }
}
