//! crates/flashcards_core/src/review/mod.rs
//!
//! The candidate review pipeline: takes a batch of accept/edit/reject decisions
//! for the candidates of one generation session and applies them in a single
//! unit of work.
//!
//! validate -> authorize -> execute -> write counters -> assemble

pub mod counters;
pub mod error;
pub mod executor;
pub mod guard;
pub mod result;
pub mod validator;

use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::ports::{RecordStore, ReviewTransaction};

pub use counters::CounterPolicy;
pub use error::{ErrorKind, FieldIssue, ReviewError};
pub use result::CandidateActionsResult;
pub use validator::MAX_BATCH_SIZE;

//=========================================================================================
// Request Types
//=========================================================================================

/// One requested decision, as received from the caller.
#[derive(Debug, Clone, Default)]
pub struct CandidateActionInput {
    pub candidate_id: String,
    pub action: String,
    pub edited_front: Option<String>,
    pub edited_back: Option<String>,
}

impl CandidateActionInput {
    pub fn accept(candidate_id: Uuid) -> Self {
        Self {
            candidate_id: candidate_id.to_string(),
            action: "accept".to_string(),
            ..Default::default()
        }
    }

    pub fn reject(candidate_id: Uuid) -> Self {
        Self {
            candidate_id: candidate_id.to_string(),
            action: "reject".to_string(),
            ..Default::default()
        }
    }

    pub fn edit(candidate_id: Uuid, front: &str, back: &str) -> Self {
        Self {
            candidate_id: candidate_id.to_string(),
            action: "edit".to_string(),
            edited_front: Some(front.to_string()),
            edited_back: Some(back.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CandidateActionsRequest {
    pub session_id: String,
    pub actions: Vec<CandidateActionInput>,
}

/// A decision that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewAction {
    Accept,
    Edit { front: String, back: String },
    Reject,
}

#[derive(Debug, Clone)]
pub struct ValidatedAction {
    /// Position within the submitted batch.
    pub index: usize,
    pub candidate_id: Uuid,
    pub action: ReviewAction,
}

#[derive(Debug, Clone)]
pub struct ValidatedBatch {
    pub session_id: Uuid,
    pub actions: Vec<ValidatedAction>,
}

//=========================================================================================
// Review Service
//=========================================================================================

/// Runs candidate review batches against a [`RecordStore`].
#[derive(Clone)]
pub struct CandidateReviewService {
    store: Arc<dyn RecordStore>,
    policy: CounterPolicy,
}

impl CandidateReviewService {
    pub fn new(store: Arc<dyn RecordStore>, policy: CounterPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> CounterPolicy {
        self.policy
    }

    /// Validates, authorizes and applies a batch of candidate actions.
    ///
    /// Validation failures return before the store is touched. Everything after
    /// that runs in one transaction, which is committed only when every action
    /// and the counter write succeeded.
    #[instrument(
        skip(self, request),
        fields(session_id = %request.session_id, batch_size = request.actions.len())
    )]
    pub async fn process_candidate_actions(
        &self,
        user_id: Uuid,
        request: &CandidateActionsRequest,
    ) -> Result<CandidateActionsResult, ReviewError> {
        let batch = validator::validate(request)?;

        let mut tx = self.store.begin_review().await?;
        match self.apply(tx.as_mut(), user_id, &batch).await {
            Ok(result) => {
                tx.commit().await?;
                info!(
                    accepted = result.accepted.len(),
                    edited = result.edited.len(),
                    rejected = result.rejected.len(),
                    "Candidate actions applied"
                );
                Ok(result)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    error!("Failed to roll back candidate review: {}", rollback_err);
                }
                Err(err)
            }
        }
    }

    async fn apply(
        &self,
        tx: &mut dyn ReviewTransaction,
        user_id: Uuid,
        batch: &ValidatedBatch,
    ) -> Result<CandidateActionsResult, ReviewError> {
        let ids: Vec<Uuid> = batch.actions.iter().map(|a| a.candidate_id).collect();
        let mut authorized = guard::authorize(tx, user_id, batch.session_id, &ids).await?;

        let outcome = executor::execute(
            tx,
            user_id,
            batch.session_id,
            &mut authorized.candidates,
            &batch.actions,
            Utc::now(),
        )
        .await?;

        counters::write_counters(tx, self.policy, &authorized.session, &outcome).await?;

        Ok(result::assemble(outcome))
    }
}
