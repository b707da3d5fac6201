//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use flashcards_core::{
    CandidateReviewService, DatabaseService, FlashcardGenerationService, GenerationWorkflow,
    RecordStore,
};
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseService>,
    pub config: Arc<Config>,
    pub generation: GenerationWorkflow,
    pub review: CandidateReviewService,
}

impl AppState {
    /// Wires the core services on top of one storage backend.
    pub fn new<S>(
        store: Arc<S>,
        generator: Arc<dyn FlashcardGenerationService>,
        config: Arc<Config>,
    ) -> Self
    where
        S: DatabaseService + RecordStore + 'static,
    {
        let db: Arc<dyn DatabaseService> = store.clone();
        let records: Arc<dyn RecordStore> = store;
        Self {
            generation: GenerationWorkflow::new(db.clone(), generator),
            review: CandidateReviewService::new(records, config.counter_policy),
            db,
            config,
        }
    }
}
