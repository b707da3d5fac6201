//! crates/flashcards_core/src/generation.rs
//!
//! Turns a block of study text into a generation session and its review candidates.

use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};
use uuid::Uuid;

use crate::content::clamp;
use crate::domain::{
    Flashcard, FlashcardProposal, GenerationSession, NewGeneration, BACK_MAX_LEN, FRONT_MAX_LEN,
};
use crate::ports::{DatabaseService, FlashcardGenerationService, PortError};

pub const SOURCE_TEXT_MIN_LEN: usize = 1000;
pub const SOURCE_TEXT_MAX_LEN: usize = 10000;

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("source_text must be between {min} and {max} characters, got {actual}")]
    InvalidSourceText {
        min: usize,
        max: usize,
        actual: usize,
    },
    #[error("Flashcard generator failed: {0}")]
    Generator(PortError),
    #[error("Failed to store generation: {0}")]
    Storage(PortError),
}

#[derive(Clone)]
pub struct GenerationWorkflow {
    db: Arc<dyn DatabaseService>,
    generator: Arc<dyn FlashcardGenerationService>,
}

impl GenerationWorkflow {
    pub fn new(
        db: Arc<dyn DatabaseService>,
        generator: Arc<dyn FlashcardGenerationService>,
    ) -> Self {
        Self { db, generator }
    }

    /// Generates candidates for `source_text` and stores them under a new session.
    pub async fn generate(
        &self,
        user_id: Uuid,
        source_text: &str,
    ) -> Result<(GenerationSession, Vec<Flashcard>), GenerationError> {
        let length = source_text.chars().count();
        if !(SOURCE_TEXT_MIN_LEN..=SOURCE_TEXT_MAX_LEN).contains(&length) {
            return Err(GenerationError::InvalidSourceText {
                min: SOURCE_TEXT_MIN_LEN,
                max: SOURCE_TEXT_MAX_LEN,
                actual: length,
            });
        }

        let started = Instant::now();
        let proposals = self
            .generator
            .generate_flashcards(source_text)
            .await
            .map_err(|e| {
                error!("Flashcard generation failed: {:?}", e);
                GenerationError::Generator(e)
            })?;
        let generation_duration_ms = started.elapsed().as_millis() as i64;

        let proposals = normalize(proposals);
        info!(
            user_id = %user_id,
            candidates = proposals.len(),
            duration_ms = generation_duration_ms,
            "Generated flashcard candidates"
        );

        self.db
            .create_generation(NewGeneration {
                user_id,
                source_text: source_text.to_string(),
                model: self.generator.model_name().to_string(),
                generation_duration_ms,
                proposals,
            })
            .await
            .map_err(GenerationError::Storage)
    }
}

/// Clamps proposals to the card length bounds and drops blank ones.
fn normalize(proposals: Vec<FlashcardProposal>) -> Vec<FlashcardProposal> {
    proposals
        .into_iter()
        .map(|p| FlashcardProposal {
            front: clamp(&p.front, FRONT_MAX_LEN),
            back: clamp(&p.back, BACK_MAX_LEN),
        })
        .filter(|p| !p.front.is_empty() && !p.back.is_empty())
        .collect()
}
