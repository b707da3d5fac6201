//! Builds the success response of a review batch.

use uuid::Uuid;

use super::executor::ExecutionOutcome;

/// Candidate ids grouped by the outcome applied to them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateActionsResult {
    pub accepted: Vec<Uuid>,
    pub edited: Vec<Uuid>,
    pub rejected: Vec<Uuid>,
}

impl CandidateActionsResult {
    pub fn total(&self) -> usize {
        self.accepted.len() + self.edited.len() + self.rejected.len()
    }
}

pub fn assemble(outcome: ExecutionOutcome) -> CandidateActionsResult {
    let ExecutionOutcome {
        accepted,
        edited,
        rejected,
    } = outcome;
    CandidateActionsResult {
        accepted,
        edited,
        rejected,
    }
}
