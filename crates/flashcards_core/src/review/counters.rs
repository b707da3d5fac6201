//! Writes the batch's acceptance counts back onto the generation session.

use std::fmt;
use std::str::FromStr;

use super::error::ReviewError;
use super::executor::ExecutionOutcome;
use crate::domain::GenerationSession;
use crate::ports::ReviewTransaction;

/// How a batch's counts combine with the counters already on the session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CounterPolicy {
    /// The session keeps only the most recent batch's counts.
    #[default]
    Overwrite,
    /// Counts are added to whatever the session already holds.
    Accumulate,
}

impl FromStr for CounterPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "overwrite" => Ok(CounterPolicy::Overwrite),
            "accumulate" => Ok(CounterPolicy::Accumulate),
            other => Err(format!("'{}' is not one of overwrite, accumulate", other)),
        }
    }
}

impl fmt::Display for CounterPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CounterPolicy::Overwrite => f.write_str("overwrite"),
            CounterPolicy::Accumulate => f.write_str("accumulate"),
        }
    }
}

/// The (accepted unedited, accepted edited) pair to store after this batch.
pub fn next_counters(
    policy: CounterPolicy,
    session: &GenerationSession,
    outcome: &ExecutionOutcome,
) -> (i32, i32) {
    let unedited = outcome.accepted_unedited_count();
    let edited = outcome.accepted_edited_count();
    match policy {
        CounterPolicy::Overwrite => (unedited, edited),
        CounterPolicy::Accumulate => (
            session.accepted_unedited_count.unwrap_or(0) + unedited,
            session.accepted_edited_count.unwrap_or(0) + edited,
        ),
    }
}

pub async fn write_counters(
    tx: &mut dyn ReviewTransaction,
    policy: CounterPolicy,
    session: &GenerationSession,
    outcome: &ExecutionOutcome,
) -> Result<(i32, i32), ReviewError> {
    let (unedited, edited) = next_counters(policy, session, outcome);
    tx.update_session_counters(session.id, unedited, edited).await?;
    Ok((unedited, edited))
}
