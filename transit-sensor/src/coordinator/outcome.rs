//! Cycle outcomes.

use std::time::Duration;

use crate::auth::AuthError;
use crate::source::SourceError;

/// Why a cycle produced no departures. None of these touch cached state.
#[derive(Debug, thiserror::Error)]
pub enum FetchFault {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("fetch timed out after {0:?}")]
    Timeout(Duration),

    /// The backend answered with nothing usable.
    #[error("empty response")]
    Empty,

    /// The payload lacked the expected structure.
    #[error("malformed response")]
    Malformed,
}

/// Result of one polling cycle.
#[derive(Debug)]
pub enum CycleOutcome {
    /// Departures were normalized and absorbed.
    Fresh { departures: usize },

    /// The fetch failed; the next tick retries.
    TransientFailure(FetchFault),

    /// No usable credential; the station is unavailable until a cycle
    /// succeeds.
    AuthenticationFault(AuthError),
}

/// What `Coordinator::refresh` reports.
#[derive(Debug)]
pub struct CycleReport {
    /// Whether a new token was obtained before fetching.
    pub token_refreshed: bool,
    pub outcome: CycleOutcome,
}

impl CycleReport {
    pub fn is_fresh(&self) -> bool {
        matches!(self.outcome, CycleOutcome::Fresh { .. })
    }
}
