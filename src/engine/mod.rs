//! Pure computation engine(s) for deterministic contest ranking.

use crate::datasource::StoreError;
use crate::domain::{CompositionError, ContestId};
use thiserror::Error;

pub mod calculator;
pub mod diff;
pub mod ranking;

pub use calculator::{PlayerContribution, PointCalculator, TeamScore};
pub use diff::{classify_update, diff_rankings, removed_users};
pub use ranking::RankingComputer;

#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// The contest has no row in the contest store.
    #[error("Contest not found: {0}")]
    ContestNotFound(ContestId),
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Upstream data broke a structural invariant. Never repaired here.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),
}

impl From<CompositionError> for EngineError {
    fn from(err: CompositionError) -> Self {
        EngineError::InvariantViolation(err.to_string())
    }
}
