//! Store abstractions for match events, team compositions and contests.
//!
//! The ranking pipeline only reads through these traits; persistence and
//! ingestion belong to whoever implements them.

use crate::domain::{
    ContestId, ContestInfo, ContestParticipant, MatchEvent, MatchId, PlayerId, TeamComposition,
    TeamId,
};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

pub mod mock;

pub use mock::MockStore;

/// Append-only source of scoring events.
#[async_trait]
pub trait MatchEventStore: Send + Sync + fmt::Debug {
    /// All events for a player in a match. No events is an empty vector, not an error.
    async fn events_for(
        &self,
        player_id: &PlayerId,
        match_id: &MatchId,
    ) -> Result<Vec<MatchEvent>, StoreError>;
}

/// Team compositions and contest entries.
#[async_trait]
pub trait TeamStore: Send + Sync + fmt::Debug {
    async fn teams_in_contest(
        &self,
        contest_id: &ContestId,
    ) -> Result<Vec<TeamComposition>, StoreError>;

    async fn participants_in_contest(
        &self,
        contest_id: &ContestId,
    ) -> Result<Vec<ContestParticipant>, StoreError>;

    /// Persist ranks computed by the ranking pipeline.
    async fn record_ranks(
        &self,
        contest_id: &ContestId,
        ranks: &[(TeamId, u32)],
    ) -> Result<(), StoreError>;
}

/// Contest metadata.
#[async_trait]
pub trait ContestStore: Send + Sync + fmt::Debug {
    /// `None` when the contest does not exist.
    async fn contest_info(&self, contest_id: &ContestId)
        -> Result<Option<ContestInfo>, StoreError>;

    /// Contests scored from the given match, in id order.
    async fn contests_for_match(&self, match_id: &MatchId) -> Result<Vec<ContestId>, StoreError>;
}

/// The three collaborators bundled for injection.
#[derive(Debug, Clone)]
pub struct Stores {
    pub events: Arc<dyn MatchEventStore>,
    pub teams: Arc<dyn TeamStore>,
    pub contests: Arc<dyn ContestStore>,
}

impl Stores {
    pub fn new(
        events: Arc<dyn MatchEventStore>,
        teams: Arc<dyn TeamStore>,
        contests: Arc<dyn ContestStore>,
    ) -> Self {
        Self {
            events,
            teams,
            contests,
        }
    }

    /// Use one object for all three roles.
    pub fn shared<S>(store: Arc<S>) -> Self
    where
        S: MatchEventStore + TeamStore + ContestStore + 'static,
    {
        Self {
            events: store.clone(),
            teams: store.clone(),
            contests: store,
        }
    }
}

/// Error type for store operations.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The backing store could not be reached or the read failed.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
    /// A row could not be decoded into a domain value.
    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                StoreError::Corrupt(err.to_string())
            }
            other => StoreError::Unavailable(other.to_string()),
        }
    }
}
