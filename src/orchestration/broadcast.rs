//! Outbound leaderboard updates and the sinks that receive them.
//!
//! Delivery to clients is someone else's job; the dispatcher only hands a
//! finished update to a `Broadcaster`.

use crate::domain::{ContestId, LeaderboardEntry, RankChangeEvent, UpdateType, UserId};
use crate::orchestration::dispatcher::{Trigger, TriggerSource};
use crate::orchestration::pipeline::CycleOutcome;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Composite update emitted once per successful dispatch cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardUpdate {
    pub contest_id: ContestId,
    pub update_id: Uuid,
    pub update_type: UpdateType,
    pub timestamp: DateTime<Utc>,
    pub affected_user_ids: Vec<UserId>,
    pub rank_changes: Vec<RankChangeEvent>,
    pub top_performers: Vec<LeaderboardEntry>,
    pub total_participants: u32,
    pub trigger_source: TriggerSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_event_id: Option<String>,
    /// Users who were ranked before this cycle and no longer are.
    pub removed_user_ids: Vec<UserId>,
    pub snapshot_id: String,
}

impl LeaderboardUpdate {
    pub fn from_cycle(trigger: &Trigger, outcome: &CycleOutcome, top_n: usize) -> Self {
        LeaderboardUpdate {
            contest_id: trigger.contest_id.clone(),
            update_id: Uuid::new_v4(),
            update_type: outcome.update_type,
            timestamp: Utc::now(),
            affected_user_ids: outcome.changes.iter().map(|c| c.user_id.clone()).collect(),
            rank_changes: outcome.changes.clone(),
            top_performers: outcome.leaderboard.top(top_n).to_vec(),
            total_participants: outcome.leaderboard.total_participants,
            trigger_source: trigger.source,
            match_event_id: trigger.match_event_id.clone(),
            removed_user_ids: outcome.removed.clone(),
            snapshot_id: outcome.snapshot_id.clone(),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum BroadcastError {
    #[error("Broadcast rejected: {0}")]
    Rejected(String),
}

/// Sink for finished updates.
#[async_trait]
pub trait Broadcaster: Send + Sync + fmt::Debug {
    async fn publish(&self, update: &LeaderboardUpdate) -> Result<(), BroadcastError>;
}

/// In-process fan-out over a tokio broadcast channel.
///
/// Slow subscribers lag and lose the oldest updates; publishing never waits.
#[derive(Debug, Clone)]
pub struct ChannelBroadcaster {
    tx: broadcast::Sender<Arc<LeaderboardUpdate>>,
}

impl ChannelBroadcaster {
    pub fn new(buffer: usize) -> Self {
        let (tx, _) = broadcast::channel(buffer.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<LeaderboardUpdate>> {
        self.tx.subscribe()
    }
}

#[async_trait]
impl Broadcaster for ChannelBroadcaster {
    async fn publish(&self, update: &LeaderboardUpdate) -> Result<(), BroadcastError> {
        match self.tx.send(Arc::new(update.clone())) {
            Ok(receivers) => {
                tracing::debug!(contest_id = %update.contest_id, receivers, "update published");
            }
            Err(_) => {
                tracing::debug!(contest_id = %update.contest_id, "no subscribers for update");
            }
        }
        Ok(())
    }
}

/// Writes each update to the log. Useful when no transport is attached.
#[derive(Debug, Clone, Default)]
pub struct LogBroadcaster;

#[async_trait]
impl Broadcaster for LogBroadcaster {
    async fn publish(&self, update: &LeaderboardUpdate) -> Result<(), BroadcastError> {
        tracing::info!(
            contest_id = %update.contest_id,
            update_id = %update.update_id,
            update_type = %update.update_type,
            changes = update.rank_changes.len(),
            removed = update.removed_user_ids.len(),
            total_participants = update.total_participants,
            "leaderboard update"
        );
        Ok(())
    }
}
