//! The ranking pipeline: cached reads and the recompute → diff → refresh cycle.

use crate::datasource::{Stores, TeamStore};
use crate::domain::{
    ContestId, Leaderboard, LeaderboardEntry, RankChangeEvent, RankingSnapshot, UpdateType,
    UserId, UserRank,
};
use crate::engine::ranking::{rank_of, window};
use crate::engine::{classify_update, diff_rankings, removed_users, EngineError, RankingComputer};
use crate::live::{CacheView, ContestLocks, LeaderboardCache, SnapshotStore};
use crate::orchestration::dispatcher::Trigger;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Read-path tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineSettings {
    /// Max-age for reads that do not pass one; also the cache entry TTL.
    pub cache_max_age: Duration,
    /// Entries returned as "top" in live views and updates.
    pub top_n: usize,
    /// Ranks on each side of the caller in a live view.
    pub window_radius: u32,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            cache_max_age: Duration::from_secs(300),
            top_n: 10,
            window_radius: 5,
        }
    }
}

/// A caller's view of a live contest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveLeaderboard {
    pub contest_id: ContestId,
    pub top: Vec<LeaderboardEntry>,
    pub user_rank: UserRank,
    /// Entries around the caller; empty when they are not participating.
    pub around_user: Vec<LeaderboardEntry>,
    pub total_participants: u32,
    pub cached_at: DateTime<Utc>,
    pub stale: bool,
}

/// Result of one successful dispatch cycle.
#[derive(Debug, Clone)]
pub struct CycleOutcome {
    pub leaderboard: Arc<Leaderboard>,
    pub changes: Vec<RankChangeEvent>,
    pub removed: Vec<UserId>,
    pub update_type: UpdateType,
    pub snapshot_id: String,
}

/// Owns the ranking computer, the cache, the snapshot map and the
/// per-contest critical sections tying them together.
#[derive(Debug)]
pub struct RankingPipeline {
    ranking: RankingComputer,
    teams: Arc<dyn TeamStore>,
    cache: LeaderboardCache,
    snapshots: SnapshotStore,
    locks: ContestLocks,
    settings: PipelineSettings,
}

impl RankingPipeline {
    pub fn new(stores: Stores, settings: PipelineSettings) -> Self {
        let locks = ContestLocks::new();
        Self {
            teams: stores.teams.clone(),
            ranking: RankingComputer::new(stores),
            cache: LeaderboardCache::new(settings.cache_max_age, locks.clone()),
            snapshots: SnapshotStore::new(),
            locks,
            settings,
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub fn cache(&self) -> &LeaderboardCache {
        &self.cache
    }

    pub fn ranking(&self) -> &RankingComputer {
        &self.ranking
    }

    /// Always recomputed; the cache is neither read nor written.
    pub async fn calculate_leaderboard(
        &self,
        contest_id: &ContestId,
    ) -> Result<Leaderboard, EngineError> {
        self.ranking.rank(contest_id).await
    }

    /// Cached read with a caller-supplied max-age.
    pub async fn get_cached_leaderboard(
        &self,
        contest_id: &ContestId,
        max_age: Duration,
    ) -> Result<CacheView, EngineError> {
        self.cache
            .get(contest_id, max_age, || self.ranking.rank(contest_id))
            .await
    }

    /// Top entries plus the caller's rank and neighbourhood.
    pub async fn get_live_leaderboard(
        &self,
        contest_id: &ContestId,
        user_id: &UserId,
    ) -> Result<LiveLeaderboard, EngineError> {
        let view = self
            .get_cached_leaderboard(contest_id, self.settings.cache_max_age)
            .await?;
        let entries = &view.leaderboard.entries;

        let user_rank = rank_of(entries, user_id);
        let around_user = match user_rank.entry() {
            Some(entry) => window(entries, entry.rank, self.settings.window_radius).to_vec(),
            None => Vec::new(),
        };

        Ok(LiveLeaderboard {
            contest_id: contest_id.clone(),
            top: view.leaderboard.top(self.settings.top_n).to_vec(),
            user_rank,
            around_user,
            total_participants: view.leaderboard.total_participants,
            cached_at: view.cached_at,
            stale: view.stale,
        })
    }

    pub async fn rank_of(
        &self,
        contest_id: &ContestId,
        user_id: &UserId,
    ) -> Result<UserRank, EngineError> {
        let view = self
            .get_cached_leaderboard(contest_id, self.settings.cache_max_age)
            .await?;
        Ok(rank_of(&view.leaderboard.entries, user_id))
    }

    pub async fn window(
        &self,
        contest_id: &ContestId,
        center_rank: u32,
        radius: u32,
    ) -> Result<Vec<LeaderboardEntry>, EngineError> {
        let view = self
            .get_cached_leaderboard(contest_id, self.settings.cache_max_age)
            .await?;
        Ok(window(&view.leaderboard.entries, center_rank, radius).to_vec())
    }

    /// Capture the contest's current ranking as its snapshot, replacing the old one.
    pub async fn snapshot(
        &self,
        contest_id: &ContestId,
    ) -> Result<Arc<RankingSnapshot>, EngineError> {
        let _guard = self.locks.lock(contest_id).await;
        let leaderboard = self.ranking.rank(contest_id).await?;
        let snapshot = Arc::new(RankingSnapshot::capture(&leaderboard));
        self.snapshots.replace(snapshot.clone());
        Ok(snapshot)
    }

    pub fn current_snapshot(&self, contest_id: &ContestId) -> Option<Arc<RankingSnapshot>> {
        self.snapshots.get(contest_id)
    }

    pub fn invalidate(&self, contest_id: &ContestId) -> bool {
        self.cache.invalidate(contest_id)
    }

    /// One dispatch cycle for a trigger.
    ///
    /// The cache entry is marked dirty first. The snapshot swap and cache
    /// refresh happen together under the contest's critical section, and only
    /// when the recompute succeeded; on failure the entry stays dirty and the
    /// previous snapshot is kept.
    pub async fn run_cycle(&self, trigger: &Trigger) -> Result<CycleOutcome, EngineError> {
        let contest_id = &trigger.contest_id;
        self.cache.invalidate(contest_id);

        let (outcome, ranks) = {
            let _guard = self.locks.lock(contest_id).await;

            let leaderboard = self.ranking.rank(contest_id).await?;
            let current = RankingSnapshot::capture(&leaderboard);
            let previous = self.snapshots.get(contest_id);

            let changes = diff_rankings(previous.as_deref(), &current);
            let removed = removed_users(previous.as_deref(), &current);
            let update_type = classify_update(&changes);
            let snapshot_id = current.snapshot_id.clone();
            let ranks: Vec<_> = leaderboard
                .entries
                .iter()
                .map(|e| (e.team_id.clone(), e.rank))
                .collect();

            self.snapshots.replace(Arc::new(current));
            let view = self.cache.store(leaderboard);

            (
                CycleOutcome {
                    leaderboard: view.leaderboard,
                    changes,
                    removed,
                    update_type,
                    snapshot_id,
                },
                ranks,
            )
        };

        if let Err(err) = self.teams.record_ranks(contest_id, &ranks).await {
            warn!(contest_id = %contest_id, error = %err, "failed to persist ranks");
        } else {
            debug!(contest_id = %contest_id, teams = ranks.len(), "ranks persisted");
        }

        info!(
            contest_id = %contest_id,
            source = %trigger.source,
            update_type = %outcome.update_type,
            changes = outcome.changes.len(),
            "leaderboard cycle complete"
        );
        Ok(outcome)
    }
}
