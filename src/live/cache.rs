//! Per-contest leaderboard cache with max-age reads and dirty-flag invalidation.

use super::ContestLocks;
use crate::domain::{ContestId, Leaderboard};
use crate::engine::EngineError;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

/// A cached leaderboard. Invalidation flips `dirty`; the payload is kept as
/// the last-good value.
#[derive(Debug, Clone)]
pub struct CachedLeaderboard {
    pub contest_id: ContestId,
    pub cache_key: String,
    pub payload: Arc<Leaderboard>,
    pub cached_at: DateTime<Utc>,
    /// Default max-age applied when a reader does not pass one.
    pub ttl: Duration,
    pub dirty: bool,
    stored: Instant,
}

impl CachedLeaderboard {
    pub fn age(&self) -> Duration {
        self.stored.elapsed()
    }

    pub fn is_fresh(&self, max_age: Duration) -> bool {
        !self.dirty && self.age() < max_age
    }

    fn view(&self, from_cache: bool, stale: bool) -> CacheView {
        CacheView {
            leaderboard: self.payload.clone(),
            cached_at: self.cached_at,
            from_cache,
            stale,
        }
    }
}

/// What a cache read hands back.
#[derive(Debug, Clone)]
pub struct CacheView {
    pub leaderboard: Arc<Leaderboard>,
    pub cached_at: DateTime<Utc>,
    /// False when this read recomputed the payload.
    pub from_cache: bool,
    /// True when a recompute failed and the last-good payload was served.
    pub stale: bool,
}

pub fn cache_key(contest_id: &ContestId) -> String {
    format!("leaderboard:{}", contest_id)
}

/// Cache map behind its own reader/writer lock.
#[derive(Debug)]
pub struct LeaderboardCache {
    entries: RwLock<HashMap<ContestId, CachedLeaderboard>>,
    locks: ContestLocks,
    ttl: Duration,
}

impl LeaderboardCache {
    pub fn new(ttl: Duration, locks: ContestLocks) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            locks,
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cached view if the entry is clean and younger than `max_age`.
    pub fn fresh(&self, contest_id: &ContestId, max_age: Duration) -> Option<CacheView> {
        self.read()
            .get(contest_id)
            .filter(|entry| entry.is_fresh(max_age))
            .map(|entry| entry.view(true, false))
    }

    /// The entry as stored, ignoring freshness.
    pub fn peek(&self, contest_id: &ContestId) -> Option<CachedLeaderboard> {
        self.read().get(contest_id).cloned()
    }

    /// Write a clean entry stamped now.
    pub fn store(&self, leaderboard: Leaderboard) -> CacheView {
        let contest_id = leaderboard.contest_id.clone();
        let entry = CachedLeaderboard {
            cache_key: cache_key(&contest_id),
            contest_id: contest_id.clone(),
            payload: Arc::new(leaderboard),
            cached_at: Utc::now(),
            ttl: self.ttl,
            dirty: false,
            stored: Instant::now(),
        };
        let view = entry.view(false, false);
        self.write().insert(contest_id, entry);
        view
    }

    /// Mark the entry dirty. Returns false when nothing was cached.
    pub fn invalidate(&self, contest_id: &ContestId) -> bool {
        match self.write().get_mut(contest_id) {
            Some(entry) => {
                entry.dirty = true;
                true
            }
            None => false,
        }
    }

    /// Serve from cache when fresh, otherwise recompute with `compute`.
    ///
    /// Misses for one contest are single-flighted: the first recomputes, the
    /// rest wait and then find the fresh entry. A failed recompute falls back
    /// to the last-good payload (marked stale) unless the contest is gone or
    /// nothing was ever cached.
    pub async fn get<F, Fut>(
        &self,
        contest_id: &ContestId,
        max_age: Duration,
        compute: F,
    ) -> Result<CacheView, EngineError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Leaderboard, EngineError>>,
    {
        if let Some(view) = self.fresh(contest_id, max_age) {
            return Ok(view);
        }

        let _guard = self.locks.lock(contest_id).await;
        if let Some(view) = self.fresh(contest_id, max_age) {
            debug!(contest_id = %contest_id, "cache filled while waiting");
            return Ok(view);
        }

        match compute().await {
            Ok(leaderboard) => Ok(self.store(leaderboard)),
            Err(err @ EngineError::ContestNotFound(_)) => Err(err),
            Err(err) => match self.peek(contest_id) {
                Some(entry) => {
                    if matches!(err, EngineError::InvariantViolation(_)) {
                        error!(contest_id = %contest_id, error = %err, "recompute rejected; serving last-good leaderboard");
                    } else {
                        warn!(contest_id = %contest_id, error = %err, "recompute failed; serving last-good leaderboard");
                    }
                    Ok(entry.view(true, true))
                }
                None => Err(err),
            },
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<ContestId, CachedLeaderboard>> {
        self.entries.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<ContestId, CachedLeaderboard>> {
        self.entries.write().unwrap_or_else(|e| e.into_inner())
    }
}
