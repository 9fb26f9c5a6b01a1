//! In-memory live state: the leaderboard cache, current snapshots and the
//! per-contest critical sections that keep them consistent.

pub mod cache;
pub mod locks;
pub mod snapshot;

pub use cache::{CacheView, CachedLeaderboard, LeaderboardCache};
pub use locks::{ContestGuard, ContestLocks};
pub use snapshot::SnapshotStore;
