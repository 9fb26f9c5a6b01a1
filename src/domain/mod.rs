//! Domain types for contests, fantasy teams and rankings.
//!
//! This module provides:
//! - Exact point arithmetic via the Points wrapper
//! - Identifier newtypes and TimeMs
//! - Match events, team compositions and contest rows
//! - Leaderboard rows, rank-change events and the strict ranking order

pub mod contest;
pub mod event;
pub mod leaderboard;
pub mod ordering;
pub mod points;
pub mod primitives;
pub mod snapshot;
pub mod team;

pub use contest::{ContestInfo, ContestParticipant, ContestStatus};
pub use event::MatchEvent;
pub use leaderboard::{Leaderboard, LeaderboardEntry, RankChangeEvent, UpdateType, UserRank};
pub use ordering::{sort_entries_deterministic, RankingKey};
pub use points::{Multiplier, Points};
pub use primitives::{ContestId, MatchId, PlayerId, TeamId, TimeMs, UserId};
pub use snapshot::{ranking_digest, RankingSnapshot, SnapshotEntry};
pub use team::{CompositionError, TeamComposition};
