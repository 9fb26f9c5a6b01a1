//! Ranked leaderboard rows and the change events derived from them.

use crate::domain::{ContestId, Points, TeamId, TimeMs, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One ranked team in a contest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub rank: u32,
    pub user_id: UserId,
    pub team_id: TeamId,
    pub points: Points,
    pub team_created_at: TimeMs,
}

/// A fully ordered contest ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Leaderboard {
    pub contest_id: ContestId,
    pub entries: Vec<LeaderboardEntry>,
    pub total_participants: u32,
    pub computed_at: DateTime<Utc>,
}

impl Leaderboard {
    pub fn top(&self, n: usize) -> &[LeaderboardEntry] {
        &self.entries[..n.min(self.entries.len())]
    }
}

/// Result of a single-user rank lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UserRank {
    Ranked(LeaderboardEntry),
    NotParticipating,
}

impl UserRank {
    pub fn entry(&self) -> Option<&LeaderboardEntry> {
        match self {
            UserRank::Ranked(entry) => Some(entry),
            UserRank::NotParticipating => None,
        }
    }
}

/// A user's movement between two rankings. Lives for one dispatch cycle.
///
/// `previous_rank == 0` marks a new entrant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankChangeEvent {
    pub user_id: UserId,
    pub team_id: TeamId,
    pub previous_rank: u32,
    pub new_rank: u32,
    pub previous_points: Points,
    pub new_points: Points,
    /// Positive = moved up. Zero for new entrants.
    pub rank_change: i64,
    pub points_change: Points,
}

impl RankChangeEvent {
    pub fn new(
        user_id: UserId,
        team_id: TeamId,
        previous_rank: u32,
        new_rank: u32,
        previous_points: Points,
        new_points: Points,
    ) -> Self {
        let rank_change = if previous_rank == 0 {
            0
        } else {
            i64::from(previous_rank) - i64::from(new_rank)
        };
        RankChangeEvent {
            user_id,
            team_id,
            previous_rank,
            new_rank,
            previous_points,
            new_points,
            rank_change,
            points_change: new_points - previous_points,
        }
    }

    pub fn is_new_entry(&self) -> bool {
        self.previous_rank == 0
    }
}

/// Coarse classification of one dispatch cycle's changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateType {
    NewEntry,
    RankChange,
    PointsUpdate,
    NoChange,
}

impl fmt::Display for UpdateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateType::NewEntry => write!(f, "new_entry"),
            UpdateType::RankChange => write!(f, "rank_change"),
            UpdateType::PointsUpdate => write!(f, "points_update"),
            UpdateType::NoChange => write!(f, "no_change"),
        }
    }
}
