//! Captured rankings used only for change detection.

use crate::domain::{ContestId, Leaderboard, Points, TeamId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// One user's position in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotEntry {
    pub rank: u32,
    pub points: Points,
    pub team_id: TeamId,
}

/// The ranking of a contest at one instant, keyed by user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingSnapshot {
    pub contest_id: ContestId,
    /// Hex SHA-256 of the ordered ranking; equal rankings share an id.
    pub snapshot_id: String,
    pub created_at: DateTime<Utc>,
    pub rankings: BTreeMap<UserId, SnapshotEntry>,
}

impl RankingSnapshot {
    /// Capture a leaderboard. A user with several teams keeps their best-ranked one.
    pub fn capture(leaderboard: &Leaderboard) -> Self {
        let mut rankings = BTreeMap::new();
        for entry in &leaderboard.entries {
            rankings
                .entry(entry.user_id.clone())
                .or_insert_with(|| SnapshotEntry {
                    rank: entry.rank,
                    points: entry.points,
                    team_id: entry.team_id.clone(),
                });
        }

        RankingSnapshot {
            contest_id: leaderboard.contest_id.clone(),
            snapshot_id: ranking_digest(leaderboard),
            created_at: Utc::now(),
            rankings,
        }
    }

    pub fn len(&self) -> usize {
        self.rankings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rankings.is_empty()
    }
}

/// Content digest over the ordered entries of a leaderboard.
pub fn ranking_digest(leaderboard: &Leaderboard) -> String {
    let mut hasher = Sha256::new();
    hasher.update(leaderboard.contest_id.as_str());
    for entry in &leaderboard.entries {
        hasher.update(entry.rank.to_le_bytes());
        hasher.update(entry.user_id.as_str());
        hasher.update(b"\x00");
        hasher.update(entry.team_id.as_str());
        hasher.update(b"\x00");
        hasher.update(entry.points.to_canonical_string());
        hasher.update(b"\x00");
    }
    let hash = hasher.finalize();
    hex::encode(&hash[..16])
}
