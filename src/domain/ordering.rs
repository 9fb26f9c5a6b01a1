//! Strict total order for leaderboard entries.

use crate::domain::{LeaderboardEntry, Points, TeamId, TimeMs};
use std::cmp::{Ordering, Reverse};

/// Stable ordering key for a ranked team.
///
/// Ordering: points desc -> team created_at asc -> team_id asc.
/// team_id is unique per contest, so no two entries compare equal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct RankingKey {
    pub points: Reverse<Points>,
    pub created_at: TimeMs,
    pub team_id: TeamId,
}

impl RankingKey {
    pub fn from_entry(entry: &LeaderboardEntry) -> Self {
        RankingKey {
            points: Reverse(entry.points),
            created_at: entry.team_created_at,
            team_id: entry.team_id.clone(),
        }
    }

    pub fn compare(a: &LeaderboardEntry, b: &LeaderboardEntry) -> Ordering {
        b.points
            .cmp(&a.points)
            .then_with(|| a.team_created_at.cmp(&b.team_created_at))
            .then_with(|| a.team_id.cmp(&b.team_id))
    }
}

/// Sort entries deterministically and assign dense ranks `1..=N`.
pub fn sort_entries_deterministic(entries: &mut [LeaderboardEntry]) {
    entries.sort_by(RankingKey::compare);
    for (idx, entry) in entries.iter_mut().enumerate() {
        entry.rank = (idx + 1) as u32;
    }
}
