//! Deterministic contest ranking and rank/window queries.

use super::{EngineError, PointCalculator};
use crate::datasource::Stores;
use crate::domain::{
    sort_entries_deterministic, ContestId, ContestInfo, Leaderboard, LeaderboardEntry, TeamId,
    UserId, UserRank,
};
use chrono::Utc;
use std::collections::{HashMap, HashSet};

/// Computes contest rankings from the stores.
#[derive(Debug, Clone)]
pub struct RankingComputer {
    stores: Stores,
    calculator: PointCalculator,
}

impl RankingComputer {
    pub fn new(stores: Stores) -> Self {
        let calculator = PointCalculator::new(stores.events.clone());
        Self { stores, calculator }
    }

    /// Contest metadata, or `ContestNotFound`.
    pub async fn contest(&self, contest_id: &ContestId) -> Result<ContestInfo, EngineError> {
        self.stores
            .contests
            .contest_info(contest_id)
            .await?
            .ok_or_else(|| EngineError::ContestNotFound(contest_id.clone()))
    }

    /// Rank every team in a contest.
    ///
    /// Order: points desc, team creation time asc, team_id asc. Zero
    /// participants yields an empty leaderboard.
    ///
    /// # Errors
    /// `ContestNotFound`, `Store` on any failed read, `InvariantViolation` for
    /// a participant without a composition or a team entered twice.
    pub async fn rank(&self, contest_id: &ContestId) -> Result<Leaderboard, EngineError> {
        self.contest(contest_id).await?;

        let participants = self.stores.teams.participants_in_contest(contest_id).await?;
        if participants.is_empty() {
            return Ok(Leaderboard {
                contest_id: contest_id.clone(),
                entries: Vec::new(),
                total_participants: 0,
                computed_at: Utc::now(),
            });
        }

        let teams: HashMap<TeamId, _> = self
            .stores
            .teams
            .teams_in_contest(contest_id)
            .await?
            .into_iter()
            .map(|t| (t.team_id.clone(), t))
            .collect();

        let mut seen = HashSet::with_capacity(participants.len());
        let mut entered = Vec::with_capacity(participants.len());
        for participant in &participants {
            if !seen.insert(&participant.team_id) {
                return Err(EngineError::InvariantViolation(format!(
                    "team {} entered twice in contest {}",
                    participant.team_id, contest_id
                )));
            }
            let team = teams.get(&participant.team_id).ok_or_else(|| {
                EngineError::InvariantViolation(format!(
                    "participant team {} in contest {} has no composition",
                    participant.team_id, contest_id
                ))
            })?;
            entered.push((participant, team));
        }

        let base = self
            .calculator
            .base_points(entered.iter().map(|(_, team)| *team))
            .await?;
        let scores = entered
            .iter()
            .map(|(_, team)| self.calculator.team_score_from(team, &base))
            .collect::<Result<Vec<_>, _>>()?;

        let mut entries: Vec<LeaderboardEntry> = entered
            .iter()
            .zip(scores)
            .map(|((participant, team), score)| LeaderboardEntry {
                rank: 0,
                user_id: participant.user_id.clone(),
                team_id: team.team_id.clone(),
                points: score.total_points,
                team_created_at: team.created_at,
            })
            .collect();
        sort_entries_deterministic(&mut entries);

        Ok(Leaderboard {
            contest_id: contest_id.clone(),
            total_participants: entries.len() as u32,
            entries,
            computed_at: Utc::now(),
        })
    }

    /// A single user's best-ranked entry.
    pub async fn rank_of(
        &self,
        contest_id: &ContestId,
        user_id: &UserId,
    ) -> Result<UserRank, EngineError> {
        let leaderboard = self.rank(contest_id).await?;
        Ok(rank_of(&leaderboard.entries, user_id))
    }

    /// Entries ranked within `radius` of `center_rank`.
    pub async fn window(
        &self,
        contest_id: &ContestId,
        center_rank: u32,
        radius: u32,
    ) -> Result<Vec<LeaderboardEntry>, EngineError> {
        let leaderboard = self.rank(contest_id).await?;
        Ok(window(&leaderboard.entries, center_rank, radius).to_vec())
    }
}

/// Look up a user in ranked entries; the first hit is their best rank.
pub fn rank_of(entries: &[LeaderboardEntry], user_id: &UserId) -> UserRank {
    entries
        .iter()
        .find(|e| &e.user_id == user_id)
        .cloned()
        .map(UserRank::Ranked)
        .unwrap_or(UserRank::NotParticipating)
}

/// Entries with rank in `[center - radius, center + radius]`, clipped to `[1, N]`.
///
/// `entries` must be ranked `1..=N` in order.
pub fn window(entries: &[LeaderboardEntry], center_rank: u32, radius: u32) -> &[LeaderboardEntry] {
    let n = entries.len() as u64;
    let lo = u64::from(center_rank).saturating_sub(u64::from(radius)).max(1);
    let hi = (u64::from(center_rank) + u64::from(radius)).min(n);
    if n == 0 || lo > hi {
        return &[];
    }
    &entries[(lo - 1) as usize..hi as usize]
}
