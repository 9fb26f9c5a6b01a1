//! Fantasy point calculation over an injected event store.

use super::EngineError;
use crate::datasource::MatchEventStore;
use crate::domain::{MatchId, Multiplier, PlayerId, Points, TeamComposition, TeamId};
use futures::stream::{self, StreamExt, TryStreamExt};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

/// Event reads in flight at once. Kept below the SQLite pool size.
const MAX_IN_FLIGHT_READS: usize = 4;

/// Base points per player and match, read once per ranking pass.
pub type BasePoints = HashMap<(PlayerId, MatchId), Points>;

/// One player's share of a team total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerContribution {
    pub player_id: PlayerId,
    pub base_points: Points,
    pub multiplier: Multiplier,
    pub contribution: Points,
}

/// Derived team total. Recomputing from the same events yields the same value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamScore {
    pub team_id: TeamId,
    pub total_points: Points,
    /// In squad order.
    pub per_player_breakdown: Vec<PlayerContribution>,
}

/// Multiplier for a player within a composition.
pub fn multiplier_for(team: &TeamComposition, player_id: &PlayerId) -> Multiplier {
    if &team.captain_id == player_id {
        Multiplier::CAPTAIN
    } else if &team.vice_captain_id == player_id {
        Multiplier::VICE_CAPTAIN
    } else {
        Multiplier::STANDARD
    }
}

fn overflow(what: String) -> EngineError {
    EngineError::InvariantViolation(format!("points overflow in {}", what))
}

/// Combine base scores (aligned with `team.player_ids`) into a team score.
///
/// # Errors
/// `InvariantViolation` when a contribution or the total leaves the decimal range.
pub fn score_team(team: &TeamComposition, base_points: &[Points]) -> Result<TeamScore, EngineError> {
    let per_player_breakdown = team
        .player_ids
        .iter()
        .zip(base_points)
        .map(|(player_id, base)| {
            let multiplier = multiplier_for(team, player_id);
            let contribution = base.checked_mul(multiplier).ok_or_else(|| {
                overflow(format!("player {} of team {}", player_id, team.team_id))
            })?;
            Ok(PlayerContribution {
                player_id: player_id.clone(),
                base_points: *base,
                multiplier,
                contribution,
            })
        })
        .collect::<Result<Vec<_>, EngineError>>()?;

    let total_points = Points::checked_sum(per_player_breakdown.iter().map(|c| c.contribution))
        .ok_or_else(|| overflow(format!("team {}", team.team_id)))?;

    Ok(TeamScore {
        team_id: team.team_id.clone(),
        total_points,
        per_player_breakdown,
    })
}

/// Reads events and turns them into player and team scores. Holds no state.
#[derive(Debug, Clone)]
pub struct PointCalculator {
    events: Arc<dyn MatchEventStore>,
}

impl PointCalculator {
    pub fn new(events: Arc<dyn MatchEventStore>) -> Self {
        Self { events }
    }

    /// Sum of all event points for a player in a match; zero when there are none.
    ///
    /// # Errors
    /// `Store` if the read fails, `InvariantViolation` if the sum overflows.
    pub async fn player_score(
        &self,
        player_id: &PlayerId,
        match_id: &MatchId,
    ) -> Result<Points, EngineError> {
        let events = self.events.events_for(player_id, match_id).await?;
        Points::checked_sum(events.iter().map(|e| e.points))
            .ok_or_else(|| overflow(format!("events of player {} in match {}", player_id, match_id)))
    }

    /// Base points for every distinct player across `teams`, each read once.
    pub async fn base_points<'a, I>(&self, teams: I) -> Result<BasePoints, EngineError>
    where
        I: IntoIterator<Item = &'a TeamComposition>,
    {
        let keys: BTreeSet<(PlayerId, MatchId)> = teams
            .into_iter()
            .flat_map(|team| {
                team.player_ids
                    .iter()
                    .map(move |player_id| (player_id.clone(), team.match_id.clone()))
            })
            .collect();

        stream::iter(keys)
            .map(|(player_id, match_id)| async move {
                let points = self.player_score(&player_id, &match_id).await?;
                Ok::<_, EngineError>(((player_id, match_id), points))
            })
            .buffer_unordered(MAX_IN_FLIGHT_READS)
            .try_collect()
            .await
    }

    /// Score a composition from already loaded base points.
    ///
    /// # Errors
    /// `InvariantViolation` for a malformed composition or an overflowing total.
    pub fn team_score_from(
        &self,
        team: &TeamComposition,
        base: &BasePoints,
    ) -> Result<TeamScore, EngineError> {
        team.validate()?;

        let base_points: Vec<Points> = team
            .player_ids
            .iter()
            .map(|player_id| {
                base.get(&(player_id.clone(), team.match_id.clone()))
                    .copied()
                    .unwrap_or_default()
            })
            .collect();

        score_team(team, &base_points)
    }

    /// Score a single composition.
    ///
    /// # Errors
    /// `InvariantViolation` for a malformed composition, `Store` if an event read fails.
    pub async fn team_score(&self, team: &TeamComposition) -> Result<TeamScore, EngineError> {
        team.validate()?;
        let base = self.base_points(std::iter::once(team)).await?;
        self.team_score_from(team, &base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::MockStore;
    use crate::domain::{MatchEvent, TimeMs, UserId};

    fn team(players: &[&str], captain: &str, vice: &str) -> TeamComposition {
        TeamComposition {
            team_id: TeamId::new("T1"),
            owner_user_id: UserId::new("U1"),
            match_id: MatchId::new("M"),
            player_ids: players.iter().map(|p| PlayerId::new(*p)).collect(),
            captain_id: PlayerId::new(captain),
            vice_captain_id: PlayerId::new(vice),
            credits_used: Points::from_i64(100),
            created_at: TimeMs::new(0),
        }
    }

    fn event(id: &str, player: &str, points: i64) -> MatchEvent {
        MatchEvent::new(
            id,
            PlayerId::new(player),
            MatchId::new("M"),
            Points::from_i64(points),
            1,
            TimeMs::new(0),
        )
    }

    fn calculator(events: Vec<MatchEvent>) -> PointCalculator {
        PointCalculator::new(Arc::new(MockStore::new().with_events(events)))
    }

    #[test]
    fn test_multipliers_by_role() {
        let t = team(&["c", "v", "x"], "c", "v");
        let base = vec![Points::from_i64(10); 3];
        let score = score_team(&t, &base).unwrap();
        let contributions: Vec<Points> = score
            .per_player_breakdown
            .iter()
            .map(|c| c.contribution)
            .collect();
        assert_eq!(
            contributions,
            vec![
                Points::from_str_canonical("20.0").unwrap(),
                Points::from_str_canonical("15.0").unwrap(),
                Points::from_i64(10),
            ]
        );
        assert_eq!(score.total_points, Points::from_i64(45));
    }

    #[tokio::test]
    async fn test_player_score_sums_negative_events() {
        let calc = calculator(vec![event("e1", "P", 5), event("e2", "P", -2), event("e3", "P", 10)]);
        let score = calc
            .player_score(&PlayerId::new("P"), &MatchId::new("M"))
            .await
            .unwrap();
        assert_eq!(score, Points::from_i64(13));
    }

    #[tokio::test]
    async fn test_player_without_events_scores_zero() {
        let calc = calculator(vec![]);
        let score = calc
            .player_score(&PlayerId::new("ghost"), &MatchId::new("M"))
            .await
            .unwrap();
        assert!(score.is_zero());
    }

    #[tokio::test]
    async fn test_captain_doubles_own_score_only() {
        let calc = calculator(vec![
            event("e1", "P", 5),
            event("e2", "P", -2),
            event("e3", "P", 10),
            event("e4", "Q", 4),
        ]);
        let score = calc.team_score(&team(&["P", "Q", "R"], "P", "Q")).await.unwrap();
        let captain = &score.per_player_breakdown[0];
        assert_eq!(captain.base_points, Points::from_i64(13));
        assert_eq!(captain.contribution, Points::from_i64(26));
        assert_eq!(score.total_points, Points::from_i64(32));
    }

    #[tokio::test]
    async fn test_recompute_is_idempotent() {
        let calc = calculator(vec![event("e1", "P", 7), event("e2", "Q", 3)]);
        let t = team(&["P", "Q"], "P", "Q");
        let first = calc.team_score(&t).await.unwrap();
        let second = calc.team_score(&t).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_overflowing_events_are_invariant_violation() {
        let huge = MatchEvent::new(
            "e1",
            PlayerId::new("P"),
            MatchId::new("M"),
            Points::from_str_canonical("79228162514264337593543950335").unwrap(),
            1,
            TimeMs::new(0),
        );
        let calc = calculator(vec![huge.clone()]);

        // Fits as a base score, overflows once doubled for the captain.
        let err = calc.team_score(&team(&["P", "Q"], "P", "Q")).await.unwrap_err();
        assert!(matches!(err, EngineError::InvariantViolation(_)));

        let mut second = huge;
        second.event_id = "e2".to_string();
        let calc = calculator(vec![second.clone(), MatchEvent { event_id: "e3".into(), ..second }]);
        let err = calc
            .player_score(&PlayerId::new("P"), &MatchId::new("M"))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvariantViolation(_)));
    }

    #[tokio::test]
    async fn test_shared_player_is_read_once() {
        let store = Arc::new(
            MockStore::new().with_events(vec![event("e1", "P", 4), event("e2", "Q", 2)]),
        );
        let calc = PointCalculator::new(store.clone());
        let a = team(&["P", "Q"], "P", "Q");
        let mut b = team(&["Q", "P", "R"], "Q", "R");
        b.team_id = TeamId::new("T2");

        let base = calc.base_points([&a, &b]).await.unwrap();
        assert_eq!(base.len(), 3);
        assert_eq!(store.event_reads(), 3);

        let score_b = calc.team_score_from(&b, &base).unwrap();
        // Q captain 2*2, P standard 4, R vice with no events.
        assert_eq!(score_b.total_points, Points::from_i64(8));
    }

    #[tokio::test]
    async fn test_malformed_team_is_invariant_violation() {
        let calc = calculator(vec![]);
        let err = calc.team_score(&team(&["P", "Q"], "P", "P")).await.unwrap_err();
        assert!(matches!(err, EngineError::InvariantViolation(_)));
    }
}
