//! Ranking scenarios against the in-memory store.

use contestboard::datasource::{MockStore, Stores};
use contestboard::domain::{
    ContestId, LeaderboardEntry, MatchEvent, MatchId, PlayerId, Points, TeamComposition, TeamId,
    TimeMs, UserId, UserRank,
};
use contestboard::engine::{EngineError, RankingComputer};
use contestboard::orchestration::{PipelineSettings, RankingPipeline};
use std::sync::Arc;
use std::time::Duration;

const MATCH: &str = "M1";
const CONTEST: &str = "C1";

fn team(id: &str, owner: &str, created_at: i64, captain: &str, vice: &str) -> TeamComposition {
    TeamComposition {
        team_id: TeamId::new(id),
        owner_user_id: UserId::new(owner),
        match_id: MatchId::new(MATCH),
        player_ids: vec![PlayerId::new(captain), PlayerId::new(vice)],
        captain_id: PlayerId::new(captain),
        vice_captain_id: PlayerId::new(vice),
        credits_used: Points::from_i64(100),
        created_at: TimeMs::new(created_at),
    }
}

fn event(id: &str, player: &str, points: i64) -> MatchEvent {
    MatchEvent::new(
        id,
        PlayerId::new(player),
        MatchId::new(MATCH),
        Points::from_i64(points),
        1,
        TimeMs::new(1_000),
    )
}

fn team_ids(entries: &[LeaderboardEntry]) -> Vec<(String, u32)> {
    entries
        .iter()
        .map(|e| (e.team_id.to_string(), e.rank))
        .collect()
}

/// T1(t=0, 50), T2(t=1, 50), T3(t=2, 30), entered in reverse order.
fn scenario_a() -> Arc<MockStore> {
    let contest = ContestId::new(CONTEST);
    Arc::new(
        MockStore::new()
            .with_contest(contest.clone(), MatchId::new(MATCH))
            .with_entry(contest.clone(), team("T3", "U3", 2, "P3", "Q3"))
            .with_entry(contest.clone(), team("T2", "U2", 1, "P2", "Q2"))
            .with_entry(contest, team("T1", "U1", 0, "P1", "Q1"))
            .with_events(vec![
                event("e1", "P1", 25),
                event("e2", "P2", 25),
                event("e3", "P3", 15),
            ]),
    )
}

#[tokio::test]
async fn test_scenario_a_earlier_team_wins_tie() {
    let store = scenario_a();
    let ranking = RankingComputer::new(Stores::shared(store));

    let board = ranking.rank(&ContestId::new(CONTEST)).await.unwrap();

    assert_eq!(
        team_ids(&board.entries),
        vec![
            ("T1".to_string(), 1),
            ("T2".to_string(), 2),
            ("T3".to_string(), 3)
        ]
    );
    assert_eq!(board.entries[0].points, Points::from_i64(50));
    assert_eq!(board.entries[2].points, Points::from_i64(30));
    assert_eq!(board.total_participants, 3);
}

#[tokio::test]
async fn test_ranking_is_deterministic_and_monotonic() {
    let store = scenario_a();
    let ranking = RankingComputer::new(Stores::shared(store));
    let contest = ContestId::new(CONTEST);

    let first = ranking.rank(&contest).await.unwrap();
    let second = ranking.rank(&contest).await.unwrap();
    assert_eq!(first.entries, second.entries);

    for (i, pair) in first.entries.windows(2).enumerate() {
        assert_eq!(pair[0].rank as usize, i + 1);
        assert_eq!(pair[1].rank, pair[0].rank + 1);
        assert!(pair[0].points >= pair[1].points);
    }
}

#[tokio::test]
async fn test_team_id_breaks_full_ties() {
    let contest = ContestId::new(CONTEST);
    let store = Arc::new(
        MockStore::new()
            .with_contest(contest.clone(), MatchId::new(MATCH))
            .with_entry(contest.clone(), team("TB", "U1", 5, "P1", "Q1"))
            .with_entry(contest.clone(), team("TA", "U2", 5, "P2", "Q2")),
    );
    let ranking = RankingComputer::new(Stores::shared(store));

    let board = ranking.rank(&contest).await.unwrap();
    assert_eq!(
        team_ids(&board.entries),
        vec![("TA".to_string(), 1), ("TB".to_string(), 2)]
    );
    assert!(board.entries.iter().all(|e| e.points.is_zero()));
}

#[tokio::test]
async fn test_scenario_b_multipliers_across_roles() {
    let contest = ContestId::new(CONTEST);
    let mut plain = team("T3", "U3", 2, "X1", "X2");
    plain.player_ids.push(PlayerId::new("P"));

    let store = Arc::new(
        MockStore::new()
            .with_contest(contest.clone(), MatchId::new(MATCH))
            .with_entry(contest.clone(), team("T1", "U1", 0, "P", "Y1"))
            .with_entry(contest.clone(), team("T2", "U2", 1, "Y2", "P"))
            .with_entry(contest.clone(), plain)
            .with_events(vec![
                event("e1", "P", 5),
                event("e2", "P", -2),
                event("e3", "P", 10),
            ]),
    );
    let ranking = RankingComputer::new(Stores::shared(store));

    let board = ranking.rank(&contest).await.unwrap();
    let points: Vec<Points> = board.entries.iter().map(|e| e.points).collect();
    assert_eq!(
        points,
        vec![
            Points::from_i64(26),
            Points::from_str_canonical("19.5").unwrap(),
            Points::from_i64(13),
        ]
    );
}

#[tokio::test]
async fn test_unknown_contest_and_empty_contest() {
    let store = Arc::new(MockStore::new().with_contest(ContestId::new("EMPTY"), MatchId::new(MATCH)));
    let ranking = RankingComputer::new(Stores::shared(store));

    let board = ranking.rank(&ContestId::new("EMPTY")).await.unwrap();
    assert!(board.entries.is_empty());
    assert_eq!(board.total_participants, 0);

    let err = ranking.rank(&ContestId::new("NOPE")).await.unwrap_err();
    assert!(matches!(err, EngineError::ContestNotFound(_)));
}

#[tokio::test]
async fn test_invalid_composition_is_invariant_violation() {
    let contest = ContestId::new(CONTEST);
    let store = Arc::new(
        MockStore::new()
            .with_contest(contest.clone(), MatchId::new(MATCH))
            .with_entry(contest.clone(), team("T1", "U1", 0, "P1", "P1")),
    );
    let ranking = RankingComputer::new(Stores::shared(store));

    let err = ranking.rank(&contest).await.unwrap_err();
    assert!(matches!(err, EngineError::InvariantViolation(_)));
}

#[tokio::test]
async fn test_live_view_top_and_window() {
    let contest = ContestId::new(CONTEST);
    let mut store = MockStore::new().with_contest(contest.clone(), MatchId::new(MATCH));
    for i in 1..=5 {
        let captain = format!("P{}", i);
        store = store
            .with_entry(
                contest.clone(),
                team(&format!("T{}", i), &format!("U{}", i), i, &captain, &format!("Q{}", i)),
            )
            .with_event(event(&format!("e{}", i), &captain, 100 - i * 10));
    }
    let settings = PipelineSettings {
        cache_max_age: Duration::from_secs(60),
        top_n: 2,
        window_radius: 1,
    };
    let pipeline = RankingPipeline::new(Stores::shared(Arc::new(store)), settings);

    let live = pipeline
        .get_live_leaderboard(&contest, &UserId::new("U3"))
        .await
        .unwrap();
    assert_eq!(
        team_ids(&live.top),
        vec![("T1".to_string(), 1), ("T2".to_string(), 2)]
    );
    assert_eq!(live.user_rank.entry().map(|e| e.rank), Some(3));
    assert_eq!(
        team_ids(&live.around_user),
        vec![
            ("T2".to_string(), 2),
            ("T3".to_string(), 3),
            ("T4".to_string(), 4)
        ]
    );
    assert_eq!(live.total_participants, 5);
    assert!(!live.stale);

    let outsider = pipeline
        .get_live_leaderboard(&contest, &UserId::new("U99"))
        .await
        .unwrap();
    assert_eq!(outsider.user_rank, UserRank::NotParticipating);
    assert!(outsider.around_user.is_empty());
    assert_eq!(outsider.cached_at, live.cached_at);
}

#[tokio::test]
async fn test_cache_served_until_invalidated() {
    let store = scenario_a();
    let pipeline = RankingPipeline::new(Stores::shared(store.clone()), PipelineSettings::default());
    let contest = ContestId::new(CONTEST);
    let max_age = Duration::from_secs(300);

    let first = pipeline.get_cached_leaderboard(&contest, max_age).await.unwrap();
    let second = pipeline.get_cached_leaderboard(&contest, max_age).await.unwrap();
    assert!(!first.from_cache);
    assert!(second.from_cache);
    assert_eq!(first.cached_at, second.cached_at);
    assert_eq!(store.participant_reads(), 1);

    assert!(pipeline.invalidate(&contest));
    tokio::time::sleep(Duration::from_millis(5)).await;
    let third = pipeline.get_cached_leaderboard(&contest, max_age).await.unwrap();
    assert!(!third.from_cache);
    assert!(third.cached_at > second.cached_at);
    assert_eq!(store.participant_reads(), 2);

    let fresh = pipeline.calculate_leaderboard(&contest).await.unwrap();
    assert_eq!(fresh.entries, third.leaderboard.entries);
    assert_eq!(store.participant_reads(), 3);
}
