use axum::http::StatusCode;
use contestboard::api::{self, AppState};
use contestboard::config::Config;
use contestboard::db::init_db;
use contestboard::domain::{
    ContestId, ContestStatus, MatchEvent, MatchId, PlayerId, Points, TeamComposition, TeamId,
    TimeMs, UserId,
};
use contestboard::orchestration::{Broadcaster, LeaderboardService, LogBroadcaster};
use contestboard::{Repository, Stores};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::util::ServiceExt;

struct TestApp {
    app: axum::Router,
    state: AppState,
    repo: Arc<Repository>,
    _temp: TempDir,
}

async fn setup_test_app() -> TestApp {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir
        .path()
        .join("test.db")
        .to_string_lossy()
        .to_string();
    let pool = init_db(&db_path).await.expect("init_db failed");
    let repo = Arc::new(Repository::new(pool));

    let mut env = HashMap::new();
    env.insert("DATABASE_PATH".to_string(), db_path);
    env.insert("LEADERBOARD_TOP_N".to_string(), "2".to_string());
    env.insert("LIVE_WINDOW_RADIUS".to_string(), "1".to_string());
    let config = Config::from_env_map(env).unwrap();

    let broadcaster: Arc<dyn Broadcaster> = Arc::new(LogBroadcaster);
    let (service, _worker) = LeaderboardService::start(
        Stores::shared(repo.clone()),
        config.pipeline_settings(),
        broadcaster,
        config.dispatch_queue_capacity,
    );
    let state = AppState::new(Arc::new(service), config);
    let app = api::create_router(state.clone());

    TestApp {
        app,
        state,
        repo,
        _temp: temp_dir,
    }
}

fn team(id: &str, owner: &str, created_at: i64, captain: &str, vice: &str) -> TeamComposition {
    TeamComposition {
        team_id: TeamId::new(id),
        owner_user_id: UserId::new(owner),
        match_id: MatchId::new("M1"),
        player_ids: vec![PlayerId::new(captain), PlayerId::new(vice)],
        captain_id: PlayerId::new(captain),
        vice_captain_id: PlayerId::new(vice),
        credits_used: Points::from_str_canonical("99.5").unwrap(),
        created_at: TimeMs::new(created_at),
    }
}

fn event(id: &str, player: &str, points: &str) -> MatchEvent {
    MatchEvent::new(
        id,
        PlayerId::new(player),
        MatchId::new("M1"),
        Points::from_str_canonical(points).unwrap(),
        1,
        TimeMs::new(1_700_000_000_000),
    )
}

/// C1 on M1 with three teams: T1 50, T2 50 (later), T3 31.5.
async fn seed(repo: &Repository) {
    let c1 = ContestId::new("C1");
    repo.upsert_contest(&c1, &MatchId::new("M1"), ContestStatus::Live)
        .await
        .unwrap();
    for (t, u, at, c, v) in [
        ("T3", "U3", 2, "P3", "Q3"),
        ("T1", "U1", 0, "P1", "Q1"),
        ("T2", "U2", 1, "P2", "Q2"),
    ] {
        repo.insert_team(&team(t, u, at, c, v)).await.unwrap();
        repo.enter_team(&c1, &TeamId::new(t), &UserId::new(u))
            .await
            .unwrap();
    }
    repo.insert_events_batch(&[
        event("e1", "P1", "25"),
        event("e2", "P2", "17.5"),
        event("e3", "Q2", "10"),
        event("e4", "Q3", "21"),
    ])
    .await
    .unwrap();
}

async fn request(app: axum::Router, method: &str, uri: &str, body: Option<&str>) -> (StatusCode, Value) {
    let builder = axum::http::Request::builder().method(method).uri(uri);
    let req = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(axum::body::Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(axum::body::Body::empty()).unwrap(),
    };

    let res = app.oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn ranked_teams(entries: &Value) -> Vec<(String, u64)> {
    entries
        .as_array()
        .unwrap()
        .iter()
        .map(|e| {
            (
                e["teamId"].as_str().unwrap().to_string(),
                e["rank"].as_u64().unwrap(),
            )
        })
        .collect()
}

#[tokio::test]
async fn test_health_and_ready() {
    let test_app = setup_test_app().await;

    let (status, body) = request(test_app.app.clone(), "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = request(test_app.app.clone(), "GET", "/ready", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
    assert_eq!(body["dispatcher"]["queueCapacity"], 100);
    assert_eq!(body["dispatcher"]["backlog"], 0);
}

#[tokio::test]
async fn test_cached_leaderboard_contract() {
    let test_app = setup_test_app().await;
    seed(&test_app.repo).await;

    let (status, body) = request(
        test_app.app.clone(),
        "GET",
        "/v1/contests/C1/leaderboard",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["contestId"], "C1");
    assert_eq!(body["totalParticipants"], 3);
    assert_eq!(body["fromCache"], false);
    assert_eq!(body["stale"], false);
    assert_eq!(
        ranked_teams(&body["entries"]),
        vec![
            ("T1".to_string(), 1),
            ("T2".to_string(), 2),
            ("T3".to_string(), 3)
        ]
    );
    assert_eq!(body["entries"][0]["points"], 50.0);
    assert_eq!(body["entries"][2]["points"], 31.5);
    assert_eq!(body["entries"][0]["userId"], "U1");

    let (_, again) = request(
        test_app.app.clone(),
        "GET",
        "/v1/contests/C1/leaderboard?maxAgeSecs=60",
        None,
    )
    .await;
    assert_eq!(again["fromCache"], true);
    assert_eq!(again["cachedAt"], body["cachedAt"]);

    let (_, zero) = request(
        test_app.app.clone(),
        "GET",
        "/v1/contests/C1/leaderboard?maxAgeSecs=0",
        None,
    )
    .await;
    assert_eq!(zero["fromCache"], false);
}

#[tokio::test]
async fn test_bad_requests_and_missing_contest() {
    let test_app = setup_test_app().await;
    seed(&test_app.repo).await;

    let cases = [
        ("GET", "/v1/contests/C1/leaderboard?maxAgeSecs=soon", StatusCode::BAD_REQUEST),
        ("GET", "/v1/contests/C1/leaderboard/live", StatusCode::BAD_REQUEST),
        ("GET", "/v1/contests/C1/rank?userId=", StatusCode::BAD_REQUEST),
        ("GET", "/v1/contests/NOPE/leaderboard", StatusCode::NOT_FOUND),
        ("GET", "/v1/contests/NOPE/leaderboard/fresh", StatusCode::NOT_FOUND),
        ("GET", "/v1/contests/NOPE/rank?userId=U1", StatusCode::NOT_FOUND),
    ];
    for (method, uri, expected) in cases {
        let (status, body) = request(test_app.app.clone(), method, uri, None).await;
        assert_eq!(status, expected, "{}", uri);
        assert!(body["error"].is_string(), "{}", uri);
    }
}

#[tokio::test]
async fn test_live_view_and_rank() {
    let test_app = setup_test_app().await;
    seed(&test_app.repo).await;

    let (status, body) = request(
        test_app.app.clone(),
        "GET",
        "/v1/contests/C1/leaderboard/live?userId=U3",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        ranked_teams(&body["top"]),
        vec![("T1".to_string(), 1), ("T2".to_string(), 2)]
    );
    assert_eq!(body["userRank"]["status"], "ranked");
    assert_eq!(body["userRank"]["rank"], 3);
    assert_eq!(
        ranked_teams(&body["aroundUser"]),
        vec![("T2".to_string(), 2), ("T3".to_string(), 3)]
    );

    let (status, body) = request(
        test_app.app.clone(),
        "GET",
        "/v1/contests/C1/rank?userId=U2",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["contestId"], "C1");
    assert_eq!(body["status"], "ranked");
    assert_eq!(body["rank"], 2);
    assert_eq!(body["teamId"], "T2");

    let (_, body) = request(
        test_app.app.clone(),
        "GET",
        "/v1/contests/C1/rank?userId=U9",
        None,
    )
    .await;
    assert_eq!(body["status"], "not_participating");
}

#[tokio::test]
async fn test_trigger_recomputes_and_persists_ranks() {
    let test_app = setup_test_app().await;
    seed(&test_app.repo).await;

    // Warm the cache, then score for T3's captain so it overtakes.
    request(test_app.app.clone(), "GET", "/v1/contests/C1/leaderboard", None).await;
    test_app
        .repo
        .insert_event(&event("e5", "P3", "20"))
        .await
        .unwrap();

    let (status, body) = request(
        test_app.app.clone(),
        "POST",
        "/v1/contests/C1/triggers",
        Some(r#"{"source":"match_event","matchEventId":"e5"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["outcome"], "queued");

    let dispatcher = test_app.state.service.dispatcher().clone();
    tokio::time::timeout(Duration::from_secs(5), async {
        while dispatcher.stats().processed == 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("trigger was never processed");

    let (_, body) = request(
        test_app.app.clone(),
        "GET",
        "/v1/contests/C1/leaderboard",
        None,
    )
    .await;
    assert_eq!(body["fromCache"], true);
    assert_eq!(body["entries"][0]["teamId"], "T3");
    assert_eq!(body["entries"][0]["points"], 71.5);

    use contestboard::TeamStore;
    let ranks: Vec<(String, Option<u32>)> = test_app
        .repo
        .participants_in_contest(&ContestId::new("C1"))
        .await
        .unwrap()
        .into_iter()
        .map(|p| (p.team_id.to_string(), p.rank))
        .collect();
    assert_eq!(
        ranks,
        vec![
            ("T1".to_string(), Some(2)),
            ("T2".to_string(), Some(3)),
            ("T3".to_string(), Some(1))
        ]
    );
}

#[tokio::test]
async fn test_trigger_rejects_unknown_contest_and_backlog_source() {
    let test_app = setup_test_app().await;
    seed(&test_app.repo).await;

    let (status, _) = request(
        test_app.app.clone(),
        "POST",
        "/v1/contests/NOPE/triggers",
        Some("{}"),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = request(
        test_app.app.clone(),
        "POST",
        "/v1/contests/C1/triggers",
        Some(r#"{"source":"backlog"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_match_recalculation_endpoint() {
    let test_app = setup_test_app().await;
    seed(&test_app.repo).await;
    test_app
        .repo
        .upsert_contest(&ContestId::new("C2"), &MatchId::new("M1"), ContestStatus::Upcoming)
        .await
        .unwrap();

    let (status, body) = request(
        test_app.app.clone(),
        "POST",
        "/v1/matches/M1/recalculate",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["contests"], 2);
    assert_eq!(body["queued"], 2);
    assert_eq!(body["dropped"], 0);

    let (_, body) = request(
        test_app.app.clone(),
        "POST",
        "/v1/matches/M9/recalculate",
        None,
    )
    .await;
    assert_eq!(body["contests"], 0);
}
