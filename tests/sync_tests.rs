//! Scoreboard sync against a mock ESPN endpoint and a throwaway SQLite file.

use prop_bets::config::DatabaseConfig;
use prop_bets::models::{GameEdit, UpsertStats};
use prop_bets::store::{open_database, ArcDatabase};
use prop_bets::{sync_games, SyncOutcome};
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const FEED_PATH: &str = "/apis/site/v2/sports/football/nfl/scoreboard";

async fn open_db() -> (ArcDatabase, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let config = DatabaseConfig::Sqlite {
        path: temp_dir.path().join("bets.db"),
    };
    (open_database(&config).await.unwrap(), temp_dir)
}

fn event(id: &str, home: (&str, &str), away: (&str, &str), status: &str) -> serde_json::Value {
    json!({
        "id": id,
        "date": "2024-09-05T00:20Z",
        "status": {"type": {"shortDetail": status}},
        "competitions": [{"competitors": [
            {"homeAway": "home", "score": home.1, "team": {"displayName": home.0}},
            {"homeAway": "away", "score": away.1, "team": {"displayName": away.0}}
        ]}]
    })
}

async fn serve_feed(server: &MockServer, body: serde_json::Value) {
    server.reset().await;
    Mock::given(method("GET"))
        .and(path(FEED_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn sync(db: &ArcDatabase, server: &MockServer) -> SyncOutcome {
    let mut session = db.session().await.unwrap();
    sync_games(&mut *session, &format!("{}{}", server.uri(), FEED_PATH)).await
}

// ── Happy path ───────────────────────────────────────────────────────

#[tokio::test]
async fn first_sync_inserts_formatted_game() {
    let (db, _dir) = open_db().await;
    let server = MockServer::start().await;
    serve_feed(
        &server,
        json!({"events": [event("999", ("A", "24"), ("B", "17"), "Final")]}),
    )
    .await;

    let outcome = sync(&db, &server).await;
    assert_eq!(
        outcome,
        SyncOutcome::Synced(UpsertStats {
            inserted: 1,
            updated: 0
        })
    );

    let mut session = db.session().await.unwrap();
    let game = session.get_game_by_espn_id("999").await.unwrap().unwrap();
    assert_eq!(game.home_team, "A");
    assert_eq!(game.away_team, "B");
    assert_eq!(game.home_score, 24);
    assert_eq!(game.away_score, 17);
    assert_eq!(game.game_date, "Wed 7:20 PM");
    assert_eq!(game.status.as_deref(), Some("Final"));
}

#[tokio::test]
async fn repeated_sync_does_not_duplicate() {
    let (db, _dir) = open_db().await;
    let server = MockServer::start().await;
    serve_feed(
        &server,
        json!({"events": [
            event("1", ("A", "0"), ("B", "0"), "Sun 1:00 PM"),
            event("2", ("C", "0"), ("D", "0"), "Sun 4:25 PM")
        ]}),
    )
    .await;

    assert!(sync(&db, &server).await.is_success());
    let before = db.session().await.unwrap().list_games().await.unwrap();

    let second = sync(&db, &server).await;
    assert_eq!(
        second,
        SyncOutcome::Synced(UpsertStats {
            inserted: 0,
            updated: 2
        })
    );

    let after = db.session().await.unwrap().list_games().await.unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn score_update_keeps_local_team_names() {
    let (db, _dir) = open_db().await;
    let server = MockServer::start().await;
    serve_feed(
        &server,
        json!({"events": [event("999", ("A", "24"), ("B", "17"), "4th 2:00")]}),
    )
    .await;
    assert!(sync(&db, &server).await.is_success());

    let mut session = db.session().await.unwrap();
    let game = session.get_game_by_espn_id("999").await.unwrap().unwrap();
    session
        .update_game(
            game.id,
            &GameEdit {
                home_team: "Home Side".to_string(),
                away_team: "Away Side".to_string(),
                game_date: game.game_date.clone(),
            },
        )
        .await
        .unwrap();
    drop(session);

    serve_feed(
        &server,
        json!({"events": [event("999", ("A", "27"), ("B", "17"), "Final")]}),
    )
    .await;
    assert!(sync(&db, &server).await.is_success());

    let mut session = db.session().await.unwrap();
    let games = session.list_games().await.unwrap();
    assert_eq!(games.len(), 1);
    assert_eq!(games[0].id, game.id);
    assert_eq!(games[0].home_score, 27);
    assert_eq!(games[0].status.as_deref(), Some("Final"));
    assert_eq!(games[0].home_team, "Home Side");
    assert_eq!(games[0].away_team, "Away Side");
}

#[tokio::test]
async fn manual_games_are_left_alone() {
    let (db, _dir) = open_db().await;
    let mut session = db.session().await.unwrap();
    let manual_id = session
        .insert_game(&prop_bets::models::NewGame {
            home_team: "Bills".to_string(),
            away_team: "Jets".to_string(),
            game_date: "Mon 8:15 PM".to_string(),
        })
        .await
        .unwrap();
    drop(session);

    let server = MockServer::start().await;
    serve_feed(
        &server,
        json!({"events": [event("1", ("A", "3"), ("B", "0"), "Final")]}),
    )
    .await;
    assert!(sync(&db, &server).await.is_success());

    let mut session = db.session().await.unwrap();
    let manual = session.get_game(manual_id).await.unwrap().unwrap();
    assert_eq!(manual.espn_id, None);
    assert_eq!(manual.home_team, "Bills");
    assert_eq!(session.list_games().await.unwrap().len(), 2);
}

#[tokio::test]
async fn empty_feed_is_a_successful_no_op() {
    let (db, _dir) = open_db().await;
    let server = MockServer::start().await;
    serve_feed(&server, json!({"events": []})).await;

    assert_eq!(
        sync(&db, &server).await,
        SyncOutcome::Synced(UpsertStats::default())
    );
}

// ── Failures ─────────────────────────────────────────────────────────

#[tokio::test]
async fn server_error_fails_without_writes() {
    let (db, _dir) = open_db().await;
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(FEED_PATH))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let outcome = sync(&db, &server).await;
    assert!(!outcome.is_success());
    assert!(outcome.message().contains("500"));
    assert!(db.session().await.unwrap().list_games().await.unwrap().is_empty());
}

#[tokio::test]
async fn malformed_json_fails() {
    let (db, _dir) = open_db().await;
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(FEED_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"events\": [}"))
        .mount(&server)
        .await;

    assert!(matches!(sync(&db, &server).await, SyncOutcome::Failed(_)));
}

#[tokio::test]
async fn bad_score_rolls_back_whole_batch() {
    let (db, _dir) = open_db().await;
    let server = MockServer::start().await;
    serve_feed(
        &server,
        json!({"events": [
            event("1", ("A", "7"), ("B", "0"), "Final"),
            event("2", ("C", "seven"), ("D", "0"), "Final")
        ]}),
    )
    .await;

    assert!(!sync(&db, &server).await.is_success());
    assert!(db.session().await.unwrap().list_games().await.unwrap().is_empty());
}

#[tokio::test]
async fn unreachable_endpoint_fails() {
    let (db, _dir) = open_db().await;
    let server = MockServer::start().await;
    let url = format!("{}{}", server.uri(), FEED_PATH);
    drop(server);

    let mut session = db.session().await.unwrap();
    assert!(!sync_games(&mut *session, &url).await.is_success());
}
