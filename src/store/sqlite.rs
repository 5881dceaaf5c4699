//! Embedded SQLite backend
//!
//! Every session opens its own connection to the database file, so nothing
//! is shared between requests. Parameters use `?N` placeholders.

use super::{Database, Session, StoreError, StoreResult, MARKER_TABLE};
use crate::models::{
    Bet, BetView, Game, GameEdit, NewGame, Prop, PropSummary, ResolvedBet, Side, SyncedGame,
    UpsertStats, User,
};
use async_trait::async_trait;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use std::time::Duration;

const SCHEMA: &str = include_str!("../../schema/sqlite.sql");

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const GAME_COLUMNS: &str =
    "id, espn_id, home_team, away_team, game_date, status, home_score, away_score";

impl ToSql for Side {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Side {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

/// SQLite database file
pub struct SqliteDatabase {
    path: PathBuf,
}

impl SqliteDatabase {
    /// Point at a database file, creating its parent directory if needed
    pub fn new(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
                log::info!("Created directory: {}", parent.display());
            }
        }
        log::info!("SQLite database: {}", path.display());
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open a session without going through the trait object
    pub fn open_session(&self) -> StoreResult<SqliteSession> {
        let conn = Connection::open(&self.path)?;
        // concurrent requests each hold their own connection
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(SqliteSession { conn })
    }
}

#[async_trait]
impl Database for SqliteDatabase {
    async fn session(&self) -> StoreResult<Box<dyn Session>> {
        Ok(Box::new(self.open_session()?))
    }

    fn backend(&self) -> &'static str {
        "sqlite"
    }
}

/// One SQLite connection
pub struct SqliteSession {
    conn: Connection,
}

fn game_from_row(row: &Row<'_>) -> rusqlite::Result<Game> {
    Ok(Game {
        id: row.get("id")?,
        espn_id: row.get("espn_id")?,
        home_team: row.get("home_team")?,
        away_team: row.get("away_team")?,
        game_date: row.get("game_date")?,
        status: row.get("status")?,
        home_score: row.get("home_score")?,
        away_score: row.get("away_score")?,
    })
}

fn prop_from_row(row: &Row<'_>) -> rusqlite::Result<Prop> {
    Ok(Prop {
        id: row.get("id")?,
        game_id: row.get("game_id")?,
        description: row.get("description")?,
        result: row.get("result")?,
    })
}

fn bet_from_row(row: &Row<'_>) -> rusqlite::Result<Bet> {
    Ok(Bet {
        id: row.get("id")?,
        prop_id: row.get("prop_id")?,
        user_id: row.get("user_id")?,
        selection: row.get("selection")?,
    })
}

/// Map a unique-constraint failure to [`StoreError::Conflict`]
fn map_conflict(err: rusqlite::Error, what: impl Into<String>) -> StoreError {
    match err {
        rusqlite::Error::SqliteFailure(ref e, _) if e.code == ErrorCode::ConstraintViolation => {
            StoreError::Conflict(what.into())
        }
        other => StoreError::Sqlite(other),
    }
}

#[async_trait]
impl Session for SqliteSession {
    async fn ensure_schema(&mut self) -> StoreResult<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            params![MARKER_TABLE],
            |row| row.get(0),
        )?;
        if count > 0 {
            return Ok(false);
        }

        let tx = self.conn.transaction()?;
        tx.execute_batch(SCHEMA)?;
        tx.commit()?;
        log::info!("SQLite schema created");
        Ok(true)
    }

    async fn list_games(&mut self) -> StoreResult<Vec<Game>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {GAME_COLUMNS} FROM games ORDER BY game_date, id"))?;
        let games = stmt
            .query_map([], game_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(games)
    }

    async fn get_game(&mut self, id: i64) -> StoreResult<Option<Game>> {
        let game = self
            .conn
            .query_row(
                &format!("SELECT {GAME_COLUMNS} FROM games WHERE id = ?1"),
                params![id],
                game_from_row,
            )
            .optional()?;
        Ok(game)
    }

    async fn get_game_by_espn_id(&mut self, espn_id: &str) -> StoreResult<Option<Game>> {
        let game = self
            .conn
            .query_row(
                &format!("SELECT {GAME_COLUMNS} FROM games WHERE espn_id = ?1"),
                params![espn_id],
                game_from_row,
            )
            .optional()?;
        Ok(game)
    }

    async fn insert_game(&mut self, game: &NewGame) -> StoreResult<i64> {
        self.conn.execute(
            "INSERT INTO games (home_team, away_team, game_date) VALUES (?1, ?2, ?3)",
            params![game.home_team, game.away_team, game.game_date],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    async fn update_game(&mut self, id: i64, edit: &GameEdit) -> StoreResult<()> {
        self.conn.execute(
            "UPDATE games SET home_team = ?1, away_team = ?2, game_date = ?3 WHERE id = ?4",
            params![edit.home_team, edit.away_team, edit.game_date, id],
        )?;
        Ok(())
    }

    async fn delete_game(&mut self, id: i64) -> StoreResult<()> {
        let tx = self.conn.transaction()?;
        let bets = tx.execute(
            "DELETE FROM bets WHERE prop_id IN (SELECT id FROM props WHERE game_id = ?1)",
            params![id],
        )?;
        let props = tx.execute("DELETE FROM props WHERE game_id = ?1", params![id])?;
        tx.execute("DELETE FROM games WHERE id = ?1", params![id])?;
        tx.commit()?;
        log::debug!("Deleted game {} ({} props, {} bets)", id, props, bets);
        Ok(())
    }

    async fn upsert_synced_games(&mut self, games: &[SyncedGame]) -> StoreResult<UpsertStats> {
        let tx = self.conn.transaction()?;
        let mut stats = UpsertStats::default();

        {
            let mut find = tx.prepare_cached("SELECT id FROM games WHERE espn_id = ?1")?;
            let mut update = tx.prepare_cached(
                "UPDATE games
                 SET status = ?1, home_score = ?2, away_score = ?3, game_date = ?4
                 WHERE id = ?5",
            )?;
            let mut insert = tx.prepare_cached(
                "INSERT INTO games
                 (espn_id, home_team, away_team, game_date, status, home_score, away_score)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;

            for game in games {
                let existing: Option<i64> = find
                    .query_row(params![game.espn_id], |row| row.get(0))
                    .optional()?;

                match existing {
                    Some(id) => {
                        update.execute(params![
                            game.status,
                            game.home_score,
                            game.away_score,
                            game.game_date,
                            id,
                        ])?;
                        stats.updated += 1;
                    }
                    None => {
                        insert.execute(params![
                            game.espn_id,
                            game.home_team,
                            game.away_team,
                            game.game_date,
                            game.status,
                            game.home_score,
                            game.away_score,
                        ])?;
                        stats.inserted += 1;
                    }
                }
            }
        }

        tx.commit()?;
        Ok(stats)
    }

    async fn list_props_for_game(&mut self, game_id: i64) -> StoreResult<Vec<Prop>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, game_id, description, result FROM props WHERE game_id = ?1 ORDER BY id",
        )?;
        let props = stmt
            .query_map(params![game_id], prop_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(props)
    }

    async fn list_prop_summaries(&mut self) -> StoreResult<Vec<PropSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT props.id AS id, props.description AS description, props.result AS result,
                    games.home_team AS home_team, games.away_team AS away_team
             FROM props
             JOIN games ON props.game_id = games.id
             ORDER BY games.game_date, props.id",
        )?;
        let props = stmt
            .query_map([], |row| {
                Ok(PropSummary {
                    id: row.get("id")?,
                    description: row.get("description")?,
                    result: row.get("result")?,
                    home_team: row.get("home_team")?,
                    away_team: row.get("away_team")?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(props)
    }

    async fn get_prop(&mut self, id: i64) -> StoreResult<Option<Prop>> {
        let prop = self
            .conn
            .query_row(
                "SELECT id, game_id, description, result FROM props WHERE id = ?1",
                params![id],
                prop_from_row,
            )
            .optional()?;
        Ok(prop)
    }

    async fn insert_prop(&mut self, game_id: i64, description: &str) -> StoreResult<i64> {
        let inserted = self.conn.execute(
            "INSERT INTO props (game_id, description)
             SELECT ?1, ?2 WHERE EXISTS (SELECT 1 FROM games WHERE id = ?1)",
            params![game_id, description],
        )?;
        if inserted == 0 {
            return Err(StoreError::MissingGame(game_id));
        }
        Ok(self.conn.last_insert_rowid())
    }

    async fn update_prop_description(&mut self, id: i64, description: &str) -> StoreResult<()> {
        self.conn.execute(
            "UPDATE props SET description = ?1 WHERE id = ?2",
            params![description, id],
        )?;
        Ok(())
    }

    async fn set_prop_result(&mut self, id: i64, result: Option<Side>) -> StoreResult<()> {
        self.conn.execute(
            "UPDATE props SET result = ?1 WHERE id = ?2",
            params![result, id],
        )?;
        Ok(())
    }

    async fn delete_prop(&mut self, id: i64) -> StoreResult<()> {
        self.conn
            .execute("DELETE FROM props WHERE id = ?1", params![id])?;
        Ok(())
    }

    async fn list_users(&mut self) -> StoreResult<Vec<User>> {
        let mut stmt = self.conn.prepare("SELECT id, name FROM users ORDER BY id")?;
        let users = stmt
            .query_map([], |row| {
                Ok(User {
                    id: row.get("id")?,
                    name: row.get("name")?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(users)
    }

    async fn insert_user(&mut self, name: &str) -> StoreResult<i64> {
        self.conn
            .execute("INSERT INTO users (name) VALUES (?1)", params![name])
            .map_err(|e| map_conflict(e, format!("user {name:?} already exists")))?;
        Ok(self.conn.last_insert_rowid())
    }

    async fn delete_user(&mut self, id: i64) -> StoreResult<()> {
        self.conn
            .execute("DELETE FROM users WHERE id = ?1", params![id])?;
        Ok(())
    }

    async fn find_bet(&mut self, prop_id: i64, user_id: i64) -> StoreResult<Option<Bet>> {
        let bet = self
            .conn
            .query_row(
                "SELECT id, prop_id, user_id, selection FROM bets
                 WHERE prop_id = ?1 AND user_id = ?2",
                params![prop_id, user_id],
                bet_from_row,
            )
            .optional()?;
        Ok(bet)
    }

    async fn insert_bet(
        &mut self,
        prop_id: i64,
        user_id: i64,
        selection: Side,
    ) -> StoreResult<i64> {
        let id = self.conn.query_row(
            "INSERT INTO bets (prop_id, user_id, selection) VALUES (?1, ?2, ?3)
             ON CONFLICT(prop_id, user_id) DO UPDATE SET selection = excluded.selection
             RETURNING id",
            params![prop_id, user_id, selection],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    async fn update_bet_selection(&mut self, bet_id: i64, selection: Side) -> StoreResult<()> {
        self.conn.execute(
            "UPDATE bets SET selection = ?1 WHERE id = ?2",
            params![selection, bet_id],
        )?;
        Ok(())
    }

    async fn list_bets_for_prop(&mut self, prop_id: i64) -> StoreResult<Vec<Bet>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, prop_id, user_id, selection FROM bets WHERE prop_id = ?1 ORDER BY id",
        )?;
        let bets = stmt
            .query_map(params![prop_id], bet_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(bets)
    }

    async fn list_bets_for_game(&mut self, game_id: i64) -> StoreResult<Vec<BetView>> {
        let mut stmt = self.conn.prepare(
            "SELECT bets.prop_id AS prop_id, bets.selection AS selection, users.name AS name
             FROM bets
             JOIN users ON bets.user_id = users.id
             WHERE bets.prop_id IN (SELECT id FROM props WHERE game_id = ?1)
             ORDER BY bets.id",
        )?;
        let bets = stmt
            .query_map(params![game_id], |row| {
                Ok(BetView {
                    prop_id: row.get("prop_id")?,
                    user_name: row.get("name")?,
                    selection: row.get("selection")?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(bets)
    }

    async fn list_resolved_bets(&mut self) -> StoreResult<Vec<ResolvedBet>> {
        let mut stmt = self.conn.prepare(
            "SELECT bets.user_id AS user_id, bets.selection AS selection, props.result AS result
             FROM bets
             JOIN props ON bets.prop_id = props.id
             JOIN users ON bets.user_id = users.id
             WHERE props.result IS NOT NULL
             ORDER BY bets.id",
        )?;
        let bets = stmt
            .query_map([], |row| {
                Ok(ResolvedBet {
                    user_id: row.get("user_id")?,
                    selection: row.get("selection")?,
                    result: row.get("result")?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(bets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    /// Create a schema-initialized database in a temp directory
    async fn test_db() -> (SqliteDatabase, TempDir) {
        let dir = TempDir::new().unwrap();
        let db = SqliteDatabase::new(dir.path().join("test.db")).unwrap();
        db.open_session().unwrap().ensure_schema().await.unwrap();
        (db, dir)
    }

    fn synced(espn_id: &str, home_score: i32) -> SyncedGame {
        SyncedGame {
            espn_id: espn_id.to_string(),
            home_team: "Home".to_string(),
            away_team: "Away".to_string(),
            game_date: "Sun 1:00 PM".to_string(),
            status: Some("Final".to_string()),
            home_score,
            away_score: 3,
        }
    }

    #[tokio::test]
    async fn ensure_schema_applies_once() {
        let dir = TempDir::new().unwrap();
        let db = SqliteDatabase::new(dir.path().join("fresh.db")).unwrap();
        let mut session = db.open_session().unwrap();

        assert!(session.ensure_schema().await.unwrap());
        assert!(!session.ensure_schema().await.unwrap());

        // A second connection sees the same schema
        let mut other = db.open_session().unwrap();
        assert!(!other.ensure_schema().await.unwrap());
    }

    #[tokio::test]
    async fn new_creates_missing_parent_directory() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("bets.db");
        let db = SqliteDatabase::new(&path).unwrap();
        assert!(path.parent().unwrap().exists());
        db.open_session().unwrap().ensure_schema().await.unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn duplicate_user_name_is_a_conflict() {
        let (db, _dir) = test_db().await;
        let mut session = db.open_session().unwrap();

        session.insert_user("alice").await.unwrap();
        let err = session.insert_user("alice").await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        // The connection is still usable afterwards
        session.insert_user("bob").await.unwrap();
        assert_eq!(session.list_users().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn insert_bet_overwrites_existing_pair() {
        let (db, _dir) = test_db().await;
        let mut session = db.open_session().unwrap();

        let first = session.insert_bet(1, 1, Side::Yes).await.unwrap();
        let second = session.insert_bet(1, 1, Side::No).await.unwrap();
        assert_eq!(first, second);

        let bets = session.list_bets_for_prop(1).await.unwrap();
        assert_eq!(bets.len(), 1);
        assert_eq!(bets[0].selection, Side::No);
    }

    #[tokio::test]
    async fn upsert_inserts_then_updates() {
        let (db, _dir) = test_db().await;
        let mut session = db.open_session().unwrap();

        let stats = session
            .upsert_synced_games(&[synced("1", 10), synced("2", 20)])
            .await
            .unwrap();
        assert_eq!(stats, UpsertStats { inserted: 2, updated: 0 });

        let stats = session
            .upsert_synced_games(&[synced("1", 14)])
            .await
            .unwrap();
        assert_eq!(stats, UpsertStats { inserted: 0, updated: 1 });

        let game = session.get_game_by_espn_id("1").await.unwrap().unwrap();
        assert_eq!(game.home_score, 14);
        assert_eq!(session.list_games().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn upsert_keeps_edited_team_names() {
        let (db, _dir) = test_db().await;
        let mut session = db.open_session().unwrap();

        session.upsert_synced_games(&[synced("7", 0)]).await.unwrap();
        let game = session.get_game_by_espn_id("7").await.unwrap().unwrap();
        session
            .update_game(
                game.id,
                &GameEdit {
                    home_team: "Fixed Home".to_string(),
                    away_team: "Fixed Away".to_string(),
                    game_date: game.game_date.clone(),
                },
            )
            .await
            .unwrap();

        session.upsert_synced_games(&[synced("7", 21)]).await.unwrap();
        let game = session.get_game(game.id).await.unwrap().unwrap();
        assert_eq!(game.home_team, "Fixed Home");
        assert_eq!(game.away_team, "Fixed Away");
        assert_eq!(game.home_score, 21);
    }

    #[tokio::test]
    async fn failed_row_rolls_back_whole_upsert() {
        let (db, _dir) = test_db().await;
        let mut session = db.open_session().unwrap();
        session.upsert_synced_games(&[synced("ok1", 10)]).await.unwrap();
        session
            .conn
            .execute_batch(
                "CREATE TRIGGER reject_bad BEFORE INSERT ON games
                 WHEN NEW.espn_id = 'bad'
                 BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
            )
            .unwrap();

        // ok1 is updated and ok2 inserted before the failing row
        let result = session
            .upsert_synced_games(&[synced("ok1", 99), synced("ok2", 5), synced("bad", 0)])
            .await;
        assert!(result.is_err());

        let games = session.list_games().await.unwrap();
        assert_eq!(games.len(), 1);
        assert_eq!(games[0].espn_id.as_deref(), Some("ok1"));
        assert_eq!(games[0].home_score, 10);
    }

    #[tokio::test]
    async fn prop_for_missing_game_is_rejected() {
        let (db, _dir) = test_db().await;
        let mut session = db.open_session().unwrap();

        let err = session.insert_prop(99, "Orphan?").await.unwrap_err();
        assert!(matches!(err, StoreError::MissingGame(99)));
        assert!(session.list_props_for_game(99).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_game_removes_props_and_their_bets() {
        let (db, _dir) = test_db().await;
        let mut session = db.open_session().unwrap();

        let keep = session
            .insert_game(&NewGame {
                home_team: "A".to_string(),
                away_team: "B".to_string(),
                game_date: "Thu 8:20 PM".to_string(),
            })
            .await
            .unwrap();
        let doomed = session
            .insert_game(&NewGame {
                home_team: "C".to_string(),
                away_team: "D".to_string(),
                game_date: "Sun 1:00 PM".to_string(),
            })
            .await
            .unwrap();
        let kept_prop = session.insert_prop(keep, "Over 40.5?").await.unwrap();
        let doomed_prop = session.insert_prop(doomed, "Safety?").await.unwrap();
        session.insert_bet(kept_prop, 1, Side::Yes).await.unwrap();
        session.insert_bet(doomed_prop, 1, Side::No).await.unwrap();

        session.delete_game(doomed).await.unwrap();

        assert!(session.get_game(doomed).await.unwrap().is_none());
        assert!(session.get_prop(doomed_prop).await.unwrap().is_none());
        assert!(session.list_bets_for_prop(doomed_prop).await.unwrap().is_empty());
        assert_eq!(session.list_bets_for_prop(kept_prop).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn deleting_user_leaves_bets_behind() {
        let (db, _dir) = test_db().await;
        let mut session = db.open_session().unwrap();

        let user = session.insert_user("carol").await.unwrap();
        session.insert_bet(5, user, Side::Yes).await.unwrap();
        session.delete_user(user).await.unwrap();

        let bets = session.list_bets_for_prop(5).await.unwrap();
        assert_eq!(bets.len(), 1);
        assert_eq!(bets[0].user_id, user);
    }

    #[tokio::test]
    async fn invalid_stored_selection_is_an_error() {
        let (db, _dir) = test_db().await;
        let mut session = db.open_session().unwrap();
        session
            .conn
            .execute(
                "INSERT INTO bets (prop_id, user_id, selection) VALUES (1, 1, 'Maybe')",
                [],
            )
            .unwrap();

        assert!(session.list_bets_for_prop(1).await.is_err());
    }
}
