//! Networked PostgreSQL backend
//!
//! Sessions check a connection out of a small pool and return it on drop.
//! Parameters use `$N` placeholders.

use super::{decode_result, decode_side, Database, Session, StoreError, StoreResult, MARKER_TABLE};
use crate::models::{
    Bet, BetView, Game, GameEdit, NewGame, Prop, PropSummary, ResolvedBet, Side, SyncedGame,
    UpsertStats, User,
};
use async_trait::async_trait;
use sqlx::pool::PoolConnection;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Connection, Postgres, Row};

const SCHEMA: &str = include_str!("../../schema/postgres.sql");

const GAME_COLUMNS: &str =
    "id, espn_id, home_team, away_team, game_date, status, home_score, away_score";

const MAX_CONNECTIONS: u32 = 5;

/// PostgreSQL connection pool
pub struct PostgresDatabase {
    pool: PgPool,
}

impl PostgresDatabase {
    pub async fn connect(url: &str) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect(url)
            .await?;
        log::info!("Connected to PostgreSQL");
        Ok(Self { pool })
    }
}

#[async_trait]
impl Database for PostgresDatabase {
    async fn session(&self) -> StoreResult<Box<dyn Session>> {
        let conn = self.pool.acquire().await?;
        Ok(Box::new(PostgresSession { conn }))
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }
}

/// One pooled PostgreSQL connection
pub struct PostgresSession {
    conn: PoolConnection<Postgres>,
}

fn game_from_row(row: &PgRow) -> StoreResult<Game> {
    Ok(Game {
        id: row.try_get("id")?,
        espn_id: row.try_get("espn_id")?,
        home_team: row.try_get("home_team")?,
        away_team: row.try_get("away_team")?,
        game_date: row.try_get("game_date")?,
        status: row.try_get("status")?,
        home_score: row.try_get("home_score")?,
        away_score: row.try_get("away_score")?,
    })
}

fn prop_from_row(row: &PgRow) -> StoreResult<Prop> {
    Ok(Prop {
        id: row.try_get("id")?,
        game_id: row.try_get("game_id")?,
        description: row.try_get("description")?,
        result: decode_result(row.try_get("result")?)?,
    })
}

fn bet_from_row(row: &PgRow) -> StoreResult<Bet> {
    Ok(Bet {
        id: row.try_get("id")?,
        prop_id: row.try_get("prop_id")?,
        user_id: row.try_get("user_id")?,
        selection: decode_side(row.try_get("selection")?)?,
    })
}

/// Map a unique-constraint failure to [`StoreError::Conflict`]
fn map_conflict(err: sqlx::Error, what: impl Into<String>) -> StoreError {
    match err {
        sqlx::Error::Database(ref db) if db.is_unique_violation() => {
            StoreError::Conflict(what.into())
        }
        other => StoreError::Postgres(other),
    }
}

#[async_trait]
impl Session for PostgresSession {
    async fn ensure_schema(&mut self) -> StoreResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT FROM information_schema.tables WHERE table_name = $1)",
        )
        .bind(MARKER_TABLE)
        .fetch_one(&mut *self.conn)
        .await?;
        if exists {
            return Ok(false);
        }

        let mut tx = self.conn.begin().await?;
        sqlx::Executor::execute(&mut *tx, sqlx::raw_sql(SCHEMA)).await?;
        tx.commit().await?;
        log::info!("PostgreSQL schema created");
        Ok(true)
    }

    async fn list_games(&mut self) -> StoreResult<Vec<Game>> {
        let rows = sqlx::query(&format!(
            "SELECT {GAME_COLUMNS} FROM games ORDER BY game_date, id"
        ))
        .fetch_all(&mut *self.conn)
        .await?;
        rows.iter().map(game_from_row).collect()
    }

    async fn get_game(&mut self, id: i64) -> StoreResult<Option<Game>> {
        let row = sqlx::query(&format!("SELECT {GAME_COLUMNS} FROM games WHERE id = $1"))
            .bind(id)
            .fetch_optional(&mut *self.conn)
            .await?;
        row.as_ref().map(game_from_row).transpose()
    }

    async fn get_game_by_espn_id(&mut self, espn_id: &str) -> StoreResult<Option<Game>> {
        let row = sqlx::query(&format!(
            "SELECT {GAME_COLUMNS} FROM games WHERE espn_id = $1"
        ))
        .bind(espn_id)
        .fetch_optional(&mut *self.conn)
        .await?;
        row.as_ref().map(game_from_row).transpose()
    }

    async fn insert_game(&mut self, game: &NewGame) -> StoreResult<i64> {
        let id = sqlx::query_scalar(
            "INSERT INTO games (home_team, away_team, game_date) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(game.home_team.as_str())
        .bind(game.away_team.as_str())
        .bind(game.game_date.as_str())
        .fetch_one(&mut *self.conn)
        .await?;
        Ok(id)
    }

    async fn update_game(&mut self, id: i64, edit: &GameEdit) -> StoreResult<()> {
        sqlx::query("UPDATE games SET home_team = $1, away_team = $2, game_date = $3 WHERE id = $4")
            .bind(edit.home_team.as_str())
            .bind(edit.away_team.as_str())
            .bind(edit.game_date.as_str())
            .bind(id)
            .execute(&mut *self.conn)
            .await?;
        Ok(())
    }

    async fn delete_game(&mut self, id: i64) -> StoreResult<()> {
        let mut tx = self.conn.begin().await?;
        let bets = sqlx::query(
            "DELETE FROM bets WHERE prop_id IN (SELECT id FROM props WHERE game_id = $1)",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;
        let props = sqlx::query("DELETE FROM props WHERE game_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM games WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        log::debug!(
            "Deleted game {} ({} props, {} bets)",
            id,
            props.rows_affected(),
            bets.rows_affected()
        );
        Ok(())
    }

    async fn upsert_synced_games(&mut self, games: &[SyncedGame]) -> StoreResult<UpsertStats> {
        let mut tx = self.conn.begin().await?;
        let mut stats = UpsertStats::default();

        for game in games {
            let existing: Option<i64> = sqlx::query_scalar("SELECT id FROM games WHERE espn_id = $1")
                .bind(game.espn_id.as_str())
                .fetch_optional(&mut *tx)
                .await?;

            match existing {
                Some(id) => {
                    sqlx::query(
                        "UPDATE games
                         SET status = $1, home_score = $2, away_score = $3, game_date = $4
                         WHERE id = $5",
                    )
                    .bind(game.status.as_deref())
                    .bind(game.home_score)
                    .bind(game.away_score)
                    .bind(game.game_date.as_str())
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
                    stats.updated += 1;
                }
                None => {
                    sqlx::query(
                        "INSERT INTO games
                         (espn_id, home_team, away_team, game_date, status, home_score, away_score)
                         VALUES ($1, $2, $3, $4, $5, $6, $7)",
                    )
                    .bind(game.espn_id.as_str())
                    .bind(game.home_team.as_str())
                    .bind(game.away_team.as_str())
                    .bind(game.game_date.as_str())
                    .bind(game.status.as_deref())
                    .bind(game.home_score)
                    .bind(game.away_score)
                    .execute(&mut *tx)
                    .await?;
                    stats.inserted += 1;
                }
            }
        }

        tx.commit().await?;
        Ok(stats)
    }

    async fn list_props_for_game(&mut self, game_id: i64) -> StoreResult<Vec<Prop>> {
        let rows = sqlx::query(
            "SELECT id, game_id, description, result FROM props WHERE game_id = $1 ORDER BY id",
        )
        .bind(game_id)
        .fetch_all(&mut *self.conn)
        .await?;
        rows.iter().map(prop_from_row).collect()
    }

    async fn list_prop_summaries(&mut self) -> StoreResult<Vec<PropSummary>> {
        let rows = sqlx::query(
            "SELECT props.id AS id, props.description AS description, props.result AS result,
                    games.home_team AS home_team, games.away_team AS away_team
             FROM props
             JOIN games ON props.game_id = games.id
             ORDER BY games.game_date, props.id",
        )
        .fetch_all(&mut *self.conn)
        .await?;
        rows.iter()
            .map(|row| {
                Ok(PropSummary {
                    id: row.try_get("id")?,
                    description: row.try_get("description")?,
                    result: decode_result(row.try_get("result")?)?,
                    home_team: row.try_get("home_team")?,
                    away_team: row.try_get("away_team")?,
                })
            })
            .collect()
    }

    async fn get_prop(&mut self, id: i64) -> StoreResult<Option<Prop>> {
        let row = sqlx::query("SELECT id, game_id, description, result FROM props WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.conn)
            .await?;
        row.as_ref().map(prop_from_row).transpose()
    }

    async fn insert_prop(&mut self, game_id: i64, description: &str) -> StoreResult<i64> {
        let id = sqlx::query_scalar(
            "INSERT INTO props (game_id, description) VALUES ($1, $2) RETURNING id",
        )
        .bind(game_id)
        .bind(description)
        .fetch_one(&mut *self.conn)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_foreign_key_violation() => {
                StoreError::MissingGame(game_id)
            }
            other => StoreError::Postgres(other),
        })?;
        Ok(id)
    }

    async fn update_prop_description(&mut self, id: i64, description: &str) -> StoreResult<()> {
        sqlx::query("UPDATE props SET description = $1 WHERE id = $2")
            .bind(description)
            .bind(id)
            .execute(&mut *self.conn)
            .await?;
        Ok(())
    }

    async fn set_prop_result(&mut self, id: i64, result: Option<Side>) -> StoreResult<()> {
        sqlx::query("UPDATE props SET result = $1 WHERE id = $2")
            .bind(result.map(|side| side.as_str()))
            .bind(id)
            .execute(&mut *self.conn)
            .await?;
        Ok(())
    }

    async fn delete_prop(&mut self, id: i64) -> StoreResult<()> {
        sqlx::query("DELETE FROM props WHERE id = $1")
            .bind(id)
            .execute(&mut *self.conn)
            .await?;
        Ok(())
    }

    async fn list_users(&mut self) -> StoreResult<Vec<User>> {
        let rows = sqlx::query("SELECT id, name FROM users ORDER BY id")
            .fetch_all(&mut *self.conn)
            .await?;
        rows.iter()
            .map(|row| {
                Ok(User {
                    id: row.try_get("id")?,
                    name: row.try_get("name")?,
                })
            })
            .collect()
    }

    async fn insert_user(&mut self, name: &str) -> StoreResult<i64> {
        sqlx::query_scalar("INSERT INTO users (name) VALUES ($1) RETURNING id")
            .bind(name)
            .fetch_one(&mut *self.conn)
            .await
            .map_err(|e| map_conflict(e, format!("user {name:?} already exists")))
    }

    async fn delete_user(&mut self, id: i64) -> StoreResult<()> {
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *self.conn)
            .await?;
        Ok(())
    }

    async fn find_bet(&mut self, prop_id: i64, user_id: i64) -> StoreResult<Option<Bet>> {
        let row = sqlx::query(
            "SELECT id, prop_id, user_id, selection FROM bets WHERE prop_id = $1 AND user_id = $2",
        )
        .bind(prop_id)
        .bind(user_id)
        .fetch_optional(&mut *self.conn)
        .await?;
        row.as_ref().map(bet_from_row).transpose()
    }

    async fn insert_bet(
        &mut self,
        prop_id: i64,
        user_id: i64,
        selection: Side,
    ) -> StoreResult<i64> {
        let id = sqlx::query_scalar(
            "INSERT INTO bets (prop_id, user_id, selection) VALUES ($1, $2, $3)
             ON CONFLICT (prop_id, user_id) DO UPDATE SET selection = EXCLUDED.selection
             RETURNING id",
        )
        .bind(prop_id)
        .bind(user_id)
        .bind(selection.as_str())
        .fetch_one(&mut *self.conn)
        .await?;
        Ok(id)
    }

    async fn update_bet_selection(&mut self, bet_id: i64, selection: Side) -> StoreResult<()> {
        sqlx::query("UPDATE bets SET selection = $1 WHERE id = $2")
            .bind(selection.as_str())
            .bind(bet_id)
            .execute(&mut *self.conn)
            .await?;
        Ok(())
    }

    async fn list_bets_for_prop(&mut self, prop_id: i64) -> StoreResult<Vec<Bet>> {
        let rows = sqlx::query(
            "SELECT id, prop_id, user_id, selection FROM bets WHERE prop_id = $1 ORDER BY id",
        )
        .bind(prop_id)
        .fetch_all(&mut *self.conn)
        .await?;
        rows.iter().map(bet_from_row).collect()
    }

    async fn list_bets_for_game(&mut self, game_id: i64) -> StoreResult<Vec<BetView>> {
        let rows = sqlx::query(
            "SELECT bets.prop_id AS prop_id, bets.selection AS selection, users.name AS name
             FROM bets
             JOIN users ON bets.user_id = users.id
             WHERE bets.prop_id IN (SELECT id FROM props WHERE game_id = $1)
             ORDER BY bets.id",
        )
        .bind(game_id)
        .fetch_all(&mut *self.conn)
        .await?;
        rows.iter()
            .map(|row| {
                Ok(BetView {
                    prop_id: row.try_get("prop_id")?,
                    user_name: row.try_get("name")?,
                    selection: decode_side(row.try_get("selection")?)?,
                })
            })
            .collect()
    }

    async fn list_resolved_bets(&mut self) -> StoreResult<Vec<ResolvedBet>> {
        let rows = sqlx::query(
            "SELECT bets.user_id AS user_id, bets.selection AS selection, props.result AS result
             FROM bets
             JOIN props ON bets.prop_id = props.id
             JOIN users ON bets.user_id = users.id
             WHERE props.result IS NOT NULL
             ORDER BY bets.id",
        )
        .fetch_all(&mut *self.conn)
        .await?;
        rows.iter()
            .map(|row| {
                Ok(ResolvedBet {
                    user_id: row.try_get("user_id")?,
                    selection: decode_side(row.try_get("selection")?)?,
                    result: decode_side(row.try_get("result")?)?,
                })
            })
            .collect()
    }
}
