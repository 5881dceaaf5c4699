//! Storage accessor for games, props, users and bets
//!
//! Two interchangeable backends sit behind [`Database`] / [`Session`]:
//! an embedded SQLite file for local use and PostgreSQL for shared use.
//! Each backend writes its own SQL dialect and maps rows by column name,
//! so callers never branch on which one is active.

pub mod postgres;
pub mod sqlite;

use crate::config::DatabaseConfig;
use crate::models::{
    Bet, BetView, Game, GameEdit, NewGame, Prop, PropSummary, ResolvedBet, Side, SyncedGame,
    UpsertStats, User,
};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

pub use postgres::PostgresDatabase;
pub use sqlite::SqliteDatabase;

/// Table whose presence marks an initialized schema
pub const MARKER_TABLE: &str = "users";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),
    /// A unique constraint rejected the write
    #[error("conflict: {0}")]
    Conflict(String),
    /// A write referenced a game that does not exist
    #[error("game {0} does not exist")]
    MissingGame(i64),
    /// A stored value could not be decoded
    #[error("invalid stored value: {0}")]
    InvalidValue(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations
pub type StoreResult<T> = Result<T, StoreError>;

/// A storage backend that hands out scoped sessions
#[async_trait]
pub trait Database: Send + Sync {
    /// Open one session. The connection is released when the session drops.
    async fn session(&self) -> StoreResult<Box<dyn Session>>;

    /// Short backend name for logging
    fn backend(&self) -> &'static str;
}

pub type ArcDatabase = Arc<dyn Database>;

/// One connection's worth of storage operations
///
/// Single-row writes are committed immediately. Methods documented as
/// transactional commit once at the end and roll back on any error.
#[async_trait]
pub trait Session: Send {
    /// Apply the DDL script if the marker table is absent.
    /// Returns whether the script ran.
    async fn ensure_schema(&mut self) -> StoreResult<bool>;

    // ── Games ────────────────────────────────────────────────────────────

    /// All games ordered by their date text
    async fn list_games(&mut self) -> StoreResult<Vec<Game>>;
    async fn get_game(&mut self, id: i64) -> StoreResult<Option<Game>>;
    async fn get_game_by_espn_id(&mut self, espn_id: &str) -> StoreResult<Option<Game>>;
    async fn insert_game(&mut self, game: &NewGame) -> StoreResult<i64>;
    async fn update_game(&mut self, id: i64, edit: &GameEdit) -> StoreResult<()>;
    /// Delete a game with its props and their bets (transactional)
    async fn delete_game(&mut self, id: i64) -> StoreResult<()>;
    /// Insert-or-update every feed game keyed by `espn_id` (transactional).
    /// Updates touch status, scores and date text only; team names are
    /// written on insert and never afterwards.
    async fn upsert_synced_games(&mut self, games: &[SyncedGame]) -> StoreResult<UpsertStats>;

    // ── Props ────────────────────────────────────────────────────────────

    async fn list_props_for_game(&mut self, game_id: i64) -> StoreResult<Vec<Prop>>;
    /// All props with their game's teams, ordered by game date
    async fn list_prop_summaries(&mut self) -> StoreResult<Vec<PropSummary>>;
    async fn get_prop(&mut self, id: i64) -> StoreResult<Option<Prop>>;
    /// Fails with [`StoreError::MissingGame`] when the game is gone
    async fn insert_prop(&mut self, game_id: i64, description: &str) -> StoreResult<i64>;
    async fn update_prop_description(&mut self, id: i64, description: &str) -> StoreResult<()>;
    /// Set the outcome; `None` returns the prop to pending
    async fn set_prop_result(&mut self, id: i64, result: Option<Side>) -> StoreResult<()>;
    /// Delete a prop; its bets stay behind
    async fn delete_prop(&mut self, id: i64) -> StoreResult<()>;

    // ── Users ────────────────────────────────────────────────────────────

    /// All users in creation order
    async fn list_users(&mut self) -> StoreResult<Vec<User>>;
    /// Fails with [`StoreError::Conflict`] when the name is taken
    async fn insert_user(&mut self, name: &str) -> StoreResult<i64>;
    /// Delete a user; their bets stay behind
    async fn delete_user(&mut self, id: i64) -> StoreResult<()>;

    // ── Bets ─────────────────────────────────────────────────────────────

    async fn find_bet(&mut self, prop_id: i64, user_id: i64) -> StoreResult<Option<Bet>>;
    /// Insert a bet; a row already present for the pair is overwritten
    async fn insert_bet(&mut self, prop_id: i64, user_id: i64, selection: Side)
        -> StoreResult<i64>;
    async fn update_bet_selection(&mut self, bet_id: i64, selection: Side) -> StoreResult<()>;
    async fn list_bets_for_prop(&mut self, prop_id: i64) -> StoreResult<Vec<Bet>>;
    /// Bets on a game's props joined with their users' names
    async fn list_bets_for_game(&mut self, game_id: i64) -> StoreResult<Vec<BetView>>;
    /// Bets on props with an outcome, for users that still exist
    async fn list_resolved_bets(&mut self) -> StoreResult<Vec<ResolvedBet>>;
}

/// Construct the configured backend and make sure its schema exists
pub async fn open_database(config: &DatabaseConfig) -> StoreResult<ArcDatabase> {
    let db: ArcDatabase = match config {
        DatabaseConfig::Postgres { url } => Arc::new(PostgresDatabase::connect(url).await?),
        DatabaseConfig::Sqlite { path } => Arc::new(SqliteDatabase::new(path)?),
    };

    let mut session = db.session().await?;
    if session.ensure_schema().await? {
        log::info!("Applied {} schema", db.backend());
    } else {
        log::info!("Using existing {} schema", db.backend());
    }

    Ok(db)
}

/// Decode a stored "Yes"/"No" column
pub(crate) fn decode_side(text: &str) -> StoreResult<Side> {
    text.parse()
        .map_err(|e: crate::models::InvalidSide| StoreError::InvalidValue(e.to_string()))
}

/// Decode a nullable outcome column
pub(crate) fn decode_result(text: Option<String>) -> StoreResult<Option<Side>> {
    text.as_deref().map(decode_side).transpose()
}
