//! Prop Bets - group prop-betting tracker
//!
//! Friends pick Yes or No on per-game propositions, an admin resolves the
//! outcomes and a leaderboard tallies who called it. Games come from the
//! ESPN NFL scoreboard and are stored in SQLite or PostgreSQL.

pub mod admin;
pub mod betting;
pub mod config;
pub mod error;
pub mod espn;
pub mod models;
pub mod schedule;
pub mod store;
pub mod sync;
pub mod web;

pub use error::{Error, Result};
pub use sync::{sync_games, SyncOutcome};
