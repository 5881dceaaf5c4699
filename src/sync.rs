//! Scoreboard sync: reconciles the ESPN feed into the games table
//!
//! Games are matched on the feed's event id. A pass may run any number of
//! times; an unchanged feed leaves the table unchanged. The whole batch is
//! written in one transaction, so a failure anywhere leaves nothing behind.

use crate::error::Result;
use crate::espn::{Event, Kickoff, Scoreboard};
use crate::models::{SyncedGame, UpsertStats};
use crate::store::Session;

/// Team name used when the feed omits one
pub const UNKNOWN_TEAM: &str = "Unknown";

/// Result of one sync pass, reported to the operator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Synced(UpsertStats),
    Failed(String),
}

impl SyncOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, SyncOutcome::Synced(_))
    }

    pub fn message(&self) -> String {
        match self {
            SyncOutcome::Synced(stats) => format!(
                "Synced successfully ({} new, {} updated)",
                stats.inserted, stats.updated
            ),
            SyncOutcome::Failed(msg) => msg.clone(),
        }
    }
}

/// Fetch the scoreboard from `url` and upsert every event.
///
/// Never returns an error: network, decoding and storage failures all
/// become [`SyncOutcome::Failed`].
pub async fn sync_games(session: &mut dyn Session, url: &str) -> SyncOutcome {
    match fetch_and_reconcile(session, url).await {
        Ok(stats) => {
            log::info!(
                "Scoreboard sync: {} inserted, {} updated",
                stats.inserted,
                stats.updated
            );
            SyncOutcome::Synced(stats)
        }
        Err(e) => {
            log::error!("Scoreboard sync failed: {}", e);
            SyncOutcome::Failed(e.to_string())
        }
    }
}

async fn fetch_and_reconcile(session: &mut dyn Session, url: &str) -> Result<UpsertStats> {
    let scoreboard = Scoreboard::fetch_from(url).await?;
    reconcile(session, &scoreboard).await
}

/// Upsert an already-fetched scoreboard
pub async fn reconcile(session: &mut dyn Session, scoreboard: &Scoreboard) -> Result<UpsertStats> {
    let mut games = Vec::with_capacity(scoreboard.events.len());
    for event in &scoreboard.events {
        if let Some(game) = normalize_event(event)? {
            games.push(game);
        }
    }

    Ok(session.upsert_synced_games(&games).await?)
}

/// Turn one feed event into an upsert row.
///
/// Returns `Ok(None)` for events without an id, which have no upsert key.
/// Missing teams become "Unknown" and missing scores 0; a malformed kickoff
/// is stored verbatim. A non-numeric score is an error.
pub fn normalize_event(event: &Event) -> Result<Option<SyncedGame>> {
    let Some(espn_id) = event.id.as_deref().filter(|id| !id.is_empty()) else {
        log::warn!("Skipping scoreboard event without an id");
        return Ok(None);
    };

    let raw_date = event.date.as_deref().unwrap_or_default();
    let kickoff = Kickoff::parse(raw_date);
    if kickoff.is_raw() {
        log::warn!(
            "Event {}: could not parse kickoff {:?}, storing it as-is",
            espn_id,
            raw_date
        );
    }

    let mut game = SyncedGame {
        espn_id: espn_id.to_string(),
        home_team: UNKNOWN_TEAM.to_string(),
        away_team: UNKNOWN_TEAM.to_string(),
        game_date: kickoff.display(),
        status: event.short_detail().map(str::to_string),
        home_score: 0,
        away_score: 0,
    };

    for competitor in event.competitors() {
        let name = competitor.team_name().unwrap_or(UNKNOWN_TEAM).to_string();
        let score = competitor.score()?;
        if competitor.is_home() {
            game.home_team = name;
            game.home_score = score;
        } else {
            game.away_team = name;
            game.away_score = score;
        }
    }

    log::debug!(
        "Event {}: {} @ {} ({})",
        game.espn_id,
        game.away_team,
        game.home_team,
        game.game_date
    );
    Ok(Some(game))
}
