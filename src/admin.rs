//! Admin maintenance of games, props and users

use crate::error::Result;
use crate::models::{GameEdit, NewGame};
use crate::store::{Session, StoreError};

/// Outcome of adding a user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddUser {
    Added(i64),
    /// The name is already taken; nothing was written
    AlreadyExists,
}

pub async fn add_user(session: &mut dyn Session, name: &str) -> Result<AddUser> {
    match session.insert_user(name).await {
        Ok(id) => {
            log::info!("Added user {:?} (id {})", name, id);
            Ok(AddUser::Added(id))
        }
        Err(StoreError::Conflict(msg)) => {
            log::info!("Rejected user: {}", msg);
            Ok(AddUser::AlreadyExists)
        }
        Err(e) => Err(e.into()),
    }
}

/// Remove a user. Their bets stay in place with a dangling user id.
pub async fn delete_user(session: &mut dyn Session, user_id: i64) -> Result<()> {
    session.delete_user(user_id).await?;
    log::info!("Deleted user {}", user_id);
    Ok(())
}

/// Add a game by hand; it has no external id and is never touched by sync
pub async fn add_game(session: &mut dyn Session, game: &NewGame) -> Result<i64> {
    let id = session.insert_game(game).await?;
    log::info!(
        "Added game {}: {} @ {} ({})",
        id,
        game.away_team,
        game.home_team,
        game.game_date
    );
    Ok(id)
}

/// Correct a game's teams or date text. Sync never overwrites team names,
/// so the correction survives later passes; the date text is refreshed
/// by the next sync for feed games.
pub async fn edit_game(session: &mut dyn Session, game_id: i64, edit: &GameEdit) -> Result<()> {
    session.update_game(game_id, edit).await?;
    log::info!("Edited game {}", game_id);
    Ok(())
}

/// Delete a game together with its props and their bets
pub async fn delete_game(session: &mut dyn Session, game_id: i64) -> Result<()> {
    session.delete_game(game_id).await?;
    log::info!("Deleted game {}", game_id);
    Ok(())
}

pub async fn add_prop(session: &mut dyn Session, game_id: i64, description: &str) -> Result<i64> {
    let id = session.insert_prop(game_id, description).await?;
    log::info!("Added prop {} to game {}", id, game_id);
    Ok(id)
}

pub async fn edit_prop(session: &mut dyn Session, prop_id: i64, description: &str) -> Result<()> {
    session.update_prop_description(prop_id, description).await?;
    log::info!("Edited prop {}", prop_id);
    Ok(())
}

/// Delete a prop. Its bets stay in place with a dangling prop id.
pub async fn delete_prop(session: &mut dyn Session, prop_id: i64) -> Result<()> {
    session.delete_prop(prop_id).await?;
    log::info!("Deleted prop {}", prop_id);
    Ok(())
}
