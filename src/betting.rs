//! Betting operations: placing picks, resolving props, scoring

use crate::error::{Error, Result};
use crate::models::{ResolveAction, ResolvedBet, Side, User};
use crate::store::Session;
use std::collections::HashMap;

/// Whether a placement created a bet or overwrote an earlier pick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BetWrite {
    Placed,
    Updated,
}

/// Record `user_id`'s pick on a prop. One bet per (prop, user): a later
/// pick overwrites the earlier one.
///
/// `user_id` is `None` when the bettor selector was left empty.
pub async fn place_or_update_bet(
    session: &mut dyn Session,
    prop_id: i64,
    user_id: Option<i64>,
    selection: Side,
) -> Result<BetWrite> {
    let user_id = user_id.ok_or(Error::MissingUser)?;

    match session.find_bet(prop_id, user_id).await? {
        Some(bet) => {
            session.update_bet_selection(bet.id, selection).await?;
            log::debug!("User {} changed pick on prop {} to {}", user_id, prop_id, selection);
            Ok(BetWrite::Updated)
        }
        None => {
            session.insert_bet(prop_id, user_id, selection).await?;
            log::debug!("User {} picked {} on prop {}", user_id, selection, prop_id);
            Ok(BetWrite::Placed)
        }
    }
}

/// Set or reset a prop's outcome. Unknown prop ids are a silent no-op.
pub async fn resolve_prop(
    session: &mut dyn Session,
    prop_id: i64,
    action: ResolveAction,
) -> Result<()> {
    session.set_prop_result(prop_id, action.outcome()).await?;
    log::info!("Prop {} outcome set to {:?}", prop_id, action.outcome());
    Ok(())
}

/// One leaderboard row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Standing {
    pub user_id: i64,
    pub name: String,
    /// Correct picks on resolved props
    pub score: u32,
    /// Picks on resolved props
    pub total: u32,
    /// `100 * score / total`, truncated; 0 with no resolved picks
    pub percentage: u32,
}

/// Score every user against the resolved props
pub async fn compute_leaderboard(session: &mut dyn Session) -> Result<Vec<Standing>> {
    let users = session.list_users().await?;
    let bets = session.list_resolved_bets().await?;
    Ok(tally(&users, &bets))
}

/// Build standings for `users` from resolved bets.
///
/// Sorted by score descending; ties break on name, then user id. Bets by
/// users not in `users` are ignored.
pub fn tally(users: &[User], bets: &[ResolvedBet]) -> Vec<Standing> {
    let mut standings: Vec<Standing> = users
        .iter()
        .map(|user| Standing {
            user_id: user.id,
            name: user.name.clone(),
            score: 0,
            total: 0,
            percentage: 0,
        })
        .collect();

    let index: HashMap<i64, usize> = users
        .iter()
        .enumerate()
        .map(|(i, user)| (user.id, i))
        .collect();

    for bet in bets {
        if let Some(&i) = index.get(&bet.user_id) {
            standings[i].total += 1;
            if bet.selection == bet.result {
                standings[i].score += 1;
            }
        }
    }

    for standing in &mut standings {
        if standing.total > 0 {
            standing.percentage = standing.score * 100 / standing.total;
        }
    }

    standings.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.user_id.cmp(&b.user_id))
    });
    standings
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: i64, name: &str) -> User {
        User {
            id,
            name: name.to_string(),
        }
    }

    fn bet(user_id: i64, selection: Side, result: Side) -> ResolvedBet {
        ResolvedBet {
            user_id,
            selection,
            result,
        }
    }

    #[test]
    fn percentage_truncates() {
        let standings = tally(
            &[user(1, "ann")],
            &[
                bet(1, Side::Yes, Side::Yes),
                bet(1, Side::No, Side::No),
                bet(1, Side::Yes, Side::No),
            ],
        );
        assert_eq!(standings[0].score, 2);
        assert_eq!(standings[0].total, 3);
        assert_eq!(standings[0].percentage, 66);
    }

    #[test]
    fn users_without_bets_score_zero() {
        let standings = tally(&[user(1, "ann"), user(2, "ben")], &[]);
        assert_eq!(standings.len(), 2);
        assert!(standings
            .iter()
            .all(|s| s.score == 0 && s.total == 0 && s.percentage == 0));
    }

    #[test]
    fn sorted_by_score_then_name() {
        let standings = tally(
            &[user(1, "zed"), user(2, "amy"), user(3, "max")],
            &[
                bet(3, Side::Yes, Side::Yes),
                bet(3, Side::Yes, Side::Yes),
                bet(1, Side::Yes, Side::Yes),
                bet(2, Side::No, Side::No),
            ],
        );
        let names: Vec<&str> = standings.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["max", "amy", "zed"]);
    }

    #[test]
    fn bets_from_unknown_users_are_ignored() {
        let standings = tally(&[user(1, "ann")], &[bet(42, Side::Yes, Side::Yes)]);
        assert_eq!(standings[0].total, 0);
    }
}
