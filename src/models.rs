//! Records stored by the tracker and the small value types around them.

use std::fmt;
use std::str::FromStr;

/// A side of a yes/no proposition: a user's selection or a prop's outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Yes,
    No,
}

impl Side {
    /// Returns the stored text ("Yes" / "No")
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Yes => "Yes",
            Side::No => "No",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when text is not "Yes" or "No"
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidSide(pub String);

impl fmt::Display for InvalidSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "expected \"Yes\" or \"No\", got {:?}", self.0)
    }
}

impl std::error::Error for InvalidSide {}

impl FromStr for Side {
    type Err = InvalidSide;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Yes" => Ok(Side::Yes),
            "No" => Ok(Side::No),
            other => Err(InvalidSide(other.to_string())),
        }
    }
}

/// Admin action on a prop's outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveAction {
    /// Set the outcome to a side
    Set(Side),
    /// Return the prop to pending
    Reset,
}

impl ResolveAction {
    /// The outcome this action leaves on the prop (`None` = pending)
    pub fn outcome(&self) -> Option<Side> {
        match self {
            ResolveAction::Set(side) => Some(*side),
            ResolveAction::Reset => None,
        }
    }
}

impl FromStr for ResolveAction {
    type Err = InvalidSide;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Reset" => Ok(ResolveAction::Reset),
            other => other.parse().map(ResolveAction::Set),
        }
    }
}

/// A scheduled or finished game
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Game {
    pub id: i64,
    /// Upstream feed identifier; `None` for manually added games
    pub espn_id: Option<String>,
    pub home_team: String,
    pub away_team: String,
    /// Display text such as "Thu 8:20 PM", not a normalized timestamp
    pub game_date: String,
    pub status: Option<String>,
    pub home_score: i32,
    pub away_score: i32,
}

/// A yes/no proposition on a game
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prop {
    pub id: i64,
    pub game_id: i64,
    pub description: String,
    /// `None` while pending
    pub result: Option<Side>,
}

/// Prop row for the admin listing, joined with its game's teams
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropSummary {
    pub id: i64,
    pub description: String,
    pub result: Option<Side>,
    pub home_team: String,
    pub away_team: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bet {
    pub id: i64,
    pub prop_id: i64,
    pub user_id: i64,
    pub selection: Side,
}

/// A bet on a game page, with the bettor's name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BetView {
    pub prop_id: i64,
    pub user_name: String,
    pub selection: Side,
}

/// A bet whose prop has an outcome, as read for scoring
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedBet {
    pub user_id: i64,
    pub selection: Side,
    pub result: Side,
}

/// Fields for a manually added game
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewGame {
    pub home_team: String,
    pub away_team: String,
    pub game_date: String,
}

/// Manual correction of a game's teams and date text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameEdit {
    pub home_team: String,
    pub away_team: String,
    pub game_date: String,
}

/// One normalized feed event, ready to upsert by `espn_id`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncedGame {
    pub espn_id: String,
    pub home_team: String,
    pub away_team: String,
    pub game_date: String,
    pub status: Option<String>,
    pub home_score: i32,
    pub away_score: i32,
}

/// Counts from one upsert batch
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct UpsertStats {
    pub inserted: usize,
    pub updated: usize,
}
