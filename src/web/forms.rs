//! Form bodies posted by the HTML pages and their typed interpretations
//!
//! Browsers post every field as text and leave absent selectors empty, so
//! all fields are read as optional strings and validated here.

use crate::models::{GameEdit, NewGame, ResolveAction, Side};
use serde::Deserialize;

/// Query string of `GET /sync`
#[derive(Debug, Default, Deserialize)]
pub struct SyncQuery {
    pub redirect_game: Option<String>,
}

impl SyncQuery {
    /// Game page to return to, when a valid id was passed
    pub fn game_id(&self) -> Option<i64> {
        parse_id(self.redirect_game.as_deref())
    }
}

/// Body of `POST /admin`
#[derive(Debug, Default, Deserialize)]
pub struct AdminForm {
    pub action: Option<String>,
    pub game_id: Option<String>,
    pub prop_id: Option<String>,
    pub description: Option<String>,
    pub result: Option<String>,
    pub home_team: Option<String>,
    pub away_team: Option<String>,
    pub game_date: Option<String>,
}

/// A validated admin request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminAction {
    AddProp { game_id: i64, description: String },
    ResolveProp { prop_id: i64, action: ResolveAction },
    EditProp { prop_id: i64, description: String },
    DeleteProp { prop_id: i64 },
    AddGame(NewGame),
    EditGame { game_id: i64, edit: GameEdit },
    DeleteGame { game_id: i64 },
}

impl AdminForm {
    /// Interpret the form. The error is a message for the operator.
    pub fn parse(&self) -> Result<AdminAction, String> {
        let action = self.action.as_deref().unwrap_or_default();
        match action {
            "add_prop" => Ok(AdminAction::AddProp {
                game_id: self.game_id()?,
                description: self.description()?,
            }),
            "resolve_prop" => {
                let result = self.result.as_deref().unwrap_or_default();
                let action = result
                    .parse::<ResolveAction>()
                    .map_err(|_| format!("Invalid result: {:?}", result))?;
                Ok(AdminAction::ResolveProp {
                    prop_id: self.prop_id()?,
                    action,
                })
            }
            "edit_prop" => Ok(AdminAction::EditProp {
                prop_id: self.prop_id()?,
                description: self.description()?,
            }),
            "delete_prop" => Ok(AdminAction::DeleteProp {
                prop_id: self.prop_id()?,
            }),
            "add_game" => {
                let (home_team, away_team, game_date) = self.game_fields()?;
                Ok(AdminAction::AddGame(NewGame {
                    home_team,
                    away_team,
                    game_date,
                }))
            }
            "edit_game" => {
                let game_id = self.game_id()?;
                let (home_team, away_team, game_date) = self.game_fields()?;
                Ok(AdminAction::EditGame {
                    game_id,
                    edit: GameEdit {
                        home_team,
                        away_team,
                        game_date,
                    },
                })
            }
            "delete_game" => Ok(AdminAction::DeleteGame {
                game_id: self.game_id()?,
            }),
            "" => Err("No action given.".to_string()),
            other => Err(format!("Unknown action: {}", other)),
        }
    }

    fn game_id(&self) -> Result<i64, String> {
        parse_id(self.game_id.as_deref()).ok_or_else(|| "Please select a game.".to_string())
    }

    fn prop_id(&self) -> Result<i64, String> {
        parse_id(self.prop_id.as_deref()).ok_or_else(|| "Please select a prop.".to_string())
    }

    fn description(&self) -> Result<String, String> {
        required(self.description.as_deref(), "Please enter a description.")
    }

    fn game_fields(&self) -> Result<(String, String, String), String> {
        let home = required(self.home_team.as_deref(), "Please enter both teams.")?;
        let away = required(self.away_team.as_deref(), "Please enter both teams.")?;
        let date = self
            .game_date
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .to_string();
        Ok((home, away, date))
    }
}

/// Body of `POST /admin/users`. The submit button's name selects the action.
#[derive(Debug, Default, Deserialize)]
pub struct UsersForm {
    pub add_user: Option<String>,
    pub delete_user: Option<String>,
    pub name: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UsersAction {
    Add(String),
    Delete(i64),
}

impl UsersForm {
    pub fn parse(&self) -> Result<UsersAction, String> {
        if self.add_user.is_some() {
            required(self.name.as_deref(), "Please enter a name.").map(UsersAction::Add)
        } else if self.delete_user.is_some() {
            parse_id(self.user_id.as_deref())
                .map(UsersAction::Delete)
                .ok_or_else(|| "Please select a user.".to_string())
        } else {
            Err("No action given.".to_string())
        }
    }
}

/// Body of `POST /place_bet`
#[derive(Debug, Default, Deserialize)]
pub struct BetForm {
    pub prop_id: Option<String>,
    pub game_id: Option<String>,
    pub user_id: Option<String>,
    pub selection: Option<String>,
}

/// A bet submission with its ids and pick decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BetRequest {
    pub prop_id: i64,
    /// `None` when the bettor selector was left empty
    pub user_id: Option<i64>,
    pub selection: Side,
}

impl BetForm {
    /// Game page to return to after the submission
    pub fn game_id(&self) -> Option<i64> {
        parse_id(self.game_id.as_deref())
    }

    pub fn parse(&self) -> Result<BetRequest, String> {
        let prop_id =
            parse_id(self.prop_id.as_deref()).ok_or_else(|| "Please select a prop.".to_string())?;
        let selection = self.selection.as_deref().unwrap_or_default();
        let selection = selection
            .parse::<Side>()
            .map_err(|_| "Please pick Yes or No.".to_string())?;
        Ok(BetRequest {
            prop_id,
            user_id: parse_id(self.user_id.as_deref()),
            selection,
        })
    }
}

fn parse_id(value: Option<&str>) -> Option<i64> {
    value.map(str::trim).and_then(|v| v.parse().ok())
}

fn required(value: Option<&str>, message: &str) -> Result<String, String> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(message.to_string()),
    }
}
