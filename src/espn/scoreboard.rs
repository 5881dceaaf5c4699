//! ESPN NFL scoreboard fetching and parsing
//!
//! Only the fields the reconciler reads are modelled. Every field is
//! optional so a sparse event still deserializes; defaults are applied
//! when the event is normalized.

use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// ESPN NFL scoreboard endpoint
pub const SCOREBOARD_URL: &str =
    "https://site.api.espn.com/apis/site/v2/sports/football/nfl/scoreboard";

const USER_AGENT: &str = "prop_bets/0.1";

/// Scoreboard response: `{events: [...]}`
#[derive(Debug, Default, Deserialize)]
pub struct Scoreboard {
    #[serde(default)]
    pub events: Vec<Event>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Event {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: Option<String>,
    /// ISO-8601 UTC kickoff
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    status: Option<EventStatus>,
    #[serde(default)]
    competitions: Vec<Competition>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct EventStatus {
    #[serde(rename = "type", default)]
    kind: Option<StatusType>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusType {
    #[serde(default)]
    short_detail: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct Competition {
    #[serde(default)]
    competitors: Vec<Competitor>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Competitor {
    #[serde(default)]
    team: Option<Team>,
    /// ESPN sends scores as strings ("24"); numbers are accepted too
    #[serde(default)]
    score: Option<Value>,
    #[serde(default)]
    home_away: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Team {
    #[serde(default)]
    display_name: Option<String>,
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

impl Scoreboard {
    /// Fetch the current scoreboard from ESPN
    pub async fn fetch() -> Result<Self> {
        Self::fetch_from(SCOREBOARD_URL).await
    }

    /// Fetch a scoreboard from the given URL (mock servers in tests)
    pub async fn fetch_from(url: &str) -> Result<Self> {
        log::info!("Fetching scoreboard from: {}", url);

        let response = reqwest::Client::new()
            .get(url)
            .header("User-Agent", USER_AGENT)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::HttpStatus(response.status()));
        }

        let body = response.text().await?;
        let scoreboard: Scoreboard = serde_json::from_str(&body)?;

        log::info!("Fetched {} scoreboard events", scoreboard.events.len());
        Ok(scoreboard)
    }
}

impl Event {
    /// Status text such as "Final" or "1st 10:00"
    pub fn short_detail(&self) -> Option<&str> {
        self.status
            .as_ref()
            .and_then(|s| s.kind.as_ref())
            .and_then(|k| k.short_detail.as_deref())
    }

    /// Competitors of the first competition
    pub fn competitors(&self) -> &[Competitor] {
        self.competitions
            .first()
            .map(|c| c.competitors.as_slice())
            .unwrap_or(&[])
    }
}

impl Competitor {
    pub fn team_name(&self) -> Option<&str> {
        self.team.as_ref().and_then(|t| t.display_name.as_deref())
    }

    pub fn is_home(&self) -> bool {
        self.home_away.as_deref() == Some("home")
    }

    /// Score as an integer; missing or blank counts as 0
    pub fn score(&self) -> Result<i32> {
        let invalid = |v: &Value| Error::InvalidFeed(format!("score {} is not an integer", v));
        match &self.score {
            None | Some(Value::Null) => Ok(0),
            Some(Value::String(s)) if s.trim().is_empty() => Ok(0),
            Some(v @ Value::String(s)) => s.trim().parse().map_err(|_| invalid(v)),
            Some(v @ Value::Number(n)) => n
                .as_i64()
                .and_then(|n| i32::try_from(n).ok())
                .ok_or_else(|| invalid(v)),
            Some(v) => Err(invalid(v)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_deserializes_espn_shape() {
        let json = r#"{
            "events": [{
                "id": "401671789",
                "date": "2024-09-06T00:20Z",
                "status": {"type": {"shortDetail": "Final"}},
                "competitions": [{
                    "competitors": [
                        {"homeAway": "home", "score": "27", "team": {"displayName": "Kansas City Chiefs"}},
                        {"homeAway": "away", "score": "20", "team": {"displayName": "Baltimore Ravens"}}
                    ]
                }]
            }]
        }"#;

        let board: Scoreboard = serde_json::from_str(json).unwrap();
        assert_eq!(board.events.len(), 1);
        let event = &board.events[0];
        assert_eq!(event.id.as_deref(), Some("401671789"));
        assert_eq!(event.short_detail(), Some("Final"));

        let competitors = event.competitors();
        assert_eq!(competitors.len(), 2);
        assert!(competitors[0].is_home());
        assert_eq!(competitors[0].team_name(), Some("Kansas City Chiefs"));
        assert_eq!(competitors[0].score().unwrap(), 27);
        assert!(!competitors[1].is_home());
    }

    #[test]
    fn sparse_event_deserializes() {
        let board: Scoreboard = serde_json::from_str(r#"{"events": [{}]}"#).unwrap();
        let event = &board.events[0];
        assert!(event.id.is_none());
        assert!(event.short_detail().is_none());
        assert!(event.competitors().is_empty());
    }

    #[test]
    fn missing_events_is_an_empty_board() {
        let board: Scoreboard = serde_json::from_str(r#"{"leagues": []}"#).unwrap();
        assert!(board.events.is_empty());
    }

    #[test]
    fn numeric_id_is_accepted() {
        let board: Scoreboard = serde_json::from_str(r#"{"events": [{"id": 999}]}"#).unwrap();
        assert_eq!(board.events[0].id.as_deref(), Some("999"));
    }

    #[test]
    fn score_accepts_strings_numbers_and_missing() {
        let parse = |json: &str| serde_json::from_str::<Competitor>(json).unwrap().score();
        assert_eq!(parse(r#"{"score": "17"}"#).unwrap(), 17);
        assert_eq!(parse(r#"{"score": 3}"#).unwrap(), 3);
        assert_eq!(parse(r#"{"score": ""}"#).unwrap(), 0);
        assert_eq!(parse(r#"{}"#).unwrap(), 0);
    }

    #[test]
    fn non_numeric_score_is_an_error() {
        let competitor: Competitor = serde_json::from_str(r#"{"score": "abc"}"#).unwrap();
        assert!(matches!(competitor.score(), Err(Error::InvalidFeed(_))));
    }
}
