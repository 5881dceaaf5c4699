//! Kickoff time display
//!
//! Feed timestamps are UTC. They are shown at a fixed UTC-5 offset as
//! "Thu 8:20 PM". Daylight saving is deliberately not applied, so games
//! during EDT display one hour early.

use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};

/// Fixed Eastern offset applied to every kickoff
pub const EASTERN_OFFSET_HOURS: i32 = -5;

/// Timestamp formats the feed is known to use besides RFC 3339.
/// ESPN usually omits seconds: "2024-09-05T00:20Z".
const NAIVE_UTC_FORMATS: &[&str] = &["%Y-%m-%dT%H:%MZ", "%Y-%m-%dT%H:%M:%SZ"];

/// A feed kickoff time: parsed, or kept verbatim when it could not be
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Kickoff {
    /// Parsed and shifted to the fixed Eastern offset
    Scheduled(DateTime<FixedOffset>),
    /// Unparseable feed text, stored as-is
    Raw(String),
}

impl Kickoff {
    pub fn parse(raw: &str) -> Self {
        match parse_utc(raw).and_then(to_eastern) {
            Some(dt) => Kickoff::Scheduled(dt),
            None => Kickoff::Raw(raw.to_string()),
        }
    }

    /// Display text stored in `games.game_date`
    pub fn display(&self) -> String {
        match self {
            Kickoff::Scheduled(dt) => dt.format("%a %-I:%M %p").to_string(),
            Kickoff::Raw(raw) => raw.clone(),
        }
    }

    pub fn is_raw(&self) -> bool {
        matches!(self, Kickoff::Raw(_))
    }
}

/// Format a feed timestamp for display, falling back to the raw text
pub fn format_kickoff(raw: &str) -> String {
    Kickoff::parse(raw).display()
}

fn parse_utc(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NAIVE_UTC_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

fn to_eastern(dt: DateTime<Utc>) -> Option<DateTime<FixedOffset>> {
    let offset = FixedOffset::east_opt(EASTERN_OFFSET_HOURS * 3600)?;
    Some(dt.with_timezone(&offset))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_full_rfc3339_timestamp() {
        assert_eq!(format_kickoff("2024-09-05T00:20:00Z"), "Wed 7:20 PM");
    }

    #[test]
    fn formats_timestamp_without_seconds() {
        assert_eq!(format_kickoff("2024-09-05T00:20Z"), "Wed 7:20 PM");
        assert_eq!(format_kickoff("2024-09-13T00:15Z"), "Thu 7:15 PM");
    }

    #[test]
    fn hour_is_not_zero_padded() {
        assert_eq!(format_kickoff("2024-09-08T13:30Z"), "Sun 8:30 AM");
        assert_eq!(format_kickoff("2024-09-08T17:00Z"), "Sun 12:00 PM");
    }

    #[test]
    fn summer_games_use_the_same_fixed_offset() {
        // 16:00 UTC is noon EDT, but the fixed offset shows 11 AM
        assert_eq!(format_kickoff("2024-07-04T16:00Z"), "Thu 11:00 AM");
    }

    #[test]
    fn explicit_offsets_are_honored() {
        assert_eq!(format_kickoff("2024-09-05T02:20:00+02:00"), "Wed 7:20 PM");
    }

    #[test]
    fn unparseable_text_is_kept_verbatim() {
        let kickoff = Kickoff::parse("TBD");
        assert!(kickoff.is_raw());
        assert_eq!(kickoff.display(), "TBD");
        assert_eq!(format_kickoff(""), "");
        assert_eq!(format_kickoff("2024-13-45T99:99Z"), "2024-13-45T99:99Z");
    }
}
