//! Grouping games into day-of-week buckets for listing pages

use crate::models::Game;

/// Bucket for games whose date text does not start with a known day
pub const UNKNOWN_DAY: &str = "Unknown";

/// Display order of the NFL week, Thursday first
const DAY_ORDER: [&str; 7] = ["Thu", "Fri", "Sat", "Sun", "Mon", "Tue", "Wed"];

/// Games sharing a day-of-week bucket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayGroup {
    pub day: String,
    pub games: Vec<Game>,
}

/// Bucket for a date text like "Thu 8:20 PM": its first whitespace token
/// when that is a day abbreviation, else [`UNKNOWN_DAY`]
pub fn day_bucket(game_date: &str) -> &str {
    match game_date.split_whitespace().next() {
        Some(token) if DAY_ORDER.contains(&token) => token,
        _ => UNKNOWN_DAY,
    }
}

fn day_priority(day: &str) -> usize {
    DAY_ORDER
        .iter()
        .position(|d| *d == day)
        .unwrap_or(DAY_ORDER.len())
}

/// Group games by day, Thursday through Wednesday, with Unknown last.
/// Games keep their input order within a bucket.
pub fn group_by_day(games: Vec<Game>) -> Vec<DayGroup> {
    let mut groups: Vec<DayGroup> = Vec::new();

    for game in games {
        let day = day_bucket(&game.game_date).to_string();
        match groups.iter_mut().find(|g| g.day == day) {
            Some(group) => group.games.push(game),
            None => groups.push(DayGroup {
                day,
                games: vec![game],
            }),
        }
    }

    // sort_by_key is stable: buckets of equal priority keep first-seen order
    groups.sort_by_key(|g| day_priority(&g.day));
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game(id: i64, game_date: &str) -> Game {
        Game {
            id,
            espn_id: None,
            home_team: "H".to_string(),
            away_team: "A".to_string(),
            game_date: game_date.to_string(),
            status: None,
            home_score: 0,
            away_score: 0,
        }
    }

    fn days(groups: &[DayGroup]) -> Vec<&str> {
        groups.iter().map(|g| g.day.as_str()).collect()
    }

    #[test]
    fn buckets_by_first_token() {
        assert_eq!(day_bucket("Thu 8:20 PM"), "Thu");
        assert_eq!(day_bucket("  Sun 1:00 PM"), "Sun");
        assert_eq!(day_bucket("XYZ garbage"), UNKNOWN_DAY);
        assert_eq!(day_bucket("2024-09-05T00:20Z"), UNKNOWN_DAY);
        assert_eq!(day_bucket(""), UNKNOWN_DAY);
    }

    #[test]
    fn groups_in_week_order_with_unknown_last() {
        let groups = group_by_day(vec![
            game(1, "XYZ garbage"),
            game(2, "Sun 1:00 PM"),
            game(3, "Thu 8:20 PM"),
        ]);
        assert_eq!(days(&groups), ["Thu", "Sun", "Unknown"]);
        assert_eq!(groups[2].games[0].id, 1);
    }

    #[test]
    fn full_week_order() {
        let groups = group_by_day(vec![
            game(1, "Wed 1:00 PM"),
            game(2, "Mon 8:15 PM"),
            game(3, "Sat 4:30 PM"),
            game(4, "Tue 7:00 PM"),
            game(5, "Fri 8:00 PM"),
            game(6, "Sun 1:00 PM"),
            game(7, "Thu 8:20 PM"),
        ]);
        assert_eq!(
            days(&groups),
            ["Thu", "Fri", "Sat", "Sun", "Mon", "Tue", "Wed"]
        );
    }

    #[test]
    fn games_keep_input_order_within_a_day() {
        let groups = group_by_day(vec![
            game(1, "Sun 4:25 PM"),
            game(2, "Thu 8:20 PM"),
            game(3, "Sun 1:00 PM"),
        ]);
        let sunday: Vec<i64> = groups[1].games.iter().map(|g| g.id).collect();
        assert_eq!(sunday, [1, 3]);
    }

    #[test]
    fn empty_input_has_no_groups() {
        assert!(group_by_day(Vec::new()).is_empty());
    }
}
