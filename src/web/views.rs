//! Server-rendered HTML pages

use crate::betting::Standing;
use crate::models::{BetView, Game, Prop, PropSummary, Side, User};
use crate::schedule::DayGroup;
use std::fmt::Write;

/// Escape text for HTML element content and quoted attribute values
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(title: &str, flash: Option<&str>, body: &str) -> String {
    let flash = flash
        .map(|msg| format!("<div class=\"flash\">{}</div>\n", escape(msg)))
        .unwrap_or_default();
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title} - Prop Bets</title>
<style>
body {{ font-family: sans-serif; max-width: 960px; margin: 0 auto; padding: 1rem; }}
nav a {{ margin-right: 1rem; }}
.flash {{ background: #fff3cd; border: 1px solid #ffe08a; padding: .5rem; margin: 1rem 0; }}
.pending {{ color: #888; }}
table {{ border-collapse: collapse; }}
td, th {{ padding: .25rem .75rem; text-align: left; }}
</style>
</head>
<body>
<nav><a href="/">Games</a><a href="/leaderboard">Leaderboard</a><a href="/admin">Admin</a><a href="/admin/users">Users</a><a href="/sync">Sync scores</a></nav>
{flash}<h1>{title}</h1>
{body}
</body>
</html>
"#,
        title = escape(title),
        flash = flash,
        body = body,
    )
}

fn matchup(game: &Game) -> String {
    format!(
        "{} @ {}",
        escape(&game.away_team),
        escape(&game.home_team)
    )
}

fn score_line(game: &Game) -> String {
    match game.status.as_deref() {
        Some(status) => format!(
            "{} {} - {} {} ({})",
            escape(&game.away_team),
            game.away_score,
            game.home_score,
            escape(&game.home_team),
            escape(status)
        ),
        None => String::new(),
    }
}

fn result_label(result: Option<Side>) -> String {
    match result {
        Some(side) => side.to_string(),
        None => "<span class=\"pending\">Pending</span>".to_string(),
    }
}

fn day_sections(groups: &[DayGroup], mut row: impl FnMut(&Game) -> String) -> String {
    if groups.is_empty() {
        return "<p>No games yet. Sync with ESPN to load this week's schedule.</p>".to_string();
    }
    let mut html = String::new();
    for group in groups {
        let _ = writeln!(html, "<h2>{}</h2>\n<ul>", escape(&group.day));
        for game in &group.games {
            let _ = writeln!(html, "<li>{}</li>", row(game));
        }
        html.push_str("</ul>\n");
    }
    html
}

/// `GET /` - games grouped by day
pub fn index_page(groups: &[DayGroup], flash: Option<&str>) -> String {
    let body = day_sections(groups, |game| {
        format!(
            "<a href=\"/game/{}\">{}</a> {} <small>{}</small>",
            game.id,
            matchup(game),
            escape(&game.game_date),
            score_line(game)
        )
    });
    layout("This Week's Games", flash, &body)
}

fn user_options(users: &[User]) -> String {
    let mut html = String::from("<option value=\"\">-- Who are you? --</option>");
    for user in users {
        let _ = write!(
            html,
            "<option value=\"{}\">{}</option>",
            user.id,
            escape(&user.name)
        );
    }
    html
}

/// `GET /game/{id}` - props of one game with the bets placed so far
pub fn game_page(
    game: &Game,
    props: &[Prop],
    users: &[User],
    bets: &[BetView],
    flash: Option<&str>,
) -> String {
    let mut body = String::new();
    let _ = writeln!(
        body,
        "<p>{} <small>{}</small> <a href=\"/sync?redirect_game={}\">Refresh scores</a></p>",
        escape(&game.game_date),
        score_line(game),
        game.id
    );

    if props.is_empty() {
        body.push_str("<p>No props for this game yet.</p>\n");
    }

    let options = user_options(users);
    for prop in props {
        let _ = writeln!(
            body,
            "<h3>{}</h3>\n<p>Result: {}</p>",
            escape(&prop.description),
            result_label(prop.result)
        );

        if prop.result.is_none() {
            let _ = writeln!(
                body,
                r#"<form method="post" action="/place_bet">
<input type="hidden" name="prop_id" value="{prop_id}">
<input type="hidden" name="game_id" value="{game_id}">
<select name="user_id">{options}</select>
<button name="selection" value="Yes">Yes</button>
<button name="selection" value="No">No</button>
</form>"#,
                prop_id = prop.id,
                game_id = game.id,
                options = options,
            );
        }

        let picks: Vec<&BetView> = bets.iter().filter(|b| b.prop_id == prop.id).collect();
        if !picks.is_empty() {
            body.push_str("<ul>\n");
            for bet in picks {
                let _ = writeln!(
                    body,
                    "<li>{}: {}</li>",
                    escape(&bet.user_name),
                    bet.selection
                );
            }
            body.push_str("</ul>\n");
        }
    }

    layout(&format!("{} @ {}", game.away_team, game.home_team), flash, &body)
}

/// `GET /admin` - games by day with their forms, then every prop
pub fn admin_page(groups: &[DayGroup], props: &[PropSummary], flash: Option<&str>) -> String {
    let mut body = String::from(
        r#"<h2>Add game</h2>
<form method="post" action="/admin">
<input type="hidden" name="action" value="add_game">
<input name="away_team" placeholder="Away team">
<input name="home_team" placeholder="Home team">
<input name="game_date" placeholder="Sun 1:00 PM">
<button>Add game</button>
</form>
"#,
    );

    body.push_str(&day_sections(groups, |game| {
        format!(
            r#"{matchup} {date}
<form method="post" action="/admin">
<input type="hidden" name="action" value="add_prop">
<input type="hidden" name="game_id" value="{id}">
<input name="description" placeholder="New prop">
<button>Add prop</button>
</form>
<form method="post" action="/admin">
<input type="hidden" name="action" value="edit_game">
<input type="hidden" name="game_id" value="{id}">
<input name="away_team" value="{away}">
<input name="home_team" value="{home}">
<input name="game_date" value="{date}">
<button>Save game</button>
</form>
<form method="post" action="/admin">
<input type="hidden" name="action" value="delete_game">
<input type="hidden" name="game_id" value="{id}">
<button>Delete game</button>
</form>"#,
            matchup = matchup(game),
            id = game.id,
            away = escape(&game.away_team),
            home = escape(&game.home_team),
            date = escape(&game.game_date),
        )
    }));

    body.push_str("<h2>Props</h2>\n");
    if props.is_empty() {
        body.push_str("<p>No props yet.</p>\n");
    }
    for prop in props {
        let _ = writeln!(
            body,
            r#"<div>
<p>{away} @ {home}: {description} ({result})</p>
<form method="post" action="/admin">
<input type="hidden" name="action" value="resolve_prop">
<input type="hidden" name="prop_id" value="{id}">
<button name="result" value="Yes">Yes</button>
<button name="result" value="No">No</button>
<button name="result" value="Reset">Reset</button>
</form>
<form method="post" action="/admin">
<input type="hidden" name="action" value="edit_prop">
<input type="hidden" name="prop_id" value="{id}">
<input name="description" value="{description}">
<button>Save</button>
</form>
<form method="post" action="/admin">
<input type="hidden" name="action" value="delete_prop">
<input type="hidden" name="prop_id" value="{id}">
<button>Delete</button>
</form>
</div>"#,
            away = escape(&prop.away_team),
            home = escape(&prop.home_team),
            description = escape(&prop.description),
            result = result_label(prop.result),
            id = prop.id,
        );
    }

    layout("Admin", flash, &body)
}

/// `GET /admin/users`
pub fn users_page(users: &[User], flash: Option<&str>) -> String {
    let mut body = String::from(
        r#"<form method="post" action="/admin/users">
<input name="name" placeholder="Name">
<button name="add_user" value="1">Add user</button>
</form>
<ul>
"#,
    );
    for user in users {
        let _ = writeln!(
            body,
            r#"<li>{name}
<form method="post" action="/admin/users" style="display:inline">
<input type="hidden" name="user_id" value="{id}">
<button name="delete_user" value="1">Delete</button>
</form></li>"#,
            name = escape(&user.name),
            id = user.id,
        );
    }
    body.push_str("</ul>\n");
    layout("Users", flash, &body)
}

/// `GET /leaderboard`
pub fn leaderboard_page(standings: &[Standing], flash: Option<&str>) -> String {
    let mut body = String::from(
        "<table>\n<tr><th>#</th><th>Name</th><th>Correct</th><th>Resolved picks</th><th>%</th></tr>\n",
    );
    for (rank, standing) in standings.iter().enumerate() {
        let _ = writeln!(
            body,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}%</td></tr>",
            rank + 1,
            escape(&standing.name),
            standing.score,
            standing.total,
            standing.percentage
        );
    }
    body.push_str("</table>\n");
    layout("Leaderboard", flash, &body)
}
