//! ESPN scoreboard feed client

mod kickoff;
mod scoreboard;

pub use kickoff::{format_kickoff, Kickoff, EASTERN_OFFSET_HOURS};
pub use scoreboard::{Competitor, Event, Scoreboard, SCOREBOARD_URL};
