//! Prop Bets - web app and scoreboard sync
//!
//! `serve` (the default) runs the web UI, `sync` runs one scoreboard pass,
//! `init-db` creates the schema.

use clap::Parser;
use prop_bets::config::{Cli, Command};
use prop_bets::store::{open_database, ArcDatabase};
use prop_bets::sync_games;

#[tokio::main]
async fn main() {
    // A missing .env file is fine; variables may come from the environment
    let _ = dotenvy::dotenv();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let database = cli.database();

    log::info!("Starting prop_bets...");
    log::info!("Database: {}", database.describe());

    let command = match cli.command() {
        Ok(command) => command,
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(1);
        }
    };

    let db = match open_database(&database).await {
        Ok(db) => db,
        Err(e) => {
            log::error!("Failed to open database: {}", e);
            std::process::exit(1);
        }
    };

    match command {
        Command::Serve(args) => {
            if let Err(e) = prop_bets::web::serve(db, &cli.scoreboard_url, &args).await {
                log::error!("Web server error: {}", e);
                std::process::exit(1);
            }
        }
        Command::Sync => run_sync(&db, &cli.scoreboard_url).await,
        // open_database has already applied the schema if it was missing
        Command::InitDb => log::info!("Database ready"),
    }
}

/// Run one scoreboard pass, exiting non-zero on failure
async fn run_sync(db: &ArcDatabase, url: &str) {
    let mut session = match db.session().await {
        Ok(session) => session,
        Err(e) => {
            log::error!("Failed to open database session: {}", e);
            std::process::exit(1);
        }
    };

    let outcome = sync_games(&mut *session, url).await;
    if outcome.is_success() {
        log::info!("{}", outcome.message());
    } else {
        log::error!("Sync failed: {}", outcome.message());
        std::process::exit(1);
    }
}
