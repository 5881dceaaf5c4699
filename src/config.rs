//! Command-line and environment configuration
//!
//! Every option can come from a flag or an environment variable; a `.env`
//! file is loaded by `main` before parsing.

use crate::error::{Error, Result};
use crate::espn::SCOREBOARD_URL;
use axum_extra::extract::cookie::Key;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Placeholder signing key used when SECRET_KEY is unset. Not for deployment.
pub const INSECURE_SECRET_KEY: &str =
    "super_secret_key_for_simple_app_replace_me_before_deploying_anywhere_real";

/// Group prop-bet tracker with NFL scoreboard sync
#[derive(Parser, Debug)]
#[command(name = "prop_bets")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// PostgreSQL connection string; selects the PostgreSQL backend when set
    #[arg(long, env = "DATABASE_URL", global = true)]
    pub database_url: Option<String>,

    /// SQLite database file, used when no connection string is set
    #[arg(long, env = "DB_PATH", default_value = "prop_bets.db", global = true)]
    pub db_path: PathBuf,

    /// Scoreboard feed endpoint
    #[arg(long, env = "SCOREBOARD_URL", default_value = SCOREBOARD_URL, global = true)]
    pub scoreboard_url: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the web app (default)
    Serve(ServeArgs),
    /// Run one scoreboard sync and exit
    Sync,
    /// Create the schema if it does not exist yet
    InitDb,
}

#[derive(clap::Args, Debug, Clone)]
pub struct ServeArgs {
    /// Interface to bind
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = 5001)]
    pub port: u16,

    /// Key used to sign flash-message cookies (at least 64 bytes)
    #[arg(long, env = "SECRET_KEY", hide_env_values = true)]
    pub secret_key: Option<String>,
}

impl Default for ServeArgs {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5001,
            secret_key: None,
        }
    }
}

impl ServeArgs {
    /// Read the serve options from the environment alone, for when no
    /// subcommand was given on the command line
    pub fn from_env() -> Result<Self> {
        let command = <Self as clap::Args>::augment_args(clap::Command::new("serve"));
        let matches = command
            .try_get_matches_from(["serve"])
            .map_err(|e| Error::Config(e.to_string()))?;
        <Self as clap::FromArgMatches>::from_arg_matches(&matches)
            .map_err(|e| Error::Config(e.to_string()))
    }

    /// Address string for the listener
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Build the cookie signing key, falling back to the insecure placeholder
    pub fn cookie_key(&self) -> Result<Key> {
        let secret = match self.secret_key.as_deref().filter(|s| !s.is_empty()) {
            Some(secret) => secret,
            None => {
                log::warn!("SECRET_KEY is not set; using an insecure placeholder key");
                INSECURE_SECRET_KEY
            }
        };
        Key::try_from(secret.as_bytes()).map_err(|_| {
            Error::Config(format!(
                "SECRET_KEY must be at least 64 bytes (got {})",
                secret.len()
            ))
        })
    }
}

/// Which storage backend to open
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseConfig {
    Postgres { url: String },
    Sqlite { path: PathBuf },
}

impl DatabaseConfig {
    /// A non-empty connection string selects PostgreSQL; otherwise SQLite
    pub fn from_parts(database_url: Option<&str>, db_path: PathBuf) -> Self {
        match database_url.map(str::trim).filter(|url| !url.is_empty()) {
            Some(url) => DatabaseConfig::Postgres {
                url: url.to_string(),
            },
            None => DatabaseConfig::Sqlite { path: db_path },
        }
    }

    /// Human-readable description that never includes credentials
    pub fn describe(&self) -> String {
        match self {
            DatabaseConfig::Postgres { .. } => "PostgreSQL (DATABASE_URL)".to_string(),
            DatabaseConfig::Sqlite { path } => format!("SQLite ({})", path.display()),
        }
    }
}

impl Cli {
    pub fn database(&self) -> DatabaseConfig {
        DatabaseConfig::from_parts(self.database_url.as_deref(), self.db_path.clone())
    }

    /// The requested command; `serve` when none was given
    pub fn command(&self) -> Result<Command> {
        match &self.command {
            Some(command) => Ok(command.clone()),
            None => ServeArgs::from_env().map(Command::Serve),
        }
    }
}
