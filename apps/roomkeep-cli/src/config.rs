//! # CLI Configuration
//!
//! Configuration is loaded from environment variables with fallback to defaults.
//!
//! ## Variables
//! | Variable                     | Default                                  |
//! |------------------------------|------------------------------------------|
//! | `ROOMKEEP_DB_PATH`           | platform data dir, `roomkeep.db`         |
//! | `ROOMKEEP_MAX_CONNECTIONS`   | 5                                        |
//! | `ROOMKEEP_MAX_ATTEMPTS`      | 5                                        |
//! | `ROOMKEEP_RETRY_BACKOFF_MS`  | 10                                       |
//!
//! Default database locations:
//! - **macOS**: `~/Library/Application Support/com.roomkeep.roomkeep/roomkeep.db`
//! - **Windows**: `%APPDATA%\roomkeep\roomkeep\data\roomkeep.db`
//! - **Linux**: `~/.local/share/roomkeep/roomkeep.db`

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use directories::ProjectDirs;
use roomkeep_db::{DbConfig, RetryPolicy};

pub const ENV_DB_PATH: &str = "ROOMKEEP_DB_PATH";
pub const ENV_MAX_CONNECTIONS: &str = "ROOMKEEP_MAX_CONNECTIONS";
pub const ENV_MAX_ATTEMPTS: &str = "ROOMKEEP_MAX_ATTEMPTS";
pub const ENV_RETRY_BACKOFF_MS: &str = "ROOMKEEP_RETRY_BACKOFF_MS";

/// CLI configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// SQLite database file.
    pub database_path: PathBuf,

    /// Pool size.
    pub max_connections: u32,

    /// Attempts per reservation before reporting `CONFLICT`.
    pub max_attempts: u32,

    /// First backoff delay between attempts.
    pub retry_backoff: Duration,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`, which maps a variable name to
    /// its value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_path = match lookup(ENV_DB_PATH) {
            Some(path) if !path.trim().is_empty() => PathBuf::from(path),
            Some(_) => return Err(ConfigError::InvalidValue(ENV_DB_PATH.to_string())),
            None => default_database_path()?,
        };

        let max_connections: u32 = parse_or(&lookup, ENV_MAX_CONNECTIONS, 5)?;
        if max_connections == 0 {
            return Err(ConfigError::InvalidValue(ENV_MAX_CONNECTIONS.to_string()));
        }

        let max_attempts: u32 = parse_or(&lookup, ENV_MAX_ATTEMPTS, 5)?;
        if max_attempts == 0 {
            return Err(ConfigError::InvalidValue(ENV_MAX_ATTEMPTS.to_string()));
        }

        let backoff_ms: u64 = parse_or(&lookup, ENV_RETRY_BACKOFF_MS, 10)?;

        Ok(AppConfig {
            database_path,
            max_connections,
            max_attempts,
            retry_backoff: Duration::from_millis(backoff_ms),
        })
    }

    /// Pool configuration for this run.
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database_path).max_connections(self.max_connections)
    }

    /// Coordinator retry policy for this run.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts).initial_delay(self.retry_backoff)
    }
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(default),
    }
}

/// Platform data directory, created if missing.
fn default_database_path() -> Result<PathBuf, ConfigError> {
    let dirs = ProjectDirs::from("com", "roomkeep", "roomkeep").ok_or(ConfigError::NoDataDir)?;
    let data_dir = dirs.data_dir();

    std::fs::create_dir_all(data_dir)?;

    Ok(data_dir.join("roomkeep.db"))
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Could not determine a data directory; set ROOMKEEP_DB_PATH")]
    NoDataDir,

    #[error("Could not create data directory: {0}")]
    Io(#[from] std::io::Error),
}
