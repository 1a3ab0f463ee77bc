//! # Roomkeep CLI Library
//!
//! Command layer behind the `roomkeep` binary. `main.rs` parses arguments
//! and calls into this crate so every command can be tested without a
//! process boundary.
//!
//! ## Module Organization
//! ```text
//! roomkeep_cli/
//! ├── lib.rs              ◄─── You are here (tracing, database bootstrap)
//! ├── config.rs           ◄─── Environment configuration
//! ├── commands/
//! │   ├── mod.rs          ◄─── Command exports
//! │   ├── reservation.rs  ◄─── process-payment, cancel-booking, bookings
//! │   └── room.rs         ◄─── rooms, add-room, health
//! └── error.rs            ◄─── ApiError + exit codes
//! ```
//!
//! ## Output Contract
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  success  ──► stdout: response JSON              exit 0                 │
//! │  failure  ──► stderr: {"code": ..., "message"}   exit per ErrorCode     │
//! │  logs     ──► stderr (tracing, RUST_LOG aware)                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod commands;
pub mod config;
pub mod error;

use std::future::Future;

use tracing::info;
use tracing_subscriber::EnvFilter;

use config::AppConfig;
use error::ApiError;
use roomkeep_db::Database;

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=roomkeep_db=trace` - Trace the coordinator only
/// - Default: INFO (DEBUG with `--verbose`), sqlx at WARN
///
/// Logs go to stderr so stdout stays pure JSON.
pub fn init_tracing(verbose: bool) {
    let default = if verbose {
        "debug,sqlx=warn"
    } else {
        "info,sqlx=warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Opens the database described by `config` and applies pending migrations.
pub async fn open_database(config: &AppConfig) -> Result<Database, ApiError> {
    let db = Database::new(config.db_config()).await?;

    info!(path = ?config.database_path, "Database connected and migrations applied");

    Ok(db)
}

/// Opens the database, runs `command` against it and closes the pool,
/// whether or not the command succeeded.
pub async fn with_database<T, F, Fut>(config: &AppConfig, command: F) -> Result<T, ApiError>
where
    F: FnOnce(Database) -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let db = open_database(config).await?;

    let result = command(db.clone()).await;

    db.close().await;

    result
}
