//! # Roomkeep Command Line
//!
//! ```text
//! $ roomkeep add-room --number 101 --room-type Deluxe --price 150.00 --location "North wing"
//! $ roomkeep process-payment --room-id 1 --email a@x.com --amount 150.00
//! $ roomkeep cancel-booking --room-number 101 --email a@x.com
//! $ roomkeep bookings a@x.com
//! $ roomkeep rooms --filter available
//! ```
//!
//! The database path comes from `--db`, then `ROOMKEEP_DB_PATH`, then the
//! platform data directory.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Serialize;

use roomkeep_cli::commands::{reservation, room};
use roomkeep_cli::config::{AppConfig, ENV_DB_PATH};
use roomkeep_cli::error::ApiError;
use roomkeep_cli::{init_tracing, with_database};
use roomkeep_core::{CancelBookingRequest, Money, NewRoom};
use roomkeep_db::{Database, RetryPolicy};

/// Room reservation engine.
#[derive(Parser)]
#[command(name = "roomkeep")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the SQLite database file
    #[arg(global = true, long)]
    db: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pay for a room and take the booking
    ProcessPayment {
        /// Room id
        #[arg(long)]
        room_id: i64,

        /// Paying user's email
        #[arg(long)]
        email: String,

        /// Amount paid, e.g. 150.00
        #[arg(long)]
        amount: String,

        /// Client token; resubmitting it returns the original booking
        #[arg(long)]
        request_token: Option<String>,
    },

    /// Cancel the booking a user holds on a room
    CancelBooking {
        /// Room number
        #[arg(long)]
        room_number: i64,

        /// Booking user's email
        #[arg(long)]
        email: String,
    },

    /// List a user's confirmed bookings
    Bookings {
        /// User email
        email: String,
    },

    /// List rooms
    Rooms {
        #[arg(short, long, value_enum, default_value_t = room::RoomFilter::All)]
        filter: room::RoomFilter,
    },

    /// Register a room
    AddRoom {
        #[arg(long)]
        number: i64,

        #[arg(long)]
        room_type: String,

        /// Nightly price, e.g. 150.00
        #[arg(long)]
        price: String,

        #[arg(long)]
        location: String,

        #[arg(long)]
        description: Option<String>,

        /// Comma separated list
        #[arg(long)]
        amenities: Option<String>,

        #[arg(long)]
        rating: Option<f64>,
    },

    /// Check database connectivity and migrations
    Health,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(output) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("{}", err.to_json());
            ExitCode::from(err.code.exit_code())
        }
    }
}

async fn run(cli: Cli) -> Result<String, ApiError> {
    let db_override = cli.db.map(|path| path.display().to_string());
    let config = AppConfig::from_lookup(|key| match (key, &db_override) {
        (ENV_DB_PATH, Some(path)) => Some(path.clone()),
        _ => std::env::var(key).ok(),
    })?;

    let retry_policy = config.retry_policy();

    with_database(&config, |db| execute(db, retry_policy, cli.command)).await
}

async fn execute(
    db: Database,
    retry_policy: RetryPolicy,
    command: Commands,
) -> Result<String, ApiError> {
    match command {
        Commands::ProcessPayment {
            room_id,
            email,
            amount,
            request_token,
        } => {
            let request = reservation::payment_request(room_id, email, &amount, request_token)?;
            render(&reservation::process_payment(&db, retry_policy, request).await?)
        }
        Commands::CancelBooking { room_number, email } => {
            let request = CancelBookingRequest {
                room_number,
                user_email: email,
            };
            render(&reservation::cancel_booking(&db, retry_policy, request).await?)
        }
        Commands::Bookings { email } => render(&reservation::list_bookings(&db, &email).await?),
        Commands::Rooms { filter } => render(&room::list_rooms(&db, filter).await?),
        Commands::AddRoom {
            number,
            room_type,
            price,
            location,
            description,
            amenities,
            rating,
        } => {
            let price: Money = price.parse()?;
            let new_room = NewRoom {
                room_number: number,
                room_type,
                price_cents: price.cents(),
                location,
                description,
                amenities,
                rating,
            };
            render(&room::add_room(&db, new_room).await?)
        }
        Commands::Health => render(&room::health(&db).await?),
    }
}

fn render<T: Serialize>(value: &T) -> Result<String, ApiError> {
    Ok(serde_json::to_string_pretty(value)?)
}
