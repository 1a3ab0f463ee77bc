//! # Seed Data Generator
//!
//! Populates the database with sample rooms for development.
//!
//! ## Usage
//! ```bash
//! # Generate 40 rooms (default)
//! cargo run -p roomkeep-db --bin seed
//!
//! # Generate custom amount
//! cargo run -p roomkeep-db --bin seed -- --count 120
//!
//! # Specify database path
//! cargo run -p roomkeep-db --bin seed -- --db ./data/roomkeep.db
//! ```
//!
//! ## Generated Rooms
//! Rooms are numbered by floor (`101`, `102`, ... `201`, ...), ten per
//! floor. Each room gets:
//! - A type cycling through Standard / Deluxe / Suite / Family
//! - A list price derived from the type and floor
//! - A wing, short description, amenities and a rating between 3.0 and 5.0
//!
//! All rooms start available.

use std::env;

use roomkeep_core::NewRoom;
use roomkeep_db::{Database, DbConfig};
use tracing_subscriber::EnvFilter;

const ROOMS_PER_FLOOR: usize = 10;

/// Room types with base nightly price in cents.
const ROOM_TYPES: &[(&str, i64, &str)] = &[
    ("Standard", 9_900, "wifi,tv"),
    ("Deluxe", 15_000, "wifi,tv,minibar"),
    ("Suite", 27_500, "wifi,tv,minibar,bathtub,lounge"),
    ("Family", 19_900, "wifi,tv,kitchenette,bunk beds"),
];

const WINGS: &[&str] = &["North wing", "South wing", "Garden annex"];

const VIEWS: &[&str] = &["Courtyard view", "Sea view", "City view", "Garden view"];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 40;
    let mut db_path = String::from("./roomkeep_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(40);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Roomkeep Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of rooms to generate (default: 40)");
                println!("  -d, --db <PATH>    Database file path (default: ./roomkeep_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Roomkeep Seed Data Generator");
    println!("===============================");
    println!("Database: {}", db_path);
    println!("Rooms:    {}", count);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.rooms().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} rooms", existing);
        println!("  Skipping seed to avoid duplicate room numbers.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    println!();
    println!("Generating rooms...");

    let mut generated = 0;
    let start = std::time::Instant::now();

    for seed in 0..count {
        let room = generate_room(seed);

        if let Err(e) = db.rooms().insert(&room).await {
            eprintln!("Failed to insert room {}: {}", room.room_number, e);
            continue;
        }

        generated += 1;
    }

    let elapsed = start.elapsed();
    println!();
    println!("✓ Generated {} rooms in {:?}", generated, elapsed);

    let available = db.rooms().list_available().await?;
    println!("  Available: {}", available.len());

    db.close().await;

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

/// Generates the room at position `seed`.
fn generate_room(seed: usize) -> NewRoom {
    let floor = seed / ROOMS_PER_FLOOR + 1;
    let position = seed % ROOMS_PER_FLOOR + 1;
    let room_number = (floor * 100 + position) as i64;

    let (room_type, base_price, amenities) = ROOM_TYPES[seed % ROOM_TYPES.len()];

    // Higher floors cost $5.00 more per floor
    let price_cents = base_price + (floor as i64 - 1) * 500;

    // 3.0 - 5.0 in steps of 0.1
    let rating = 3.0 + ((seed * 7) % 21) as f64 / 10.0;

    NewRoom {
        room_number,
        room_type: room_type.to_string(),
        price_cents,
        location: WINGS[floor % WINGS.len()].to_string(),
        description: Some(format!("{}, floor {}", VIEWS[seed % VIEWS.len()], floor)),
        amenities: Some(amenities.to_string()),
        rating: Some(rating),
    }
}
