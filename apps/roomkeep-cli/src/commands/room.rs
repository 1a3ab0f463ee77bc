//! # Room Commands
//!
//! `rooms`, `add-room` and `health`.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ApiError;
use roomkeep_core::{NewRoom, Room};
use roomkeep_db::{migrations, Database};

/// Which rooms `rooms` lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum RoomFilter {
    #[default]
    All,
    Available,
    Booked,
}

/// Room DTO for command output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomDto {
    pub id: i64,
    pub room_number: i64,
    pub room_type: String,
    /// List price, formatted.
    pub price: String,
    pub price_cents: i64,
    pub location: String,
    pub description: Option<String>,
    pub amenities: Option<String>,
    pub rating: Option<f64>,
    pub booked: bool,
}

impl From<Room> for RoomDto {
    fn from(r: Room) -> Self {
        RoomDto {
            price: r.price().to_string(),
            id: r.id,
            room_number: r.room_number,
            room_type: r.room_type,
            price_cents: r.price_cents,
            location: r.location,
            description: r.description,
            amenities: r.amenities,
            rating: r.rating,
            booked: r.booked,
        }
    }
}

/// `health` output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub healthy: bool,
    pub migrations_total: usize,
    pub migrations_applied: usize,
    pub rooms: i64,
}

/// Lists rooms, ordered by room number.
pub async fn list_rooms(db: &Database, filter: RoomFilter) -> Result<Vec<RoomDto>, ApiError> {
    debug!(?filter, "list_rooms command");

    let rooms = match filter {
        RoomFilter::All => db.rooms().list_all().await?,
        RoomFilter::Available => db.rooms().list_available().await?,
        RoomFilter::Booked => db.rooms().list_booked().await?,
    };

    Ok(rooms.into_iter().map(RoomDto::from).collect())
}

/// Registers a room. Fails with `CONFLICT` if the number is taken.
pub async fn add_room(db: &Database, room: NewRoom) -> Result<RoomDto, ApiError> {
    let created = db.rooms().insert(&room).await?;

    info!(id = created.id, room_number = created.room_number, "Room added");

    Ok(created.into())
}

/// Reports database reachability and migration state.
pub async fn health(db: &Database) -> Result<HealthResponse, ApiError> {
    let healthy = db.health_check().await;
    let (migrations_total, migrations_applied) = migrations::migration_status(db.pool()).await?;
    let rooms = db.rooms().count().await?;

    Ok(HealthResponse {
        healthy,
        migrations_total,
        migrations_applied,
        rooms,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use roomkeep_core::ProcessPaymentRequest;
    use roomkeep_db::DbConfig;

    fn suite(room_number: i64) -> NewRoom {
        NewRoom {
            room_number,
            room_type: "Suite".to_string(),
            price_cents: 27500,
            location: "South wing".to_string(),
            description: Some("Sea view".to_string()),
            amenities: None,
            rating: Some(4.8),
        }
    }

    #[tokio::test]
    async fn test_add_and_filter_rooms() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let first = add_room(&db, suite(301)).await.unwrap();
        add_room(&db, suite(302)).await.unwrap();
        assert_eq!(first.price, "$275.00");

        db.reservations()
            .process_payment(&ProcessPaymentRequest {
                room_id: first.id,
                user_email: "a@x.com".to_string(),
                amount_cents: 27500,
                request_token: None,
            })
            .await
            .unwrap();

        assert_eq!(list_rooms(&db, RoomFilter::All).await.unwrap().len(), 2);

        let booked = list_rooms(&db, RoomFilter::Booked).await.unwrap();
        assert_eq!(booked.len(), 1);
        assert_eq!(booked[0].room_number, 301);

        let available = list_rooms(&db, RoomFilter::Available).await.unwrap();
        assert_eq!(available.len(), 1);
        assert_eq!(available[0].room_number, 302);
    }

    #[tokio::test]
    async fn test_duplicate_room_is_conflict() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        add_room(&db, suite(301)).await.unwrap();

        let err = add_room(&db, suite(301)).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Conflict);
    }

    #[tokio::test]
    async fn test_health() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let report = health(&db).await.unwrap();
        assert!(report.healthy);
        assert_eq!(report.migrations_total, report.migrations_applied);
        assert_eq!(report.rooms, 0);
    }
}
