//! # Room Repository
//!
//! Database operations for rooms and their availability flag.
//!
//! ## Version Token
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                   Compare-and-Set on rooms.version                      │
//! │                                                                         │
//! │  read   ──► Room { booked: false, version: 4 }                         │
//! │                                                                         │
//! │  write  ──► UPDATE rooms SET booked = 1, version = version + 1         │
//! │             WHERE id = ?1 AND version = 4                              │
//! │                                                                         │
//! │             1 row  → new version 5                                     │
//! │             0 rows → room gone (NotFound) or moved on (VersionConflict)│
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The transactional primitives ([`fetch`], [`set_booked`]) take an
//! executor or connection so the coordinator can run them inside an open
//! transaction. [`RoomRepository`] runs the same SQL on the pool.

use chrono::Utc;
use sqlx::{SqliteExecutor, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use roomkeep_core::validation::{validate_new_room, validate_room_number};
use roomkeep_core::{NewRoom, Room};

const ROOM_COLUMNS: &str = r#"
    id, room_number, room_type, price_cents, location,
    description, amenities, rating, booked, version,
    created_at, updated_at
"#;

// =============================================================================
// Transactional Primitives
// =============================================================================

/// Reads a room by id.
pub async fn fetch<'e, E>(executor: E, id: i64) -> DbResult<Option<Room>>
where
    E: SqliteExecutor<'e>,
{
    let sql = format!("SELECT {ROOM_COLUMNS} FROM rooms WHERE id = ?1");
    let room = sqlx::query_as::<_, Room>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?;

    Ok(room)
}

/// Sets the availability flag if the room is still at `expected_version`.
///
/// ## Returns
/// The room's new version.
///
/// ## Errors
/// - `VersionConflict` if another writer bumped the version first
/// - `NotFound` if the room row no longer exists
pub async fn set_booked(
    conn: &mut sqlx::SqliteConnection,
    id: i64,
    booked: bool,
    expected_version: i64,
) -> DbResult<i64> {
    debug!(room_id = id, booked, expected_version, "Setting room availability");

    let result = sqlx::query(
        r#"
        UPDATE rooms
        SET booked = ?1, version = version + 1, updated_at = ?2
        WHERE id = ?3 AND version = ?4
        "#,
    )
    .bind(booked)
    .bind(Utc::now())
    .bind(id)
    .bind(expected_version)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return match fetch(&mut *conn, id).await? {
            None => Err(DbError::not_found("Room", id)),
            Some(_) => Err(DbError::version_conflict("Room", id, expected_version)),
        };
    }

    Ok(expected_version + 1)
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for room database operations.
#[derive(Debug, Clone)]
pub struct RoomRepository {
    pool: SqlitePool,
}

impl RoomRepository {
    /// Creates a new RoomRepository.
    pub fn new(pool: SqlitePool) -> Self {
        RoomRepository { pool }
    }

    /// Registers a room. New rooms start available at version 0.
    ///
    /// ## Errors
    /// - `Validation` for bad attributes
    /// - `UniqueViolation` if the room number is taken
    pub async fn insert(&self, room: &NewRoom) -> DbResult<Room> {
        validate_new_room(room)?;

        if self.get_by_number(room.room_number).await?.is_some() {
            return Err(DbError::duplicate(
                "room_number",
                room.room_number.to_string(),
            ));
        }

        let now = Utc::now();

        debug!(room_number = room.room_number, "Inserting room");

        let sql = format!(
            r#"
            INSERT INTO rooms (
                room_number, room_type, price_cents, location,
                description, amenities, rating, booked, version,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, 0, ?8, ?8)
            RETURNING {ROOM_COLUMNS}
            "#
        );

        let inserted = sqlx::query_as::<_, Room>(&sql)
            .bind(room.room_number)
            .bind(room.room_type.trim())
            .bind(room.price_cents)
            .bind(&room.location)
            .bind(&room.description)
            .bind(&room.amenities)
            .bind(room.rating)
            .bind(now)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match DbError::from(e) {
                DbError::UniqueViolation { field, .. } => {
                    DbError::duplicate(field, room.room_number.to_string())
                }
                other => other,
            })?;

        Ok(inserted)
    }

    /// Gets a room by id.
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Room>> {
        fetch(&self.pool, id).await
    }

    /// Gets a room by its human-facing number.
    pub async fn get_by_number(&self, room_number: i64) -> DbResult<Option<Room>> {
        validate_room_number(room_number)?;

        let sql = format!("SELECT {ROOM_COLUMNS} FROM rooms WHERE room_number = ?1");
        let room = sqlx::query_as::<_, Room>(&sql)
            .bind(room_number)
            .fetch_optional(&self.pool)
            .await?;

        Ok(room)
    }

    /// Lists every room ordered by room number.
    pub async fn list_all(&self) -> DbResult<Vec<Room>> {
        let sql = format!("SELECT {ROOM_COLUMNS} FROM rooms ORDER BY room_number");
        let rooms = sqlx::query_as::<_, Room>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(rooms)
    }

    /// Lists rooms that can be booked.
    pub async fn list_available(&self) -> DbResult<Vec<Room>> {
        self.list_by_booked(false).await
    }

    /// Lists rooms held by a Confirmed booking.
    pub async fn list_booked(&self) -> DbResult<Vec<Room>> {
        self.list_by_booked(true).await
    }

    async fn list_by_booked(&self, booked: bool) -> DbResult<Vec<Room>> {
        let sql = format!(
            "SELECT {ROOM_COLUMNS} FROM rooms WHERE booked = ?1 ORDER BY room_number"
        );
        let rooms = sqlx::query_as::<_, Room>(&sql)
            .bind(booked)
            .fetch_all(&self.pool)
            .await?;

        Ok(rooms)
    }

    /// Counts registered rooms.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM rooms")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    fn new_room(room_number: i64) -> NewRoom {
        NewRoom {
            room_number,
            room_type: "Deluxe".to_string(),
            price_cents: 15000,
            location: "North wing".to_string(),
            description: Some("Sea view".to_string()),
            amenities: Some("wifi,minibar".to_string()),
            rating: Some(4.5),
        }
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let rooms = db.rooms();

        let room = rooms.insert(&new_room(101)).await.unwrap();
        assert!(room.id > 0);
        assert!(!room.booked);
        assert_eq!(room.version, 0);

        let by_id = rooms.get_by_id(room.id).await.unwrap().unwrap();
        assert_eq!(by_id.room_number, 101);

        let by_number = rooms.get_by_number(101).await.unwrap().unwrap();
        assert_eq!(by_number.id, room.id);
        assert_eq!(by_number.rating, Some(4.5));
    }

    #[tokio::test]
    async fn test_duplicate_room_number_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let rooms = db.rooms();

        rooms.insert(&new_room(101)).await.unwrap();
        let err = rooms.insert(&new_room(101)).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
        assert_eq!(rooms.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_invalid_room_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut room = new_room(0);
        room.room_type = String::new();

        let err = db.rooms().insert(&room).await.unwrap_err();
        assert!(matches!(err, DbError::Validation(_)));
    }

    #[tokio::test]
    async fn test_set_booked_compare_and_set() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let room = db.rooms().insert(&new_room(101)).await.unwrap();
        let mut conn = db.pool().acquire().await.unwrap();

        let version = set_booked(&mut conn, room.id, true, 0).await.unwrap();
        assert_eq!(version, 1);

        // Stale token
        let err = set_booked(&mut conn, room.id, false, 0).await.unwrap_err();
        assert!(matches!(err, DbError::VersionConflict { .. }));

        // Missing room
        let err = set_booked(&mut conn, 999, false, 0).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
        drop(conn);

        let booked = db.rooms().list_booked().await.unwrap();
        assert_eq!(booked.len(), 1);
        assert!(db.rooms().list_available().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_all_ordered_by_number() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let rooms = db.rooms();
        rooms.insert(&new_room(202)).await.unwrap();
        rooms.insert(&new_room(101)).await.unwrap();

        let numbers: Vec<i64> = rooms
            .list_all()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.room_number)
            .collect();
        assert_eq!(numbers, vec![101, 202]);
    }
}
