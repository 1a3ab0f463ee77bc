//! # Booking Repository
//!
//! The booking ledger. Bookings are never deleted; a booking leaves the
//! Confirmed state exactly once, either by explicit cancellation or by
//! being superseded by a newer payment for the same room.
//!
//! ## Booking Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Booking Lifecycle                                 │
//! │                                                                         │
//! │  1. INSERT                                                             │
//! │     └── insert() → Booking { status: Confirmed, version: 0 }           │
//! │                                                                         │
//! │  2. CANCEL (explicit or supersession)                                  │
//! │     └── cancel(id, expected_version)                                   │
//! │         → Booking { status: Canceled, version: n + 1 }                 │
//! │                                                                         │
//! │  3. CANCEL again                                                       │
//! │     └── no-op, Ok(false)                                               │
//! │                                                                         │
//! │  The store refuses a second Confirmed booking for the same room        │
//! │  (partial unique index), independent of the coordinator.               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqliteExecutor, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use roomkeep_core::validation::{validate_email, validate_room_id, validate_room_number};
use roomkeep_core::{Booking, BookingStatus, ValidationError};

const BOOKING_COLUMNS: &str = r#"
    id, room_id, user_email, booked_at, status,
    room_number, room_type, room_price_cents,
    request_token, version, updated_at
"#;

// =============================================================================
// Transactional Primitives
// =============================================================================

/// The Confirmed booking holding `room_id`, if any.
pub async fn find_active<'e, E>(executor: E, room_id: i64) -> DbResult<Option<Booking>>
where
    E: SqliteExecutor<'e>,
{
    let sql = format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings WHERE room_id = ?1 AND status = 'confirmed'"
    );
    let booking = sqlx::query_as::<_, Booking>(&sql)
        .bind(room_id)
        .fetch_optional(executor)
        .await?;

    Ok(booking)
}

/// The Confirmed booking for a (room number, email) pair, if any.
pub async fn find_active_by_room_number<'e, E>(
    executor: E,
    room_number: i64,
    user_email: &str,
) -> DbResult<Option<Booking>>
where
    E: SqliteExecutor<'e>,
{
    let sql = format!(
        r#"
        SELECT {BOOKING_COLUMNS} FROM bookings
        WHERE room_number = ?1 AND user_email = ?2 AND status = 'confirmed'
        ORDER BY booked_at DESC, rowid DESC
        LIMIT 1
        "#
    );
    let booking = sqlx::query_as::<_, Booking>(&sql)
        .bind(room_number)
        .bind(user_email)
        .fetch_optional(executor)
        .await?;

    Ok(booking)
}

/// The most recent booking of any status for a (room number, email) pair.
pub async fn find_latest_by_room_number<'e, E>(
    executor: E,
    room_number: i64,
    user_email: &str,
) -> DbResult<Option<Booking>>
where
    E: SqliteExecutor<'e>,
{
    let sql = format!(
        r#"
        SELECT {BOOKING_COLUMNS} FROM bookings
        WHERE room_number = ?1 AND user_email = ?2
        ORDER BY updated_at DESC, rowid DESC
        LIMIT 1
        "#
    );
    let booking = sqlx::query_as::<_, Booking>(&sql)
        .bind(room_number)
        .bind(user_email)
        .fetch_optional(executor)
        .await?;

    Ok(booking)
}

/// The booking created under `request_token`, if any.
pub async fn find_by_request_token<'e, E>(
    executor: E,
    request_token: &str,
) -> DbResult<Option<Booking>>
where
    E: SqliteExecutor<'e>,
{
    let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE request_token = ?1");
    let booking = sqlx::query_as::<_, Booking>(&sql)
        .bind(request_token)
        .fetch_optional(executor)
        .await?;

    Ok(booking)
}

/// Reads a booking by id.
pub async fn fetch<'e, E>(executor: E, id: &str) -> DbResult<Option<Booking>>
where
    E: SqliteExecutor<'e>,
{
    let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1");
    let booking = sqlx::query_as::<_, Booking>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?;

    Ok(booking)
}

/// Appends a booking to the ledger.
///
/// ## Errors
/// - `Validation` if the email is empty or the room id is not positive
/// - `UniqueViolation` if the room already has a Confirmed booking, or the
///   request token was used before
pub async fn insert<'e, E>(executor: E, booking: &Booking) -> DbResult<()>
where
    E: SqliteExecutor<'e>,
{
    if booking.user_email.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "user_email".to_string(),
        }
        .into());
    }
    validate_room_id(booking.room_id)?;

    debug!(
        id = %booking.id,
        room_id = booking.room_id,
        status = booking.status.as_str(),
        "Inserting booking"
    );

    sqlx::query(
        r#"
        INSERT INTO bookings (
            id, room_id, user_email, booked_at, status,
            room_number, room_type, room_price_cents,
            request_token, version, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        "#,
    )
    .bind(&booking.id)
    .bind(booking.room_id)
    .bind(&booking.user_email)
    .bind(booking.booked_at)
    .bind(booking.status)
    .bind(booking.room_number)
    .bind(&booking.room_type)
    .bind(booking.room_price_cents)
    .bind(&booking.request_token)
    .bind(booking.version)
    .bind(booking.updated_at)
    .execute(executor)
    .await?;

    Ok(())
}

/// Moves a Confirmed booking to Canceled if it is still at `expected_version`.
///
/// ## Returns
/// - `Ok(true)` if this call canceled the booking
/// - `Ok(false)` if the booking was already Canceled
///
/// ## Errors
/// - `NotFound` if no booking has this id
/// - `VersionConflict` if the booking is Confirmed but at another version
pub async fn cancel(
    conn: &mut SqliteConnection,
    id: &str,
    expected_version: i64,
) -> DbResult<bool> {
    debug!(id = %id, expected_version, "Canceling booking");

    let result = sqlx::query(
        r#"
        UPDATE bookings
        SET status = 'canceled', version = version + 1, updated_at = ?1
        WHERE id = ?2 AND version = ?3 AND status = 'confirmed'
        "#,
    )
    .bind(Utc::now())
    .bind(id)
    .bind(expected_version)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return match fetch(&mut *conn, id).await? {
            None => Err(DbError::not_found("Booking", id)),
            Some(current) if current.status == BookingStatus::Canceled => Ok(false),
            Some(_) => Err(DbError::version_conflict("Booking", id, expected_version)),
        };
    }

    Ok(true)
}

// =============================================================================
// Repository
// =============================================================================

/// Read access to the booking ledger.
///
/// Writes go through the reservation coordinator so that the ledger, the
/// room flag and the payment record always move together.
#[derive(Debug, Clone)]
pub struct BookingRepository {
    pool: SqlitePool,
}

impl BookingRepository {
    /// Creates a new BookingRepository.
    pub fn new(pool: SqlitePool) -> Self {
        BookingRepository { pool }
    }

    /// Gets a booking by id.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Booking>> {
        fetch(&self.pool, id).await
    }

    /// The Confirmed booking holding a room, if any.
    pub async fn find_active_booking(&self, room_id: i64) -> DbResult<Option<Booking>> {
        validate_room_id(room_id)?;
        find_active(&self.pool, room_id).await
    }

    /// The Confirmed booking for a (room number, email) pair, if any.
    pub async fn find_active_by_room_number(
        &self,
        room_number: i64,
        user_email: &str,
    ) -> DbResult<Option<Booking>> {
        validate_room_number(room_number)?;
        let user_email = validate_email(user_email)?;
        find_active_by_room_number(&self.pool, room_number, &user_email).await
    }

    /// Confirmed bookings held by a user, newest first.
    pub async fn list_confirmed_by_user(&self, user_email: &str) -> DbResult<Vec<Booking>> {
        let user_email = validate_email(user_email)?;

        let sql = format!(
            r#"
            SELECT {BOOKING_COLUMNS} FROM bookings
            WHERE user_email = ?1 AND status = 'confirmed'
            ORDER BY booked_at DESC
            "#
        );
        let bookings = sqlx::query_as::<_, Booking>(&sql)
            .bind(&user_email)
            .fetch_all(&self.pool)
            .await?;

        Ok(bookings)
    }

    /// Full ledger history of a room, oldest first.
    pub async fn list_for_room(&self, room_id: i64) -> DbResult<Vec<Booking>> {
        validate_room_id(room_id)?;

        let sql = format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE room_id = ?1 ORDER BY booked_at, rowid"
        );
        let bookings = sqlx::query_as::<_, Booking>(&sql)
            .bind(room_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(bookings)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use uuid::Uuid;

    fn booking(room_id: i64, email: &str) -> Booking {
        let now = Utc::now();
        Booking {
            id: Uuid::new_v4().to_string(),
            room_id,
            user_email: email.to_string(),
            booked_at: now,
            status: BookingStatus::Confirmed,
            room_number: 100 + room_id,
            room_type: "Deluxe".to_string(),
            room_price_cents: 15000,
            request_token: None,
            version: 0,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_insert_and_find_active() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let b = booking(1, "a@x.com");
        insert(db.pool(), &b).await.unwrap();

        let active = db.bookings().find_active_booking(1).await.unwrap().unwrap();
        assert_eq!(active.id, b.id);
        assert_eq!(active.status, BookingStatus::Confirmed);

        let by_number = db
            .bookings()
            .find_active_by_room_number(101, "a@x.com")
            .await
            .unwrap();
        assert!(by_number.is_some());
        assert!(db
            .bookings()
            .find_active_by_room_number(101, "b@y.com")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_insert_rejects_empty_email() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let err = insert(db.pool(), &booking(1, "  ")).await.unwrap_err();
        assert!(matches!(err, DbError::Validation(_)));
    }

    #[tokio::test]
    async fn test_second_confirmed_booking_for_room_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        insert(db.pool(), &booking(1, "a@x.com")).await.unwrap();

        let err = insert(db.pool(), &booking(1, "b@y.com")).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_cancel_is_compare_and_set() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let b = booking(1, "a@x.com");
        insert(db.pool(), &b).await.unwrap();
        let mut conn = db.pool().acquire().await.unwrap();

        // Stale token on a Confirmed booking
        let err = cancel(&mut conn, &b.id, 7).await.unwrap_err();
        assert!(matches!(err, DbError::VersionConflict { .. }));

        assert!(cancel(&mut conn, &b.id, 0).await.unwrap());

        // Second cancel is a no-op
        assert!(!cancel(&mut conn, &b.id, 0).await.unwrap());

        let err = cancel(&mut conn, "missing", 0).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
        drop(conn);

        let stored = db.bookings().get_by_id(&b.id).await.unwrap().unwrap();
        assert_eq!(stored.status, BookingStatus::Canceled);
        assert_eq!(stored.version, 1);
        assert!(db.bookings().find_active_booking(1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_request_token_lookup() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut b = booking(1, "a@x.com");
        b.request_token = Some("req-1".to_string());
        insert(db.pool(), &b).await.unwrap();

        let found = find_by_request_token(db.pool(), "req-1").await.unwrap().unwrap();
        assert_eq!(found.id, b.id);
        assert!(find_by_request_token(db.pool(), "req-2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_confirmed_by_user() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let first = booking(1, "a@x.com");
        let second = booking(2, "a@x.com");
        insert(db.pool(), &first).await.unwrap();
        insert(db.pool(), &second).await.unwrap();
        insert(db.pool(), &booking(3, "b@y.com")).await.unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        cancel(&mut conn, &first.id, 0).await.unwrap();
        drop(conn);

        let held = db.bookings().list_confirmed_by_user("a@x.com").await.unwrap();
        assert_eq!(held.len(), 1);
        assert_eq!(held[0].id, second.id);

        let history = db.bookings().list_for_room(1).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].status, BookingStatus::Canceled);
    }
}
