//! # Reservation Coordinator
//!
//! Runs the Reserve and Cancel transitions as single SQLite transactions,
//! with optimistic version checks and bounded retry.
//!
//! ## Reserve
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                 process_payment(room_id, email, amount)                 │
//! │                                                                         │
//! │  validate input ──✗──► ValidationError (no transaction opened)         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─ attempt n ───────────────────────────────────────────────────────┐ │
//! │  │ BEGIN                                                              │ │
//! │  │  (token?) booking with this token exists → ROLLBACK, replay it    │ │
//! │  │  a.  read room + version        ──✗──► NotFound                   │ │
//! │  │  b.  cancel active booking (CAS)                                  │ │
//! │  │  b2. insert Confirmed booking                                     │ │
//! │  │  c.  insert payment                                               │ │
//! │  │  d.  set_booked(true, version from a)                             │ │
//! │  │ COMMIT                                                             │ │
//! │  └────────────────────────────────────────────────────────────────────┘ │
//! │       │                                                                 │
//! │       ├── VersionConflict / Busy ──► ROLLBACK, back off, attempt n + 1 │
//! │       │                              (after max_attempts: Conflict)    │
//! │       └── anything else ──────────► ROLLBACK, surface the error        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Cancel
//! Same loop: find the Confirmed booking for (room number, email), cancel it
//! with its version and release the room with the room's version. A booking
//! whose room is gone is an integrity fault and nothing is written.
//!
//! The coordinator holds no mutable state. Every call takes its own
//! transaction from the pool, so one coordinator can serve many tasks.

use std::future::Future;
use std::time::Duration;

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use chrono::Utc;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::DbError;
use crate::repository::{booking, payment, room};
use roomkeep_core::reservation::is_consistent;
use roomkeep_core::validation::{
    validate_email, validate_payment_amount, validate_request_token, validate_room_id,
    validate_room_number,
};
use roomkeep_core::{
    plan_cancel, plan_reserve, BookingStatus, CancelBookingRequest, CancelBookingResponse,
    CancelPlan, CoreError, ErrorKind, Money, ProcessPaymentRequest, ProcessPaymentResponse,
    ValidationError,
};

// =============================================================================
// Retry Policy
// =============================================================================

/// Bounded retry with exponential backoff for contended transactions.
///
/// # Default Values
///
/// - `max_attempts`: 5 (including the first)
/// - `initial_delay`: 10ms
/// - `max_delay`: 200ms
/// - `multiplier`: 2.0
///
/// Delays carry `backoff`'s default jitter (randomization factor 0.5).
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts before giving up with `Conflict`. At least 1.
    pub max_attempts: u32,
    /// Delay after the first failed attempt.
    pub initial_delay: Duration,
    /// Cap for the exponential backoff.
    pub max_delay: Duration,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(200),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with the given attempt budget and default backoff.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    /// Sets the first backoff delay.
    #[must_use]
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets the backoff cap.
    #[must_use]
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Fresh backoff schedule for one request.
    ///
    /// The attempt budget bounds the retries, not elapsed time.
    pub fn create_backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            current_interval: self.initial_delay,
            initial_interval: self.initial_delay,
            max_interval: self.max_delay,
            multiplier: self.multiplier,
            max_elapsed_time: None,
            ..Default::default()
        }
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Outcome of a failed reservation request.
#[derive(Debug, Error)]
pub enum ReservationError {
    /// Malformed request. Never retried.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Room or booking does not exist. Never retried.
    #[error("{0}")]
    NotFound(String),

    /// Lost the race on every attempt.
    #[error("Concurrent modification, gave up after {attempts} attempts")]
    Conflict { attempts: u32 },

    /// Ledger and room store disagree. Never retried.
    #[error("Integrity violation: {0}")]
    Integrity(String),

    /// The store itself failed. Nothing was persisted.
    #[error("Storage failure: {0}")]
    Storage(DbError),
}

impl ReservationError {
    /// Maps the error onto the caller-facing taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ReservationError::Validation(_) => ErrorKind::ValidationError,
            ReservationError::NotFound(_) => ErrorKind::NotFound,
            ReservationError::Conflict { .. } => ErrorKind::Conflict,
            ReservationError::Integrity(_) => ErrorKind::IntegrityError,
            ReservationError::Storage(_) => ErrorKind::StorageFailure,
        }
    }
}

impl From<CoreError> for ReservationError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(e) => ReservationError::Validation(e),
            CoreError::Integrity(message) => ReservationError::Integrity(message),
            not_found @ (CoreError::RoomNotFound(_) | CoreError::BookingNotFound { .. }) => {
                ReservationError::NotFound(not_found.to_string())
            }
        }
    }
}

impl From<DbError> for ReservationError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Validation(e) => ReservationError::Validation(e),
            not_found @ DbError::NotFound { .. } => ReservationError::NotFound(not_found.to_string()),
            other => ReservationError::Storage(other),
        }
    }
}

/// Result of a single transaction attempt.
#[derive(Debug)]
enum AttemptError {
    /// A concurrent writer got there first; start over from a fresh read.
    Contention(DbError),
    /// Final; surfaced to the caller.
    Failed(ReservationError),
}

impl From<DbError> for AttemptError {
    fn from(err: DbError) -> Self {
        if err.is_contention() {
            AttemptError::Contention(err)
        } else {
            AttemptError::Failed(err.into())
        }
    }
}

impl From<CoreError> for AttemptError {
    fn from(err: CoreError) -> Self {
        AttemptError::Failed(err.into())
    }
}

impl From<ReservationError> for AttemptError {
    fn from(err: ReservationError) -> Self {
        AttemptError::Failed(err)
    }
}

/// Inserting a booking trips a unique index only when a concurrent Reserve
/// committed a Confirmed booking (or the same request token) first.
fn contended_on_duplicate(err: DbError) -> AttemptError {
    match err {
        DbError::UniqueViolation { .. } => AttemptError::Contention(err),
        other => other.into(),
    }
}

// =============================================================================
// Coordinator
// =============================================================================

/// Validated ProcessPayment input.
#[derive(Debug)]
struct ReserveInput {
    room_id: i64,
    user_email: String,
    amount: Money,
    request_token: Option<String>,
}

/// Validated CancelBooking input.
#[derive(Debug)]
struct CancelInput {
    room_number: i64,
    user_email: String,
}

/// Executes reservation transitions against the database.
#[derive(Debug, Clone)]
pub struct ReservationCoordinator {
    pool: SqlitePool,
    policy: RetryPolicy,
}

impl ReservationCoordinator {
    /// Creates a coordinator over `pool`.
    pub fn new(pool: SqlitePool, policy: RetryPolicy) -> Self {
        ReservationCoordinator { pool, policy }
    }

    /// The retry policy in use.
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Reserves a room against a payment.
    ///
    /// ## Postconditions
    /// On success the room holds exactly one Confirmed booking (the new one),
    /// `booked` is true, and one new payment record exists. A prior Confirmed
    /// booking for the room is Canceled and reported as superseded.
    ///
    /// ## Errors
    /// `Validation`, `NotFound`, `Conflict` (retries exhausted), `Integrity`,
    /// `Storage`. No error leaves a partial write behind.
    pub async fn process_payment(
        &self,
        request: &ProcessPaymentRequest,
    ) -> Result<ProcessPaymentResponse, ReservationError> {
        validate_room_id(request.room_id)?;
        validate_payment_amount(request.amount_cents)?;
        let input = ReserveInput {
            room_id: request.room_id,
            user_email: validate_email(&request.user_email)?,
            amount: Money::from_cents(request.amount_cents),
            request_token: validate_request_token(request.request_token.as_deref())?,
        };

        let input = &input;
        self.with_retry("process_payment", move || self.try_reserve(input))
            .await
    }

    /// Cancels the Confirmed booking a user holds on a room.
    ///
    /// Canceling a booking that is already Canceled succeeds with
    /// `changed = false`.
    ///
    /// ## Errors
    /// `Validation`, `NotFound` (the pair never booked), `Integrity` (the
    /// booking's room is missing), `Conflict`, `Storage`.
    pub async fn cancel_booking(
        &self,
        request: &CancelBookingRequest,
    ) -> Result<CancelBookingResponse, ReservationError> {
        validate_room_number(request.room_number)?;
        let input = CancelInput {
            room_number: request.room_number,
            user_email: validate_email(&request.user_email)?,
        };

        let input = &input;
        self.with_retry("cancel_booking", move || self.try_cancel(input))
            .await
    }

    /// Runs `attempt` until it succeeds, fails for good, or the policy's
    /// attempt budget is spent.
    async fn with_retry<T, F, Fut>(
        &self,
        operation: &'static str,
        mut attempt: F,
    ) -> Result<T, ReservationError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, AttemptError>>,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut backoff = self.policy.create_backoff();
        let mut attempts = 0;

        loop {
            attempts += 1;

            match attempt().await {
                Ok(value) => {
                    if attempts > 1 {
                        debug!(operation, attempts, "Succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(AttemptError::Contention(cause)) => {
                    if attempts >= max_attempts {
                        warn!(operation, attempts, error = %cause, "Retries exhausted");
                        return Err(ReservationError::Conflict { attempts });
                    }

                    let delay = backoff.next_backoff().unwrap_or(self.policy.max_delay);
                    warn!(
                        operation,
                        attempt = attempts,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %cause,
                        "Concurrent modification, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(AttemptError::Failed(err)) => {
                    if let ReservationError::Integrity(message) = &err {
                        error!(operation, %message, "Data integrity fault");
                    }
                    return Err(err);
                }
            }
        }
    }

    async fn try_reserve(
        &self,
        input: &ReserveInput,
    ) -> Result<ProcessPaymentResponse, AttemptError> {
        let mut tx = self.pool.begin().await.map_err(DbError::transaction)?;

        if let Some(token) = &input.request_token {
            if let Some(existing) = booking::find_by_request_token(&mut *tx, token).await? {
                tx.rollback().await.map_err(DbError::transaction)?;

                if existing.room_id != input.room_id || existing.user_email != input.user_email {
                    return Err(ReservationError::Validation(ValidationError::InvalidFormat {
                        field: "request_token".to_string(),
                        reason: "already used for a different reservation".to_string(),
                    })
                    .into());
                }

                info!(
                    booking_id = %existing.id,
                    room_id = existing.room_id,
                    "Replayed payment for known request token"
                );
                return Ok(ProcessPaymentResponse {
                    booking_id: existing.id,
                    status: existing.status,
                    superseded_booking_id: None,
                    replayed: true,
                });
            }
        }

        // a. Room and its version token
        let room = room::fetch(&mut *tx, input.room_id)
            .await?
            .ok_or(CoreError::RoomNotFound(input.room_id))?;

        let active = booking::find_active(&mut *tx, room.id).await?;
        if !is_consistent(&room, active.as_ref()) {
            warn!(
                room_id = room.id,
                booked = room.booked,
                active_booking = active.as_ref().map(|b| b.id.as_str()),
                "Room flag disagrees with booking ledger, reserving repairs it"
            );
        }

        let plan = plan_reserve(
            &room,
            active.as_ref(),
            &input.user_email,
            input.amount,
            input.request_token.clone(),
            Uuid::new_v4().to_string(),
            Utc::now(),
        )?;

        // b. Supersede the prior holder
        if let Some(prior) = &plan.supersede {
            let changed = booking::cancel(&mut *tx, &prior.booking_id, prior.expected_version).await?;
            if !changed {
                return Err(AttemptError::Contention(DbError::version_conflict(
                    "Booking",
                    &prior.booking_id,
                    prior.expected_version,
                )));
            }
        }

        // b2. New Confirmed booking
        booking::insert(&mut *tx, &plan.booking)
            .await
            .map_err(contended_on_duplicate)?;

        // c. Payment
        payment::record(&mut *tx, &plan.payment).await?;

        // d. Room flag, checked against the version read in (a)
        let room_version =
            room::set_booked(&mut *tx, plan.room_id, true, plan.expected_room_version).await?;

        tx.commit().await.map_err(DbError::transaction)?;

        let superseded_booking_id = plan.supersede.map(|prior| prior.booking_id);

        info!(
            booking_id = %plan.booking.id,
            room_id = plan.room_id,
            room_number = plan.booking.room_number,
            amount = %input.amount,
            superseded = ?superseded_booking_id,
            room_version,
            "Room reserved"
        );

        Ok(ProcessPaymentResponse {
            booking_id: plan.booking.id,
            status: BookingStatus::Confirmed,
            superseded_booking_id,
            replayed: false,
        })
    }

    async fn try_cancel(&self, input: &CancelInput) -> Result<CancelBookingResponse, AttemptError> {
        let mut tx = self.pool.begin().await.map_err(DbError::transaction)?;

        let active =
            booking::find_active_by_room_number(&mut *tx, input.room_number, &input.user_email)
                .await?;

        let Some(active) = active else {
            let latest =
                booking::find_latest_by_room_number(&mut *tx, input.room_number, &input.user_email)
                    .await?;
            tx.rollback().await.map_err(DbError::transaction)?;

            return match latest {
                Some(previous) => {
                    debug!(booking_id = %previous.id, "Booking already canceled");
                    Ok(CancelBookingResponse {
                        booking_id: previous.id,
                        status: BookingStatus::Canceled,
                        changed: false,
                    })
                }
                None => Err(CoreError::BookingNotFound {
                    room_number: input.room_number,
                    user_email: input.user_email.clone(),
                }
                .into()),
            };
        };

        let room = room::fetch(&mut *tx, active.room_id).await?;

        let plan = match plan_cancel(&active, room.as_ref()) {
            Ok(plan) => plan,
            Err(err) => {
                tx.rollback().await.map_err(DbError::transaction)?;
                return Err(err.into());
            }
        };

        let (booking_id, room_id) = match plan {
            CancelPlan::AlreadyCanceled { booking_id } => {
                tx.rollback().await.map_err(DbError::transaction)?;
                return Ok(CancelBookingResponse {
                    booking_id,
                    status: BookingStatus::Canceled,
                    changed: false,
                });
            }
            CancelPlan::Release {
                booking_id,
                expected_booking_version,
                room_id,
                expected_room_version,
            } => {
                if !booking::cancel(&mut *tx, &booking_id, expected_booking_version).await? {
                    // Canceled by a concurrent request between our read and write
                    return Err(AttemptError::Contention(DbError::version_conflict(
                        "Booking",
                        &booking_id,
                        expected_booking_version,
                    )));
                }
                room::set_booked(&mut *tx, room_id, false, expected_room_version).await?;
                (booking_id, room_id)
            }
        };

        tx.commit().await.map_err(DbError::transaction)?;

        info!(
            booking_id = %booking_id,
            room_id,
            room_number = input.room_number,
            "Booking canceled, room released"
        );

        Ok(CancelBookingResponse {
            booking_id,
            status: BookingStatus::Canceled,
            changed: true,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use roomkeep_core::{NewRoom, Room};

    async fn setup() -> (Database, Room) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let room = db.rooms().insert(&deluxe(101)).await.unwrap();
        (db, room)
    }

    fn deluxe(room_number: i64) -> NewRoom {
        NewRoom {
            room_number,
            room_type: "Deluxe".to_string(),
            price_cents: 15000,
            location: "North wing".to_string(),
            description: None,
            amenities: None,
            rating: None,
        }
    }

    fn pay(room_id: i64, email: &str, amount_cents: i64) -> ProcessPaymentRequest {
        ProcessPaymentRequest {
            room_id,
            user_email: email.to_string(),
            amount_cents,
            request_token: None,
        }
    }

    fn cancel(room_number: i64, email: &str) -> CancelBookingRequest {
        CancelBookingRequest {
            room_number,
            user_email: email.to_string(),
        }
    }

    async fn assert_consistent(db: &Database, room_id: i64) {
        let room = db.rooms().get_by_id(room_id).await.unwrap().unwrap();
        let active = db.bookings().find_active_booking(room_id).await.unwrap();
        assert!(
            is_consistent(&room, active.as_ref()),
            "room booked={} but active booking={:?}",
            room.booked,
            active.map(|b| b.id)
        );
    }

    #[test]
    fn test_retry_policy_backoff() {
        let mut backoff = RetryPolicy::default().create_backoff();

        // 10ms +/- 50% jitter
        let first = backoff.next_backoff().unwrap();
        assert!(first >= Duration::from_millis(5) && first <= Duration::from_millis(15));

        // Capped at 200ms, plus jitter
        for _ in 0..20 {
            let delay = backoff.next_backoff().unwrap();
            assert!(delay <= Duration::from_millis(300));
        }

        assert_eq!(RetryPolicy::new(0).max_attempts, 1);
    }

    #[tokio::test]
    async fn test_reserve_available_room() {
        let (db, room) = setup().await;

        let response = db
            .reservations()
            .process_payment(&pay(room.id, "a@x.com", 15000))
            .await
            .unwrap();

        assert_eq!(response.status, BookingStatus::Confirmed);
        assert!(response.superseded_booking_id.is_none());
        assert!(!response.replayed);

        let booking = db.bookings().get_by_id(&response.booking_id).await.unwrap().unwrap();
        assert_eq!(booking.room_number, 101);
        assert_eq!(booking.room_type, "Deluxe");
        assert_eq!(booking.room_price_cents, 15000);
        assert_eq!(booking.user_email, "a@x.com");

        let payment = db.payments().get_by_booking(&response.booking_id).await.unwrap().unwrap();
        assert_eq!(payment.amount_cents, 15000);

        let room = db.rooms().get_by_id(room.id).await.unwrap().unwrap();
        assert!(room.booked);
        assert_eq!(room.version, 1);
    }

    #[tokio::test]
    async fn test_second_payment_supersedes_first() {
        let (db, room) = setup().await;
        let coordinator = db.reservations();

        let first = coordinator
            .process_payment(&pay(room.id, "a@x.com", 15000))
            .await
            .unwrap();
        let second = coordinator
            .process_payment(&pay(room.id, "b@y.com", 20000))
            .await
            .unwrap();

        assert_eq!(second.superseded_booking_id.as_deref(), Some(first.booking_id.as_str()));

        let first = db.bookings().get_by_id(&first.booking_id).await.unwrap().unwrap();
        assert_eq!(first.status, BookingStatus::Canceled);

        let active = db.bookings().find_active_booking(room.id).await.unwrap().unwrap();
        assert_eq!(active.id, second.booking_id);
        assert_eq!(active.room_price_cents, 20000);
        assert_eq!(db.payments().count().await.unwrap(), 2);
        assert_consistent(&db, room.id).await;
    }

    #[tokio::test]
    async fn test_cancel_releases_room() {
        let (db, room) = setup().await;
        let coordinator = db.reservations();

        coordinator
            .process_payment(&pay(room.id, "a@x.com", 15000))
            .await
            .unwrap();
        let reserved = coordinator
            .process_payment(&pay(room.id, "b@y.com", 20000))
            .await
            .unwrap();

        let response = coordinator.cancel_booking(&cancel(101, "b@y.com")).await.unwrap();
        assert_eq!(response.booking_id, reserved.booking_id);
        assert_eq!(response.status, BookingStatus::Canceled);
        assert!(response.changed);

        let room = db.rooms().get_by_id(room.id).await.unwrap().unwrap();
        assert!(!room.booked);
        assert!(db.bookings().find_active_booking(room.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cancel_twice_is_noop_success() {
        let (db, room) = setup().await;
        let coordinator = db.reservations();

        coordinator
            .process_payment(&pay(room.id, "a@x.com", 15000))
            .await
            .unwrap();

        let first = coordinator.cancel_booking(&cancel(101, "a@x.com")).await.unwrap();
        let version_after_cancel = db.rooms().get_by_id(room.id).await.unwrap().unwrap().version;

        let second = coordinator.cancel_booking(&cancel(101, "a@x.com")).await.unwrap();
        assert!(first.changed);
        assert!(!second.changed);
        assert_eq!(first.booking_id, second.booking_id);
        assert_eq!(second.status, BookingStatus::Canceled);

        // The room is written once per transition
        let room = db.rooms().get_by_id(room.id).await.unwrap().unwrap();
        assert!(!room.booked);
        assert_eq!(room.version, version_after_cancel);
    }

    #[tokio::test]
    async fn test_cancel_unknown_booking_not_found() {
        let (db, _room) = setup().await;

        let err = db
            .reservations()
            .cancel_booking(&cancel(101, "nobody@x.com"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_cancel_rejects_bad_input() {
        let (db, _room) = setup().await;
        let coordinator = db.reservations();

        let err = coordinator.cancel_booking(&cancel(0, "a@x.com")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationError);

        let err = coordinator.cancel_booking(&cancel(101, "")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationError);
    }

    #[tokio::test]
    async fn test_invalid_amount_writes_nothing() {
        let (db, room) = setup().await;

        let err = db
            .reservations()
            .process_payment(&pay(room.id, "a@x.com", 0))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationError);

        assert!(db.bookings().list_for_room(room.id).await.unwrap().is_empty());
        assert_eq!(db.payments().count().await.unwrap(), 0);
        assert!(!db.rooms().get_by_id(room.id).await.unwrap().unwrap().booked);
    }

    #[tokio::test]
    async fn test_missing_room_not_found() {
        let (db, _room) = setup().await;

        let err = db
            .reservations()
            .process_payment(&pay(999, "a@x.com", 15000))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(db.payments().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_failed_room_write_rolls_back_everything() {
        let (db, room) = setup().await;

        // Make step (d) fail after booking and payment were written
        sqlx::query(
            r#"
            CREATE TRIGGER reject_room_update BEFORE UPDATE ON rooms
            BEGIN
                SELECT RAISE(ABORT, 'room store unavailable');
            END
            "#,
        )
        .execute(db.pool())
        .await
        .unwrap();

        let err = db
            .reservations()
            .process_payment(&pay(room.id, "a@x.com", 15000))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StorageFailure);

        assert!(db.bookings().list_for_room(room.id).await.unwrap().is_empty());
        assert_eq!(db.payments().count().await.unwrap(), 0);
        let room = db.rooms().get_by_id(room.id).await.unwrap().unwrap();
        assert!(!room.booked);
        assert_eq!(room.version, 0);
    }

    #[tokio::test]
    async fn test_cancel_with_missing_room_is_integrity_error() {
        let (db, room) = setup().await;
        let coordinator = db.reservations();

        let reserved = coordinator
            .process_payment(&pay(room.id, "a@x.com", 15000))
            .await
            .unwrap();

        sqlx::query("DELETE FROM rooms WHERE id = ?1")
            .bind(room.id)
            .execute(db.pool())
            .await
            .unwrap();

        let err = coordinator.cancel_booking(&cancel(101, "a@x.com")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IntegrityError);

        // Nothing was written
        let booking = db.bookings().get_by_id(&reserved.booking_id).await.unwrap().unwrap();
        assert_eq!(booking.status, BookingStatus::Confirmed);
        assert_eq!(booking.version, 0);
    }

    #[tokio::test]
    async fn test_request_token_replays_original_booking() {
        let (db, room) = setup().await;
        let coordinator = db.reservations();

        let mut request = pay(room.id, "a@x.com", 15000);
        request.request_token = Some("req-7f3a".to_string());

        let first = coordinator.process_payment(&request).await.unwrap();
        let second = coordinator.process_payment(&request).await.unwrap();

        assert!(!first.replayed);
        assert!(second.replayed);
        assert_eq!(first.booking_id, second.booking_id);
        assert_eq!(db.payments().count().await.unwrap(), 1);
        assert_eq!(db.bookings().list_for_room(room.id).await.unwrap().len(), 1);

        // Same token, different reservation
        let mut other = pay(room.id, "b@y.com", 15000);
        other.request_token = Some("req-7f3a".to_string());
        let err = coordinator.process_payment(&other).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationError);
    }

    #[tokio::test]
    async fn test_single_active_booking_across_sequence() {
        let (db, room) = setup().await;
        let coordinator = db.reservations();

        let steps: [(&str, bool); 6] = [
            ("a@x.com", true),
            ("b@y.com", true),
            ("b@y.com", false),
            ("c@z.com", true),
            ("a@x.com", true),
            ("a@x.com", false),
        ];

        for (email, reserve) in steps {
            if reserve {
                coordinator
                    .process_payment(&pay(room.id, email, 10000))
                    .await
                    .unwrap();
            } else {
                coordinator.cancel_booking(&cancel(101, email)).await.unwrap();
            }

            let confirmed = db
                .bookings()
                .list_for_room(room.id)
                .await
                .unwrap()
                .into_iter()
                .filter(|b| b.is_confirmed())
                .count();
            assert!(confirmed <= 1);
            assert_consistent(&db, room.id).await;
        }
    }

    fn temp_db_path() -> std::path::PathBuf {
        std::env::temp_dir().join(format!("roomkeep-{}.db", Uuid::new_v4()))
    }

    fn remove_db_files(path: &std::path::Path) {
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{}", path.display(), suffix));
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_reservations_leave_one_confirmed() {
        let path = temp_db_path();
        let db = Database::new(DbConfig::new(&path).max_connections(4))
            .await
            .unwrap();
        let room = db.rooms().insert(&deluxe(101)).await.unwrap();
        let coordinator =
            db.reservations_with(RetryPolicy::new(20).max_delay(Duration::from_millis(50)));

        let emails = ["a@x.com", "b@y.com"];
        let handles: Vec<_> = emails
            .iter()
            .map(|email| {
                let coordinator = coordinator.clone();
                let request = pay(room.id, email, 15000);
                tokio::spawn(async move { coordinator.process_payment(&request).await })
            })
            .collect();

        let mut succeeded = 0;
        for handle in handles {
            handle.await.unwrap().unwrap();
            succeeded += 1;
        }
        assert_eq!(succeeded, 2);

        let history = db.bookings().list_for_room(room.id).await.unwrap();
        let confirmed = history.iter().filter(|b| b.is_confirmed()).count();
        assert_eq!(history.len(), 2);
        assert_eq!(confirmed, 1);
        assert_eq!(db.payments().count().await.unwrap(), 2);
        assert_consistent(&db, room.id).await;

        db.close().await;
        remove_db_files(&path);
    }

    #[tokio::test]
    async fn test_locked_database_exhausts_retries_with_conflict() {
        let path = temp_db_path();
        let db = Database::new(
            DbConfig::new(&path)
                .max_connections(2)
                .busy_timeout(Duration::from_millis(20)),
        )
        .await
        .unwrap();
        let room = db.rooms().insert(&deluxe(101)).await.unwrap();

        // Another writer holds the database lock
        let mut holder = db.pool().acquire().await.unwrap();
        sqlx::query("BEGIN IMMEDIATE")
            .execute(&mut *holder)
            .await
            .unwrap();

        let err = db
            .rooms()
            .insert(&deluxe(102))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Busy(_)), "got {:?}", err);
        assert!(err.is_contention());

        let coordinator = db.reservations_with(
            RetryPolicy::new(2)
                .initial_delay(Duration::from_millis(5))
                .max_delay(Duration::from_millis(10)),
        );
        let err = coordinator
            .process_payment(&pay(room.id, "a@x.com", 15000))
            .await
            .unwrap_err();
        assert!(matches!(err, ReservationError::Conflict { attempts: 2 }));
        assert_eq!(err.kind(), ErrorKind::Conflict);

        sqlx::query("ROLLBACK").execute(&mut *holder).await.unwrap();
        drop(holder);

        assert_eq!(db.payments().count().await.unwrap(), 0);
        assert!(db.bookings().list_for_room(room.id).await.unwrap().is_empty());
        assert!(!db.rooms().get_by_id(room.id).await.unwrap().unwrap().booked);

        db.close().await;
        remove_db_files(&path);
    }
}
