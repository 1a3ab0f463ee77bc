//! # Reservation Planning
//!
//! Pure transition logic for the (room, booking) state machine. The database
//! layer reads the current rows, asks this module what to write, and then
//! executes the plan inside one transaction.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │                      Reserve (new payment)                              │
//! │        ┌───────────┐ ─────────────────────► ┌───────────┐              │
//! │        │ Available │                        │ Reserved  │──┐           │
//! │        │ booked=0  │ ◄───────────────────── │ booked=1  │  │ Reserve   │
//! │        └───────────┘      Cancel            └───────────┘◄─┘ (supersede│
//! │                                                               prior)   │
//! │                                                                         │
//! │  Reserve on Reserved: prior Confirmed booking → Canceled,              │
//! │                       new Confirmed booking, room stays booked.        │
//! │  Cancel on Canceled:  no-op.                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every plan carries the version tokens that were read, so the executor
//! can detect a concurrent writer at write time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{Booking, BookingStatus, PaymentRecord, Room};
use crate::validation::{validate_email, validate_payment_amount};

// =============================================================================
// Room State
// =============================================================================

/// The two states a room can be in from the coordinator's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomState {
    /// No Confirmed booking; `booked = false`.
    Available,
    /// Exactly one Confirmed booking; `booked = true`.
    Reserved,
}

impl RoomState {
    /// State according to the room's availability flag.
    pub fn of_room(room: &Room) -> Self {
        if room.booked {
            RoomState::Reserved
        } else {
            RoomState::Available
        }
    }

    /// State according to the booking ledger.
    pub fn of_ledger(active: Option<&Booking>) -> Self {
        match active {
            Some(_) => RoomState::Reserved,
            None => RoomState::Available,
        }
    }
}

/// Returns true when the room flag and the ledger agree.
pub fn is_consistent(room: &Room, active: Option<&Booking>) -> bool {
    RoomState::of_room(room) == RoomState::of_ledger(active)
}

// =============================================================================
// Reserve
// =============================================================================

/// A Confirmed booking that a new payment displaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Supersession {
    pub booking_id: String,
    pub expected_version: i64,
}

/// Writes required to reserve a room, in execution order.
#[derive(Debug, Clone)]
pub struct ReservePlan {
    /// Prior Confirmed booking to cancel, if the room was held.
    pub supersede: Option<Supersession>,
    /// New Confirmed booking to insert.
    pub booking: Booking,
    /// Payment recorded against `booking`.
    pub payment: PaymentRecord,
    pub room_id: i64,
    /// Room version read at the start of the attempt.
    pub expected_room_version: i64,
}

/// Plans a reservation of `room` for `user_email`.
///
/// ## Rules
/// - `amount` must be positive, `user_email` well formed
/// - an existing Confirmed booking is superseded, not stacked on
/// - the active booking, if any, must belong to `room`
/// - the new booking snapshots room number and type, and records the
///   *paid* amount as its price
///
/// ## Example
/// ```rust
/// use chrono::Utc;
/// use roomkeep_core::{plan_reserve, Money, Room};
///
/// let now = Utc::now();
/// let room = Room {
///     id: 1, room_number: 101, room_type: "Deluxe".into(), price_cents: 15000,
///     location: "North".into(), description: None, amenities: None, rating: None,
///     booked: false, version: 0, created_at: now, updated_at: now,
/// };
///
/// let plan = plan_reserve(&room, None, "a@x.com", Money::from_cents(15000), None, "b-1".into(), now).unwrap();
/// assert!(plan.supersede.is_none());
/// assert_eq!(plan.booking.room_number, 101);
/// assert_eq!(plan.payment.amount_cents, 15000);
/// ```
pub fn plan_reserve(
    room: &Room,
    active: Option<&Booking>,
    user_email: &str,
    amount: Money,
    request_token: Option<String>,
    booking_id: String,
    now: DateTime<Utc>,
) -> CoreResult<ReservePlan> {
    validate_payment_amount(amount.cents())?;
    let user_email = validate_email(user_email)?;

    let supersede = match active {
        Some(prior) if prior.room_id != room.id => {
            return Err(CoreError::Integrity(format!(
                "active booking {} belongs to room {}, expected room {}",
                prior.id, prior.room_id, room.id
            )));
        }
        Some(prior) if prior.is_confirmed() => Some(Supersession {
            booking_id: prior.id.clone(),
            expected_version: prior.version,
        }),
        _ => None,
    };

    let booking = Booking {
        id: booking_id,
        room_id: room.id,
        user_email,
        booked_at: now,
        status: BookingStatus::Confirmed,
        room_number: room.room_number,
        room_type: room.room_type.clone(),
        room_price_cents: amount.cents(),
        request_token,
        version: 0,
        updated_at: now,
    };

    let payment = PaymentRecord {
        booking_id: booking.id.clone(),
        room_id: room.id,
        amount_cents: amount.cents(),
        paid_at: now,
    };

    Ok(ReservePlan {
        supersede,
        booking,
        payment,
        room_id: room.id,
        expected_room_version: room.version,
    })
}

// =============================================================================
// Cancel
// =============================================================================

/// Writes required to cancel a booking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelPlan {
    /// Flip the booking to Canceled and release the room.
    Release {
        booking_id: String,
        expected_booking_version: i64,
        room_id: i64,
        expected_room_version: i64,
    },
    /// Booking is already Canceled; nothing to write.
    AlreadyCanceled { booking_id: String },
}

/// Plans the cancellation of `booking`.
///
/// `room` is the row looked up by `booking.room_id`. A Confirmed booking
/// whose room cannot be found is an integrity fault, never a silent success.
pub fn plan_cancel(booking: &Booking, room: Option<&Room>) -> CoreResult<CancelPlan> {
    if !booking.is_confirmed() {
        return Ok(CancelPlan::AlreadyCanceled {
            booking_id: booking.id.clone(),
        });
    }

    let room = room.ok_or_else(|| {
        CoreError::Integrity(format!(
            "booking {} references missing room {}",
            booking.id, booking.room_id
        ))
    })?;

    if room.id != booking.room_id {
        return Err(CoreError::Integrity(format!(
            "booking {} references room {}, got room {}",
            booking.id, booking.room_id, room.id
        )));
    }

    Ok(CancelPlan::Release {
        booking_id: booking.id.clone(),
        expected_booking_version: booking.version,
        room_id: room.id,
        expected_room_version: room.version,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn room(booked: bool) -> Room {
        let now = Utc::now();
        Room {
            id: 1,
            room_number: 101,
            room_type: "Deluxe".to_string(),
            price_cents: 15000,
            location: "North wing".to_string(),
            description: None,
            amenities: None,
            rating: None,
            booked,
            version: 3,
            created_at: now,
            updated_at: now,
        }
    }

    fn confirmed(id: &str, email: &str) -> Booking {
        let now = Utc::now();
        Booking {
            id: id.to_string(),
            room_id: 1,
            user_email: email.to_string(),
            booked_at: now,
            status: BookingStatus::Confirmed,
            room_number: 101,
            room_type: "Deluxe".to_string(),
            room_price_cents: 15000,
            request_token: None,
            version: 0,
            updated_at: now,
        }
    }

    #[test]
    fn test_reserve_available_room() {
        let room = room(false);
        let plan = plan_reserve(
            &room,
            None,
            "a@x.com",
            Money::from_cents(15000),
            None,
            "b-1".to_string(),
            Utc::now(),
        )
        .unwrap();

        assert!(plan.supersede.is_none());
        assert_eq!(plan.booking.status, BookingStatus::Confirmed);
        assert_eq!(plan.booking.room_price_cents, 15000);
        assert_eq!(plan.booking.room_type, "Deluxe");
        assert_eq!(plan.payment.booking_id, "b-1");
        assert_eq!(plan.expected_room_version, 3);
    }

    #[test]
    fn test_reserve_supersedes_prior_booking() {
        let room = room(true);
        let prior = confirmed("b-1", "a@x.com");
        let plan = plan_reserve(
            &room,
            Some(&prior),
            "b@y.com",
            Money::from_cents(20000),
            None,
            "b-2".to_string(),
            Utc::now(),
        )
        .unwrap();

        assert_eq!(
            plan.supersede,
            Some(Supersession {
                booking_id: "b-1".to_string(),
                expected_version: 0,
            })
        );
        assert_eq!(plan.booking.user_email, "b@y.com");
        assert_eq!(plan.booking.room_price_cents, 20000);
    }

    #[test]
    fn test_reserve_rejects_non_positive_amount() {
        let err = plan_reserve(
            &room(false),
            None,
            "a@x.com",
            Money::zero(),
            None,
            "b-1".to_string(),
            Utc::now(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationError);
    }

    #[test]
    fn test_reserve_rejects_foreign_active_booking() {
        let mut prior = confirmed("b-1", "a@x.com");
        prior.room_id = 9;
        let err = plan_reserve(
            &room(true),
            Some(&prior),
            "b@y.com",
            Money::from_cents(100),
            None,
            "b-2".to_string(),
            Utc::now(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IntegrityError);
    }

    #[test]
    fn test_cancel_releases_room() {
        let room = room(true);
        let booking = confirmed("b-1", "a@x.com");
        let plan = plan_cancel(&booking, Some(&room)).unwrap();
        assert_eq!(
            plan,
            CancelPlan::Release {
                booking_id: "b-1".to_string(),
                expected_booking_version: 0,
                room_id: 1,
                expected_room_version: 3,
            }
        );
    }

    #[test]
    fn test_cancel_missing_room_is_integrity_error() {
        let booking = confirmed("b-1", "a@x.com");
        let err = plan_cancel(&booking, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IntegrityError);
    }

    #[test]
    fn test_cancel_already_canceled_is_noop() {
        let mut booking = confirmed("b-1", "a@x.com");
        booking.status = BookingStatus::Canceled;
        let plan = plan_cancel(&booking, None).unwrap();
        assert_eq!(
            plan,
            CancelPlan::AlreadyCanceled {
                booking_id: "b-1".to_string()
            }
        );
    }

    #[test]
    fn test_consistency_check() {
        let booking = confirmed("b-1", "a@x.com");
        assert!(is_consistent(&room(true), Some(&booking)));
        assert!(is_consistent(&room(false), None));
        assert!(!is_consistent(&room(true), None));
        assert!(!is_consistent(&room(false), Some(&booking)));
    }
}
