//! # Domain Types
//!
//! Core domain types used throughout Roomkeep.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │      Room       │   │     Booking     │   │  PaymentRecord  │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (int)       │◄──│  room_id        │◄──│  booking_id(PK) │       │
//! │  │  room_number    │   │  id (UUID)      │   │  amount_cents   │       │
//! │  │  booked         │   │  status         │   │  paid_at        │       │
//! │  │  version        │   │  version        │   └─────────────────┘       │
//! │  └─────────────────┘   └─────────────────┘                              │
//! │                                                                         │
//! │  ┌─────────────────┐                                                    │
//! │  │  BookingStatus  │   Room 1 ── 0..1 Confirmed Booking                │
//! │  │  Confirmed      │   Booking 1 ── 0..1 PaymentRecord                 │
//! │  │  Canceled       │                                                    │
//! │  └─────────────────┘                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Version Tokens
//! `Room::version` and `Booking::version` are incremented by every write.
//! A writer passes the version it read; the store rejects the write if the
//! row moved on in the meantime.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Room
// =============================================================================

/// A bookable room.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Room {
    /// Database identity.
    pub id: i64,

    /// Human-facing room number, unique.
    pub room_number: i64,

    pub room_type: String,

    /// Nightly list price in cents.
    pub price_cents: i64,

    pub location: String,
    pub description: Option<String>,
    pub amenities: Option<String>,
    pub rating: Option<f64>,

    /// True while a Confirmed booking holds the room.
    pub booked: bool,

    /// Optimistic concurrency token.
    pub version: i64,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Room {
    /// Returns the list price as Money.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }
}

/// Attributes supplied when registering a room.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NewRoom {
    pub room_number: i64,
    pub room_type: String,
    pub price_cents: i64,
    pub location: String,
    pub description: Option<String>,
    pub amenities: Option<String>,
    pub rating: Option<f64>,
}

// =============================================================================
// Booking Status
// =============================================================================

/// Lifecycle status of a booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    /// Booking currently holds the room.
    Confirmed,
    /// Cancelled explicitly or superseded by a newer booking.
    Canceled,
}

impl BookingStatus {
    /// Lowercase label, as stored and reported.
    pub const fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Canceled => "canceled",
        }
    }
}

// =============================================================================
// Booking
// =============================================================================

/// A reservation of a room by a user.
///
/// Uses the snapshot pattern: room number, type and paid price are frozen
/// at booking time so the ledger stays meaningful if the room changes.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Booking {
    /// UUID v4.
    pub id: String,
    pub room_id: i64,
    pub user_email: String,
    #[ts(as = "String")]
    pub booked_at: DateTime<Utc>,
    pub status: BookingStatus,
    /// Room number at time of booking (frozen).
    pub room_number: i64,
    /// Room type at time of booking (frozen).
    pub room_type: String,
    /// Amount paid for this booking, in cents.
    pub room_price_cents: i64,
    /// Client-supplied idempotency key, if any.
    pub request_token: Option<String>,
    /// Optimistic concurrency token.
    pub version: i64,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    #[inline]
    pub fn is_confirmed(&self) -> bool {
        self.status == BookingStatus::Confirmed
    }

    /// Returns the paid price as Money.
    #[inline]
    pub fn room_price(&self) -> Money {
        Money::from_cents(self.room_price_cents)
    }
}

// =============================================================================
// Payment Record
// =============================================================================

/// Money received for a booking. Immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct PaymentRecord {
    /// Owning booking; also the record's identity.
    pub booking_id: String,
    pub room_id: i64,
    pub amount_cents: i64,
    #[ts(as = "String")]
    pub paid_at: DateTime<Utc>,
}

impl PaymentRecord {
    /// Returns the payment amount as Money.
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

// =============================================================================
// Requests and Responses
// =============================================================================

/// `ProcessPayment` request.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ProcessPaymentRequest {
    pub room_id: i64,
    pub user_email: String,
    pub amount_cents: i64,
    /// Optional idempotency key. A repeated token returns the original booking.
    #[serde(default)]
    pub request_token: Option<String>,
}

/// `ProcessPayment` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ProcessPaymentResponse {
    pub booking_id: String,
    pub status: BookingStatus,
    /// Booking that this payment displaced, if the room was already held.
    pub superseded_booking_id: Option<String>,
    /// True when the request token matched an earlier booking and nothing was written.
    pub replayed: bool,
}

/// `CancelBooking` request.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CancelBookingRequest {
    pub room_number: i64,
    pub user_email: String,
}

/// `CancelBooking` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CancelBookingResponse {
    pub booking_id: String,
    pub status: BookingStatus,
    /// False when the booking was already canceled and the call was a no-op.
    pub changed: bool,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_booking_status_labels() {
        assert_eq!(BookingStatus::Confirmed.as_str(), "confirmed");
        assert_eq!(BookingStatus::Canceled.as_str(), "canceled");
    }

    #[test]
    fn test_process_payment_response_shape() {
        let response = ProcessPaymentResponse {
            booking_id: "b-1".to_string(),
            status: BookingStatus::Confirmed,
            superseded_booking_id: None,
            replayed: false,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["bookingId"], "b-1");
        assert_eq!(json["status"], "confirmed");
    }

    #[test]
    fn test_process_payment_request_token_defaults_to_none() {
        let request: ProcessPaymentRequest = serde_json::from_str(
            r#"{"roomId": 1, "userEmail": "a@x.com", "amountCents": 15000}"#,
        )
        .unwrap();
        assert_eq!(request.room_id, 1);
        assert!(request.request_token.is_none());
    }
}
