//! # Reservation Commands
//!
//! `process-payment`, `cancel-booking` and `bookings`.
//!
//! ## Payment Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    process-payment                                      │
//! │                                                                         │
//! │  --amount "150.00" ──► Money::from_str ──► 15000 cents                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ProcessPaymentRequest { room_id, user_email, amount_cents, token }    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ReservationCoordinator::process_payment (one transaction, retried)    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  {"bookingId": "...", "status": "confirmed", ...}                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ApiError;
use roomkeep_core::{
    Booking, BookingStatus, CancelBookingRequest, CancelBookingResponse, Money,
    ProcessPaymentRequest, ProcessPaymentResponse,
};
use roomkeep_db::{Database, RetryPolicy};

/// Booking DTO for `bookings` output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingDto {
    pub id: String,
    pub room_number: i64,
    pub room_type: String,
    /// Paid amount, formatted.
    pub paid: String,
    pub paid_cents: i64,
    pub status: BookingStatus,
    pub booked_at: DateTime<Utc>,
}

impl From<Booking> for BookingDto {
    fn from(b: Booking) -> Self {
        BookingDto {
            paid: b.room_price().to_string(),
            paid_cents: b.room_price_cents,
            id: b.id,
            room_number: b.room_number,
            room_type: b.room_type,
            status: b.status,
            booked_at: b.booked_at,
        }
    }
}

/// Builds a payment request from command line values.
///
/// ## Arguments
/// * `amount` - Decimal amount such as `150.00`
pub fn payment_request(
    room_id: i64,
    user_email: String,
    amount: &str,
    request_token: Option<String>,
) -> Result<ProcessPaymentRequest, ApiError> {
    let amount: Money = amount.parse()?;

    Ok(ProcessPaymentRequest {
        room_id,
        user_email,
        amount_cents: amount.cents(),
        request_token,
    })
}

/// Reserves a room against a payment.
pub async fn process_payment(
    db: &Database,
    policy: RetryPolicy,
    request: ProcessPaymentRequest,
) -> Result<ProcessPaymentResponse, ApiError> {
    debug!(room_id = request.room_id, "process_payment command");

    let response = db.reservations_with(policy).process_payment(&request).await?;

    Ok(response)
}

/// Cancels the booking a user holds on a room.
pub async fn cancel_booking(
    db: &Database,
    policy: RetryPolicy,
    request: CancelBookingRequest,
) -> Result<CancelBookingResponse, ApiError> {
    debug!(room_number = request.room_number, "cancel_booking command");

    let response = db.reservations_with(policy).cancel_booking(&request).await?;

    Ok(response)
}

/// Lists the Confirmed bookings a user holds.
pub async fn list_bookings(db: &Database, user_email: &str) -> Result<Vec<BookingDto>, ApiError> {
    debug!("list_bookings command");

    let bookings = db.bookings().list_confirmed_by_user(user_email).await?;

    Ok(bookings.into_iter().map(BookingDto::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use roomkeep_core::NewRoom;
    use roomkeep_db::DbConfig;

    async fn setup() -> (Database, i64) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let room = db
            .rooms()
            .insert(&NewRoom {
                room_number: 101,
                room_type: "Deluxe".to_string(),
                price_cents: 15000,
                location: "North wing".to_string(),
                description: None,
                amenities: None,
                rating: None,
            })
            .await
            .unwrap();
        (db, room.id)
    }

    #[test]
    fn test_payment_request_parses_amount() {
        let request = payment_request(1, "a@x.com".into(), "150.00", None).unwrap();
        assert_eq!(request.amount_cents, 15000);

        let err = payment_request(1, "a@x.com".into(), "lots", None).unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_pay_list_cancel() {
        let (db, room_id) = setup().await;

        let request = payment_request(room_id, "a@x.com".into(), "150.00", None).unwrap();
        let paid = process_payment(&db, RetryPolicy::default(), request).await.unwrap();
        assert_eq!(paid.status, BookingStatus::Confirmed);

        let held = list_bookings(&db, "a@x.com").await.unwrap();
        assert_eq!(held.len(), 1);
        assert_eq!(held[0].paid, "$150.00");
        assert_eq!(held[0].room_number, 101);

        let canceled = cancel_booking(
            &db,
            RetryPolicy::default(),
            CancelBookingRequest {
                room_number: 101,
                user_email: "a@x.com".into(),
            },
        )
        .await
        .unwrap();
        assert_eq!(canceled.status, BookingStatus::Canceled);
        assert!(list_bookings(&db, "a@x.com").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_zero_amount_is_validation_error() {
        let (db, room_id) = setup().await;

        let request = payment_request(room_id, "a@x.com".into(), "0", None).unwrap();
        let err = process_payment(&db, RetryPolicy::default(), request)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }
}
