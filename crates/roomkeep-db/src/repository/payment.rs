//! # Payment Repository
//!
//! Payment records, one per booking. Records are written in the same
//! transaction as the booking they pay for and never updated afterwards.

use sqlx::{SqliteExecutor, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use roomkeep_core::validation::{validate_payment_amount, validate_room_id};
use roomkeep_core::PaymentRecord;

/// Writes a payment record.
///
/// ## Errors
/// - `Validation` if the amount is not positive
/// - `UniqueViolation` if the booking already has a payment
/// - `ForeignKeyViolation` if the booking does not exist
pub async fn record<'e, E>(executor: E, payment: &PaymentRecord) -> DbResult<()>
where
    E: SqliteExecutor<'e>,
{
    validate_payment_amount(payment.amount_cents)?;
    validate_room_id(payment.room_id)?;

    debug!(
        booking_id = %payment.booking_id,
        amount = %payment.amount(),
        "Recording payment"
    );

    sqlx::query(
        r#"
        INSERT INTO payments (booking_id, room_id, amount_cents, paid_at)
        VALUES (?1, ?2, ?3, ?4)
        "#,
    )
    .bind(&payment.booking_id)
    .bind(payment.room_id)
    .bind(payment.amount_cents)
    .bind(payment.paid_at)
    .execute(executor)
    .await?;

    Ok(())
}

/// Read access to payment records.
#[derive(Debug, Clone)]
pub struct PaymentRepository {
    pool: SqlitePool,
}

impl PaymentRepository {
    /// Creates a new PaymentRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PaymentRepository { pool }
    }

    /// The payment for a booking, if any.
    pub async fn get_by_booking(&self, booking_id: &str) -> DbResult<Option<PaymentRecord>> {
        let payment = sqlx::query_as::<_, PaymentRecord>(
            r#"
            SELECT booking_id, room_id, amount_cents, paid_at
            FROM payments
            WHERE booking_id = ?1
            "#,
        )
        .bind(booking_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(payment)
    }

    /// Counts payment records.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM payments")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
