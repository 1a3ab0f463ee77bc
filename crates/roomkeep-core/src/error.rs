//! # Error Types
//!
//! Domain-specific error types for roomkeep-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  roomkeep-core errors (this file)                                      │
//! │  ├── CoreError        - Reservation rule violations                    │
//! │  ├── ValidationError  - Input validation failures                      │
//! │  └── ErrorKind        - Caller-facing taxonomy                         │
//! │                                                                         │
//! │  roomkeep-db errors (separate crate)                                   │
//! │  ├── DbError          - Database operation failures                    │
//! │  └── ReservationError - Coordinator outcome, carries an ErrorKind      │
//! │                                                                         │
//! │  CLI errors (in app)                                                   │
//! │  └── ApiError         - What the caller sees (serialized)              │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → ReservationError → ApiError       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

// =============================================================================
// Error Kind
// =============================================================================

/// The five outcomes a reservation request can fail with.
///
/// ## Retry Semantics
/// ```text
/// ValidationError  → never retried, caller fixes input
/// NotFound         → never retried
/// Conflict         → retried internally, surfaced after exhaustion
/// IntegrityError   → never retried, operator attention required
/// StorageFailure   → caller may retry; nothing was persisted
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    ValidationError,
    NotFound,
    Conflict,
    IntegrityError,
    StorageFailure,
}

impl ErrorKind {
    /// Whether a caller may reasonably resubmit the same request.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::Conflict | ErrorKind::StorageFailure)
    }
}

// =============================================================================
// Core Error
// =============================================================================

/// Reservation rule errors.
///
/// These are raised by the pure planning functions in
/// [`crate::reservation`] before any write is attempted.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Room cannot be found.
    #[error("Room not found: {0}")]
    RoomNotFound(i64),

    /// No booking matches the request.
    ///
    /// ## When This Occurs
    /// - Cancel for a (room number, email) pair that never booked
    #[error("Booking not found for room {room_number} and {user_email}")]
    BookingNotFound {
        room_number: i64,
        user_email: String,
    },

    /// A booking refers to a room that belongs to a different room record.
    ///
    /// ## When This Occurs
    /// - The ledger and the room store disagree about which room a
    ///   booking holds. Never recovered silently.
    #[error("Integrity violation: {0}")]
    Integrity(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Maps the error onto the caller-facing taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::RoomNotFound(_) | CoreError::BookingNotFound { .. } => ErrorKind::NotFound,
            CoreError::Integrity(_) => ErrorKind::IntegrityError,
            CoreError::Validation(_) => ErrorKind::ValidationError,
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., malformed email).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
