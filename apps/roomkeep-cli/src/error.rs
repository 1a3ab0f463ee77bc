//! # API Error Type
//!
//! Unified error type for CLI commands.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Roomkeep                               │
//! │                                                                         │
//! │  roomkeep process-payment --room-id 1 --email a@x.com --amount 0       │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  Command Function                                                │  │
//! │  │  Result<T, ApiError>                                             │  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  ReservationError::Validation ──────────┐                        │  │
//! │  │  DbError::UniqueViolation ──────────────┼──► ApiError ──────────►│  │
//! │  │  ConfigError::InvalidValue ─────────────┘                        │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  stderr: {"code":"VALIDATION_ERROR","message":"amount must be ..."}    │
//! │  exit status: per code (see ErrorCode::exit_code)                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;

use crate::config::ConfigError;
use roomkeep_core::{ErrorKind, ValidationError};
use roomkeep_db::{DbError, ReservationError};

/// API error returned from CLI commands.
///
/// ## Serialization
/// ```json
/// {
///   "code": "NOT_FOUND",
///   "message": "Room not found: 42"
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Malformed input
    ValidationError,

    /// Room or booking does not exist
    NotFound,

    /// Lost the race for a room, or a duplicate room number
    Conflict,

    /// Ledger and room store disagree
    IntegrityError,

    /// The database failed; nothing was written
    StorageFailure,

    /// Bad environment configuration
    ConfigError,

    /// Anything else
    Internal,
}

impl ErrorCode {
    /// Process exit status for this code.
    pub const fn exit_code(&self) -> u8 {
        match self {
            ErrorCode::Internal => 1,
            ErrorCode::ValidationError => 2,
            ErrorCode::NotFound => 3,
            ErrorCode::Conflict => 4,
            ErrorCode::IntegrityError => 5,
            ErrorCode::StorageFailure => 6,
            ErrorCode::ConfigError => 7,
        }
    }
}

impl From<ErrorKind> for ErrorCode {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::ValidationError => ErrorCode::ValidationError,
            ErrorKind::NotFound => ErrorCode::NotFound,
            ErrorKind::Conflict => ErrorCode::Conflict,
            ErrorKind::IntegrityError => ErrorCode::IntegrityError,
            ErrorKind::StorageFailure => ErrorCode::StorageFailure,
        }
    }
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }

    /// Serializes the error for printing.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            r#"{"code":"INTERNAL","message":"error could not be serialized"}"#.to_string()
        })
    }
}

/// Converts coordinator errors to API errors.
impl From<ReservationError> for ApiError {
    fn from(err: ReservationError) -> Self {
        let code = ErrorCode::from(err.kind());
        match err {
            ReservationError::Storage(e) => {
                // Log the actual error but return a generic message
                tracing::error!(error = %e, "Reservation storage failure");
                ApiError::new(code, "Database operation failed; nothing was written")
            }
            other => ApiError::new(code, other.to_string()),
        }
    }
}

/// Converts database errors to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => {
                ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", entity, id))
            }
            DbError::UniqueViolation { field, value } => ApiError::new(
                ErrorCode::Conflict,
                format!("{} '{}' already exists", field, value),
            ),
            DbError::Validation(e) => ApiError::validation(e.to_string()),
            conflict @ (DbError::VersionConflict { .. } | DbError::Busy(_)) => {
                ApiError::new(ErrorCode::Conflict, conflict.to_string())
            }
            DbError::ConnectionFailed(e) => {
                tracing::error!("Database connection failed: {}", e);
                ApiError::new(ErrorCode::StorageFailure, "Database connection failed")
            }
            DbError::MigrationFailed(e) => {
                tracing::error!("Database migration failed: {}", e);
                ApiError::new(ErrorCode::StorageFailure, "Database migration failed")
            }
            DbError::ForeignKeyViolation { message } => {
                tracing::error!("Foreign key violation: {}", message);
                ApiError::new(ErrorCode::IntegrityError, "Invalid reference")
            }
            DbError::PoolExhausted => {
                ApiError::new(ErrorCode::StorageFailure, "Database pool exhausted")
            }
            DbError::QueryFailed(e) | DbError::TransactionFailed(e) | DbError::Internal(e) => {
                tracing::error!("Database operation failed: {}", e);
                ApiError::new(ErrorCode::StorageFailure, "Database operation failed")
            }
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::validation(err.to_string())
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        ApiError::new(ErrorCode::ConfigError, err.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::internal(format!("Could not serialize response: {}", err))
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reservation_errors_keep_their_kind() {
        let err = ApiError::from(ReservationError::Conflict { attempts: 5 });
        assert_eq!(err.code, ErrorCode::Conflict);

        let err = ApiError::from(ReservationError::Integrity("booking b-1 references missing room 1".into()));
        assert_eq!(err.code, ErrorCode::IntegrityError);
        assert!(err.message.contains("missing room"));

        let err = ApiError::from(ReservationError::Storage(DbError::QueryFailed("disk I/O error".into())));
        assert_eq!(err.code, ErrorCode::StorageFailure);
        assert!(!err.message.contains("disk"));
    }

    #[test]
    fn test_duplicate_room_is_conflict() {
        let err = ApiError::from(DbError::duplicate("room_number", "101"));
        assert_eq!(err.code, ErrorCode::Conflict);
        assert_eq!(err.message, "room_number '101' already exists");
    }

    #[test]
    fn test_json_shape() {
        let err = ApiError::new(ErrorCode::NotFound, "Room not found: 42");
        let json: serde_json::Value = serde_json::from_str(&err.to_json()).unwrap();
        assert_eq!(json["code"], "NOT_FOUND");
        assert_eq!(json["message"], "Room not found: 42");
        assert_eq!(ErrorCode::NotFound.exit_code(), 3);
    }
}
