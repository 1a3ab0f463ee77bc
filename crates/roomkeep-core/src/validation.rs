//! # Validation Module
//!
//! Input validation for reservation requests and room registration.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Request decoding (CLI / serde)                               │
//! │  └── Type validation                                                   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  └── Business rule validation, before any transaction is opened        │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  └── UNIQUE (room_number, request_token)                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::types::NewRoom;
use crate::{MAX_EMAIL_LENGTH, MAX_REQUEST_TOKEN_LENGTH};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a user email and returns it trimmed.
///
/// ## Rules
/// - Must not be empty
/// - At most 254 characters
/// - Exactly one `@` with a non-empty local part and a dotted domain
///
/// ## Example
/// ```rust
/// use roomkeep_core::validation::validate_email;
///
/// assert_eq!(validate_email(" a@x.com ").unwrap(), "a@x.com");
/// assert!(validate_email("").is_err());
/// assert!(validate_email("not-an-email").is_err());
/// ```
pub fn validate_email(email: &str) -> ValidationResult<String> {
    let email = email.trim();

    if email.is_empty() {
        return Err(ValidationError::Required {
            field: "user_email".to_string(),
        });
    }

    if email.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::TooLong {
            field: "user_email".to_string(),
            max: MAX_EMAIL_LENGTH,
        });
    }

    let invalid = |reason: &str| ValidationError::InvalidFormat {
        field: "user_email".to_string(),
        reason: reason.to_string(),
    };

    let (local, domain) = email
        .split_once('@')
        .ok_or_else(|| invalid("missing '@'"))?;

    if local.is_empty() || domain.contains('@') {
        return Err(invalid("must be of the form name@domain"));
    }

    if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
        return Err(invalid("domain must contain a dot"));
    }

    if email.chars().any(char::is_whitespace) {
        return Err(invalid("must not contain whitespace"));
    }

    Ok(email.to_string())
}

/// Validates an optional client request token and returns it trimmed.
///
/// A blank token is treated as absent.
pub fn validate_request_token(token: Option<&str>) -> ValidationResult<Option<String>> {
    let token = match token.map(str::trim) {
        None | Some("") => return Ok(None),
        Some(t) => t,
    };

    if token.len() > MAX_REQUEST_TOKEN_LENGTH {
        return Err(ValidationError::TooLong {
            field: "request_token".to_string(),
            max: MAX_REQUEST_TOKEN_LENGTH,
        });
    }

    Ok(Some(token.to_string()))
}

/// Validates a room type label.
pub fn validate_room_type(room_type: &str) -> ValidationResult<()> {
    let room_type = room_type.trim();

    if room_type.is_empty() {
        return Err(ValidationError::Required {
            field: "room_type".to_string(),
        });
    }

    if room_type.len() > 100 {
        return Err(ValidationError::TooLong {
            field: "room_type".to_string(),
            max: 100,
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a payment amount in cents.
///
/// ## Rules
/// - Must be positive (> 0)
///
/// ## Example
/// ```rust
/// use roomkeep_core::validation::validate_payment_amount;
///
/// assert!(validate_payment_amount(15000).is_ok());
/// assert!(validate_payment_amount(0).is_err());
/// assert!(validate_payment_amount(-100).is_err());
/// ```
pub fn validate_payment_amount(cents: i64) -> ValidationResult<()> {
    if cents <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "amount".to_string(),
        });
    }

    Ok(())
}

/// Validates a room number (must be positive).
pub fn validate_room_number(room_number: i64) -> ValidationResult<()> {
    if room_number <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "room_number".to_string(),
        });
    }

    Ok(())
}

/// Validates a room id (must be positive).
pub fn validate_room_id(room_id: i64) -> ValidationResult<()> {
    if room_id <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "room_id".to_string(),
        });
    }

    Ok(())
}

/// Validates a list price in cents. Zero is allowed.
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a rating on the 0–5 scale.
pub fn validate_rating(rating: Option<f64>) -> ValidationResult<()> {
    match rating {
        Some(r) if !(0.0..=5.0).contains(&r) => Err(ValidationError::OutOfRange {
            field: "rating".to_string(),
            min: 0,
            max: 5,
        }),
        _ => Ok(()),
    }
}

// =============================================================================
// Composite Validators
// =============================================================================

/// Validates all attributes of a room about to be registered.
pub fn validate_new_room(room: &NewRoom) -> ValidationResult<()> {
    validate_room_number(room.room_number)?;
    validate_room_type(&room.room_type)?;
    validate_price_cents(room.price_cents)?;
    validate_rating(room.rating)?;

    if room.location.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "location".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
