//! # roomkeep-core: Pure Reservation Logic
//!
//! This crate holds the business rules of the room reservation engine as
//! pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Roomkeep Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    roomkeep CLI (apps/)                         │   │
//! │  │        process-payment, cancel-booking, bookings, rooms         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ roomkeep-core (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌─────────────┐  ┌──────────┐  │   │
//! │  │   │   types   │  │   money   │  │ reservation │  │validation│  │   │
//! │  │   │   Room    │  │   Money   │  │ plan_reserve│  │  rules   │  │   │
//! │  │   │  Booking  │  │           │  │ plan_cancel │  │  checks  │  │   │
//! │  │   └───────────┘  └───────────┘  └─────────────┘  └──────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 roomkeep-db (Database Layer)                    │   │
//! │  │     SQLite repositories, transactions, ReservationCoordinator   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Room, Booking, PaymentRecord, DTOs)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`error`] - Domain error types and the [`ErrorKind`] taxonomy
//! - [`validation`] - Input validation
//! - [`reservation`] - Reserve / cancel transition planning
//!
//! ## Example Usage
//!
//! ```rust
//! use roomkeep_core::money::Money;
//! use roomkeep_core::validation::validate_payment_amount;
//!
//! let amount = Money::from_major_minor(150, 0); // $150.00
//! assert!(validate_payment_amount(amount.cents()).is_ok());
//! assert!(validate_payment_amount(0).is_err());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod reservation;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ErrorKind, ValidationError};
pub use money::Money;
pub use reservation::{plan_cancel, plan_reserve, CancelPlan, ReservePlan, RoomState};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum accepted length of a user email.
///
/// Matches the practical limit of an SMTP forward path.
pub const MAX_EMAIL_LENGTH: usize = 254;

/// Maximum accepted length of a client request token.
pub const MAX_REQUEST_TOKEN_LENGTH: usize = 128;
