//! # roomkeep-db: Database Layer and Reservation Engine
//!
//! This crate owns persistence for Roomkeep: SQLite via sqlx, the room,
//! booking and payment stores, and the coordinator that moves them together
//! inside one transaction.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Roomkeep Data Flow                               │
//! │                                                                         │
//! │  CLI command (process-payment)                                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   roomkeep-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │  Coordinator  │───►│  Repositories │    │  Migrations  │  │   │
//! │  │   │  retry + tx   │    │  room         │    │  (embedded)  │  │   │
//! │  │   └───────┬───────┘    │  booking      │    │ 001_init.sql │  │   │
//! │  │           │            │  payment      │    └──────────────┘  │   │
//! │  │           ▼            └───────────────┘                       │   │
//! │  │   ┌───────────────┐                                            │   │
//! │  │   │   Database    │                                            │   │
//! │  │   │   (pool.rs)   │                                            │   │
//! │  │   └───────────────┘                                            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (WAL)                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Room, booking and payment stores
//! - [`coordinator`] - ProcessPayment / CancelBooking transactions
//!
//! ## Usage
//!
//! ```rust,ignore
//! use roomkeep_db::{Database, DbConfig};
//! use roomkeep_core::ProcessPaymentRequest;
//!
//! let db = Database::new(DbConfig::new("path/to/roomkeep.db")).await?;
//!
//! let response = db
//!     .reservations()
//!     .process_payment(&ProcessPaymentRequest {
//!         room_id: 1,
//!         user_email: "a@x.com".into(),
//!         amount_cents: 15000,
//!         request_token: None,
//!     })
//!     .await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod coordinator;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use coordinator::{ReservationCoordinator, ReservationError, RetryPolicy};
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::booking::BookingRepository;
pub use repository::payment::PaymentRepository;
pub use repository::room::RoomRepository;
