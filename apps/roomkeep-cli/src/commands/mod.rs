//! # CLI Commands Module
//!
//! Every subcommand of the `roomkeep` binary.
//!
//! ## Command Organization
//! ```text
//! commands/
//! ├── mod.rs          ◄─── You are here (exports)
//! ├── reservation.rs  ◄─── process-payment, cancel-booking, bookings
//! └── room.rs         ◄─── rooms, add-room, health
//! ```
//!
//! ## How Commands Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Command Flow                                         │
//! │                                                                         │
//! │  $ roomkeep cancel-booking --room-number 101 --email b@y.com           │
//! │         │                                                               │
//! │         │ (clap)                                                        │
//! │         ▼                                                               │
//! │  async fn cancel_booking(                                               │
//! │      db: &Database,             ◄── opened once per process            │
//! │      policy: RetryPolicy,       ◄── from AppConfig                     │
//! │      request: CancelBookingRequest,                                     │
//! │  ) -> Result<CancelBookingResponse, ApiError>                           │
//! │         │                                                               │
//! │         │ (JSON serialization)                                          │
//! │         ▼                                                               │
//! │  stdout: {"bookingId": "...", "status": "canceled", "changed": true}   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod reservation;
pub mod room;
