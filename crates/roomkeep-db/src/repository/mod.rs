//! # Repository Module
//!
//! The three stores behind the reservation engine.
//!
//! ## Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Repositories                                     │
//! │                                                                         │
//! │  ReservationCoordinator                                                │
//! │       │                                                                 │
//! │       │  free functions on an open transaction                         │
//! │       │  room::set_booked(&mut *tx, id, true, version)                 │
//! │       ▼                                                                 │
//! │  ┌────────────┐   ┌──────────────┐   ┌──────────────┐                  │
//! │  │  room.rs   │   │  booking.rs  │   │  payment.rs  │                  │
//! │  │ Room Store │   │ Booking      │   │ Payment      │                  │
//! │  │            │   │ Ledger       │   │ Recorder     │                  │
//! │  └────────────┘   └──────────────┘   └──────────────┘                  │
//! │       ▲                                                                 │
//! │       │  pool-backed structs for read paths and room admin             │
//! │       │  db.rooms().list_available()                                   │
//! │  CLI / seed                                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`RoomRepository`](room::RoomRepository) - Room registration and listings
//! - [`BookingRepository`](booking::BookingRepository) - Ledger lookups
//! - [`PaymentRepository`](payment::PaymentRepository) - Payment lookups

pub mod booking;
pub mod payment;
pub mod room;
