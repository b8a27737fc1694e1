//! Booking core for the conference ticket service.
//!
//! This crate provides:
//! - [`Validator`] for well-formedness and availability checks on requests
//! - [`ReservationCoordinator`] for the atomic, oversell-free booking operation
//! - [`ReadViews`] for conference state and booking history, backed by a
//!   read-through [`BookingCache`]
//! - [`ensure_conference`] for find-or-create of the seeded conference

pub mod bootstrap;
pub mod cache;
pub mod coordinator;
pub mod error;
pub mod validator;
pub mod views;

pub use bootstrap::ensure_conference;
pub use cache::BookingCache;
pub use coordinator::{BookingRequest, CoordinatorConfig, ReservationCoordinator};
pub use error::{BookingError, Field, Result};
pub use validator::{DEFAULT_MIN_NAME_LENGTH, Validation, Validator, validate};
pub use views::ReadViews;
