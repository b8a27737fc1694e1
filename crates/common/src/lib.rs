//! Shared identifier types for the ticket booking service.

pub mod ids;

pub use ids::{BookingId, ConferenceId};
