pub mod error;
pub mod memory;
pub mod model;
pub mod postgres;
pub mod store;

pub use common::{BookingId, ConferenceId};
pub use error::{Result, StoreError};
pub use memory::{InMemoryBookingStore, InMemoryTransaction};
pub use model::{Booking, BookingRecord, Conference, EmailUniqueness, NewBooking};
pub use postgres::{PostgresBookingStore, PostgresTransaction};
pub use store::{BookingStore, StoreTransaction};
