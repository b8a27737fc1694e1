use async_trait::async_trait;

use crate::{
    Booking, BookingRecord, Conference, ConferenceId, EmailUniqueness, NewBooking, Result,
};

/// Durable record of conferences and the bookings made against them.
///
/// Reads go straight to the store and may be stale relative to in-flight
/// transactions. Writes to inventory and the ledger happen only through a
/// [`StoreTransaction`] obtained from [`BookingStore::begin`].
#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Transaction handle returned by [`BookingStore::begin`].
    type Transaction: StoreTransaction;

    /// The email uniqueness scope this store enforces.
    fn uniqueness(&self) -> EmailUniqueness;

    /// Starts a new transaction.
    async fn begin(&self) -> Result<Self::Transaction>;

    /// Looks up a conference by ID.
    async fn get_conference(&self, id: ConferenceId) -> Result<Option<Conference>>;

    /// Looks up a conference by its unique name.
    async fn find_conference_by_name(&self, name: &str) -> Result<Option<Conference>>;

    /// Returns the conference with `name`, creating it with `total_tickets`
    /// available if it does not exist yet.
    ///
    /// The flag is true when the conference was created by this call. An
    /// existing conference keeps its persisted remaining count.
    async fn find_or_create_conference(
        &self,
        name: &str,
        total_tickets: u32,
    ) -> Result<(Conference, bool)>;

    /// Returns every committed booking joined with its conference, in insertion order.
    async fn list_bookings(&self) -> Result<Vec<BookingRecord>>;

    /// Returns the committed bookings of one conference, in insertion order.
    async fn bookings_for_conference(&self, id: ConferenceId) -> Result<Vec<Booking>>;
}

/// An open store transaction.
///
/// Nothing written through a transaction is visible to other readers until
/// [`StoreTransaction::commit`] succeeds. Dropping a transaction without
/// committing discards its writes.
#[async_trait]
pub trait StoreTransaction: Send {
    /// Loads a conference and holds it exclusively until the transaction ends.
    ///
    /// Concurrent transactions locking the same conference wait for each
    /// other; different conferences do not block one another.
    async fn lock_conference(&mut self, id: ConferenceId) -> Result<Option<Conference>>;

    /// Inserts a booking, enforcing the store's email uniqueness scope.
    async fn insert_booking(&mut self, booking: NewBooking) -> Result<Booking>;

    /// Overwrites the remaining ticket count of a conference.
    async fn set_remaining_tickets(&mut self, id: ConferenceId, remaining: u32) -> Result<()>;

    /// Makes every write of this transaction visible atomically.
    async fn commit(self) -> Result<()>;

    /// Discards every write of this transaction.
    async fn rollback(self) -> Result<()>;
}
