//! Read-only queries over conferences and bookings.

use std::sync::Arc;

use booking_store::{Booking, BookingRecord, BookingStore, Conference};
use common::ConferenceId;

use crate::cache::BookingCache;
use crate::error::{BookingError, Result};

/// Query side of the booking service.
///
/// Never mutates persisted state. Results may lag behind bookings that are
/// committing concurrently.
pub struct ReadViews<S: BookingStore> {
    store: S,
    cache: BookingCache,
}

impl<S: BookingStore> ReadViews<S> {
    /// Creates read views sharing `cache` with the coordinator that invalidates it.
    pub fn new(store: S, cache: BookingCache) -> Self {
        Self { store, cache }
    }

    /// Returns the current state of a conference.
    #[tracing::instrument(skip(self))]
    pub async fn get_conference(&self, id: ConferenceId) -> Result<Conference> {
        self.store
            .get_conference(id)
            .await?
            .ok_or(BookingError::ConferenceNotFound(id))
    }

    /// Returns every booking joined with its conference, in insertion order.
    #[tracing::instrument(skip(self))]
    pub async fn list_bookings(&self) -> Result<Vec<BookingRecord>> {
        if let Some(records) = self.cache.get().await {
            metrics::counter!("booking_cache_hits_total").increment(1);
            return Ok(records.as_ref().clone());
        }

        let generation = self.cache.generation().await;
        let records = Arc::new(self.store.list_bookings().await?);
        if !self.cache.fill(generation, records.clone()).await {
            tracing::debug!("booking list changed while loading, not cached");
        }
        Ok(records.as_ref().clone())
    }

    /// Returns the bookings of a single conference, in insertion order.
    #[tracing::instrument(skip(self))]
    pub async fn conference_bookings(&self, id: ConferenceId) -> Result<Vec<Booking>> {
        if self.store.get_conference(id).await?.is_none() {
            return Err(BookingError::ConferenceNotFound(id));
        }
        Ok(self.store.bookings_for_conference(id).await?)
    }
}
