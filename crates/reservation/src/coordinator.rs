//! Reservation coordinator: the atomic check-insert-decrement booking protocol.

use std::time::{Duration, Instant};

use booking_store::{
    Booking, BookingRecord, BookingStore, Conference, NewBooking, StoreError, StoreTransaction,
};
use common::ConferenceId;

use crate::cache::BookingCache;
use crate::error::{BookingError, Field, Result};
use crate::validator::{DEFAULT_MIN_NAME_LENGTH, Validator, is_valid_email};

/// Default upper bound on one booking transaction.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

/// A request to book tickets for one conference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingRequest {
    pub conference_id: ConferenceId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub ticket_count: u32,
}

impl BookingRequest {
    /// Creates a booking request, trimming surrounding whitespace from the text fields.
    pub fn new(
        conference_id: ConferenceId,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        email: impl Into<String>,
        ticket_count: u32,
    ) -> Self {
        Self {
            conference_id,
            first_name: first_name.into().trim().to_string(),
            last_name: last_name.into().trim().to_string(),
            email: email.into().trim().to_string(),
            ticket_count,
        }
    }

    fn to_new_booking(&self) -> NewBooking {
        NewBooking {
            conference_id: self.conference_id,
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            email: self.email.clone(),
            number_of_tickets: self.ticket_count,
        }
    }
}

/// Tunables for the reservation coordinator.
#[derive(Debug, Clone, Copy)]
pub struct CoordinatorConfig {
    pub min_name_length: usize,
    /// Bound on the whole store transaction; expiry surfaces as `StoreUnavailable`.
    pub store_timeout: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            min_name_length: DEFAULT_MIN_NAME_LENGTH,
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }
}

/// Books tickets atomically against the store.
///
/// Each call locks the conference inside a store transaction, re-checks
/// availability on the freshly loaded row, records the booking and
/// decrements inventory, then commits. Any failure rolls back every write
/// of the call. Calls for the same conference are serialized by the
/// store's conference lock; calls for different conferences run in parallel.
pub struct ReservationCoordinator<S: BookingStore> {
    store: S,
    cache: BookingCache,
    validator: Validator,
    store_timeout: Duration,
}

impl<S: BookingStore> ReservationCoordinator<S> {
    /// Creates a coordinator with default configuration.
    pub fn new(store: S, cache: BookingCache) -> Self {
        Self::with_config(store, cache, CoordinatorConfig::default())
    }

    pub fn with_config(store: S, cache: BookingCache, config: CoordinatorConfig) -> Self {
        Self {
            store,
            cache,
            validator: Validator::new(config.min_name_length),
            store_timeout: config.store_timeout,
        }
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    /// Books `ticket_count` tickets for the requester.
    ///
    /// On success the committed booking is returned joined with its
    /// conference name and the shared booking cache is invalidated.
    #[tracing::instrument(
        skip(self, request),
        fields(conference_id = %request.conference_id, tickets = request.ticket_count)
    )]
    pub async fn book(&self, request: BookingRequest) -> Result<BookingRecord> {
        let started = Instant::now();
        let result = self.try_book(&request).await;

        match &result {
            Ok(record) => {
                metrics::counter!("bookings_total").increment(1);
                metrics::counter!("tickets_booked_total")
                    .increment(u64::from(record.booking.number_of_tickets));
                tracing::info!(
                    booking_id = %record.booking.id,
                    "booking committed"
                );
            }
            Err(e) => {
                metrics::counter!("booking_failures_total", "reason" => e.reason()).increment(1);
                tracing::info!(reason = e.reason(), error = %e, "booking rejected");
            }
        }
        metrics::histogram!("booking_duration_seconds").record(started.elapsed().as_secs_f64());

        result
    }

    async fn try_book(&self, request: &BookingRequest) -> Result<BookingRecord> {
        self.check_request(request)?;

        // Only staging is bounded: a COMMIT once sent runs to completion
        let (tx, conference, booking) =
            tokio::time::timeout(self.store_timeout, self.stage(request))
                .await
                .map_err(|_| {
                    BookingError::StoreUnavailable(format!(
                        "booking transaction timed out after {:?}",
                        self.store_timeout
                    ))
                })??;

        Self::commit_staged(tx, request).await?;

        self.cache.invalidate().await;
        Ok(BookingRecord::new(booking, conference.name))
    }

    /// Checks the request fields that do not depend on inventory: name
    /// length, email shape and a non-zero ticket count.
    pub fn check_request(&self, request: &BookingRequest) -> Result<()> {
        if !self.validator.is_valid_name(&request.first_name)
            || !self.validator.is_valid_name(&request.last_name)
        {
            return Err(BookingError::ValidationFailed { field: Field::Name });
        }
        if !is_valid_email(&request.email) {
            return Err(BookingError::ValidationFailed {
                field: Field::Email,
            });
        }
        if request.ticket_count == 0 {
            return Err(BookingError::ValidationFailed {
                field: Field::Tickets,
            });
        }
        Ok(())
    }

    /// Opens a transaction and locks, checks, inserts and decrements, rolling
    /// back on failure.
    ///
    /// Dropping the returned future before it completes drops the
    /// transaction, which discards its writes.
    async fn stage(
        &self,
        request: &BookingRequest,
    ) -> Result<(S::Transaction, Conference, Booking)> {
        let mut tx = self.store.begin().await?;

        match Self::apply(&mut tx, request).await {
            Ok((conference, booking)) => Ok((tx, conference, booking)),
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::warn!(error = %rollback_err, "rollback failed");
                }
                Err(e)
            }
        }
    }

    async fn commit_staged(tx: S::Transaction, request: &BookingRequest) -> Result<()> {
        tx.commit().await.map_err(|e| match e {
            // Deferred uniqueness checks surface at commit
            StoreError::UniqueViolation { .. } => BookingError::DuplicateBooking {
                email: request.email.clone(),
            },
            StoreError::Unavailable(msg) | StoreError::CommitFailed(msg) => {
                BookingError::TransactionAborted(msg)
            }
            other => BookingError::TransactionAborted(other.to_string()),
        })
    }

    /// Steps 1-4 of the protocol inside an open transaction.
    async fn apply(
        tx: &mut S::Transaction,
        request: &BookingRequest,
    ) -> Result<(Conference, Booking)> {
        let conference = tx
            .lock_conference(request.conference_id)
            .await?
            .ok_or(BookingError::ConferenceNotFound(request.conference_id))?;

        let remaining = conference
            .remaining_tickets
            .checked_sub(request.ticket_count)
            .ok_or(BookingError::InsufficientTickets {
                requested: request.ticket_count,
                remaining: conference.remaining_tickets,
            })?;

        let booking = tx
            .insert_booking(request.to_new_booking())
            .await
            .map_err(|e| match e {
                StoreError::UniqueViolation { .. } => BookingError::DuplicateBooking {
                    email: request.email.clone(),
                },
                other => BookingError::from(other),
            })?;

        tx.set_remaining_tickets(conference.id, remaining).await?;

        tracing::debug!(
            booking_id = %booking.id,
            remaining,
            "booking staged"
        );
        Ok((conference, booking))
    }
}
