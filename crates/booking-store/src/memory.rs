use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use crate::{
    Booking, BookingId, BookingRecord, Conference, ConferenceId, EmailUniqueness, NewBooking,
    Result, StoreError,
    store::{BookingStore, StoreTransaction},
};

#[derive(Debug, Default)]
struct MemoryState {
    conferences: BTreeMap<ConferenceId, Conference>,
    /// Committed bookings in commit order.
    bookings: Vec<Booking>,
    next_conference_id: i64,
    next_booking_id: i64,
}

impl MemoryState {
    fn find_conflict(&self, scope: EmailUniqueness, candidate: &NewBooking) -> bool {
        self.bookings
            .iter()
            .any(|existing| scope.conflicts(existing, candidate))
    }
}

#[derive(Debug, Default)]
struct Faults {
    unavailable: AtomicBool,
    fail_next_commit: AtomicBool,
    commit_delay_ms: AtomicU64,
}

/// In-memory booking store.
///
/// Serves as the default backend when no database is configured and as the
/// store under test. Each conference has its own async mutex, held by a
/// transaction from `lock_conference` until commit or drop, so bookings
/// for one conference are serialized while other conferences proceed.
#[derive(Clone, Default)]
pub struct InMemoryBookingStore {
    state: Arc<RwLock<MemoryState>>,
    locks: Arc<Mutex<HashMap<ConferenceId, Arc<Mutex<()>>>>>,
    uniqueness: EmailUniqueness,
    faults: Arc<Faults>,
}

impl InMemoryBookingStore {
    /// Creates an empty store enforcing globally unique emails.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store enforcing the given email uniqueness scope.
    pub fn with_uniqueness(uniqueness: EmailUniqueness) -> Self {
        Self {
            uniqueness,
            ..Self::default()
        }
    }

    /// Returns the number of committed bookings.
    pub async fn booking_count(&self) -> usize {
        self.state.read().await.bookings.len()
    }

    /// Makes every subsequent call fail as if the store were unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.faults.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Makes the next commit fail after all of its writes were staged.
    pub fn fail_next_commit(&self) {
        self.faults.fail_next_commit.store(true, Ordering::SeqCst);
    }

    /// Makes every commit take at least `delay` before its writes are applied.
    pub fn set_commit_delay(&self, delay: Duration) {
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.faults.commit_delay_ms.store(millis, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<()> {
        if self.faults.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(
                "in-memory store marked unavailable".to_string(),
            ));
        }
        Ok(())
    }

    /// Lock for an existing conference. Conferences are never deleted, so
    /// the map holds at most one entry per conference ever created.
    async fn conference_lock(&self, id: ConferenceId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks.entry(id).or_default().clone()
    }
}

#[async_trait]
impl BookingStore for InMemoryBookingStore {
    type Transaction = InMemoryTransaction;

    fn uniqueness(&self) -> EmailUniqueness {
        self.uniqueness
    }

    async fn begin(&self) -> Result<InMemoryTransaction> {
        self.check_available()?;
        Ok(InMemoryTransaction {
            store: self.clone(),
            held: HashMap::new(),
            bookings: Vec::new(),
            remaining: HashMap::new(),
        })
    }

    async fn get_conference(&self, id: ConferenceId) -> Result<Option<Conference>> {
        self.check_available()?;
        Ok(self.state.read().await.conferences.get(&id).cloned())
    }

    async fn find_conference_by_name(&self, name: &str) -> Result<Option<Conference>> {
        self.check_available()?;
        let state = self.state.read().await;
        Ok(state
            .conferences
            .values()
            .find(|c| c.name == name)
            .cloned())
    }

    async fn find_or_create_conference(
        &self,
        name: &str,
        total_tickets: u32,
    ) -> Result<(Conference, bool)> {
        self.check_available()?;
        let mut state = self.state.write().await;

        if let Some(existing) = state.conferences.values().find(|c| c.name == name) {
            return Ok((existing.clone(), false));
        }

        state.next_conference_id += 1;
        let conference = Conference {
            id: ConferenceId::new(state.next_conference_id),
            name: name.to_string(),
            total_tickets,
            remaining_tickets: total_tickets,
            created_at: Utc::now(),
        };
        state.conferences.insert(conference.id, conference.clone());
        Ok((conference, true))
    }

    async fn list_bookings(&self) -> Result<Vec<BookingRecord>> {
        self.check_available()?;
        let state = self.state.read().await;
        state
            .bookings
            .iter()
            .map(|booking| {
                let conference = state
                    .conferences
                    .get(&booking.conference_id)
                    .ok_or(StoreError::ConferenceNotFound(booking.conference_id))?;
                Ok(BookingRecord::new(booking.clone(), conference.name.clone()))
            })
            .collect()
    }

    async fn bookings_for_conference(&self, id: ConferenceId) -> Result<Vec<Booking>> {
        self.check_available()?;
        let state = self.state.read().await;
        Ok(state
            .bookings
            .iter()
            .filter(|b| b.conference_id == id)
            .cloned()
            .collect())
    }
}

/// Transaction over an [`InMemoryBookingStore`].
///
/// Writes are staged locally and applied under the store's write lock on
/// commit, where email uniqueness is checked again against everything
/// committed in the meantime.
pub struct InMemoryTransaction {
    store: InMemoryBookingStore,
    held: HashMap<ConferenceId, OwnedMutexGuard<()>>,
    bookings: Vec<Booking>,
    remaining: HashMap<ConferenceId, u32>,
}

impl InMemoryTransaction {
    fn staged_conflict(&self, scope: EmailUniqueness, candidate: &NewBooking) -> bool {
        self.bookings
            .iter()
            .any(|existing| scope.conflicts(existing, candidate))
    }

    fn unique_violation(scope: EmailUniqueness) -> StoreError {
        StoreError::UniqueViolation {
            constraint: scope.constraint_name().unwrap_or("unknown").to_string(),
        }
    }
}

#[async_trait]
impl StoreTransaction for InMemoryTransaction {
    async fn lock_conference(&mut self, id: ConferenceId) -> Result<Option<Conference>> {
        self.store.check_available()?;

        if !self.held.contains_key(&id) {
            if !self.store.state.read().await.conferences.contains_key(&id) {
                return Ok(None);
            }
            let lock = self.store.conference_lock(id).await;
            let guard = lock.lock_owned().await;
            self.held.insert(id, guard);
        }

        let state = self.store.state.read().await;
        Ok(state.conferences.get(&id).map(|conference| {
            let mut conference = conference.clone();
            if let Some(remaining) = self.remaining.get(&id) {
                conference.remaining_tickets = *remaining;
            }
            conference
        }))
    }

    async fn insert_booking(&mut self, booking: NewBooking) -> Result<Booking> {
        self.store.check_available()?;
        let scope = self.store.uniqueness;

        let mut state = self.store.state.write().await;
        if !state.conferences.contains_key(&booking.conference_id) {
            return Err(StoreError::ConferenceNotFound(booking.conference_id));
        }
        if booking.number_of_tickets == 0 {
            return Err(StoreError::ConstraintViolation(
                "number_of_tickets must be positive".to_string(),
            ));
        }
        if state.find_conflict(scope, &booking) || self.staged_conflict(scope, &booking) {
            return Err(Self::unique_violation(scope));
        }

        state.next_booking_id += 1;
        let stored = Booking {
            id: BookingId::new(state.next_booking_id),
            conference_id: booking.conference_id,
            first_name: booking.first_name,
            last_name: booking.last_name,
            email: booking.email,
            number_of_tickets: booking.number_of_tickets,
            created_at: Utc::now(),
        };
        self.bookings.push(stored.clone());
        Ok(stored)
    }

    async fn set_remaining_tickets(&mut self, id: ConferenceId, remaining: u32) -> Result<()> {
        self.store.check_available()?;

        let state = self.store.state.read().await;
        let conference = state
            .conferences
            .get(&id)
            .ok_or(StoreError::ConferenceNotFound(id))?;
        if remaining > conference.total_tickets {
            return Err(StoreError::ConstraintViolation(format!(
                "remaining tickets {remaining} exceed total {}",
                conference.total_tickets
            )));
        }

        self.remaining.insert(id, remaining);
        Ok(())
    }

    async fn commit(self) -> Result<()> {
        self.store.check_available()?;
        if self
            .store
            .faults
            .fail_next_commit
            .swap(false, Ordering::SeqCst)
        {
            return Err(StoreError::CommitFailed(
                "injected commit failure".to_string(),
            ));
        }

        let delay = self.store.faults.commit_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        let scope = self.store.uniqueness;
        let mut state = self.store.state.write().await;

        for booking in &self.bookings {
            let candidate = NewBooking {
                conference_id: booking.conference_id,
                first_name: booking.first_name.clone(),
                last_name: booking.last_name.clone(),
                email: booking.email.clone(),
                number_of_tickets: booking.number_of_tickets,
            };
            if state.find_conflict(scope, &candidate) {
                return Err(Self::unique_violation(scope));
            }
        }

        for (id, remaining) in &self.remaining {
            if let Some(conference) = state.conferences.get_mut(id) {
                conference.remaining_tickets = *remaining;
            }
        }
        state.bookings.extend(self.bookings);

        tracing::trace!(conferences = self.held.len(), "in-memory transaction committed");
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        Ok(())
    }
}
