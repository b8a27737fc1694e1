//! Read-through cache of the booking history.

use std::sync::Arc;

use booking_store::BookingRecord;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct CacheState {
    /// Bumped on every invalidation so fills computed from an older read are discarded.
    generation: u64,
    records: Option<Arc<Vec<BookingRecord>>>,
}

/// Shared, never-authoritative copy of the booking list.
///
/// The store remains the source of truth. The coordinator invalidates the
/// cache after every committed booking and the read views refill it from
/// the store on the next miss.
#[derive(Debug, Clone, Default)]
pub struct BookingCache {
    state: Arc<RwLock<CacheState>>,
}

impl BookingCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached records, if present.
    pub async fn get(&self) -> Option<Arc<Vec<BookingRecord>>> {
        self.state.read().await.records.clone()
    }

    /// Current generation, to be passed back to [`BookingCache::fill`].
    pub async fn generation(&self) -> u64 {
        self.state.read().await.generation
    }

    /// Stores records loaded while the cache was at `generation`.
    ///
    /// Returns false, leaving the cache empty, if an invalidation happened
    /// since that generation was observed.
    pub async fn fill(&self, generation: u64, records: Arc<Vec<BookingRecord>>) -> bool {
        let mut state = self.state.write().await;
        if state.generation != generation {
            return false;
        }
        state.records = Some(records);
        true
    }

    /// Drops the cached records.
    pub async fn invalidate(&self) {
        let mut state = self.state.write().await;
        state.generation += 1;
        state.records = None;
    }
}
