//! Startup seeding of the bookable conference.

use booking_store::{BookingStore, Conference};

use crate::error::Result;

/// Finds the conference called `name`, creating it with `total_tickets` if absent.
///
/// An existing conference is returned untouched: its remaining count is
/// whatever earlier bookings left, never reset to full capacity.
#[tracing::instrument(skip(store))]
pub async fn ensure_conference<S: BookingStore>(
    store: &S,
    name: &str,
    total_tickets: u32,
) -> Result<Conference> {
    let (conference, created) = store
        .find_or_create_conference(name, total_tickets)
        .await?;

    if created {
        tracing::info!(
            conference_id = %conference.id,
            total_tickets = conference.total_tickets,
            "created conference"
        );
    } else {
        tracing::info!(
            conference_id = %conference.id,
            remaining_tickets = conference.remaining_tickets,
            "found existing conference"
        );
    }

    Ok(conference)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BookingCache, BookingRequest, ReservationCoordinator};
    use booking_store::InMemoryBookingStore;

    #[tokio::test]
    async fn restart_keeps_remaining_inventory() {
        let store = InMemoryBookingStore::new();
        let conference = ensure_conference(&store, "Go Conference", 50)
            .await
            .unwrap();

        let coordinator = ReservationCoordinator::new(store.clone(), BookingCache::new());
        coordinator
            .book(BookingRequest::new(
                conference.id,
                "Ada",
                "Lovelace",
                "ada@x.com",
                5,
            ))
            .await
            .unwrap();

        // Second startup against the same store
        let again = ensure_conference(&store, "Go Conference", 50)
            .await
            .unwrap();
        assert_eq!(again.id, conference.id);
        assert_eq!(again.remaining_tickets, 45);
    }
}
