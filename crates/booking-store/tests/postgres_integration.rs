//! PostgreSQL integration tests
//!
//! These tests share one PostgreSQL container and reinstall the email
//! uniqueness index per test, so they run serially:
//!
//! ```bash
//! cargo test -p booking-store --test postgres_integration
//! ```

use std::sync::Arc;

use booking_store::{
    BookingStore, ConferenceId, EmailUniqueness, NewBooking, PostgresBookingStore, StoreError,
    StoreTransaction,
};
use serial_test::serial;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool, migrated schema and cleared tables
async fn get_test_store(uniqueness: EmailUniqueness) -> PostgresBookingStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    // Create the schema without any email index, clear it, then install the
    // index for this test's scope on the empty tables
    PostgresBookingStore::new(pool.clone(), EmailUniqueness::None)
        .run_migrations()
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE bookings, conferences RESTART IDENTITY")
        .execute(&pool)
        .await
        .unwrap();

    let store = PostgresBookingStore::new(pool, uniqueness);
    store.run_migrations().await.unwrap();
    store
}

fn new_booking(conference_id: ConferenceId, email: &str, tickets: u32) -> NewBooking {
    NewBooking {
        conference_id,
        first_name: "Ada".to_string(),
        last_name: "Lovelace".to_string(),
        email: email.to_string(),
        number_of_tickets: tickets,
    }
}

#[tokio::test]
#[serial]
async fn find_or_create_conference_is_idempotent() {
    let store = get_test_store(EmailUniqueness::Global).await;

    let (created, was_created) = store
        .find_or_create_conference("Go Conference", 50)
        .await
        .unwrap();
    assert!(was_created);
    assert_eq!(created.total_tickets, 50);
    assert_eq!(created.remaining_tickets, 50);

    let (found, was_created) = store
        .find_or_create_conference("Go Conference", 80)
        .await
        .unwrap();
    assert!(!was_created);
    assert_eq!(found.id, created.id);
    assert_eq!(found.total_tickets, 50);
}

#[tokio::test]
#[serial]
async fn committed_transaction_is_visible() {
    let store = get_test_store(EmailUniqueness::Global).await;
    let (conference, _) = store.find_or_create_conference("Conf", 10).await.unwrap();

    let mut tx = store.begin().await.unwrap();
    let locked = tx.lock_conference(conference.id).await.unwrap().unwrap();
    let booking = tx
        .insert_booking(new_booking(conference.id, "ada@x.com", 4))
        .await
        .unwrap();
    tx.set_remaining_tickets(conference.id, locked.remaining_tickets - 4)
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let conference = store.get_conference(conference.id).await.unwrap().unwrap();
    assert_eq!(conference.remaining_tickets, 6);

    let records = store.list_bookings().await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].booking.id, booking.id);
    assert_eq!(records[0].conference_name, "Conf");
}

#[tokio::test]
#[serial]
async fn rolled_back_transaction_leaves_no_trace() {
    let store = get_test_store(EmailUniqueness::Global).await;
    let (conference, _) = store.find_or_create_conference("Conf", 10).await.unwrap();

    let mut tx = store.begin().await.unwrap();
    tx.lock_conference(conference.id).await.unwrap();
    tx.insert_booking(new_booking(conference.id, "ada@x.com", 4))
        .await
        .unwrap();
    tx.set_remaining_tickets(conference.id, 6).await.unwrap();
    tx.rollback().await.unwrap();

    let conference = store.get_conference(conference.id).await.unwrap().unwrap();
    assert_eq!(conference.remaining_tickets, 10);
    assert!(store.list_bookings().await.unwrap().is_empty());
}

#[tokio::test]
#[serial]
async fn global_uniqueness_rejects_email_across_conferences() {
    let store = get_test_store(EmailUniqueness::Global).await;
    let (first, _) = store.find_or_create_conference("First", 10).await.unwrap();
    let (second, _) = store.find_or_create_conference("Second", 10).await.unwrap();

    let mut tx = store.begin().await.unwrap();
    tx.insert_booking(new_booking(first.id, "ada@x.com", 1))
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let mut tx = store.begin().await.unwrap();
    let err = tx
        .insert_booking(new_booking(second.id, "ada@x.com", 1))
        .await
        .unwrap_err();
    match err {
        StoreError::UniqueViolation { constraint } => {
            assert_eq!(constraint, "bookings_email_key");
        }
        other => panic!("expected unique violation, got {other:?}"),
    }
}

#[tokio::test]
#[serial]
async fn per_conference_uniqueness_allows_other_conferences() {
    let store = get_test_store(EmailUniqueness::PerConference).await;
    let (first, _) = store.find_or_create_conference("First", 10).await.unwrap();
    let (second, _) = store.find_or_create_conference("Second", 10).await.unwrap();

    let mut tx = store.begin().await.unwrap();
    tx.insert_booking(new_booking(first.id, "ada@x.com", 1))
        .await
        .unwrap();
    tx.insert_booking(new_booking(second.id, "ada@x.com", 1))
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let mut tx = store.begin().await.unwrap();
    let result = tx
        .insert_booking(new_booking(first.id, "ada@x.com", 1))
        .await;
    assert!(matches!(result, Err(StoreError::UniqueViolation { .. })));
}

#[tokio::test]
#[serial]
async fn no_uniqueness_accepts_repeated_email() {
    let store = get_test_store(EmailUniqueness::None).await;
    let (conference, _) = store.find_or_create_conference("Conf", 10).await.unwrap();

    let mut tx = store.begin().await.unwrap();
    tx.insert_booking(new_booking(conference.id, "ada@x.com", 1))
        .await
        .unwrap();
    tx.insert_booking(new_booking(conference.id, "ada@x.com", 1))
        .await
        .unwrap();
    tx.commit().await.unwrap();

    assert_eq!(store.list_bookings().await.unwrap().len(), 2);
}

#[tokio::test]
#[serial]
async fn booking_unknown_conference_is_rejected() {
    let store = get_test_store(EmailUniqueness::Global).await;

    let mut tx = store.begin().await.unwrap();
    assert!(
        tx.lock_conference(ConferenceId::new(404))
            .await
            .unwrap()
            .is_none()
    );
    let result = tx
        .insert_booking(new_booking(ConferenceId::new(404), "ada@x.com", 1))
        .await;
    assert!(matches!(result, Err(StoreError::ConferenceNotFound(_))));
}

#[tokio::test]
#[serial]
async fn check_constraint_rejects_overdrawn_inventory() {
    let store = get_test_store(EmailUniqueness::Global).await;
    let (conference, _) = store.find_or_create_conference("Conf", 10).await.unwrap();

    let mut tx = store.begin().await.unwrap();
    let result = tx.set_remaining_tickets(conference.id, 11).await;
    assert!(matches!(result, Err(StoreError::ConstraintViolation(_))));
}

#[tokio::test]
#[serial]
async fn row_lock_serializes_concurrent_transactions() {
    let store = get_test_store(EmailUniqueness::Global).await;
    let (conference, _) = store.find_or_create_conference("Conf", 5).await.unwrap();

    let mut first = store.begin().await.unwrap();
    let locked = first.lock_conference(conference.id).await.unwrap().unwrap();
    assert_eq!(locked.remaining_tickets, 5);

    let contender = {
        let store = store.clone();
        let id = conference.id;
        tokio::spawn(async move {
            let mut tx = store.begin().await.unwrap();
            let seen = tx.lock_conference(id).await.unwrap().unwrap();
            tx.rollback().await.unwrap();
            seen.remaining_tickets
        })
    };

    first
        .insert_booking(new_booking(conference.id, "ada@x.com", 3))
        .await
        .unwrap();
    first.set_remaining_tickets(conference.id, 2).await.unwrap();
    first.commit().await.unwrap();

    // The contender blocked on the row lock and observes the committed count
    assert_eq!(contender.await.unwrap(), 2);
}

#[tokio::test]
#[serial]
async fn bookings_for_conference_returns_insertion_order() {
    let store = get_test_store(EmailUniqueness::Global).await;
    let (conference, _) = store.find_or_create_conference("Conf", 10).await.unwrap();

    let mut tx = store.begin().await.unwrap();
    for (i, email) in ["a@x.com", "b@x.com", "c@x.com"].iter().enumerate() {
        tx.insert_booking(new_booking(conference.id, email, i as u32 + 1))
            .await
            .unwrap();
    }
    tx.commit().await.unwrap();

    let bookings = store.bookings_for_conference(conference.id).await.unwrap();
    let tickets: Vec<u32> = bookings.iter().map(|b| b.number_of_tickets).collect();
    assert_eq!(tickets, vec![1, 2, 3]);
}
