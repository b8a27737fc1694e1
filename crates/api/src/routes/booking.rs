//! Booking and conference endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use booking_store::{BookingRecord, BookingStore, Conference};
use common::ConferenceId;
use notify::{Notification, NotificationSink};
use reservation::{BookingRequest, ReadViews, ReservationCoordinator};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S: BookingStore> {
    pub coordinator: ReservationCoordinator<S>,
    pub views: ReadViews<S>,
    pub sink: NotificationSink,
    /// Conference seeded at startup; every booking targets it.
    pub conference_id: ConferenceId,
}

// -- Request types --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub tickets: u32,
}

// -- Response types --

#[derive(Serialize)]
pub struct BookResponse {
    pub message: String,
    pub booking: BookingRecord,
}

// -- Handlers --

/// POST /api/book: book tickets for the seeded conference.
///
/// Field checks run before any store access. The ticket count is then
/// checked against the conference as currently loaded; the coordinator
/// re-checks availability under the conference lock.
#[tracing::instrument(skip(state, payload))]
pub async fn book<S: BookingStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    payload: Result<Json<BookRequest>, JsonRejection>,
) -> Result<Json<BookResponse>, ApiError> {
    let Json(req) = payload.map_err(|e| {
        tracing::debug!(error = %e, "rejected booking payload");
        ApiError::BadRequest("Invalid JSON".to_string())
    })?;
    let request = BookingRequest::new(
        state.conference_id,
        req.first_name,
        req.last_name,
        req.email,
        req.tickets,
    );

    state.coordinator.check_request(&request)?;

    let conference = state.views.get_conference(state.conference_id).await?;
    state
        .coordinator
        .validator()
        .validate(
            &request.first_name,
            &request.last_name,
            &request.email,
            request.ticket_count,
            conference.remaining_tickets,
        )
        .into_result()?;

    let record = state.coordinator.book(request).await?;
    state.sink.notify(Notification::for_booking(&record));

    Ok(Json(BookResponse {
        message: confirmation_message(&record),
        booking: record,
    }))
}

/// GET /api/bookings: every booking joined with its conference, oldest first.
#[tracing::instrument(skip(state))]
pub async fn list<S: BookingStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<BookingRecord>>, ApiError> {
    Ok(Json(state.views.list_bookings().await?))
}

/// GET /api/conference: current state of the seeded conference.
#[tracing::instrument(skip(state))]
pub async fn conference<S: BookingStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Conference>, ApiError> {
    Ok(Json(state.views.get_conference(state.conference_id).await?))
}

fn confirmation_message(record: &BookingRecord) -> String {
    format!(
        "Thank you {} {} for booking {} tickets!",
        record.booking.first_name, record.booking.last_name, record.booking.number_of_tickets
    )
}
