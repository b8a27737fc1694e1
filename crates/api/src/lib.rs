//! HTTP API server with observability for the conference booking service.
//!
//! Exposes the booking core over REST: booking against the seeded
//! conference, conference state and booking history, with structured
//! logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use booking_store::BookingStore;
use common::ConferenceId;
use metrics_exporter_prometheus::PrometheusHandle;
use notify::{NotificationSink, Notifier};
use reservation::{BookingCache, ReadViews, ReservationCoordinator};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
use routes::booking::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: BookingStore + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::ops::metrics))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::ops::health::<S>))
        .route("/api/book", post(routes::booking::book::<S>))
        .route("/api/bookings", get(routes::booking::list::<S>))
        .route("/api/conference", get(routes::booking::conference::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Wires the coordinator, read views and notification sink around `store`.
///
/// The coordinator and the views share one booking cache so that every
/// committed booking invalidates what the views serve. Must be called from
/// within a tokio runtime since the sink spawns its workers.
pub fn create_state<S, N>(
    store: S,
    conference_id: ConferenceId,
    notifier: Arc<N>,
    config: &Config,
) -> Arc<AppState<S>>
where
    S: BookingStore + Clone + 'static,
    N: Notifier + 'static,
{
    let cache = BookingCache::new();
    let coordinator = ReservationCoordinator::with_config(
        store.clone(),
        cache.clone(),
        config.coordinator_config(),
    );
    let views = ReadViews::new(store, cache);
    let sink = NotificationSink::spawn(notifier, config.sink_config());

    Arc::new(AppState {
        coordinator,
        views,
        sink,
        conference_id,
    })
}
