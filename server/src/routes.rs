//! Router configuration for the waiting room.
//!
//! Builds the complete Axum router with all endpoints.

use crate::handlers::{admin, events, health, queue, reservations};
use crate::state::AppState;
use axum::{
    Router,
    routing::{delete, get, post},
};
use tower_http::trace::TraceLayer;
use waiting_room_core::providers::{DistributedLock, QueueStore, SeatRepository};

/// Build the complete Axum router.
///
/// Operator routes under `/api/admin` are mounted only when the state has
/// them enabled.
pub fn build_router<Q, L, R>(state: AppState<Q, L, R>) -> Router
where
    Q: QueueStore + 'static,
    L: DistributedLock + Clone + 'static,
    R: SeatRepository + 'static,
{
    let mut api_routes = Router::new()
        // Admission
        .route("/queue/enter", post(queue::enter::<Q, L, R>))
        .route("/queue/status", get(queue::status::<Q, L, R>))
        .route("/queue/token", post(queue::acquire_token::<Q, L, R>))
        // Reservation
        .route("/reservations", post(reservations::reserve::<Q, L, R>))
        // Catalog reads
        .route("/events/:event_id/seats", get(events::list_seats::<Q, L, R>))
        .route(
            "/events/:event_id/remaining",
            get(events::seats_remaining::<Q, L, R>),
        );

    if state.admin_enabled {
        api_routes = api_routes
            .route("/admin/events/seats", post(admin::load_catalog::<Q, L, R>))
            .route(
                "/admin/events/:event_id/queue",
                delete(admin::purge_queue::<Q, L, R>),
            )
            .route(
                "/admin/events/:event_id/tokens/reconcile",
                post(admin::reconcile_tokens::<Q, L, R>),
            );
    }

    Router::new()
        // Probes
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check::<Q, L, R>))
        .route("/metrics", get(health::metrics::<Q, L, R>))
        // API routes under /api prefix
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
