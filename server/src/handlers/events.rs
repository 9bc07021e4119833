//! Seat catalog reads.

use crate::error::AppError;
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, State, rejection::PathRejection},
};
use serde::Serialize;
use waiting_room_core::providers::{DistributedLock, QueueStore, SeatRepository};
use waiting_room_core::{EventId, Seat};

/// Remaining-seat gauge.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatsRemaining {
    /// Event ID
    pub event_id: EventId,
    /// Advisory count, `null` if the event's catalog was never loaded
    pub remaining: Option<i64>,
}

/// `GET /api/events/:eventId/seats`
///
/// # Errors
///
/// `503` if the durable store is down.
pub async fn list_seats<Q, L, R>(
    State(state): State<AppState<Q, L, R>>,
    path: Result<Path<EventId>, PathRejection>,
) -> Result<Json<Vec<Seat>>, AppError>
where
    Q: QueueStore,
    L: DistributedLock + Clone + 'static,
    R: SeatRepository,
{
    let Path(event_id) = path?;
    let seats = state.catalog.list(event_id).await?;
    Ok(Json(seats))
}

/// `GET /api/events/:eventId/remaining`
///
/// # Errors
///
/// `503` if the cache tier is down.
pub async fn seats_remaining<Q, L, R>(
    State(state): State<AppState<Q, L, R>>,
    path: Result<Path<EventId>, PathRejection>,
) -> Result<Json<SeatsRemaining>, AppError>
where
    Q: QueueStore,
    L: DistributedLock + Clone + 'static,
    R: SeatRepository,
{
    let Path(event_id) = path?;
    let remaining = state.admission.seats_remaining(event_id).await?;
    Ok(Json(SeatsRemaining {
        event_id,
        remaining,
    }))
}
