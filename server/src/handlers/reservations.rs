//! Seat reservation.

use crate::error::AppError;
use crate::extractors::Caller;
use crate::state::AppState;
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use serde::Deserialize;
use waiting_room_core::providers::{DistributedLock, QueueStore, SeatRepository};
use waiting_room_core::{EventId, Reservation, SeatId};

/// Reservation request body.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReserveRequest {
    /// Event the seat belongs to
    pub event_id: EventId,
    /// Seat to reserve
    pub seat_id: SeatId,
}

/// `POST /api/reservations`
///
/// # Errors
///
/// - `403 NO_TOKEN` without an admission token
/// - `409 SEAT_CONTENDED` when the seat lock could not be obtained in time
/// - `404 SEAT_NOT_FOUND` for a seat outside the event
/// - `409 ALREADY_RESERVED` when another user took the seat first
pub async fn reserve<Q, L, R>(
    State(state): State<AppState<Q, L, R>>,
    Caller(user_id): Caller,
    payload: Result<Json<ReserveRequest>, JsonRejection>,
) -> Result<Json<Reservation>, AppError>
where
    Q: QueueStore,
    L: DistributedLock + Clone + 'static,
    R: SeatRepository,
{
    let Json(request) = payload?;
    let reservation = state
        .reservations
        .reserve(request.event_id, request.seat_id, user_id)
        .await?;
    Ok(Json(reservation))
}
