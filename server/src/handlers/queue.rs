//! Queue entry, status polling and token acquisition.

use super::EventQuery;
use crate::error::AppError;
use crate::extractors::Caller;
use crate::state::AppState;
use axum::{
    Json,
    extract::{Query, State, rejection::QueryRejection},
};
use waiting_room_core::providers::{DistributedLock, QueueStore, SeatRepository};
use waiting_room_core::{QueueEnterResponse, QueueStatus, TokenResponse};

/// `POST /api/queue/enter?eventId=`
///
/// # Errors
///
/// `400` on a bad user id or event id, `503` if the cache tier is down.
pub async fn enter<Q, L, R>(
    State(state): State<AppState<Q, L, R>>,
    Caller(user_id): Caller,
    query: Result<Query<EventQuery>, QueryRejection>,
) -> Result<Json<QueueEnterResponse>, AppError>
where
    Q: QueueStore,
    L: DistributedLock + Clone + 'static,
    R: SeatRepository,
{
    let Query(EventQuery { event_id }) = query?;
    let response = state.admission.enter(event_id, user_id).await?;
    Ok(Json(response))
}

/// `GET /api/queue/status?eventId=`
///
/// # Errors
///
/// `404 NOT_IN_QUEUE` if the user holds neither a token nor a queue entry.
pub async fn status<Q, L, R>(
    State(state): State<AppState<Q, L, R>>,
    Caller(user_id): Caller,
    query: Result<Query<EventQuery>, QueryRejection>,
) -> Result<Json<QueueStatus>, AppError>
where
    Q: QueueStore,
    L: DistributedLock + Clone + 'static,
    R: SeatRepository,
{
    let Query(EventQuery { event_id }) = query?;
    let status = state.admission.get_status(event_id, user_id).await?;
    Ok(Json(status))
}

/// `POST /api/queue/token?eventId=`
///
/// Not being admitted yet is a `200` with `success: false`.
///
/// # Errors
///
/// `503` if the cache tier is down.
pub async fn acquire_token<Q, L, R>(
    State(state): State<AppState<Q, L, R>>,
    Caller(user_id): Caller,
    query: Result<Query<EventQuery>, QueryRejection>,
) -> Result<Json<TokenResponse>, AppError>
where
    Q: QueueStore,
    L: DistributedLock + Clone + 'static,
    R: SeatRepository,
{
    let Query(EventQuery { event_id }) = query?;
    let response = state.admission.acquire_token(event_id, user_id).await?;
    Ok(Json(response))
}
