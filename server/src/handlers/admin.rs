//! Operator endpoints.
//!
//! Mounted only when `ADMIN_ENDPOINTS_ENABLED` is set; otherwise these paths
//! are plain `404`s.

use crate::error::AppError;
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, State, rejection::{JsonRejection, PathRejection}},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use waiting_room_core::EventId;
use waiting_room_core::providers::{DistributedLock, QueueStore, SeatRepository};
use waiting_room_runtime::catalog::{CatalogLoaded, DEFAULT_LABEL_PREFIX};

/// Catalog load request body.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadCatalogRequest {
    /// Existing event to add seats to; a new event id is generated if absent
    pub event_id: Option<EventId>,
    /// Number of seats to create
    pub seat_count: u32,
    /// Label prefix, `"A"` by default
    pub label_prefix: Option<String>,
}

/// Reconciled token counter.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenCount {
    /// Event ID
    pub event_id: EventId,
    /// Live admission tokens found
    pub count: i64,
}

/// `POST /api/admin/events/seats`
///
/// # Errors
///
/// `400` for a zero seat count, `503` if a store is down.
pub async fn load_catalog<Q, L, R>(
    State(state): State<AppState<Q, L, R>>,
    payload: Result<Json<LoadCatalogRequest>, JsonRejection>,
) -> Result<Json<CatalogLoaded>, AppError>
where
    Q: QueueStore,
    L: DistributedLock + Clone + 'static,
    R: SeatRepository,
{
    let Json(request) = payload?;
    if request.seat_count == 0 {
        return Err(AppError::bad_request("seatCount must be greater than zero"));
    }

    let event_id = request.event_id.unwrap_or_default();
    let prefix = request.label_prefix.as_deref().unwrap_or(DEFAULT_LABEL_PREFIX);
    let loaded = state
        .catalog
        .load(event_id, request.seat_count, prefix)
        .await?;
    Ok(Json(loaded))
}

/// `DELETE /api/admin/events/:eventId/queue`
///
/// # Errors
///
/// `503` if the cache tier is down.
pub async fn purge_queue<Q, L, R>(
    State(state): State<AppState<Q, L, R>>,
    path: Result<Path<EventId>, PathRejection>,
) -> Result<StatusCode, AppError>
where
    Q: QueueStore,
    L: DistributedLock + Clone + 'static,
    R: SeatRepository,
{
    let Path(event_id) = path?;
    state.admission.purge_queue(event_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/admin/events/:eventId/tokens/reconcile`
///
/// # Errors
///
/// `503` if the cache tier is down.
pub async fn reconcile_tokens<Q, L, R>(
    State(state): State<AppState<Q, L, R>>,
    path: Result<Path<EventId>, PathRejection>,
) -> Result<Json<TokenCount>, AppError>
where
    Q: QueueStore,
    L: DistributedLock + Clone + 'static,
    R: SeatRepository,
{
    let Path(event_id) = path?;
    let count = state.admission.reconcile_token_count(event_id).await?;
    Ok(Json(TokenCount { event_id, count }))
}
