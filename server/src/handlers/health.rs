//! Health, readiness and metrics endpoints.

use crate::state::AppState;
use axum::{
    Json,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use waiting_room_core::providers::{DistributedLock, QueueStore, SeatRepository};
use waiting_room_runtime::HealthReport;
use waiting_room_runtime::health::check_dependencies;

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service version
    pub version: String,
}

/// `GET /health`
///
/// Liveness only; dependencies are not probed.
///
/// # Example
///
/// ```bash
/// curl http://localhost:8080/health
/// # {"status":"ok","version":"0.1.0"}
/// ```
pub async fn health_check() -> (StatusCode, Json<HealthResponse>) {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}

/// `GET /ready`
///
/// Probes the cache tier (`PING`) and the durable store (`SELECT 1`).
/// Returns `503` with the per-component report if either is down.
pub async fn readiness_check<Q, L, R>(
    State(state): State<AppState<Q, L, R>>,
) -> (StatusCode, Json<HealthReport>)
where
    Q: QueueStore,
    L: DistributedLock + Clone + 'static,
    R: SeatRepository,
{
    let report = check_dependencies(state.admission.store(), state.reservations.seats()).await;
    let status = if report.is_healthy() {
        StatusCode::OK
    } else {
        tracing::warn!(checks = ?report.checks, "Readiness check failed");
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(report))
}

/// `GET /metrics`
///
/// Prometheus text format. `404` if this process did not install the recorder.
pub async fn metrics<Q, L, R>(State(state): State<AppState<Q, L, R>>) -> Response
where
    Q: QueueStore,
    L: DistributedLock + Clone + 'static,
    R: SeatRepository,
{
    match &state.metrics {
        Some(handle) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
