//! Application state for the waiting room HTTP server.
//!
//! Contains all shared resources needed by HTTP handlers:
//! - Admission service (queue entry, status, tokens)
//! - Reservation coordinator (the seat critical section)
//! - Catalog service (seat loading and listing)
//! - Prometheus handle for `/metrics`

use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use waiting_room_core::environment::Clock;
use waiting_room_core::providers::{DistributedLock, QueueStore, SeatRepository};
use waiting_room_core::{AdmissionConfig, SeatLockConfig};
use waiting_room_runtime::{AdmissionService, CatalogService, ReservationCoordinator};

/// Application state shared across all HTTP handlers.
///
/// Generic over the infrastructure adapters so the same router serves
/// production (Redis and `PostgreSQL`) and tests (in-memory). Cloned per
/// request; every field is behind an `Arc`.
pub struct AppState<Q, L, R>
where
    Q: QueueStore,
    L: DistributedLock + Clone + 'static,
    R: SeatRepository,
{
    /// Queue entry, status polling and token management
    pub admission: Arc<AdmissionService<Q>>,
    /// Seat reservation critical section
    pub reservations: Arc<ReservationCoordinator<Q, L, R>>,
    /// Seat catalog
    pub catalog: Arc<CatalogService<Q, R>>,
    /// Prometheus renderer, if this process installed the recorder
    pub metrics: Option<PrometheusHandle>,
    /// Whether operator endpoints are served
    pub admin_enabled: bool,
}

impl<Q, L, R> Clone for AppState<Q, L, R>
where
    Q: QueueStore,
    L: DistributedLock + Clone + 'static,
    R: SeatRepository,
{
    fn clone(&self) -> Self {
        Self {
            admission: Arc::clone(&self.admission),
            reservations: Arc::clone(&self.reservations),
            catalog: Arc::clone(&self.catalog),
            metrics: self.metrics.clone(),
            admin_enabled: self.admin_enabled,
        }
    }
}

impl<Q, L, R> AppState<Q, L, R>
where
    Q: QueueStore + Clone,
    L: DistributedLock + Clone + 'static,
    R: SeatRepository + Clone,
{
    /// Wire the services over one set of adapters.
    #[must_use]
    pub fn new(
        queue: Q,
        lock: L,
        seats: R,
        admission: AdmissionConfig,
        seat_lock: SeatLockConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            admission: Arc::new(AdmissionService::new(
                queue.clone(),
                admission,
                Arc::clone(&clock),
            )),
            reservations: Arc::new(ReservationCoordinator::new(
                queue.clone(),
                lock,
                seats.clone(),
                seat_lock,
                clock,
            )),
            catalog: Arc::new(CatalogService::new(queue, seats)),
            metrics: None,
            admin_enabled: false,
        }
    }

    /// Serve `/metrics` from this handle.
    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// Enable or disable the operator endpoints.
    #[must_use]
    pub const fn with_admin(mut self, enabled: bool) -> Self {
        self.admin_enabled = enabled;
        self
    }
}
