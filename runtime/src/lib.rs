//! # Waiting Room Runtime
//!
//! Services that compose the provider traits into the waiting room protocol.
//!
//! ## Core Components
//!
//! - **`AdmissionService`**: queue entry, status polling, token acquisition and release
//! - **`LivenessReaper`**: periodic eviction of users whose heartbeat expired
//! - **`ReservationCoordinator`**: the seat critical section
//! - **`CatalogService`**: seat catalog loading and listing
//!
//! ## Example
//!
//! ```ignore
//! use waiting_room_runtime::AdmissionService;
//! use waiting_room_core::{AdmissionConfig, environment::SystemClock};
//!
//! let admission = AdmissionService::new(store, AdmissionConfig::default(), Arc::new(SystemClock));
//!
//! admission.enter(event_id, user_id).await?;
//! loop {
//!     match admission.get_status(event_id, user_id).await? {
//!         QueueStatus::Ready { .. } => break,
//!         _ => tokio::time::sleep(poll_interval).await,
//!     }
//! }
//! let token = admission.acquire_token(event_id, user_id).await?;
//! ```

/// Queue entry and admission tokens
pub mod admission;

/// Seat catalog management
pub mod catalog;

/// Dependency health checks
pub mod health;

/// Prometheus metrics for observability
pub mod metrics;

/// Liveness sweep over every queue
pub mod reaper;

/// Seat reservation critical section
pub mod reservation;

pub use admission::AdmissionService;
pub use catalog::CatalogService;
pub use health::{HealthCheck, HealthReport, HealthStatus};
pub use reaper::{LivenessReaper, ReapReport};
pub use reservation::ReservationCoordinator;
