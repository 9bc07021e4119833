//! Prometheus metrics for observability and monitoring.
//!
//! This module provides metric collection for the waiting room:
//! - Queue entry and admission outcomes
//! - Liveness reaper sweeps
//! - Seat reservation outcomes and latency
//!
//! The recorder is rendered by the HTTP server on `GET /metrics`.
//!
//! # Example
//!
//! ```rust,no_run
//! use waiting_room_runtime::metrics::MetricsRecorder;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut recorder = MetricsRecorder::new();
//! recorder.install()?;
//!
//! let body = recorder.render().unwrap_or_default();
//! # Ok(())
//! # }
//! ```

use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;
use thiserror::Error;
use waiting_room_core::TokenOutcome;

// Re-export metrics macros for use in other modules
pub use metrics::{counter, histogram};

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Prometheus recorder for the waiting room metrics.
#[derive(Default)]
pub struct MetricsRecorder {
    handle: Option<PrometheusHandle>,
}

impl MetricsRecorder {
    /// Create a recorder that is not yet installed.
    #[must_use]
    pub const fn new() -> Self {
        Self { handle: None }
    }

    /// Install the global recorder and register metric descriptions.
    ///
    /// # Errors
    ///
    /// Returns error if the exporter cannot be built or installed.
    ///
    /// # Note
    ///
    /// If a metrics recorder is already installed (e.g., in tests), the
    /// existing one keeps receiving samples and [`Self::handle`] stays `None`.
    pub fn install(&mut self) -> Result<(), MetricsError> {
        let builder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[
                    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
                ],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?;

        match builder.install_recorder() {
            Ok(handle) => {
                // Descriptions sent before this point reach the no-op recorder
                register_metrics();
                self.handle = Some(handle);
                tracing::info!("Metrics recorder installed");
                Ok(())
            }
            Err(e) => {
                let err_msg = e.to_string();
                if err_msg.contains("already initialized") {
                    tracing::warn!("Metrics recorder already initialized, skipping re-initialization");
                    Ok(())
                } else {
                    Err(MetricsError::Install(err_msg))
                }
            }
        }
    }

    /// Get the metrics handle for rendering.
    #[must_use]
    pub const fn handle(&self) -> Option<&PrometheusHandle> {
        self.handle.as_ref()
    }

    /// Render current metrics in Prometheus format.
    ///
    /// Returns `None` if the recorder was not installed by this instance.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

/// Register all metric descriptions.
fn register_metrics() {
    // Admission Metrics
    describe_counter!(
        "waiting_room_queue_entered_total",
        "Total number of queue entries"
    );
    describe_counter!(
        "waiting_room_token_acquire_total",
        "Token acquisition attempts by outcome"
    );
    describe_counter!(
        "waiting_room_token_released_total",
        "Total number of admission tokens released"
    );

    // Reaper Metrics
    describe_counter!(
        "waiting_room_reaper_evicted_total",
        "Total number of inactive users evicted from queues"
    );
    describe_histogram!(
        "waiting_room_reaper_sweep_duration_seconds",
        "Time taken by one liveness sweep"
    );

    // Reservation Metrics
    describe_counter!(
        "waiting_room_reservations_total",
        "Seat reservation attempts by outcome"
    );
    describe_histogram!(
        "waiting_room_reservation_duration_seconds",
        "Time taken by one reservation attempt"
    );
}

/// Admission metrics recorder.
pub struct AdmissionMetrics;

impl AdmissionMetrics {
    /// Record a queue entry.
    pub fn record_enter() {
        counter!("waiting_room_queue_entered_total").increment(1);
    }

    /// Record a token acquisition attempt.
    pub fn record_acquire(outcome: TokenOutcome) {
        counter!("waiting_room_token_acquire_total", "outcome" => outcome.as_str()).increment(1);
    }

    /// Record a token release that actually freed a slot.
    pub fn record_release() {
        counter!("waiting_room_token_released_total").increment(1);
    }
}

/// Liveness reaper metrics recorder.
pub struct ReaperMetrics;

impl ReaperMetrics {
    /// Record one completed sweep.
    pub fn record_sweep(evicted: u64, duration: Duration) {
        counter!("waiting_room_reaper_evicted_total").increment(evicted);
        histogram!("waiting_room_reaper_sweep_duration_seconds").record(duration.as_secs_f64());
    }
}

/// Reservation metrics recorder.
pub struct ReservationMetrics;

impl ReservationMetrics {
    /// Record a reservation attempt.
    ///
    /// `outcome` is `reserved` or the lowercased error code.
    pub fn record(outcome: &'static str, duration: Duration) {
        counter!("waiting_room_reservations_total", "outcome" => outcome).increment(1);
        histogram!("waiting_room_reservation_duration_seconds").record(duration.as_secs_f64());
    }
}
