//! Dependency health checks.

use serde::Serialize;
use waiting_room_core::providers::{QueueStore, SeatRepository};

/// Health check status levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Component is fully operational
    Healthy,

    /// Component is not operational
    Unhealthy,
}

impl HealthStatus {
    /// Check if status is healthy
    #[must_use]
    pub const fn is_healthy(self) -> bool {
        matches!(self, Self::Healthy)
    }

    /// Get the worst status between two statuses
    #[must_use]
    pub const fn worst(self, other: Self) -> Self {
        match (self, other) {
            (Self::Unhealthy, _) | (_, Self::Unhealthy) => Self::Unhealthy,
            _ => Self::Healthy,
        }
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Healthy => write!(f, "healthy"),
            Self::Unhealthy => write!(f, "unhealthy"),
        }
    }
}

/// Health check result for a component
#[derive(Debug, Clone, Serialize)]
pub struct HealthCheck {
    /// Name of the component being checked
    pub component: String,

    /// Current health status
    pub status: HealthStatus,

    /// Optional message providing details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl HealthCheck {
    /// Create a healthy check result
    #[must_use]
    pub fn healthy(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            status: HealthStatus::Healthy,
            message: None,
        }
    }

    /// Create an unhealthy check result
    #[must_use]
    pub fn unhealthy(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            status: HealthStatus::Unhealthy,
            message: Some(message.into()),
        }
    }
}

/// Aggregated health report
///
/// Combines multiple health checks into an overall system status.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    /// Overall system status (worst of all checks)
    pub status: HealthStatus,

    /// Individual component checks
    pub checks: Vec<HealthCheck>,

    /// Timestamp when report was generated
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl HealthReport {
    /// Create a new health report from checks
    #[must_use]
    pub fn new(checks: Vec<HealthCheck>) -> Self {
        let status = checks
            .iter()
            .map(|c| c.status)
            .fold(HealthStatus::Healthy, HealthStatus::worst);

        Self {
            status,
            checks,
            timestamp: chrono::Utc::now(),
        }
    }

    /// Check if overall system is healthy
    #[must_use]
    pub const fn is_healthy(&self) -> bool {
        self.status.is_healthy()
    }
}

/// Probe the cache tier and the durable store.
pub async fn check_dependencies<Q, R>(queue: &Q, seats: &R) -> HealthReport
where
    Q: QueueStore,
    R: SeatRepository,
{
    let cache = match queue.ping().await {
        Ok(()) => HealthCheck::healthy("cache"),
        Err(e) => HealthCheck::unhealthy("cache", e.to_string()),
    };
    let store = match seats.ping().await {
        Ok(()) => HealthCheck::healthy("store"),
        Err(e) => HealthCheck::unhealthy("store", e.to_string()),
    };

    HealthReport::new(vec![cache, store])
}

#[cfg(test)]
mod tests {
    use super::*;
    use waiting_room_testing::mocks::{InMemoryQueueStore, InMemorySeatRepository};

    #[test]
    fn test_report_takes_worst_status() {
        let report = HealthReport::new(vec![
            HealthCheck::healthy("cache"),
            HealthCheck::unhealthy("store", "connection refused"),
        ]);
        assert_eq!(report.status, HealthStatus::Unhealthy);
    }

    #[tokio::test]
    async fn test_offline_cache_is_unhealthy() {
        let queue = InMemoryQueueStore::new();
        let seats = InMemorySeatRepository::new();

        assert!(check_dependencies(&queue, &seats).await.is_healthy());

        queue.set_offline(true);
        let report = check_dependencies(&queue, &seats).await;

        assert!(!report.is_healthy());
        assert_eq!(report.checks[0].status, HealthStatus::Unhealthy);
        assert_eq!(report.checks[1].status, HealthStatus::Healthy);
    }
}
