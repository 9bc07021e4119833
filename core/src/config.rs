//! Admission and seat-lock tuning.
//!
//! These are the knobs of the admission state machine. Loading them from the
//! process environment is the server's job; this module only holds the values
//! and checks them.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Invalid configuration value.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A value that must be strictly positive was zero.
    #[error("{0} must be greater than zero")]
    NotPositive(&'static str),
}

/// Per-event admission settings.
///
/// # Default Values
///
/// - `max_concurrent`: 800
/// - `token_ttl`: 300 seconds
/// - `activity_ttl`: 30 seconds
/// - `reap_interval`: 30 seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmissionConfig {
    /// Per-event cap on outstanding admission tokens
    pub max_concurrent: u32,
    /// Admission token lifetime, refreshed on each status poll
    pub token_ttl: Duration,
    /// Activity heartbeat lifetime
    pub activity_ttl: Duration,
    /// Liveness reaper cadence
    pub reap_interval: Duration,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 800,
            token_ttl: Duration::from_secs(300),
            activity_ttl: Duration::from_secs(30),
            reap_interval: Duration::from_secs(30),
        }
    }
}

impl AdmissionConfig {
    /// Set the concurrency cap.
    #[must_use]
    pub const fn with_max_concurrent(mut self, max_concurrent: u32) -> Self {
        self.max_concurrent = max_concurrent;
        self
    }

    /// Set the admission token lifetime.
    #[must_use]
    pub const fn with_token_ttl(mut self, ttl: Duration) -> Self {
        self.token_ttl = ttl;
        self
    }

    /// Set the activity heartbeat lifetime.
    #[must_use]
    pub const fn with_activity_ttl(mut self, ttl: Duration) -> Self {
        self.activity_ttl = ttl;
        self
    }

    /// Set the reaper cadence.
    #[must_use]
    pub const fn with_reap_interval(mut self, interval: Duration) -> Self {
        self.reap_interval = interval;
        self
    }

    /// Check every value is usable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotPositive`] naming the first zero value.
    pub const fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrent == 0 {
            return Err(ConfigError::NotPositive("max_concurrent"));
        }
        // TTLs are sent to the cache tier in whole seconds
        if self.token_ttl.as_secs() == 0 {
            return Err(ConfigError::NotPositive("token_ttl"));
        }
        if self.activity_ttl.as_secs() == 0 {
            return Err(ConfigError::NotPositive("activity_ttl"));
        }
        if self.reap_interval.is_zero() {
            return Err(ConfigError::NotPositive("reap_interval"));
        }
        Ok(())
    }
}

/// Budgets for the per-seat distributed lock.
///
/// # Default Values
///
/// - `wait`: 3 seconds
/// - `lease`: 5 seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatLockConfig {
    /// How long to keep trying to acquire the lock
    pub wait: Duration,
    /// How long an acquired lock lives if never released
    pub lease: Duration,
}

impl Default for SeatLockConfig {
    fn default() -> Self {
        Self {
            wait: Duration::from_secs(3),
            lease: Duration::from_secs(5),
        }
    }
}

impl SeatLockConfig {
    /// Check every value is usable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotPositive`] naming the first zero value.
    pub const fn validate(&self) -> Result<(), ConfigError> {
        if self.wait.is_zero() {
            return Err(ConfigError::NotPositive("lock_wait"));
        }
        if self.lease.is_zero() {
            return Err(ConfigError::NotPositive("lock_lease"));
        }
        Ok(())
    }
}
