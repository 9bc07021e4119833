//! # Waiting Room Core
//!
//! Core types and traits for the virtual waiting room and admission-control
//! system that fronts a scarce-resource booking flow.
//!
//! The system accepts an unbounded burst of arriving users, orders them in a
//! per-event FIFO queue, and admits them into the seat-reservation stage in
//! batches bounded by a concurrency budget. An admitted user may then take one
//! seat inside a critical section that guarantees a seat is reserved at most once.
//!
//! ## Core Concepts
//!
//! - **Queue**: Per-event sorted set of users ordered by arrival score
//! - **Activity heartbeat**: Short-TTL marker refreshed on every interaction
//! - **Admission token**: TTL-bounded marker authorizing a reservation attempt
//! - **Concurrency counter**: Per-event count of outstanding admission tokens
//! - **Seat**: Durable row whose status only moves from `AVAILABLE` to `RESERVED`
//!
//! ## Architecture
//!
//! ```text
//! arriving user ──▶ enter ──▶ getStatus (poll) ──▶ acquireToken ──▶ reserve ──▶ releaseToken
//!                    │              │                   │              │
//!                    ▼              ▼                   ▼              ▼
//!               ┌─────────────────────────────────────────────┐  ┌──────────────┐
//!               │           QueueStore (cache tier)           │  │SeatRepository│
//!               │  sorted set · heartbeats · tokens · counter │  │ (row locks)  │
//!               └─────────────────────────────────────────────┘  └──────────────┘
//!                                    ▲
//!                                    │ periodic sweep
//!                              liveness reaper
//! ```
//!
//! All infrastructure sits behind the traits in [`providers`]; the runtime
//! crate composes them and the adapter crates implement them.

pub mod config;
pub mod error;
pub mod keys;
pub mod lock;
pub mod providers;
pub mod types;

pub use config::{AdmissionConfig, ConfigError, SeatLockConfig};
pub use error::{Result, WaitingRoomError};
pub use lock::{LockGuard, LockToken};
pub use types::*;

/// Environment module - injected dependencies that are not infrastructure stores.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// Arrival scores and reservation timestamps are taken from the clock, and
    /// the in-memory adapters evaluate TTL expiry against it, so tests can
    /// move time forward deterministically.
    ///
    /// # Examples
    ///
    /// ```
    /// use waiting_room_core::environment::{Clock, SystemClock};
    ///
    /// let clock = SystemClock;
    /// assert!(clock.now_millis() > 0);
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;

        /// Current time as milliseconds since the Unix epoch.
        fn now_millis(&self) -> i64 {
            self.now().timestamp_millis()
        }
    }

    /// Production clock backed by the system wall clock.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
