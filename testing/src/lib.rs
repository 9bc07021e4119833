//! # Waiting Room Testing
//!
//! Testing utilities for the virtual waiting room.
//!
//! This crate provides:
//! - Deterministic clocks ([`FixedClock`], [`ManualClock`])
//! - In-memory implementations of every provider trait
//! - Property-based testing strategies for domain types
//!
//! ## Example
//!
//! ```
//! use waiting_room_testing::{ManualClock, test_clock};
//! use waiting_room_testing::mocks::InMemoryQueueStore;
//! use std::sync::Arc;
//!
//! let clock = ManualClock::from(test_clock());
//! let store = InMemoryQueueStore::with_clock(Arc::new(clock.clone()));
//!
//! // Expire every heartbeat and token in one step
//! clock.advance(std::time::Duration::from_secs(60));
//! # let _ = store;
//! ```

use chrono::{DateTime, Utc};
use waiting_room_core::environment::Clock;

/// Mock implementations for testing.
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    mod lock;
    mod queue;
    mod seats;

    pub use lock::InMemorySeatLock;
    pub use queue::InMemoryQueueStore;
    pub use seats::InMemorySeatRepository;

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use waiting_room_testing::mocks::FixedClock;
    /// use waiting_room_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Clock that only moves when told to.
    ///
    /// Clones share the same instant, so a test can hand one clone to the
    /// system under test and advance another.
    #[derive(Debug, Clone)]
    pub struct ManualClock {
        time: Arc<Mutex<DateTime<Utc>>>,
    }

    impl ManualClock {
        /// Create a manual clock starting at `time`.
        #[must_use]
        pub fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: Arc::new(Mutex::new(time)),
            }
        }

        /// Move the clock forward.
        pub fn advance(&self, by: Duration) {
            let mut time = self
                .time
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            *time += by;
        }
    }

    impl From<FixedClock> for ManualClock {
        fn from(clock: FixedClock) -> Self {
            Self::new(clock.time)
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self
                .time
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

/// Property-based testing utilities using proptest.
pub mod properties {
    use proptest::prelude::*;
    use uuid::Uuid;
    use waiting_room_core::{EventId, UserId};

    /// Arbitrary user id.
    pub fn arb_user_id() -> impl Strategy<Value = UserId> {
        any::<u128>().prop_map(|bits| UserId::from_uuid(Uuid::from_u128(bits)))
    }

    /// Arbitrary event id.
    pub fn arb_event_id() -> impl Strategy<Value = EventId> {
        any::<u128>().prop_map(|bits| EventId::from_uuid(Uuid::from_u128(bits)))
    }

    /// A crowd of distinct users, arrival order preserved.
    pub fn arb_crowd(max: usize) -> impl Strategy<Value = Vec<UserId>> {
        proptest::collection::btree_set(any::<u128>(), 1..=max).prop_map(|set| {
            set.into_iter()
                .map(|bits| UserId::from_uuid(Uuid::from_u128(bits)))
                .collect()
        })
    }
}

// Re-export commonly used items
pub use mocks::{FixedClock, ManualClock, test_clock};
