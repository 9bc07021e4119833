//! Infrastructure providers.
//!
//! This module defines traits for every external dependency of the waiting
//! room. Services in the runtime crate are generic over these traits, so the
//! admission and reservation logic runs unchanged against Redis/`PostgreSQL`
//! in production and against in-memory implementations in tests.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────┐   ┌────────────────────┐   ┌────────────────────┐
//! │  AdmissionService  │   │   LivenessReaper   │   │ReservationCoordin. │
//! └─────────┬──────────┘   └─────────┬──────────┘   └──┬──────────┬──────┘
//!           │                        │                 │          │
//!           ▼                        ▼                 ▼          ▼
//! ┌─────────────────────────────────────────────┐ ┌─────────┐ ┌──────────────┐
//! │                 QueueStore                  │ │Distrib. │ │SeatRepository│
//! │ (RedisQueueStore / InMemoryQueueStore)      │ │  Lock   │ │ (Postgres /  │
//! └─────────────────────────────────────────────┘ └─────────┘ │  in-memory)  │
//!                                                             └──────────────┘
//! ```
//!
//! Providers are **interfaces**, not implementations.

use crate::error::Result;
use crate::lock::LockToken;
use crate::types::{EventId, Reservation, Seat, SeatId, TokenOutcome, UserId};
use chrono::{DateTime, Utc};
use std::future::Future;
use std::time::Duration;

/// Cache-tier operations over per-event queue state.
///
/// Every method is a single round trip (or a single server-side script) so
/// that multi-step decisions stay atomic where the admission protocol needs it.
/// All per-event state is shared between request handlers and mediated only
/// by these operations.
///
/// # Errors
///
/// Every method returns [`crate::WaitingRoomError::Cache`] when the cache tier
/// is unreachable or rejects the command.
pub trait QueueStore: Send + Sync {
    /// Insert the user if absent with the given arrival score, set the
    /// activity heartbeat, and return the user's 0-based rank.
    ///
    /// A user already queued keeps their original score and position.
    /// Equal scores are ordered lexicographically by user id. Holding a token
    /// does not prevent a new entry.
    fn enter(
        &self,
        event_id: EventId,
        user_id: UserId,
        score_ms: i64,
        activity_ttl: Duration,
    ) -> impl Future<Output = Result<u64>> + Send;

    /// Reset the admission token's TTL. Returns `false` if no token exists.
    fn refresh_token(
        &self,
        event_id: EventId,
        user_id: UserId,
        ttl: Duration,
    ) -> impl Future<Output = Result<bool>> + Send;

    /// 0-based queue position, or `None` if the user is not queued.
    fn rank(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> impl Future<Output = Result<Option<u64>>> + Send;

    /// Refresh the activity heartbeat.
    fn touch_activity(
        &self,
        event_id: EventId,
        user_id: UserId,
        ttl: Duration,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Current value of the concurrency counter (0 if unset).
    fn token_count(&self, event_id: EventId) -> impl Future<Output = Result<i64>> + Send;

    /// The admission decision, executed atomically on the cache tier:
    ///
    /// 1. token exists → `Granted`
    /// 2. not queued → `NotInQueue`
    /// 3. `rank < maxConcurrent - counter` → mint token with `token_ttl`,
    ///    increment counter, dequeue, `Granted`
    /// 4. otherwise `NotYet`
    fn acquire_token(
        &self,
        event_id: EventId,
        user_id: UserId,
        max_concurrent: u32,
        token_ttl: Duration,
    ) -> impl Future<Output = Result<TokenOutcome>> + Send;

    /// Whether the user currently holds an admission token.
    fn has_token(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> impl Future<Output = Result<bool>> + Send;

    /// Atomically delete the token and decrement the counter.
    ///
    /// No-op returning `false` if the token is already gone.
    fn release_token(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> impl Future<Output = Result<bool>> + Send;

    /// Events that currently have a queue. May be stale.
    fn queued_events(&self) -> impl Future<Output = Result<Vec<EventId>>> + Send;

    /// Every queued user of an event, front first.
    fn queue_members(&self, event_id: EventId)
    -> impl Future<Output = Result<Vec<UserId>>> + Send;

    /// For each user, whether their activity heartbeat is still present.
    fn activity_alive(
        &self,
        event_id: EventId,
        user_ids: &[UserId],
    ) -> impl Future<Output = Result<Vec<bool>>> + Send;

    /// Remove users from the queue, returning how many were present.
    fn remove_members(
        &self,
        event_id: EventId,
        user_ids: &[UserId],
    ) -> impl Future<Output = Result<u64>> + Send;

    /// Drop the whole queue of an event. Tokens and counters are untouched.
    fn purge_queue(&self, event_id: EventId) -> impl Future<Output = Result<bool>> + Send;

    /// Add newly created seats to the remaining-seat gauge, returning the new value.
    fn add_seat_count(
        &self,
        event_id: EventId,
        count: i64,
    ) -> impl Future<Output = Result<i64>> + Send;

    /// Read the remaining-seat gauge.
    fn seat_count(&self, event_id: EventId) -> impl Future<Output = Result<Option<i64>>> + Send;

    /// Decrement the remaining-seat gauge, returning the new value.
    fn decrement_seat_count(&self, event_id: EventId) -> impl Future<Output = Result<i64>> + Send;

    /// Recompute the concurrency counter from the live token markers and
    /// return the new value.
    fn reconcile_token_count(&self, event_id: EventId) -> impl Future<Output = Result<i64>> + Send;

    /// Connectivity probe.
    fn ping(&self) -> impl Future<Output = Result<()>> + Send;
}

/// Exclusion primitive with a bounded wait and a lease.
///
/// Ownership is unique: `unlock` only deletes the lock if it is still held by
/// the given token. Prefer [`crate::LockGuard`] over calling these directly.
pub trait DistributedLock: Send + Sync {
    /// Try to acquire `key` for `lease`, retrying until `wait` elapses.
    ///
    /// Returns `None` on timeout.
    ///
    /// # Errors
    ///
    /// Returns [`crate::WaitingRoomError::Cache`] if the backing store fails.
    fn try_lock(
        &self,
        key: &str,
        wait: Duration,
        lease: Duration,
    ) -> impl Future<Output = Result<Option<LockToken>>> + Send;

    /// Release `key` if still owned by `token`.
    ///
    /// Returns `false` when the lease already expired (or was taken over).
    ///
    /// # Errors
    ///
    /// Returns [`crate::WaitingRoomError::Cache`] if the backing store fails.
    fn unlock(&self, key: &str, token: &LockToken) -> impl Future<Output = Result<bool>> + Send;
}

/// Durable seat catalog and reservation log.
///
/// # Errors
///
/// Every method returns [`crate::WaitingRoomError::Store`] when the store is
/// unreachable or a statement fails.
pub trait SeatRepository: Send + Sync {
    /// Insert one available seat per label.
    fn create_seats(
        &self,
        event_id: EventId,
        labels: &[String],
    ) -> impl Future<Output = Result<Vec<Seat>>> + Send;

    /// All seats of an event, ordered by label.
    fn list_seats(&self, event_id: EventId) -> impl Future<Output = Result<Vec<Seat>>> + Send;

    /// Look up a single seat.
    fn find_seat(&self, seat_id: SeatId) -> impl Future<Output = Result<Option<Seat>>> + Send;

    /// The durable half of the reservation critical section, in one transaction:
    /// lock the seat row for update, reject missing or reserved seats, flip the
    /// status to `RESERVED`, append the reservation record, commit.
    ///
    /// # Errors
    ///
    /// - [`crate::WaitingRoomError::SeatNotFound`] if no seat has this id within the event
    /// - [`crate::WaitingRoomError::AlreadyReserved`] if the seat was taken
    /// - [`crate::WaitingRoomError::SeatContended`] if the row lock timed out
    /// - [`crate::WaitingRoomError::Store`] on any other failure (nothing is committed)
    fn reserve_seat(
        &self,
        event_id: EventId,
        seat_id: SeatId,
        user_id: UserId,
        reserved_at: DateTime<Utc>,
    ) -> impl Future<Output = Result<Reservation>> + Send;

    /// Reservation records for a seat, oldest first.
    fn reservations_for_seat(
        &self,
        seat_id: SeatId,
    ) -> impl Future<Output = Result<Vec<Reservation>>> + Send;

    /// Connectivity probe.
    fn ping(&self) -> impl Future<Output = Result<()>> + Send;
}
