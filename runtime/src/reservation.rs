//! Seat reservation coordinator.
//!
//! Converts an admission token into at most one seat reservation. The seat is
//! guarded twice: a per-seat distributed lock bounds contention to one request
//! per seat across replicas, and the durable store's row lock inside the
//! reservation transaction is the authority on `RESERVED`.
//!
//! # Sequence
//!
//! ```text
//! has token? ──no──▶ NO_TOKEN
//!     │
//! lock seat (wait ≤ lock wait, lease = lock lease) ──timeout──▶ SEAT_CONTENDED
//!     │
//! transaction: SELECT … FOR UPDATE ─▶ status check ─▶ flip ─▶ insert reservation ─▶ commit
//!     │
//! best effort: decrement seat gauge, release token
//!     │
//! unlock seat (always, owner only)
//! ```
//!
//! The token is released only after a successful commit. A failed attempt
//! keeps the token so the caller can retry another seat.

use crate::metrics::ReservationMetrics;
use std::sync::Arc;
use std::time::Instant;
use waiting_room_core::environment::Clock;
use waiting_room_core::keys;
use waiting_room_core::providers::{DistributedLock, QueueStore, SeatRepository};
use waiting_room_core::{
    EventId, LockGuard, Reservation, Result, SeatId, SeatLockConfig, UserId, WaitingRoomError,
};

/// Coordinates token check, seat lock, durable reservation and token release.
pub struct ReservationCoordinator<Q, L, R>
where
    Q: QueueStore,
    L: DistributedLock + Clone + 'static,
    R: SeatRepository,
{
    queue: Q,
    lock: L,
    seats: R,
    config: SeatLockConfig,
    clock: Arc<dyn Clock>,
}

impl<Q, L, R> ReservationCoordinator<Q, L, R>
where
    Q: QueueStore,
    L: DistributedLock + Clone + 'static,
    R: SeatRepository,
{
    /// Create a coordinator.
    #[must_use]
    pub fn new(queue: Q, lock: L, seats: R, config: SeatLockConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            queue,
            lock,
            seats,
            config,
            clock,
        }
    }

    /// The seat repository.
    #[must_use]
    pub const fn seats(&self) -> &R {
        &self.seats
    }

    /// Reserve one seat for an admitted user.
    ///
    /// # Errors
    ///
    /// - [`WaitingRoomError::NoToken`] if the user holds no admission token
    /// - [`WaitingRoomError::SeatContended`] if the seat lock or row lock timed out
    /// - [`WaitingRoomError::SeatNotFound`] if the seat does not belong to the event
    /// - [`WaitingRoomError::AlreadyReserved`] if another user took the seat first
    /// - [`WaitingRoomError::Cache`] / [`WaitingRoomError::Store`] on infrastructure failure
    #[tracing::instrument(
        skip(self),
        fields(event_id = %event_id, seat_id = %seat_id, user_id = %user_id)
    )]
    pub async fn reserve(
        &self,
        event_id: EventId,
        seat_id: SeatId,
        user_id: UserId,
    ) -> Result<Reservation> {
        let started = Instant::now();
        let result = self.reserve_inner(event_id, seat_id, user_id).await;

        let outcome = match &result {
            Ok(reservation) => {
                tracing::info!(reservation_id = %reservation.id, "Seat reserved");
                "reserved"
            }
            Err(e) if e.is_infrastructure() => {
                tracing::error!(error = %e, "Reservation failed");
                outcome_label(e)
            }
            Err(e) => {
                tracing::debug!(code = e.code(), "Reservation rejected");
                outcome_label(e)
            }
        };
        ReservationMetrics::record(outcome, started.elapsed());

        result
    }

    async fn reserve_inner(
        &self,
        event_id: EventId,
        seat_id: SeatId,
        user_id: UserId,
    ) -> Result<Reservation> {
        if !self.queue.has_token(event_id, user_id).await? {
            return Err(WaitingRoomError::NoToken);
        }

        let Some(guard) = LockGuard::acquire(
            &self.lock,
            keys::seat_lock(event_id, seat_id),
            self.config.wait,
            self.config.lease,
        )
        .await?
        else {
            return Err(WaitingRoomError::SeatContended);
        };

        let result = self
            .seats
            .reserve_seat(event_id, seat_id, user_id, self.clock.now())
            .await;

        if result.is_ok() {
            self.after_commit(event_id, user_id).await;
        }

        guard.release().await;
        result
    }

    /// Post-commit bookkeeping. The reservation stands even if these fail.
    async fn after_commit(&self, event_id: EventId, user_id: UserId) {
        if let Err(e) = self.queue.decrement_seat_count(event_id).await {
            tracing::warn!(error = %e, "Failed to decrement remaining-seat gauge");
        }
        match self.queue.release_token(event_id, user_id).await {
            Ok(true) => crate::metrics::AdmissionMetrics::record_release(),
            Ok(false) => tracing::debug!("Admission token already gone after reservation"),
            Err(e) => tracing::warn!(error = %e, "Failed to release admission token after reservation"),
        }
    }
}

const fn outcome_label(error: &WaitingRoomError) -> &'static str {
    match error {
        WaitingRoomError::NotInQueue => "not_in_queue",
        WaitingRoomError::NoToken => "no_token",
        WaitingRoomError::SeatContended => "seat_contended",
        WaitingRoomError::SeatNotFound(_) => "seat_not_found",
        WaitingRoomError::AlreadyReserved(_) => "already_reserved",
        WaitingRoomError::Cache(_) | WaitingRoomError::Store(_) => "infra_unavailable",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::time::Duration;
    use waiting_room_testing::mocks::{InMemoryQueueStore, InMemorySeatLock, InMemorySeatRepository};
    use waiting_room_testing::test_clock;

    type Coordinator =
        ReservationCoordinator<InMemoryQueueStore, InMemorySeatLock, InMemorySeatRepository>;

    fn coordinator() -> (Coordinator, InMemoryQueueStore, InMemorySeatLock) {
        let queue = InMemoryQueueStore::new();
        let lock = InMemorySeatLock::new();
        let config = SeatLockConfig {
            wait: Duration::from_millis(50),
            lease: Duration::from_secs(5),
        };
        let coordinator = ReservationCoordinator::new(
            queue.clone(),
            lock.clone(),
            InMemorySeatRepository::new(),
            config,
            Arc::new(test_clock()),
        );
        (coordinator, queue, lock)
    }

    async fn admit(queue: &InMemoryQueueStore, event: EventId, user: UserId) {
        queue.enter(event, user, 1, Duration::from_secs(30)).await.unwrap();
        queue
            .acquire_token(event, user, 10, Duration::from_secs(300))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_reserve_without_token_is_rejected() {
        let (coordinator, _, _) = coordinator();
        let event = EventId::new();
        let seats = coordinator.seats().create_seats(event, &["A1".into()]).await.unwrap();

        let err = coordinator
            .reserve(event, seats[0].id, UserId::new())
            .await
            .unwrap_err();

        assert_eq!(err, WaitingRoomError::NoToken);
    }

    #[tokio::test]
    async fn test_successful_reserve_consumes_token_and_unlocks() {
        let (coordinator, queue, lock) = coordinator();
        let event = EventId::new();
        let user = UserId::new();
        let seats = coordinator.seats().create_seats(event, &["A1".into()]).await.unwrap();
        queue.add_seat_count(event, 1).await.unwrap();
        admit(&queue, event, user).await;

        let reservation = coordinator.reserve(event, seats[0].id, user).await.unwrap();

        assert_eq!(reservation.user_id, user);
        assert_eq!(reservation.created_at, test_clock().now());
        assert!(!queue.has_token(event, user).await.unwrap());
        assert_eq!(queue.token_count(event).await.unwrap(), 0);
        assert_eq!(queue.seat_count(event).await.unwrap(), Some(0));
        assert!(!lock.is_locked(&keys::seat_lock(event, seats[0].id)).unwrap());
    }

    #[tokio::test]
    async fn test_failed_reserve_keeps_token() {
        let (coordinator, queue, _) = coordinator();
        let event = EventId::new();
        let user = UserId::new();
        admit(&queue, event, user).await;

        let missing = SeatId::new();
        let err = coordinator.reserve(event, missing, user).await.unwrap_err();

        assert_eq!(err, WaitingRoomError::SeatNotFound(missing));
        assert!(queue.has_token(event, user).await.unwrap());
    }

    #[tokio::test]
    async fn test_held_seat_lock_is_contended() {
        let (coordinator, queue, lock) = coordinator();
        let event = EventId::new();
        let user = UserId::new();
        let seats = coordinator.seats().create_seats(event, &["A1".into()]).await.unwrap();
        admit(&queue, event, user).await;

        let key = keys::seat_lock(event, seats[0].id);
        let _held = lock
            .try_lock(&key, Duration::ZERO, Duration::from_secs(5))
            .await
            .unwrap()
            .unwrap();

        let err = coordinator.reserve(event, seats[0].id, user).await.unwrap_err();

        assert_eq!(err, WaitingRoomError::SeatContended);
        assert!(queue.has_token(event, user).await.unwrap());
    }

    #[tokio::test]
    async fn test_store_outage_maps_to_infrastructure_error() {
        let (coordinator, queue, _) = coordinator();
        let event = EventId::new();
        let user = UserId::new();
        let seats = coordinator.seats().create_seats(event, &["A1".into()]).await.unwrap();
        admit(&queue, event, user).await;
        coordinator.seats().set_offline(true);

        let err = coordinator.reserve(event, seats[0].id, user).await.unwrap_err();

        assert_eq!(err.code(), "INFRA_UNAVAILABLE");
        assert!(queue.has_token(event, user).await.unwrap());
    }
}
