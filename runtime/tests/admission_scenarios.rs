//! End-to-end admission and reservation scenarios against the in-memory adapters.
//!
//! Settings: `maxConcurrent=2`, `tokenTtl=60`, `activityTtl=30`.

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)] // Test code can use unwrap/expect

use std::sync::Arc;
use std::time::Duration;
use waiting_room_core::providers::{QueueStore, SeatRepository};
use waiting_room_core::{
    AdmissionConfig, EventId, QueueStatus, SeatId, SeatLockConfig, SeatStatus, TokenOutcome,
    TokenResponse, UserId, WaitingRoomError,
};
use waiting_room_runtime::{AdmissionService, LivenessReaper, ReservationCoordinator};
use waiting_room_testing::mocks::{InMemoryQueueStore, InMemorySeatLock, InMemorySeatRepository};
use waiting_room_testing::{ManualClock, test_clock};

struct Harness {
    clock: ManualClock,
    queue: InMemoryQueueStore,
    admission: AdmissionService<InMemoryQueueStore>,
    reaper: LivenessReaper<InMemoryQueueStore>,
    coordinator: Arc<ReservationCoordinator<InMemoryQueueStore, InMemorySeatLock, InMemorySeatRepository>>,
}

fn harness(max_concurrent: u32) -> Harness {
    let clock = ManualClock::from(test_clock());
    let queue = InMemoryQueueStore::with_clock(Arc::new(clock.clone()));
    let config = AdmissionConfig::default()
        .with_max_concurrent(max_concurrent)
        .with_token_ttl(Duration::from_secs(60))
        .with_activity_ttl(Duration::from_secs(30))
        .with_reap_interval(Duration::from_secs(30));

    Harness {
        admission: AdmissionService::new(queue.clone(), config, Arc::new(clock.clone())),
        reaper: LivenessReaper::new(queue.clone(), config.reap_interval),
        coordinator: Arc::new(ReservationCoordinator::new(
            queue.clone(),
            InMemorySeatLock::new(),
            InMemorySeatRepository::new(),
            SeatLockConfig::default(),
            Arc::new(clock.clone()),
        )),
        queue,
        clock,
    }
}

impl Harness {
    /// Enter in arrival order, one millisecond apart.
    async fn enter_all(&self, event: EventId, users: &[UserId]) {
        for user in users {
            self.admission.enter(event, *user).await.unwrap();
            self.clock.advance(Duration::from_millis(1));
        }
    }

    async fn seat(&self, event: EventId) -> SeatId {
        let seats = self
            .coordinator
            .seats()
            .create_seats(event, &["A1".to_string()])
            .await
            .unwrap();
        seats[0].id
    }
}

#[tokio::test]
async fn test_basic_admission() {
    let h = harness(2);
    let e1 = EventId::new();
    let (u1, u2, u3) = (UserId::new(), UserId::new(), UserId::new());
    h.enter_all(e1, &[u1, u2, u3]).await;

    assert_eq!(
        h.admission.get_status(e1, u1).await.unwrap(),
        QueueStatus::Ready { rank: 0, ahead: 0 }
    );
    assert_eq!(
        h.admission.acquire_token(e1, u1).await.unwrap(),
        TokenResponse { success: true, reason: TokenOutcome::Granted }
    );
    // u1 left the queue on admission
    assert_eq!(
        h.admission.get_status(e1, u2).await.unwrap(),
        QueueStatus::Ready { rank: 0, ahead: 0 }
    );
    assert_eq!(
        h.admission.acquire_token(e1, u3).await.unwrap(),
        TokenResponse { success: false, reason: TokenOutcome::NotYet }
    );
    assert_eq!(h.admission.get_status(e1, u1).await.unwrap(), QueueStatus::Entered);
}

#[tokio::test]
async fn test_cap_enforcement() {
    let h = harness(2);
    let e1 = EventId::new();
    let u4 = UserId::new();
    h.queue.set_token_count(e1, 2).unwrap();
    h.enter_all(e1, &[u4]).await;

    let response = h.admission.acquire_token(e1, u4).await.unwrap();

    assert_eq!(response, TokenResponse { success: false, reason: TokenOutcome::NotYet });
    assert!(!h.admission.has_token(e1, u4).await.unwrap());
    assert_eq!(h.queue.token_count(e1).await.unwrap(), 2);
    assert_eq!(h.queue.rank(e1, u4).await.unwrap(), Some(0));
}

#[tokio::test]
async fn test_release_frees_a_slot() {
    let h = harness(2);
    let e1 = EventId::new();
    let (u1, u2, u3) = (UserId::new(), UserId::new(), UserId::new());
    h.enter_all(e1, &[u1, u2, u3]).await;
    assert!(h.admission.acquire_token(e1, u1).await.unwrap().success);
    assert!(h.admission.acquire_token(e1, u2).await.unwrap().success);
    assert!(!h.admission.acquire_token(e1, u3).await.unwrap().success);

    assert!(h.admission.release_token(e1, u1).await.unwrap());

    assert_eq!(
        h.admission.acquire_token(e1, u3).await.unwrap(),
        TokenResponse { success: true, reason: TokenOutcome::Granted }
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_seat_race_has_single_winner() {
    let h = harness(10);
    let e1 = EventId::new();
    let s1 = h.seat(e1).await;
    let users: Vec<UserId> = (0..10).map(|_| UserId::new()).collect();
    h.enter_all(e1, &users).await;
    for user in &users {
        assert!(h.admission.acquire_token(e1, *user).await.unwrap().success);
    }

    let handles: Vec<_> = users
        .iter()
        .map(|user| {
            let coordinator = Arc::clone(&h.coordinator);
            let user = *user;
            tokio::spawn(async move { coordinator.reserve(e1, s1, user).await })
        })
        .collect();

    let mut winners = Vec::new();
    for handle in handles {
        match handle.await.expect("Task panicked") {
            Ok(reservation) => winners.push(reservation),
            Err(WaitingRoomError::AlreadyReserved(seat)) => assert_eq!(seat, s1),
            Err(WaitingRoomError::SeatContended) => {}
            Err(other) => panic!("unexpected reservation error: {other}"),
        }
    }

    assert_eq!(winners.len(), 1);
    assert_eq!(winners[0].seat_id, s1);
    let seat = h.coordinator.seats().find_seat(s1).await.unwrap().unwrap();
    assert_eq!(seat.status, SeatStatus::Reserved);
    assert_eq!(h.coordinator.seats().reservations_for_seat(s1).await.unwrap().len(), 1);
    // Only the winner gave up their token
    assert!(!h.admission.has_token(e1, winners[0].user_id).await.unwrap());
    assert_eq!(h.queue.token_count(e1).await.unwrap(), 9);
}

#[tokio::test]
async fn test_unauthorized_reserve() {
    let h = harness(2);
    let e1 = EventId::new();
    let s1 = h.seat(e1).await;

    let err = h.coordinator.reserve(e1, s1, UserId::new()).await.unwrap_err();

    assert_eq!(err, WaitingRoomError::NoToken);
    let seat = h.coordinator.seats().find_seat(s1).await.unwrap().unwrap();
    assert_eq!(seat.status, SeatStatus::Available);
}

#[tokio::test]
async fn test_liveness_reaping() {
    let h = harness(2);
    let e1 = EventId::new();
    let u5 = UserId::new();
    h.enter_all(e1, &[u5]).await;

    h.clock.advance(Duration::from_secs(30 + 30));
    let report = h.reaper.sweep().await.unwrap();

    assert_eq!(report.evicted, 1);
    assert_eq!(
        h.admission.get_status(e1, u5).await.unwrap_err(),
        WaitingRoomError::NotInQueue
    );
}

#[tokio::test]
async fn test_successful_reserve_consumes_token() {
    let h = harness(2);
    let e1 = EventId::new();
    let s1 = h.seat(e1).await;
    let u1 = UserId::new();
    h.enter_all(e1, &[u1]).await;
    assert!(h.admission.acquire_token(e1, u1).await.unwrap().success);

    h.coordinator.reserve(e1, s1, u1).await.unwrap();

    assert!(!h.admission.has_token(e1, u1).await.unwrap());
    assert_eq!(
        h.admission.get_status(e1, u1).await.unwrap_err(),
        WaitingRoomError::NotInQueue
    );
}

#[tokio::test]
async fn test_release_without_token_is_noop() {
    let h = harness(2);
    let e1 = EventId::new();
    h.queue.set_token_count(e1, 1).unwrap();

    assert!(!h.admission.release_token(e1, UserId::new()).await.unwrap());
    assert_eq!(h.queue.token_count(e1).await.unwrap(), 1);
}

#[tokio::test]
async fn test_rank_never_increases_between_polls() {
    let h = harness(1);
    let e1 = EventId::new();
    let users: Vec<UserId> = (0..5).map(|_| UserId::new()).collect();
    h.enter_all(e1, &users).await;
    let last = users[4];

    let mut previous = h.admission.get_status(e1, last).await.unwrap().rank().unwrap();
    for user in &users[..4] {
        h.admission.acquire_token(e1, *user).await.unwrap();
        h.admission.release_token(e1, *user).await.unwrap();
        // Late arrivals queue behind
        h.enter_all(e1, &[UserId::new()]).await;

        let rank = h.admission.get_status(e1, last).await.unwrap().rank().unwrap();
        assert!(rank <= previous, "rank went from {previous} to {rank}");
        previous = rank;
    }
    assert_eq!(previous, 0);
}

#[tokio::test]
async fn test_reenter_keeps_position() {
    let h = harness(2);
    let e1 = EventId::new();
    let (u1, u2) = (UserId::new(), UserId::new());
    h.enter_all(e1, &[u1, u2]).await;

    let again = h.admission.enter(e1, u1).await.unwrap();

    assert_eq!(again.rank, 0);
}

#[tokio::test]
async fn test_holder_reentry_is_reaped_while_token_lives() {
    let h = harness(2);
    let e1 = EventId::new();
    let u1 = UserId::new();
    h.enter_all(e1, &[u1]).await;
    assert!(h.admission.acquire_token(e1, u1).await.unwrap().success);

    h.admission.enter(e1, u1).await.unwrap();
    assert_eq!(h.queue.rank(e1, u1).await.unwrap(), Some(0));
    assert_eq!(h.admission.get_status(e1, u1).await.unwrap(), QueueStatus::Entered);

    h.clock.advance(Duration::from_secs(31));
    assert_eq!(h.admission.get_status(e1, u1).await.unwrap(), QueueStatus::Entered);
    let report = h.reaper.sweep().await.unwrap();

    assert_eq!(report.evicted, 1);
    assert_eq!(h.queue.rank(e1, u1).await.unwrap(), None);
    assert!(h.admission.has_token(e1, u1).await.unwrap());
}
