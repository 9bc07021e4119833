//! HTTP API tests against the router wired to the in-memory adapters.

#![allow(clippy::expect_used, clippy::unwrap_used)] // Test code can use unwrap/expect

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::{TestRequest, TestServer};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use waiting_room_core::environment::SystemClock;
use waiting_room_core::{AdmissionConfig, EventId, SeatId, SeatLockConfig, UserId};
use waiting_room_server::{AppState, build_router};
use waiting_room_testing::mocks::{InMemoryQueueStore, InMemorySeatLock, InMemorySeatRepository};

struct Harness {
    server: TestServer,
    queue: InMemoryQueueStore,
}

fn harness(max_concurrent: u32, admin: bool) -> Harness {
    let queue = InMemoryQueueStore::new();
    let state = AppState::new(
        queue.clone(),
        InMemorySeatLock::new(),
        InMemorySeatRepository::new(),
        AdmissionConfig::default().with_max_concurrent(max_concurrent),
        SeatLockConfig {
            wait: Duration::from_millis(200),
            lease: Duration::from_secs(5),
        },
        Arc::new(SystemClock),
    )
    .with_admin(admin);

    let server = TestServer::new(build_router(state)).expect("Failed to build test server");
    Harness { server, queue }
}

fn as_user(request: TestRequest, user: UserId) -> TestRequest {
    request.add_header(
        HeaderName::from_static("x-user-id"),
        HeaderValue::from_str(&user.to_string()).unwrap(),
    )
}

impl Harness {
    async fn load_seats(&self, count: u32) -> (EventId, Vec<SeatId>) {
        let body: Value = self
            .server
            .post("/api/admin/events/seats")
            .json(&json!({ "seatCount": count }))
            .await
            .json();

        let event_id: EventId = serde_json::from_value(body["eventId"].clone()).unwrap();
        let seat_ids: Vec<SeatId> = serde_json::from_value(body["seatIds"].clone()).unwrap();
        (event_id, seat_ids)
    }

    async fn enter(&self, event_id: EventId, user: UserId) -> Value {
        as_user(self.server.post("/api/queue/enter"), user)
            .add_query_param("eventId", event_id)
            .await
            .json()
    }

    async fn acquire(&self, event_id: EventId, user: UserId) -> Value {
        as_user(self.server.post("/api/queue/token"), user)
            .add_query_param("eventId", event_id)
            .await
            .json()
    }
}

#[tokio::test]
async fn test_health_is_ok() {
    let h = harness(1, false);

    let response = h.server.get("/health").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<Value>()["status"], "ok");
}

#[tokio::test]
async fn test_missing_user_header_is_bad_request() {
    let h = harness(1, false);

    let response = h
        .server
        .post("/api/queue/enter")
        .add_query_param("eventId", EventId::new())
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_malformed_event_id_is_bad_request() {
    let h = harness(1, false);

    let response = as_user(h.server.get("/api/queue/status"), UserId::new())
        .add_query_param("eventId", "not-a-uuid")
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_enter_then_poll_reports_window() {
    let h = harness(1, false);
    let event = EventId::new();
    let (first, second) = (UserId::new(), UserId::new());

    assert_eq!(h.enter(event, first).await["rank"], 0);
    h.enter(event, second).await;

    let status: Value = as_user(h.server.get("/api/queue/status"), first)
        .add_query_param("eventId", event)
        .await
        .json();
    assert_eq!(status, json!({ "status": "READY", "rank": 0, "ahead": 0 }));

    let status: Value = as_user(h.server.get("/api/queue/status"), second)
        .add_query_param("eventId", event)
        .await
        .json();
    assert_eq!(status, json!({ "status": "WAITING", "rank": 1, "ahead": 1 }));
}

#[tokio::test]
async fn test_unknown_user_status_is_not_in_queue() {
    let h = harness(1, false);

    let response = as_user(h.server.get("/api/queue/status"), UserId::new())
        .add_query_param("eventId", EventId::new())
        .await;

    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(response.json::<Value>()["code"], "NOT_IN_QUEUE");
}

#[tokio::test]
async fn test_token_cap_is_enforced() {
    let h = harness(1, false);
    let event = EventId::new();
    let (first, second) = (UserId::new(), UserId::new());
    h.enter(event, first).await;
    h.enter(event, second).await;

    assert_eq!(
        h.acquire(event, first).await,
        json!({ "success": true, "reason": "GRANTED" })
    );
    assert_eq!(
        h.acquire(event, second).await,
        json!({ "success": false, "reason": "NOT_YET" })
    );

    let status: Value = as_user(h.server.get("/api/queue/status"), first)
        .add_query_param("eventId", event)
        .await
        .json();
    assert_eq!(status, json!({ "status": "ENTERED" }));
}

#[tokio::test]
async fn test_reserve_without_token_is_forbidden() {
    let h = harness(1, true);
    let (event, seats) = h.load_seats(1).await;

    let response = as_user(h.server.post("/api/reservations"), UserId::new())
        .json(&json!({ "eventId": event, "seatId": seats[0] }))
        .await;

    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
    assert_eq!(response.json::<Value>()["code"], "NO_TOKEN");
}

#[tokio::test]
async fn test_full_reservation_flow() {
    let h = harness(1, true);
    let (event, seats) = h.load_seats(3).await;
    let (winner, loser) = (UserId::new(), UserId::new());

    h.enter(event, winner).await;
    h.enter(event, loser).await;
    assert_eq!(h.acquire(event, winner).await["success"], true);

    let response = as_user(h.server.post("/api/reservations"), winner)
        .json(&json!({ "eventId": event, "seatId": seats[0] }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let reservation: Value = response.json();
    assert_eq!(reservation["seatId"], json!(seats[0]));
    assert_eq!(reservation["userId"], json!(winner));

    // The winner's token was released, so the next user is admitted
    assert_eq!(h.acquire(event, loser).await["success"], true);
    let response = as_user(h.server.post("/api/reservations"), loser)
        .json(&json!({ "eventId": event, "seatId": seats[0] }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CONFLICT);
    assert_eq!(response.json::<Value>()["code"], "ALREADY_RESERVED");

    let listed: Value = h.server.get(&format!("/api/events/{event}/seats")).await.json();
    assert_eq!(listed[0]["label"], "A1");
    assert_eq!(listed[0]["status"], "RESERVED");
    assert_eq!(listed[1]["status"], "AVAILABLE");

    let remaining: Value = h
        .server
        .get(&format!("/api/events/{event}/remaining"))
        .await
        .json();
    assert_eq!(remaining["remaining"], 2);
}

#[tokio::test]
async fn test_seat_from_other_event_is_not_found() {
    let h = harness(1, true);
    let (_, seats) = h.load_seats(1).await;
    let other_event = EventId::new();
    let user = UserId::new();

    h.enter(other_event, user).await;
    h.acquire(other_event, user).await;

    let response = as_user(h.server.post("/api/reservations"), user)
        .json(&json!({ "eventId": other_event, "seatId": seats[0] }))
        .await;

    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(response.json::<Value>()["code"], "SEAT_NOT_FOUND");
}

#[tokio::test]
async fn test_admin_routes_hidden_when_disabled() {
    let h = harness(1, false);

    let response = h
        .server
        .post("/api/admin/events/seats")
        .json(&json!({ "seatCount": 5 }))
        .await;

    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_zero_seat_catalog_is_rejected() {
    let h = harness(1, true);

    let response = h
        .server
        .post("/api/admin/events/seats")
        .json(&json!({ "seatCount": 0 }))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_reconcile_recovers_leaked_counter() {
    let h = harness(1, true);
    let event = EventId::new();
    h.queue.set_token_count(event, 7).unwrap();

    let response = h
        .server
        .post(&format!("/api/admin/events/{event}/tokens/reconcile"))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<Value>()["count"], 0);
}

#[tokio::test]
async fn test_purge_empties_queue() {
    let h = harness(1, true);
    let event = EventId::new();
    h.enter(event, UserId::new()).await;

    let response = h
        .server
        .delete(&format!("/api/admin/events/{event}/queue"))
        .await;

    assert_eq!(response.status_code(), StatusCode::NO_CONTENT);
    assert_eq!(h.queue.queue_len(event).unwrap(), 0);
}

#[tokio::test]
async fn test_cache_outage_is_service_unavailable() {
    let h = harness(1, false);
    h.queue.set_offline(true);

    let response = as_user(h.server.post("/api/queue/enter"), UserId::new())
        .add_query_param("eventId", EventId::new())
        .await;
    assert_eq!(response.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.json::<Value>()["code"], "INFRA_UNAVAILABLE");

    let ready = h.server.get("/ready").await;
    assert_eq!(ready.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(ready.json::<Value>()["status"], "unhealthy");
}

#[tokio::test]
async fn test_metrics_not_served_without_recorder() {
    let h = harness(1, false);

    let response = h.server.get("/metrics").await;

    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}
