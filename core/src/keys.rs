//! Cache-tier key layout.
//!
//! Operational tooling depends on these exact shapes:
//!
//! ```text
//! queue:<eventId>                 sorted-set (user → arrival score)
//! queue:activity:<eventId>:<u>    string, TTL activityTtl
//! token:<eventId>:<u>             string, TTL tokenTtl
//! token:count:<eventId>           counter
//! lock:seat:<eventId>:<seatId>    distributed lock
//! seat:count:<eventId>            counter (advisory remaining-seat gauge)
//! ```

use crate::types::{EventId, SeatId, UserId};

/// Glob matching every queue key, including heartbeat keys (filter with [`parse_queue_key`]).
pub const QUEUE_SCAN_PATTERN: &str = "queue:*";

const QUEUE_PREFIX: &str = "queue:";

/// Sorted set holding the event's waiting users.
#[must_use]
pub fn queue(event_id: EventId) -> String {
    format!("{QUEUE_PREFIX}{event_id}")
}

/// Activity heartbeat for a queued user.
#[must_use]
pub fn activity(event_id: EventId, user_id: UserId) -> String {
    format!("queue:activity:{event_id}:{user_id}")
}

/// Admission token marker.
#[must_use]
pub fn token(event_id: EventId, user_id: UserId) -> String {
    format!("token:{event_id}:{user_id}")
}

/// Glob matching every admission token of one event.
///
/// Never matches the counter key because `count` is not a UUID.
#[must_use]
pub fn token_scan_pattern(event_id: EventId) -> String {
    format!("token:{event_id}:*")
}

/// Outstanding-token counter.
#[must_use]
pub fn token_count(event_id: EventId) -> String {
    format!("token:count:{event_id}")
}

/// Per-seat distributed lock.
#[must_use]
pub fn seat_lock(event_id: EventId, seat_id: SeatId) -> String {
    format!("lock:seat:{event_id}:{seat_id}")
}

/// Advisory remaining-seat gauge.
#[must_use]
pub fn seat_count(event_id: EventId) -> String {
    format!("seat:count:{event_id}")
}

/// Recover the event from a `queue:<eventId>` key.
///
/// Returns `None` for heartbeat keys and anything else that is not exactly a
/// queue key followed by a UUID.
#[must_use]
pub fn parse_queue_key(key: &str) -> Option<EventId> {
    let rest = key.strip_prefix(QUEUE_PREFIX)?;
    if rest.contains(':') {
        return None;
    }
    rest.parse().ok()
}
