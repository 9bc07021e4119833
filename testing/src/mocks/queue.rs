//! In-memory queue store.

use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use waiting_room_core::environment::{Clock, SystemClock};
use waiting_room_core::providers::QueueStore;
use waiting_room_core::{EventId, Result, TokenOutcome, UserId, WaitingRoomError};

/// In-memory [`QueueStore`] with the same observable semantics as the Redis
/// adapter.
///
/// Every operation runs under a single mutex, so the admission decision is as
/// atomic as the server-side script. TTLs are evaluated lazily against the
/// injected clock: an expired token or heartbeat simply stops being visible,
/// and, like the cache tier, an expired token does **not** decrement the
/// concurrency counter.
#[derive(Clone)]
pub struct InMemoryQueueStore {
    events: Arc<Mutex<HashMap<EventId, EventState>>>,
    clock: Arc<dyn Clock>,
    offline: Arc<AtomicBool>,
}

#[derive(Default)]
struct EventState {
    /// Ordered by (score, user id) like a sorted set
    queue: BTreeSet<(i64, UserId)>,
    scores: HashMap<UserId, i64>,
    /// Expiry instants
    activity: HashMap<UserId, DateTime<Utc>>,
    tokens: HashMap<UserId, DateTime<Utc>>,
    token_count: i64,
    seat_count: Option<i64>,
}

impl EventState {
    fn rank(&self, user_id: UserId) -> Option<u64> {
        let score = *self.scores.get(&user_id)?;
        Some(self.queue.range(..(score, user_id)).count() as u64)
    }

    fn dequeue(&mut self, user_id: UserId) -> bool {
        match self.scores.remove(&user_id) {
            Some(score) => self.queue.remove(&(score, user_id)),
            None => false,
        }
    }

    fn token_alive(&self, user_id: UserId, now: DateTime<Utc>) -> bool {
        self.tokens.get(&user_id).is_some_and(|expires| *expires > now)
    }

    fn activity_alive(&self, user_id: UserId, now: DateTime<Utc>) -> bool {
        self.activity.get(&user_id).is_some_and(|expires| *expires > now)
    }
}

impl InMemoryQueueStore {
    /// Create a store driven by the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create a store whose TTLs are evaluated against `clock`.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            events: Arc::new(Mutex::new(HashMap::new())),
            clock,
            offline: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Simulate the cache tier going away. Every operation fails while offline.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Overwrite the concurrency counter, e.g. to simulate drift.
    ///
    /// # Errors
    ///
    /// Returns [`WaitingRoomError::Cache`] if the store is offline.
    pub fn set_token_count(&self, event_id: EventId, count: i64) -> Result<()> {
        self.state()?.entry(event_id).or_default().token_count = count;
        Ok(())
    }

    /// Number of queued users.
    ///
    /// # Errors
    ///
    /// Returns [`WaitingRoomError::Cache`] if the store is offline.
    pub fn queue_len(&self, event_id: EventId) -> Result<usize> {
        Ok(self.state()?.get(&event_id).map_or(0, |event| event.queue.len()))
    }

    fn state(&self) -> Result<MutexGuard<'_, HashMap<EventId, EventState>>> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(WaitingRoomError::Cache("Connection refused".into()));
        }
        self.events
            .lock()
            .map_err(|_| WaitingRoomError::Cache("Mutex lock failed".into()))
    }

    fn expires_at(&self, ttl: Duration) -> DateTime<Utc> {
        self.clock.now() + ttl
    }
}

impl Default for InMemoryQueueStore {
    fn default() -> Self {
        Self::new()
    }
}

impl QueueStore for InMemoryQueueStore {
    async fn enter(
        &self,
        event_id: EventId,
        user_id: UserId,
        score_ms: i64,
        activity_ttl: Duration,
    ) -> Result<u64> {
        let expires = self.expires_at(activity_ttl);
        let mut events = self.state()?;
        let event = events.entry(event_id).or_default();

        if !event.scores.contains_key(&user_id) {
            event.scores.insert(user_id, score_ms);
            event.queue.insert((score_ms, user_id));
        }
        event.activity.insert(user_id, expires);

        Ok(event.rank(user_id).unwrap_or_default())
    }

    async fn refresh_token(&self, event_id: EventId, user_id: UserId, ttl: Duration) -> Result<bool> {
        let now = self.clock.now();
        let mut events = self.state()?;
        let Some(event) = events.get_mut(&event_id) else {
            return Ok(false);
        };
        if !event.token_alive(user_id, now) {
            return Ok(false);
        }
        event.tokens.insert(user_id, now + ttl);
        Ok(true)
    }

    async fn rank(&self, event_id: EventId, user_id: UserId) -> Result<Option<u64>> {
        Ok(self
            .state()?
            .get(&event_id)
            .and_then(|event| event.rank(user_id)))
    }

    async fn touch_activity(&self, event_id: EventId, user_id: UserId, ttl: Duration) -> Result<()> {
        let expires = self.expires_at(ttl);
        self.state()?
            .entry(event_id)
            .or_default()
            .activity
            .insert(user_id, expires);
        Ok(())
    }

    async fn token_count(&self, event_id: EventId) -> Result<i64> {
        Ok(self
            .state()?
            .get(&event_id)
            .map_or(0, |event| event.token_count))
    }

    async fn acquire_token(
        &self,
        event_id: EventId,
        user_id: UserId,
        max_concurrent: u32,
        token_ttl: Duration,
    ) -> Result<TokenOutcome> {
        let now = self.clock.now();
        let mut events = self.state()?;
        let event = events.entry(event_id).or_default();

        if event.token_alive(user_id, now) {
            return Ok(TokenOutcome::Granted);
        }

        let Some(rank) = event.rank(user_id) else {
            return Ok(TokenOutcome::NotInQueue);
        };

        let remaining = i64::from(max_concurrent) - event.token_count;
        if i64::try_from(rank).unwrap_or(i64::MAX) < remaining {
            event.tokens.insert(user_id, now + token_ttl);
            event.token_count += 1;
            event.dequeue(user_id);
            return Ok(TokenOutcome::Granted);
        }

        Ok(TokenOutcome::NotYet)
    }

    async fn has_token(&self, event_id: EventId, user_id: UserId) -> Result<bool> {
        let now = self.clock.now();
        Ok(self
            .state()?
            .get(&event_id)
            .is_some_and(|event| event.token_alive(user_id, now)))
    }

    async fn release_token(&self, event_id: EventId, user_id: UserId) -> Result<bool> {
        let now = self.clock.now();
        let mut events = self.state()?;
        let Some(event) = events.get_mut(&event_id) else {
            return Ok(false);
        };
        if !event.token_alive(user_id, now) {
            event.tokens.remove(&user_id);
            return Ok(false);
        }
        event.tokens.remove(&user_id);
        event.token_count -= 1;
        Ok(true)
    }

    async fn queued_events(&self) -> Result<Vec<EventId>> {
        let mut events: Vec<EventId> = self
            .state()?
            .iter()
            .filter(|(_, event)| !event.queue.is_empty())
            .map(|(event_id, _)| *event_id)
            .collect();
        events.sort_unstable();
        Ok(events)
    }

    async fn queue_members(&self, event_id: EventId) -> Result<Vec<UserId>> {
        Ok(self.state()?.get(&event_id).map_or_else(Vec::new, |event| {
            event.queue.iter().map(|(_, user_id)| *user_id).collect()
        }))
    }

    async fn activity_alive(&self, event_id: EventId, user_ids: &[UserId]) -> Result<Vec<bool>> {
        let now = self.clock.now();
        let events = self.state()?;
        let event = events.get(&event_id);
        Ok(user_ids
            .iter()
            .map(|user_id| event.is_some_and(|event| event.activity_alive(*user_id, now)))
            .collect())
    }

    async fn remove_members(&self, event_id: EventId, user_ids: &[UserId]) -> Result<u64> {
        let mut events = self.state()?;
        let Some(event) = events.get_mut(&event_id) else {
            return Ok(0);
        };
        let mut removed = 0;
        for user_id in user_ids {
            if event.dequeue(*user_id) {
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn purge_queue(&self, event_id: EventId) -> Result<bool> {
        let mut events = self.state()?;
        let Some(event) = events.get_mut(&event_id) else {
            return Ok(false);
        };
        let existed = !event.queue.is_empty();
        event.queue.clear();
        event.scores.clear();
        Ok(existed)
    }

    async fn add_seat_count(&self, event_id: EventId, count: i64) -> Result<i64> {
        let mut events = self.state()?;
        let gauge = &mut events.entry(event_id).or_default().seat_count;
        let next = gauge.unwrap_or_default() + count;
        *gauge = Some(next);
        Ok(next)
    }

    async fn seat_count(&self, event_id: EventId) -> Result<Option<i64>> {
        Ok(self
            .state()?
            .get(&event_id)
            .and_then(|event| event.seat_count))
    }

    async fn decrement_seat_count(&self, event_id: EventId) -> Result<i64> {
        let mut events = self.state()?;
        let count = &mut events.entry(event_id).or_default().seat_count;
        let next = count.unwrap_or_default() - 1;
        *count = Some(next);
        Ok(next)
    }

    async fn reconcile_token_count(&self, event_id: EventId) -> Result<i64> {
        let now = self.clock.now();
        let mut events = self.state()?;
        let event = events.entry(event_id).or_default();
        event.tokens.retain(|_, expires| *expires > now);
        event.token_count = i64::try_from(event.tokens.len()).unwrap_or(i64::MAX);
        Ok(event.token_count)
    }

    async fn ping(&self) -> Result<()> {
        self.state().map(|_| ())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::{ManualClock, test_clock};

    const TTL: Duration = Duration::from_secs(30);

    fn store() -> (InMemoryQueueStore, ManualClock) {
        let clock = ManualClock::from(test_clock());
        (InMemoryQueueStore::with_clock(Arc::new(clock.clone())), clock)
    }

    #[tokio::test]
    async fn test_enter_keeps_original_position() {
        let (store, _) = store();
        let event = EventId::new();
        let (first, second) = (UserId::new(), UserId::new());

        assert_eq!(store.enter(event, first, 100, TTL).await.unwrap(), 0);
        assert_eq!(store.enter(event, second, 200, TTL).await.unwrap(), 1);
        // Re-entering with a later score changes nothing
        assert_eq!(store.enter(event, first, 300, TTL).await.unwrap(), 0);
        assert_eq!(store.queue_len(event).unwrap(), 2);
    }

    #[tokio::test]
    async fn test_equal_scores_order_by_user_id() {
        let (store, _) = store();
        let event = EventId::new();
        let mut users = [UserId::new(), UserId::new()];
        users.sort();

        store.enter(event, users[1], 100, TTL).await.unwrap();
        store.enter(event, users[0], 100, TTL).await.unwrap();

        assert_eq!(store.rank(event, users[0]).await.unwrap(), Some(0));
        assert_eq!(store.rank(event, users[1]).await.unwrap(), Some(1));
    }

    #[tokio::test]
    async fn test_expired_token_keeps_counter() {
        let (store, clock) = store();
        let event = EventId::new();
        let user = UserId::new();

        store.enter(event, user, 1, TTL).await.unwrap();
        let outcome = store.acquire_token(event, user, 1, TTL).await.unwrap();
        assert_eq!(outcome, TokenOutcome::Granted);

        clock.advance(TTL);

        assert!(!store.has_token(event, user).await.unwrap());
        assert_eq!(store.token_count(event).await.unwrap(), 1);
        assert!(!store.release_token(event, user).await.unwrap());
        assert_eq!(store.reconcile_token_count(event).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_offline_store_reports_cache_error() {
        let (store, _) = store();
        store.set_offline(true);

        let err = store.ping().await.unwrap_err();
        assert_eq!(err.code(), "INFRA_UNAVAILABLE");
    }
}
