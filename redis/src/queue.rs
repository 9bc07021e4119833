//! `Redis`-backed queue store.
//!
//! # Data Layout
//!
//! See [`waiting_room_core::keys`]. The queue is a sorted set scored by arrival
//! time in milliseconds; `Redis` orders equal scores lexicographically by
//! member, so simultaneous arrivals are ranked by user id.

use crate::scripts;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use std::collections::BTreeSet;
use std::time::Duration;
use waiting_room_core::providers::QueueStore;
use waiting_room_core::{EventId, Result, TokenOutcome, UserId, WaitingRoomError, keys};

/// Keys requested per `SCAN` round trip.
const SCAN_BATCH: usize = 500;

/// `Redis` implementation of [`QueueStore`].
///
/// # Example
///
/// ```no_run
/// use waiting_room_redis::RedisQueueStore;
/// use waiting_room_core::providers::QueueStore;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = RedisQueueStore::new("redis://127.0.0.1:6379").await?;
/// store.ping().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct RedisQueueStore {
    /// Connection manager for connection pooling.
    conn_manager: ConnectionManager,
}

impl RedisQueueStore {
    /// Connect to `Redis`.
    ///
    /// # Arguments
    ///
    /// * `redis_url` - `Redis` connection URL (e.g., "<redis://127.0.0.1:6379>")
    ///
    /// # Errors
    ///
    /// Returns [`WaitingRoomError::Cache`] if the connection cannot be established.
    pub async fn new(redis_url: &str) -> Result<Self> {
        Ok(Self::from_manager(crate::connect(redis_url).await?))
    }

    /// Wrap an existing connection manager.
    #[must_use]
    pub const fn from_manager(conn_manager: ConnectionManager) -> Self {
        Self { conn_manager }
    }

    /// Collect every key matching `pattern` without blocking the server.
    ///
    /// `SCAN` may return a key more than once; callers dedupe.
    async fn scan(&self, pattern: &str) -> Result<Vec<String>> {
        let mut conn = self.conn_manager.clone();
        let mut cursor: u64 = 0;
        let mut found = Vec::new();

        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await
                .map_err(|e| WaitingRoomError::Cache(format!("Failed to scan keys: {e}")))?;

            found.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }

        Ok(found)
    }
}

/// `EXPIRE` takes signed seconds.
fn ttl_secs(ttl: Duration) -> i64 {
    i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX)
}

impl QueueStore for RedisQueueStore {
    async fn enter(
        &self,
        event_id: EventId,
        user_id: UserId,
        score_ms: i64,
        activity_ttl: Duration,
    ) -> Result<u64> {
        let mut conn = self.conn_manager.clone();

        let rank: u64 = scripts::ENTER
            .key(keys::queue(event_id))
            .key(keys::activity(event_id, user_id))
            .arg(user_id.to_string())
            .arg(score_ms)
            .arg(activity_ttl.as_secs())
            .invoke_async(&mut conn)
            .await
            .map_err(|e| WaitingRoomError::Cache(format!("Failed to enter queue: {e}")))?;

        tracing::debug!(
            event_id = %event_id,
            user_id = %user_id,
            rank = rank,
            "Queue entry stored"
        );

        Ok(rank)
    }

    async fn refresh_token(&self, event_id: EventId, user_id: UserId, ttl: Duration) -> Result<bool> {
        let mut conn = self.conn_manager.clone();

        conn.expire(keys::token(event_id, user_id), ttl_secs(ttl))
            .await
            .map_err(|e| WaitingRoomError::Cache(format!("Failed to refresh token: {e}")))
    }

    async fn rank(&self, event_id: EventId, user_id: UserId) -> Result<Option<u64>> {
        let mut conn = self.conn_manager.clone();

        conn.zrank(keys::queue(event_id), user_id.to_string())
            .await
            .map_err(|e| WaitingRoomError::Cache(format!("Failed to read queue rank: {e}")))
    }

    async fn touch_activity(&self, event_id: EventId, user_id: UserId, ttl: Duration) -> Result<()> {
        let mut conn = self.conn_manager.clone();

        conn.set_ex(keys::activity(event_id, user_id), 1, ttl.as_secs())
            .await
            .map_err(|e| WaitingRoomError::Cache(format!("Failed to refresh activity: {e}")))
    }

    async fn token_count(&self, event_id: EventId) -> Result<i64> {
        let mut conn = self.conn_manager.clone();

        let count: Option<i64> = conn
            .get(keys::token_count(event_id))
            .await
            .map_err(|e| WaitingRoomError::Cache(format!("Failed to read token count: {e}")))?;

        Ok(count.unwrap_or_default())
    }

    async fn acquire_token(
        &self,
        event_id: EventId,
        user_id: UserId,
        max_concurrent: u32,
        token_ttl: Duration,
    ) -> Result<TokenOutcome> {
        let mut conn = self.conn_manager.clone();

        let code: i64 = scripts::ACQUIRE_TOKEN
            .key(keys::token(event_id, user_id))
            .key(keys::token_count(event_id))
            .key(keys::queue(event_id))
            .arg(user_id.to_string())
            .arg(max_concurrent)
            .arg(token_ttl.as_secs())
            .invoke_async(&mut conn)
            .await
            .map_err(|e| WaitingRoomError::Cache(format!("Failed to run admission script: {e}")))?;

        Ok(TokenOutcome::from_script_code(code))
    }

    async fn has_token(&self, event_id: EventId, user_id: UserId) -> Result<bool> {
        let mut conn = self.conn_manager.clone();

        conn.exists(keys::token(event_id, user_id))
            .await
            .map_err(|e| WaitingRoomError::Cache(format!("Failed to check token: {e}")))
    }

    async fn release_token(&self, event_id: EventId, user_id: UserId) -> Result<bool> {
        let mut conn = self.conn_manager.clone();

        let released: i64 = scripts::RELEASE_TOKEN
            .key(keys::token(event_id, user_id))
            .key(keys::token_count(event_id))
            .invoke_async(&mut conn)
            .await
            .map_err(|e| WaitingRoomError::Cache(format!("Failed to release token: {e}")))?;

        Ok(released == 1)
    }

    async fn queued_events(&self) -> Result<Vec<EventId>> {
        let events: BTreeSet<EventId> = self
            .scan(keys::QUEUE_SCAN_PATTERN)
            .await?
            .iter()
            .filter_map(|key| keys::parse_queue_key(key))
            .collect();

        Ok(events.into_iter().collect())
    }

    async fn queue_members(&self, event_id: EventId) -> Result<Vec<UserId>> {
        let mut conn = self.conn_manager.clone();

        let members: Vec<String> = conn
            .zrange(keys::queue(event_id), 0, -1)
            .await
            .map_err(|e| WaitingRoomError::Cache(format!("Failed to read queue members: {e}")))?;

        Ok(members
            .iter()
            .filter_map(|member| match member.parse() {
                Ok(user_id) => Some(user_id),
                Err(_) => {
                    tracing::warn!(event_id = %event_id, member = %member, "Ignoring malformed queue member");
                    None
                }
            })
            .collect())
    }

    async fn activity_alive(&self, event_id: EventId, user_ids: &[UserId]) -> Result<Vec<bool>> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.conn_manager.clone();

        let mut pipe = redis::pipe();
        for user_id in user_ids {
            pipe.exists(keys::activity(event_id, *user_id));
        }

        pipe.query_async(&mut conn)
            .await
            .map_err(|e| WaitingRoomError::Cache(format!("Failed to check activity: {e}")))
    }

    async fn remove_members(&self, event_id: EventId, user_ids: &[UserId]) -> Result<u64> {
        if user_ids.is_empty() {
            return Ok(0);
        }
        let mut conn = self.conn_manager.clone();
        let members: Vec<String> = user_ids.iter().map(ToString::to_string).collect();

        conn.zrem(keys::queue(event_id), members)
            .await
            .map_err(|e| WaitingRoomError::Cache(format!("Failed to remove queue members: {e}")))
    }

    async fn purge_queue(&self, event_id: EventId) -> Result<bool> {
        let mut conn = self.conn_manager.clone();

        conn.del(keys::queue(event_id))
            .await
            .map_err(|e| WaitingRoomError::Cache(format!("Failed to purge queue: {e}")))
    }

    async fn add_seat_count(&self, event_id: EventId, count: i64) -> Result<i64> {
        let mut conn = self.conn_manager.clone();

        conn.incr(keys::seat_count(event_id), count)
            .await
            .map_err(|e| WaitingRoomError::Cache(format!("Failed to add to seat count: {e}")))
    }

    async fn seat_count(&self, event_id: EventId) -> Result<Option<i64>> {
        let mut conn = self.conn_manager.clone();

        conn.get(keys::seat_count(event_id))
            .await
            .map_err(|e| WaitingRoomError::Cache(format!("Failed to read seat count: {e}")))
    }

    async fn decrement_seat_count(&self, event_id: EventId) -> Result<i64> {
        let mut conn = self.conn_manager.clone();

        conn.decr(keys::seat_count(event_id), 1)
            .await
            .map_err(|e| WaitingRoomError::Cache(format!("Failed to decrement seat count: {e}")))
    }

    async fn reconcile_token_count(&self, event_id: EventId) -> Result<i64> {
        // Tokens minted or released between the scan and the write are not
        // reflected; run on a quiet event or repeat.
        let markers = self.scan(&keys::token_scan_pattern(event_id)).await?;
        let live = i64::try_from(markers.iter().collect::<BTreeSet<_>>().len()).unwrap_or(i64::MAX);

        let mut conn = self.conn_manager.clone();
        let _: () = conn
            .set(keys::token_count(event_id), live)
            .await
            .map_err(|e| WaitingRoomError::Cache(format!("Failed to write token count: {e}")))?;

        Ok(live)
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.conn_manager.clone();

        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| WaitingRoomError::Cache(format!("Failed to ping Redis: {e}")))?;

        Ok(())
    }
}
