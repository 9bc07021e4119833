//! `Redis`-backed seat lock.
//!
//! # Algorithm
//!
//! 1. `SET key <owner> NX PX <lease>` claims the lock for one lease
//! 2. On failure, sleep 25-75 ms (jittered) and retry until the wait budget runs out
//! 3. Release runs a script that deletes the key only while it still holds `<owner>`
//!
//! A holder that outlives its lease loses the lock silently; the durable
//! store's row lock remains the authority on who reserved the seat.

use crate::scripts;
use rand::Rng;
use redis::aio::ConnectionManager;
use std::time::Duration;
use tokio::time::Instant;
use waiting_room_core::providers::DistributedLock;
use waiting_room_core::{LockToken, Result, WaitingRoomError};

/// Lower bound of the retry backoff.
const RETRY_MIN_MS: u64 = 25;
/// Upper bound of the retry backoff.
const RETRY_MAX_MS: u64 = 75;

/// `Redis` implementation of [`DistributedLock`].
#[derive(Clone)]
pub struct RedisSeatLock {
    /// Connection manager for connection pooling.
    conn_manager: ConnectionManager,
}

impl RedisSeatLock {
    /// Connect to `Redis`.
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

    async fn try_once(&self, key: &str, token: &LockToken, lease: Duration) -> Result<bool> {
        let mut conn = self.conn_manager.clone();
        let lease_ms = u64::try_from(lease.as_millis()).unwrap_or(u64::MAX).max(1);

        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(token.as_str())
            .arg("NX")
            .arg("PX")
            .arg(lease_ms)
            .query_async(&mut conn)
            .await
            .map_err(|e| WaitingRoomError::Cache(format!("Failed to acquire lock: {e}")))?;

        Ok(reply.is_some())
    }
}

impl DistributedLock for RedisSeatLock {
    async fn try_lock(&self, key: &str, wait: Duration, lease: Duration) -> Result<Option<LockToken>> {
        let token = LockToken::generate();
        let deadline = Instant::now() + wait;
        let mut attempts: u32 = 0;

        loop {
            attempts += 1;
            if self.try_once(key, &token, lease).await? {
                tracing::debug!(key = %key, attempts = attempts, "Lock acquired");
                return Ok(Some(token));
            }

            let now = Instant::now();
            if now >= deadline {
                tracing::debug!(key = %key, attempts = attempts, "Lock wait budget exhausted");
                return Ok(None);
            }

            let backoff = Duration::from_millis(rand::thread_rng().gen_range(RETRY_MIN_MS..=RETRY_MAX_MS));
            tokio::time::sleep(backoff.min(deadline - now)).await;
        }
    }

    async fn unlock(&self, key: &str, token: &LockToken) -> Result<bool> {
        let mut conn = self.conn_manager.clone();

        let deleted: i64 = scripts::UNLOCK
            .key(key)
            .arg(token.as_str())
            .invoke_async(&mut conn)
            .await
            .map_err(|e| WaitingRoomError::Cache(format!("Failed to release lock: {e}")))?;

        Ok(deleted == 1)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    // Run with: docker run -d -p 6379:6379 redis:7-alpine

    const URL: &str = "redis://127.0.0.1:6379";

    fn key() -> String {
        format!("lock:test:{}", LockToken::generate())
    }

    #[tokio::test]
    #[ignore] // Requires Redis running
    async fn test_lock_is_exclusive_until_released() {
        let lock = RedisSeatLock::new(URL).await.unwrap();
        let key = key();
        let lease = Duration::from_secs(5);

        let token = lock.try_lock(&key, Duration::ZERO, lease).await.unwrap().unwrap();
        assert!(lock
            .try_lock(&key, Duration::from_millis(100), lease)
            .await
            .unwrap()
            .is_none());

        assert!(lock.unlock(&key, &token).await.unwrap());
        assert!(lock.try_lock(&key, Duration::ZERO, lease).await.unwrap().is_some());
    }

    #[tokio::test]
    #[ignore] // Requires Redis running
    async fn test_expired_owner_cannot_unlock_successor() {
        let lock = RedisSeatLock::new(URL).await.unwrap();
        let key = key();

        let stale = lock
            .try_lock(&key, Duration::ZERO, Duration::from_millis(50))
            .await
            .unwrap()
            .unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        let fresh = lock
            .try_lock(&key, Duration::ZERO, Duration::from_secs(5))
            .await
            .unwrap()
            .unwrap();

        assert!(!lock.unlock(&key, &stale).await.unwrap());
        assert!(lock.unlock(&key, &fresh).await.unwrap());
    }
}
