//! In-memory seat lock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use waiting_room_core::providers::DistributedLock;
use waiting_room_core::{LockToken, Result, WaitingRoomError};

const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// In-process [`DistributedLock`] with lease expiry.
///
/// Uses Tokio's clock, so tests running with paused time see leases expire
/// as soon as time is advanced.
#[derive(Debug, Clone, Default)]
pub struct InMemorySeatLock {
    /// Map of key -> (owner, lease expiry)
    held: Arc<Mutex<HashMap<String, (LockToken, Instant)>>>,
}

impl InMemorySeatLock {
    /// Create an empty lock table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `key` is held by anyone right now.
    ///
    /// # Errors
    ///
    /// Returns [`WaitingRoomError::Cache`] if the table mutex is poisoned.
    pub fn is_locked(&self, key: &str) -> Result<bool> {
        let now = Instant::now();
        Ok(self
            .table()?
            .get(key)
            .is_some_and(|(_, expires)| *expires > now))
    }

    fn table(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, (LockToken, Instant)>>> {
        self.held
            .lock()
            .map_err(|_| WaitingRoomError::Cache("Mutex lock failed".into()))
    }

    fn try_once(&self, key: &str, lease: Duration) -> Result<Option<LockToken>> {
        let now = Instant::now();
        let mut held = self.table()?;
        if held.get(key).is_some_and(|(_, expires)| *expires > now) {
            return Ok(None);
        }
        let token = LockToken::generate();
        held.insert(key.to_string(), (token.clone(), now + lease));
        Ok(Some(token))
    }
}

impl DistributedLock for InMemorySeatLock {
    async fn try_lock(&self, key: &str, wait: Duration, lease: Duration) -> Result<Option<LockToken>> {
        let deadline = Instant::now() + wait;
        loop {
            if let Some(token) = self.try_once(key, lease)? {
                return Ok(Some(token));
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            tokio::time::sleep(POLL_INTERVAL.min(deadline - now)).await;
        }
    }

    async fn unlock(&self, key: &str, token: &LockToken) -> Result<bool> {
        let now = Instant::now();
        let mut held = self.table()?;
        let Some((owner, expires)) = held.get(key) else {
            return Ok(false);
        };
        let owned = owner == token && *expires > now;
        if owned || *expires <= now {
            held.remove(key);
        }
        Ok(owned)
    }
}
