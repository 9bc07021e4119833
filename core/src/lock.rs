//! Scoped ownership of a distributed lock.
//!
//! A [`LockGuard`] is released explicitly with [`LockGuard::release`]. If the
//! guard is dropped instead (the owning task was cancelled mid-critical-section)
//! the unlock is spawned on the current Tokio runtime. The lease expiry on the
//! backing store remains the last line of defence.

use crate::error::Result;
use crate::providers::DistributedLock;
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// Proof of ownership for an acquired lock.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct LockToken(String);

impl LockToken {
    /// Fresh random owner token.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Token value as stored in the lock key.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LockToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An acquired distributed lock that is released on every exit path.
///
/// # Example
///
/// ```no_run
/// use waiting_room_core::LockGuard;
/// use waiting_room_core::providers::DistributedLock;
/// use std::time::Duration;
///
/// # async fn example<L: DistributedLock + Clone + 'static>(lock: L) -> waiting_room_core::Result<()> {
/// if let Some(guard) = LockGuard::acquire(&lock, "lock:seat:e:s", Duration::from_secs(3), Duration::from_secs(5)).await? {
///     // ... critical section ...
///     guard.release().await;
/// }
/// # Ok(())
/// # }
/// ```
pub struct LockGuard<L>
where
    L: DistributedLock + Clone + 'static,
{
    lock: L,
    key: String,
    token: Option<LockToken>,
}

impl<L> LockGuard<L>
where
    L: DistributedLock + Clone + 'static,
{
    /// Acquire `key`, waiting at most `wait`. Returns `None` on timeout.
    ///
    /// # Errors
    ///
    /// Propagates backing store failures from [`DistributedLock::try_lock`].
    pub async fn acquire(
        lock: &L,
        key: impl Into<String>,
        wait: Duration,
        lease: Duration,
    ) -> Result<Option<Self>> {
        let key = key.into();
        let token = lock.try_lock(&key, wait, lease).await?;

        Ok(token.map(|token| Self {
            lock: lock.clone(),
            key,
            token: Some(token),
        }))
    }

    /// The locked key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Release the lock if this guard still owns it.
    ///
    /// Returns `true` if the lock was deleted. An expired lease or a failing
    /// backing store is logged, not reported: the lease bounds the damage.
    pub async fn release(mut self) -> bool {
        let Some(token) = self.token.take() else {
            return false;
        };

        match self.lock.unlock(&self.key, &token).await {
            Ok(true) => true,
            Ok(false) => {
                tracing::debug!(key = %self.key, "Lock lease expired before release");
                false
            }
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "Failed to release lock");
                false
            }
        }
    }
}

impl<L> Drop for LockGuard<L>
where
    L: DistributedLock + Clone + 'static,
{
    fn drop(&mut self) {
        let Some(token) = self.token.take() else {
            return;
        };

        let lock = self.lock.clone();
        let key = std::mem::take(&mut self.key);

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                tracing::debug!(key = %key, "Lock guard dropped without release, unlocking in background");
                handle.spawn(async move {
                    if let Err(e) = lock.unlock(&key, &token).await {
                        tracing::warn!(key = %key, error = %e, "Background lock release failed");
                    }
                });
            }
            Err(_) => {
                tracing::warn!(key = %key, "No runtime to release dropped lock guard; lease expiry will free it");
            }
        }
    }
}
