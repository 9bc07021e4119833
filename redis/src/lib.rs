//! # Waiting Room Redis
//!
//! Cache-tier adapters for the virtual waiting room.
//!
//! - [`RedisQueueStore`]: queues, heartbeats, admission tokens and counters
//! - [`RedisSeatLock`]: per-seat distributed lock with lease
//!
//! Both share one multiplexed [`ConnectionManager`], which reconnects
//! automatically after a dropped connection.

pub mod lock;
pub mod queue;
pub mod scripts;

pub use lock::RedisSeatLock;
pub use queue::RedisQueueStore;

use redis::Client;
use redis::aio::ConnectionManager;
use waiting_room_core::{Result, WaitingRoomError};

/// Open a managed connection to `Redis`.
///
/// # Errors
///
/// Returns [`WaitingRoomError::Cache`] if the URL is invalid or the server is
/// unreachable.
pub async fn connect(redis_url: &str) -> Result<ConnectionManager> {
    let client = Client::open(redis_url)
        .map_err(|e| WaitingRoomError::Cache(format!("Failed to create Redis client: {e}")))?;

    ConnectionManager::new(client).await.map_err(|e| {
        WaitingRoomError::Cache(format!("Failed to create Redis connection manager: {e}"))
    })
}
