//! Admission engine.
//!
//! Places users in a per-event queue, reports their position relative to the
//! admission window, and mints admission tokens within the concurrency cap.
//!
//! # Lifecycle of a user
//!
//! ```text
//! (absent) ──enter──▶ QUEUED ──acquire (in window)──▶ ADMITTED ──release / TTL──▶ (absent)
//!                       │
//!                       └──heartbeat expired + sweep──▶ (absent)
//! ```
//!
//! Position reporting ([`AdmissionService::get_status`]) is advisory. Only
//! [`AdmissionService::acquire_token`] decides, atomically on the cache tier.

use crate::metrics::AdmissionMetrics;
use std::sync::Arc;
use waiting_room_core::environment::Clock;
use waiting_room_core::providers::QueueStore;
use waiting_room_core::{
    AdmissionConfig, EventId, QueueEnterResponse, QueueStatus, Result, TokenOutcome,
    TokenResponse, UserId, WaitingRoomError,
};

/// Queue entry, status polling and token management.
pub struct AdmissionService<Q: QueueStore> {
    store: Q,
    config: AdmissionConfig,
    clock: Arc<dyn Clock>,
}

impl<Q: QueueStore> AdmissionService<Q> {
    /// Create an admission service.
    #[must_use]
    pub fn new(store: Q, config: AdmissionConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            config,
            clock,
        }
    }

    /// The admission settings in effect.
    #[must_use]
    pub const fn config(&self) -> &AdmissionConfig {
        &self.config
    }

    /// The underlying queue store.
    #[must_use]
    pub const fn store(&self) -> &Q {
        &self.store
    }

    /// Enter the event's queue.
    ///
    /// Idempotent: a user already queued keeps their original position. The
    /// activity heartbeat is (re)set either way.
    ///
    /// A token holder who enters again gets a fresh queue entry. Status polls
    /// answer `Entered` without refreshing its heartbeat, so the liveness
    /// reaper evicts it once `activity_ttl` lapses. Until then it counts
    /// toward the rank of users behind it.
    ///
    /// # Errors
    ///
    /// Returns [`WaitingRoomError::Cache`] if the cache tier is unavailable.
    #[tracing::instrument(skip(self), fields(event_id = %event_id, user_id = %user_id))]
    pub async fn enter(&self, event_id: EventId, user_id: UserId) -> Result<QueueEnterResponse> {
        let score = self.clock.now_millis();
        let rank = self
            .store
            .enter(event_id, user_id, score, self.config.activity_ttl)
            .await?;

        AdmissionMetrics::record_enter();
        tracing::debug!(rank, "User entered queue");

        Ok(QueueEnterResponse {
            event_id,
            user_id,
            rank,
        })
    }

    /// Report the user's position.
    ///
    /// A token holder gets `Entered` and their token TTL is refreshed. A queued
    /// user gets `Ready` or `Waiting` and their heartbeat is refreshed.
    ///
    /// # Errors
    ///
    /// - [`WaitingRoomError::NotInQueue`] if the user has neither a token nor a queue entry
    /// - [`WaitingRoomError::Cache`] if the cache tier is unavailable
    #[tracing::instrument(skip(self), fields(event_id = %event_id, user_id = %user_id))]
    pub async fn get_status(&self, event_id: EventId, user_id: UserId) -> Result<QueueStatus> {
        if self
            .store
            .refresh_token(event_id, user_id, self.config.token_ttl)
            .await?
        {
            return Ok(QueueStatus::Entered);
        }

        let Some(rank) = self.store.rank(event_id, user_id).await? else {
            return Err(WaitingRoomError::NotInQueue);
        };

        self.store
            .touch_activity(event_id, user_id, self.config.activity_ttl)
            .await?;

        let count = self.store.token_count(event_id).await?;
        let remaining = (i64::from(self.config.max_concurrent) - count).max(0);

        Ok(QueueStatus::from_rank(
            rank,
            u64::try_from(remaining).unwrap_or_default(),
        ))
    }

    /// Try to convert the user's queue entry into an admission token.
    ///
    /// `NOT_YET` and `NOT_IN_QUEUE` are normal outcomes, not errors.
    ///
    /// # Errors
    ///
    /// Returns [`WaitingRoomError::Cache`] if the cache tier is unavailable.
    #[tracing::instrument(skip(self), fields(event_id = %event_id, user_id = %user_id))]
    pub async fn acquire_token(&self, event_id: EventId, user_id: UserId) -> Result<TokenResponse> {
        let outcome = self
            .store
            .acquire_token(
                event_id,
                user_id,
                self.config.max_concurrent,
                self.config.token_ttl,
            )
            .await?;

        AdmissionMetrics::record_acquire(outcome);
        if outcome == TokenOutcome::Granted {
            tracing::info!("Admission token granted");
        } else {
            tracing::debug!(outcome = outcome.as_str(), "Admission token not granted");
        }

        Ok(outcome.into())
    }

    /// Whether the user currently holds an admission token.
    ///
    /// # Errors
    ///
    /// Returns [`WaitingRoomError::Cache`] if the cache tier is unavailable.
    pub async fn has_token(&self, event_id: EventId, user_id: UserId) -> Result<bool> {
        self.store.has_token(event_id, user_id).await
    }

    /// Give the token back and free its slot. No-op if the token is gone.
    ///
    /// # Errors
    ///
    /// Returns [`WaitingRoomError::Cache`] if the cache tier is unavailable.
    pub async fn release_token(&self, event_id: EventId, user_id: UserId) -> Result<bool> {
        let released = self.store.release_token(event_id, user_id).await?;
        if released {
            AdmissionMetrics::record_release();
            tracing::debug!(event_id = %event_id, user_id = %user_id, "Admission token released");
        }
        Ok(released)
    }

    /// Advisory remaining-seat gauge for the event.
    ///
    /// # Errors
    ///
    /// Returns [`WaitingRoomError::Cache`] if the cache tier is unavailable.
    pub async fn seats_remaining(&self, event_id: EventId) -> Result<Option<i64>> {
        self.store.seat_count(event_id).await
    }

    /// Drop the event's whole queue (administrative cleanup).
    ///
    /// # Errors
    ///
    /// Returns [`WaitingRoomError::Cache`] if the cache tier is unavailable.
    pub async fn purge_queue(&self, event_id: EventId) -> Result<bool> {
        let purged = self.store.purge_queue(event_id).await?;
        tracing::info!(event_id = %event_id, purged, "Queue purged");
        Ok(purged)
    }

    /// Recompute the concurrency counter from live tokens.
    ///
    /// Repairs slots leaked by tokens that expired without being released.
    ///
    /// # Errors
    ///
    /// Returns [`WaitingRoomError::Cache`] if the cache tier is unavailable.
    pub async fn reconcile_token_count(&self, event_id: EventId) -> Result<i64> {
        let before = self.store.token_count(event_id).await?;
        let after = self.store.reconcile_token_count(event_id).await?;
        if before == after {
            tracing::debug!(event_id = %event_id, count = after, "Token counter already consistent");
        } else {
            tracing::warn!(event_id = %event_id, before, after, "Token counter reconciled");
        }
        Ok(after)
    }
}
