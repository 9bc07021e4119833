//! Liveness reaper.
//!
//! Periodically evicts queued users whose activity heartbeat has expired, so
//! abandoned entries stop occupying positions ahead of live users.
//!
//! The reaper never touches admission tokens or the concurrency counter.
//! Several replicas may sweep concurrently; removing an absent member is a
//! no-op, so overlapping sweeps are harmless.

use crate::metrics::ReaperMetrics;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use waiting_room_core::providers::QueueStore;
use waiting_room_core::{EventId, Result, UserId};

/// Outcome of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReapReport {
    /// Queues inspected
    pub events: usize,
    /// Users removed across all queues
    pub evicted: u64,
    /// Queues whose sweep failed and was skipped
    pub failed: usize,
}

/// Periodic sweep over every queue.
pub struct LivenessReaper<Q: QueueStore> {
    store: Q,
    interval: Duration,
}

impl<Q: QueueStore + 'static> LivenessReaper<Q> {
    /// Create a reaper sweeping every `interval`.
    #[must_use]
    pub const fn new(store: Q, interval: Duration) -> Self {
        Self { store, interval }
    }

    /// Sweep every queue once.
    ///
    /// A failure on one event is logged and does not stop the others.
    ///
    /// # Errors
    ///
    /// Returns [`waiting_room_core::WaitingRoomError::Cache`] only if the list
    /// of queues cannot be read.
    pub async fn sweep(&self) -> Result<ReapReport> {
        let started = Instant::now();
        let events = self.store.queued_events().await?;
        let mut report = ReapReport {
            events: events.len(),
            ..ReapReport::default()
        };

        for event_id in events {
            match self.sweep_event(event_id).await {
                Ok(evicted) => report.evicted += evicted,
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(event_id = %event_id, error = %e, "Liveness sweep failed for event");
                }
            }
        }

        ReaperMetrics::record_sweep(report.evicted, started.elapsed());
        if report.evicted > 0 {
            tracing::info!(
                events = report.events,
                evicted = report.evicted,
                "Evicted inactive users"
            );
        }

        Ok(report)
    }

    async fn sweep_event(&self, event_id: EventId) -> Result<u64> {
        let members = self.store.queue_members(event_id).await?;
        if members.is_empty() {
            return Ok(0);
        }

        let alive = self.store.activity_alive(event_id, &members).await?;
        let dead: Vec<UserId> = members
            .into_iter()
            .zip(alive)
            .filter_map(|(user_id, alive)| (!alive).then_some(user_id))
            .collect();

        if dead.is_empty() {
            return Ok(0);
        }

        let removed = self.store.remove_members(event_id, &dead).await?;
        tracing::debug!(event_id = %event_id, removed, "Removed inactive users");
        Ok(removed)
    }

    /// Sweep on a fixed cadence until shutdown is signalled.
    ///
    /// The first sweep happens one interval after start.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        let mut ticker = tokio::time::interval_at(
            tokio::time::Instant::now() + self.interval,
            self.interval,
        );
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(interval_secs = self.interval.as_secs(), "Liveness reaper started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.sweep().await {
                        tracing::warn!(error = %e, "Liveness sweep failed");
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Liveness reaper stopping");
                    break;
                }
            }
        }
    }

    /// Run the reaper on a background task.
    #[must_use]
    pub fn spawn(self, shutdown: broadcast::Receiver<()>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use waiting_room_testing::mocks::InMemoryQueueStore;
    use waiting_room_testing::{ManualClock, test_clock};

    const ACTIVITY_TTL: Duration = Duration::from_secs(30);

    #[tokio::test]
    async fn test_sweep_evicts_only_expired_heartbeats() {
        let clock = ManualClock::from(test_clock());
        let store = InMemoryQueueStore::with_clock(Arc::new(clock.clone()));
        let reaper = LivenessReaper::new(store.clone(), Duration::from_secs(30));
        let event = EventId::new();
        let (stale, live) = (UserId::new(), UserId::new());

        store.enter(event, stale, 1, ACTIVITY_TTL).await.unwrap();
        store.enter(event, live, 2, ACTIVITY_TTL).await.unwrap();
        clock.advance(Duration::from_secs(20));
        store.touch_activity(event, live, ACTIVITY_TTL).await.unwrap();
        clock.advance(Duration::from_secs(15));

        let report = reaper.sweep().await.unwrap();

        assert_eq!(report, ReapReport { events: 1, evicted: 1, failed: 0 });
        assert_eq!(store.rank(event, stale).await.unwrap(), None);
        assert_eq!(store.rank(event, live).await.unwrap(), Some(0));
    }

    #[tokio::test]
    async fn test_sweep_leaves_tokens_alone() {
        let clock = ManualClock::from(test_clock());
        let store = InMemoryQueueStore::with_clock(Arc::new(clock.clone()));
        let reaper = LivenessReaper::new(store.clone(), Duration::from_secs(30));
        let event = EventId::new();
        let user = UserId::new();

        store.enter(event, user, 1, ACTIVITY_TTL).await.unwrap();
        store
            .acquire_token(event, user, 1, Duration::from_secs(300))
            .await
            .unwrap();
        clock.advance(Duration::from_secs(60));

        reaper.sweep().await.unwrap();

        assert!(store.has_token(event, user).await.unwrap());
        assert_eq!(store.token_count(event).await.unwrap(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_on_shutdown() {
        let store = InMemoryQueueStore::new();
        let (tx, rx) = broadcast::channel(1);
        let handle = LivenessReaper::new(store, Duration::from_secs(30)).spawn(rx);

        tokio::time::advance(Duration::from_secs(61)).await;
        tx.send(()).unwrap();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
