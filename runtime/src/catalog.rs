//! Seat catalog loading and listing.

use serde::Serialize;
use waiting_room_core::providers::{QueueStore, SeatRepository};
use waiting_room_core::{EventId, Result, Seat, SeatId};

/// Default seat label prefix.
pub const DEFAULT_LABEL_PREFIX: &str = "A";

/// Result of loading a seat catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogLoaded {
    /// Event the seats belong to
    pub event_id: EventId,
    /// Created seats, in label order
    pub seat_ids: Vec<SeatId>,
    /// Number of seats created
    pub seat_count: u32,
}

/// Labels `<prefix>1 ..= <prefix>count`.
#[must_use]
pub fn seat_labels(prefix: &str, count: u32) -> Vec<String> {
    (1..=count).map(|i| format!("{prefix}{i}")).collect()
}

/// Seat catalog operations.
pub struct CatalogService<Q: QueueStore, R: SeatRepository> {
    queue: Q,
    seats: R,
}

impl<Q: QueueStore, R: SeatRepository> CatalogService<Q, R> {
    /// Create a catalog service.
    #[must_use]
    pub const fn new(queue: Q, seats: R) -> Self {
        Self { queue, seats }
    }

    /// Create `count` available seats for an event and add them to its
    /// remaining-seat gauge.
    ///
    /// Loading into an event that already has seats extends its catalog; the
    /// gauge keeps counting seats loaded and reserved before.
    ///
    /// # Errors
    ///
    /// - [`waiting_room_core::WaitingRoomError::Store`] if the seats cannot be inserted
    /// - [`waiting_room_core::WaitingRoomError::Cache`] if the gauge cannot be updated
    #[tracing::instrument(skip(self), fields(event_id = %event_id))]
    pub async fn load(&self, event_id: EventId, count: u32, prefix: &str) -> Result<CatalogLoaded> {
        let labels = seat_labels(prefix, count);
        let seats = self.seats.create_seats(event_id, &labels).await?;
        let remaining = self.queue.add_seat_count(event_id, i64::from(count)).await?;

        tracing::info!(seat_count = count, remaining, "Seat catalog loaded");

        Ok(CatalogLoaded {
            event_id,
            seat_ids: seats.iter().map(|seat| seat.id).collect(),
            seat_count: count,
        })
    }

    /// All seats of an event, ordered by label.
    ///
    /// # Errors
    ///
    /// Returns [`waiting_room_core::WaitingRoomError::Store`] if the store is unavailable.
    pub async fn list(&self, event_id: EventId) -> Result<Vec<Seat>> {
        self.seats.list_seats(event_id).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use waiting_room_testing::mocks::{InMemoryQueueStore, InMemorySeatRepository};

    #[test]
    fn test_labels_start_at_one() {
        assert_eq!(seat_labels("A", 3), vec!["A1", "A2", "A3"]);
        assert!(seat_labels("A", 0).is_empty());
    }

    #[tokio::test]
    async fn test_load_sets_gauge_and_lists_seats() {
        let queue = InMemoryQueueStore::new();
        let catalog = CatalogService::new(queue.clone(), InMemorySeatRepository::new());
        let event = EventId::new();

        let loaded = catalog.load(event, 2, DEFAULT_LABEL_PREFIX).await.unwrap();
        let seats = catalog.list(event).await.unwrap();

        assert_eq!(loaded.seat_ids.len(), 2);
        assert_eq!(queue.seat_count(event).await.unwrap(), Some(2));
        assert_eq!(
            seats.iter().map(|s| s.label.as_str()).collect::<Vec<_>>(),
            vec!["A1", "A2"]
        );
    }

    #[tokio::test]
    async fn test_second_load_extends_gauge() {
        let queue = InMemoryQueueStore::new();
        let catalog = CatalogService::new(queue.clone(), InMemorySeatRepository::new());
        let event = EventId::new();

        catalog.load(event, 10, "A").await.unwrap();
        queue.decrement_seat_count(event).await.unwrap();
        catalog.load(event, 5, "B").await.unwrap();

        assert_eq!(catalog.list(event).await.unwrap().len(), 15);
        assert_eq!(queue.seat_count(event).await.unwrap(), Some(14));
    }
}
