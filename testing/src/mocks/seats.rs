//! In-memory seat repository.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use waiting_room_core::providers::SeatRepository;
use waiting_room_core::{
    EventId, Reservation, ReservationId, Result, Seat, SeatId, SeatStatus, UserId,
    WaitingRoomError, compare_labels,
};

/// In-memory [`SeatRepository`].
///
/// The whole catalog sits behind one mutex, which stands in for the row lock:
/// the check-then-flip in [`SeatRepository::reserve_seat`] cannot interleave.
#[derive(Debug, Clone, Default)]
pub struct InMemorySeatRepository {
    inner: Arc<Mutex<Catalog>>,
    offline: Arc<AtomicBool>,
}

#[derive(Debug, Default)]
struct Catalog {
    seats: HashMap<SeatId, Seat>,
    reservations: Vec<Reservation>,
}

impl InMemorySeatRepository {
    /// Create an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate the durable store going away. Every operation fails while offline.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Every reservation record, in commit order.
    ///
    /// # Errors
    ///
    /// Returns [`WaitingRoomError::Store`] if the store is offline.
    pub fn reservations(&self) -> Result<Vec<Reservation>> {
        Ok(self.catalog()?.reservations.clone())
    }

    fn catalog(&self) -> Result<MutexGuard<'_, Catalog>> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(WaitingRoomError::Store("Connection refused".into()));
        }
        self.inner
            .lock()
            .map_err(|_| WaitingRoomError::Store("Mutex lock failed".into()))
    }
}

impl SeatRepository for InMemorySeatRepository {
    async fn create_seats(&self, event_id: EventId, labels: &[String]) -> Result<Vec<Seat>> {
        let mut catalog = self.catalog()?;
        let seats: Vec<Seat> = labels
            .iter()
            .map(|label| Seat::new(event_id, label.clone()))
            .collect();
        for seat in &seats {
            catalog.seats.insert(seat.id, seat.clone());
        }
        Ok(seats)
    }

    async fn list_seats(&self, event_id: EventId) -> Result<Vec<Seat>> {
        let mut seats: Vec<Seat> = self
            .catalog()?
            .seats
            .values()
            .filter(|seat| seat.event_id == event_id)
            .cloned()
            .collect();
        seats.sort_by(|a, b| compare_labels(&a.label, &b.label));
        Ok(seats)
    }

    async fn find_seat(&self, seat_id: SeatId) -> Result<Option<Seat>> {
        Ok(self.catalog()?.seats.get(&seat_id).cloned())
    }

    async fn reserve_seat(
        &self,
        event_id: EventId,
        seat_id: SeatId,
        user_id: UserId,
        reserved_at: DateTime<Utc>,
    ) -> Result<Reservation> {
        let mut catalog = self.catalog()?;

        let seat = catalog
            .seats
            .get_mut(&seat_id)
            .filter(|seat| seat.event_id == event_id)
            .ok_or(WaitingRoomError::SeatNotFound(seat_id))?;

        if seat.status.is_reserved() {
            return Err(WaitingRoomError::AlreadyReserved(seat_id));
        }
        seat.status = SeatStatus::Reserved;

        let reservation = Reservation {
            id: ReservationId::new(),
            event_id,
            seat_id,
            user_id,
            created_at: reserved_at,
        };
        catalog.reservations.push(reservation.clone());

        Ok(reservation)
    }

    async fn reservations_for_seat(&self, seat_id: SeatId) -> Result<Vec<Reservation>> {
        Ok(self
            .catalog()?
            .reservations
            .iter()
            .filter(|reservation| reservation.seat_id == seat_id)
            .cloned()
            .collect())
    }

    async fn ping(&self) -> Result<()> {
        self.catalog().map(|_| ())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_list_orders_labels_numerically() {
        let repo = InMemorySeatRepository::new();
        let event = EventId::new();
        let labels: Vec<String> = (1..=12).map(|i| format!("A{i}")).collect();
        repo.create_seats(event, &labels).await.unwrap();

        let listed = repo.list_seats(event).await.unwrap();

        assert_eq!(
            listed.iter().map(|s| s.label.clone()).collect::<Vec<_>>(),
            labels
        );
    }

    #[tokio::test]
    async fn test_seat_of_other_event_is_not_found() {
        let repo = InMemorySeatRepository::new();
        let seats = repo.create_seats(EventId::new(), &["A1".into()]).await.unwrap();

        let err = repo
            .reserve_seat(EventId::new(), seats[0].id, UserId::new(), Utc::now())
            .await
            .unwrap_err();

        assert_eq!(err, WaitingRoomError::SeatNotFound(seats[0].id));
    }

    #[tokio::test]
    async fn test_second_reservation_is_rejected() {
        let repo = InMemorySeatRepository::new();
        let event = EventId::new();
        let seats = repo.create_seats(event, &["A1".into()]).await.unwrap();
        let seat = seats[0].id;

        repo.reserve_seat(event, seat, UserId::new(), Utc::now()).await.unwrap();
        let err = repo
            .reserve_seat(event, seat, UserId::new(), Utc::now())
            .await
            .unwrap_err();

        assert_eq!(err, WaitingRoomError::AlreadyReserved(seat));
        assert_eq!(repo.reservations_for_seat(seat).await.unwrap().len(), 1);
        assert_eq!(
            repo.find_seat(seat).await.unwrap().map(|s| s.status),
            Some(SeatStatus::Reserved)
        );
    }
}
