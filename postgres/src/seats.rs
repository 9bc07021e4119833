//! Seat catalog and reservation log.

use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use std::time::Duration;
use waiting_room_core::providers::SeatRepository;
use waiting_room_core::{
    EventId, Reservation, ReservationId, Result, Seat, SeatId, SeatStatus, UserId,
    WaitingRoomError,
};

/// SQLSTATE raised when `lock_timeout` expires while waiting for a row lock.
const LOCK_NOT_AVAILABLE: &str = "55P03";

/// Default bound on waiting for a seat row lock.
const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// `PostgreSQL` seat repository.
#[derive(Clone)]
pub struct PostgresSeatRepository {
    /// `PostgreSQL` connection pool.
    pool: PgPool,
    /// Upper bound on waiting for the seat row lock.
    lock_timeout: Duration,
}

impl PostgresSeatRepository {
    /// Create a repository over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self {
            pool,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }

    /// Connect a new pool.
    ///
    /// # Errors
    ///
    /// Returns [`WaitingRoomError::Store`] if the database is unreachable.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| WaitingRoomError::Store(format!("Failed to connect to database: {e}")))?;

        Ok(Self::new(pool))
    }

    /// Set the row-lock wait bound.
    #[must_use]
    pub const fn with_lock_timeout(mut self, lock_timeout: Duration) -> Self {
        self.lock_timeout = lock_timeout;
        self
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run database migrations.
    ///
    /// # Errors
    ///
    /// Returns [`WaitingRoomError::Store`] if migrations fail.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| WaitingRoomError::Store(format!("Migration failed: {e}")))?;
        Ok(())
    }

    fn row_to_seat(row: &PgRow) -> Result<Seat> {
        let status: String = row.try_get("status").map_err(store_error)?;
        let status = SeatStatus::parse(&status)
            .ok_or_else(|| WaitingRoomError::Store(format!("Unknown seat status: {status}")))?;

        Ok(Seat {
            id: SeatId::from_uuid(row.try_get("id").map_err(store_error)?),
            event_id: EventId::from_uuid(row.try_get("event_id").map_err(store_error)?),
            label: row.try_get("label").map_err(store_error)?,
            status,
        })
    }

    fn row_to_reservation(row: &PgRow) -> Result<Reservation> {
        Ok(Reservation {
            id: ReservationId::from_uuid(row.try_get("id").map_err(store_error)?),
            event_id: EventId::from_uuid(row.try_get("event_id").map_err(store_error)?),
            seat_id: SeatId::from_uuid(row.try_get("seat_id").map_err(store_error)?),
            user_id: UserId::from_uuid(row.try_get("user_id").map_err(store_error)?),
            created_at: row.try_get("created_at").map_err(store_error)?,
        })
    }
}

#[allow(clippy::needless_pass_by_value)] // Used as a map_err adapter
fn store_error(e: sqlx::Error) -> WaitingRoomError {
    WaitingRoomError::Store(e.to_string())
}

/// Row-lock timeouts are contention, not outages.
#[allow(clippy::needless_pass_by_value)] // Used as a map_err adapter
fn reserve_error(e: sqlx::Error) -> WaitingRoomError {
    if let sqlx::Error::Database(db) = &e {
        if db.code().as_deref() == Some(LOCK_NOT_AVAILABLE) {
            return WaitingRoomError::SeatContended;
        }
    }
    WaitingRoomError::Store(format!("Reservation transaction failed: {e}"))
}

impl SeatRepository for PostgresSeatRepository {
    async fn create_seats(&self, event_id: EventId, labels: &[String]) -> Result<Vec<Seat>> {
        let seats: Vec<Seat> = labels
            .iter()
            .map(|label| Seat::new(event_id, label.clone()))
            .collect();

        let mut tx = self.pool.begin().await.map_err(store_error)?;
        for seat in &seats {
            sqlx::query("INSERT INTO seats (id, event_id, label, status) VALUES ($1, $2, $3, $4)")
                .bind(seat.id.as_uuid())
                .bind(event_id.as_uuid())
                .bind(&seat.label)
                .bind(seat.status.as_str())
                .execute(&mut *tx)
                .await
                .map_err(|e| WaitingRoomError::Store(format!("Failed to insert seat: {e}")))?;
        }
        tx.commit().await.map_err(store_error)?;

        tracing::debug!(event_id = %event_id, count = seats.len(), "Seats created");
        Ok(seats)
    }

    async fn list_seats(&self, event_id: EventId) -> Result<Vec<Seat>> {
        let rows = sqlx::query(
            r#"
            SELECT id, event_id, label, status
            FROM seats
            WHERE event_id = $1
            ORDER BY regexp_replace(label, '[0-9]+$', '') COLLATE "C",
                     substring(label from '[0-9]+$')::numeric NULLS FIRST,
                     label COLLATE "C"
            "#,
        )
        .bind(event_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| WaitingRoomError::Store(format!("Failed to list seats: {e}")))?;

        rows.iter().map(Self::row_to_seat).collect()
    }

    async fn find_seat(&self, seat_id: SeatId) -> Result<Option<Seat>> {
        let row = sqlx::query("SELECT id, event_id, label, status FROM seats WHERE id = $1")
            .bind(seat_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| WaitingRoomError::Store(format!("Failed to load seat: {e}")))?;

        row.as_ref().map(Self::row_to_seat).transpose()
    }

    async fn reserve_seat(
        &self,
        event_id: EventId,
        seat_id: SeatId,
        user_id: UserId,
        reserved_at: DateTime<Utc>,
    ) -> Result<Reservation> {
        // Rolls back on drop unless committed
        let mut tx = self.pool.begin().await.map_err(reserve_error)?;

        let timeout_ms = self.lock_timeout.as_millis().max(1);
        sqlx::query(&format!("SET LOCAL lock_timeout = '{timeout_ms}ms'"))
            .execute(&mut *tx)
            .await
            .map_err(reserve_error)?;

        let row = sqlx::query(
            r"
            SELECT id, event_id, label, status
            FROM seats
            WHERE id = $1 AND event_id = $2
            FOR UPDATE
            ",
        )
        .bind(seat_id.as_uuid())
        .bind(event_id.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(reserve_error)?
        .ok_or(WaitingRoomError::SeatNotFound(seat_id))?;

        let seat = Self::row_to_seat(&row)?;
        if seat.status.is_reserved() {
            return Err(WaitingRoomError::AlreadyReserved(seat_id));
        }

        sqlx::query("UPDATE seats SET status = $1 WHERE id = $2")
            .bind(SeatStatus::Reserved.as_str())
            .bind(seat_id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(reserve_error)?;

        let reservation = Reservation {
            id: ReservationId::new(),
            event_id,
            seat_id,
            user_id,
            created_at: reserved_at,
        };

        sqlx::query(
            r"
            INSERT INTO reservations (id, event_id, seat_id, user_id, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ",
        )
        .bind(reservation.id.as_uuid())
        .bind(event_id.as_uuid())
        .bind(seat_id.as_uuid())
        .bind(user_id.as_uuid())
        .bind(reserved_at)
        .execute(&mut *tx)
        .await
        .map_err(reserve_error)?;

        tx.commit().await.map_err(reserve_error)?;

        Ok(reservation)
    }

    async fn reservations_for_seat(&self, seat_id: SeatId) -> Result<Vec<Reservation>> {
        let rows = sqlx::query(
            r"
            SELECT id, event_id, seat_id, user_id, created_at
            FROM reservations
            WHERE seat_id = $1
            ORDER BY created_at ASC
            ",
        )
        .bind(seat_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| WaitingRoomError::Store(format!("Failed to list reservations: {e}")))?;

        rows.iter().map(Self::row_to_reservation).collect()
    }

    async fn ping(&self) -> Result<()> {
        let (_,): (i32,) = sqlx::query_as("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| WaitingRoomError::Store(format!("Failed to ping database: {e}")))?;
        Ok(())
    }
}

