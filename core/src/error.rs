//! Error types surfaced to callers of the admission and reservation operations.

use crate::types::SeatId;
use thiserror::Error;

/// Result type alias for waiting room operations.
pub type Result<T> = std::result::Result<T, WaitingRoomError>;

/// Error taxonomy for the waiting room.
///
/// `NOT_YET` is deliberately absent: being behind the admission window is a
/// normal outcome of token acquisition, see [`crate::TokenOutcome`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WaitingRoomError {
    // ═══════════════════════════════════════════════════════════
    // Admission Errors
    // ═══════════════════════════════════════════════════════════

    /// User has no queue entry and no token. Caller re-enters.
    #[error("User is not in the queue")]
    NotInQueue,

    /// Reserve called without an admission token. Caller re-acquires a token.
    #[error("No admission token for this event")]
    NoToken,

    // ═══════════════════════════════════════════════════════════
    // Reservation Errors
    // ═══════════════════════════════════════════════════════════

    /// Seat lock could not be obtained in time. Caller retries with backoff.
    #[error("Seat is being reserved by another user")]
    SeatContended,

    /// Unknown seat id for this event.
    #[error("Seat {0} not found")]
    SeatNotFound(SeatId),

    /// Another reservation committed first. Caller picks another seat.
    #[error("Seat {0} is already reserved")]
    AlreadyReserved(SeatId),

    // ═══════════════════════════════════════════════════════════
    // Infrastructure Errors
    // ═══════════════════════════════════════════════════════════

    /// Cache tier failure.
    #[error("Cache tier unavailable: {0}")]
    Cache(String),

    /// Durable store failure.
    #[error("Durable store unavailable: {0}")]
    Store(String),
}

impl WaitingRoomError {
    /// Stable error code surfaced to clients.
    ///
    /// # Examples
    ///
    /// ```
    /// # use waiting_room_core::WaitingRoomError;
    /// assert_eq!(WaitingRoomError::NoToken.code(), "NO_TOKEN");
    /// assert_eq!(WaitingRoomError::Cache("down".into()).code(), "INFRA_UNAVAILABLE");
    /// ```
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NotInQueue => "NOT_IN_QUEUE",
            Self::NoToken => "NO_TOKEN",
            Self::SeatContended => "SEAT_CONTENDED",
            Self::SeatNotFound(_) => "SEAT_NOT_FOUND",
            Self::AlreadyReserved(_) => "ALREADY_RESERVED",
            Self::Cache(_) | Self::Store(_) => "INFRA_UNAVAILABLE",
        }
    }

    /// Returns `true` if retrying the same request may succeed.
    ///
    /// # Examples
    ///
    /// ```
    /// # use waiting_room_core::{SeatId, WaitingRoomError};
    /// assert!(WaitingRoomError::SeatContended.is_retryable());
    /// assert!(!WaitingRoomError::AlreadyReserved(SeatId::new()).is_retryable());
    /// ```
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::SeatContended | Self::Cache(_) | Self::Store(_))
    }

    /// Returns `true` if this error comes from an unavailable dependency.
    #[must_use]
    pub const fn is_infrastructure(&self) -> bool {
        matches!(self, Self::Cache(_) | Self::Store(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_cover_taxonomy() {
        let seat = SeatId::new();
        assert_eq!(WaitingRoomError::NotInQueue.code(), "NOT_IN_QUEUE");
        assert_eq!(WaitingRoomError::SeatContended.code(), "SEAT_CONTENDED");
        assert_eq!(WaitingRoomError::SeatNotFound(seat).code(), "SEAT_NOT_FOUND");
        assert_eq!(WaitingRoomError::AlreadyReserved(seat).code(), "ALREADY_RESERVED");
        assert_eq!(WaitingRoomError::Store("timeout".into()).code(), "INFRA_UNAVAILABLE");
    }

    #[test]
    fn test_infrastructure_errors_are_retryable() {
        assert!(WaitingRoomError::Store("x".into()).is_retryable());
        assert!(WaitingRoomError::Cache("x".into()).is_infrastructure());
        assert!(!WaitingRoomError::NotInQueue.is_retryable());
        assert!(!WaitingRoomError::NoToken.is_infrastructure());
    }
}
