//! Domain types for the waiting room.
//!
//! Identifiers, durable seat and reservation records, and the response shapes
//! of the admission operations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for an event (the thing users queue for)
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(Uuid);

impl EventId {
    /// Creates a new random `EventId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create an `EventId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EventId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Unique identifier for a user waiting in (or admitted from) a queue
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl UserId {
    /// Creates a new random `UserId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `UserId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UserId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Unique identifier for a seat
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeatId(Uuid);

impl SeatId {
    /// Creates a new random `SeatId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `SeatId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SeatId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SeatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a reservation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReservationId(Uuid);

impl ReservationId {
    /// Creates a new random `ReservationId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `ReservationId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ReservationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ReservationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Durable records
// ============================================================================

/// Seat status.
///
/// Monotone: `Available` may become `Reserved`, never the reverse.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeatStatus {
    /// Seat can be reserved
    Available,
    /// Seat has been taken
    Reserved,
}

impl SeatStatus {
    /// Convert status to its database string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "AVAILABLE",
            Self::Reserved => "RESERVED",
        }
    }

    /// Parse status from its database string representation.
    ///
    /// Returns `None` for unknown values.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "AVAILABLE" => Some(Self::Available),
            "RESERVED" => Some(Self::Reserved),
            _ => None,
        }
    }

    /// Returns `true` if the seat has already been taken.
    #[must_use]
    pub const fn is_reserved(&self) -> bool {
        matches!(self, Self::Reserved)
    }
}

impl fmt::Display for SeatStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A seat in an event's catalog.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Seat {
    /// Seat ID
    #[serde(rename = "seatId")]
    pub id: SeatId,
    /// Event the seat belongs to
    pub event_id: EventId,
    /// Human-readable label (e.g., "A12")
    pub label: String,
    /// Current status
    pub status: SeatStatus,
}

impl Seat {
    /// Create a new available seat.
    #[must_use]
    pub fn new(event_id: EventId, label: impl Into<String>) -> Self {
        Self {
            id: SeatId::new(),
            event_id,
            label: label.into(),
            status: SeatStatus::Available,
        }
    }
}

/// Catalog order for seat labels: prefix first, then the trailing number by value.
///
/// `A2` sorts before `A10`. Labels without a number come first within their
/// prefix, and equal keys fall back to byte order.
#[must_use]
pub fn compare_labels(a: &str, b: &str) -> Ordering {
    let (a_prefix, a_number) = split_label(a);
    let (b_prefix, b_number) = split_label(b);

    a_prefix
        .cmp(b_prefix)
        .then_with(|| a_number.len().cmp(&b_number.len()))
        .then_with(|| a_number.cmp(b_number))
        .then_with(|| a.cmp(b))
}

/// Split off the trailing digits, without leading zeros.
fn split_label(label: &str) -> (&str, &str) {
    let prefix = label.trim_end_matches(|c: char| c.is_ascii_digit());
    let (_, digits) = label.split_at(prefix.len());
    (prefix, digits.trim_start_matches('0'))
}

/// Append-only record of a successful seat reservation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    /// Reservation ID
    #[serde(rename = "reservationId")]
    pub id: ReservationId,
    /// Event ID
    pub event_id: EventId,
    /// Reserved seat
    pub seat_id: SeatId,
    /// User who holds the seat
    pub user_id: UserId,
    /// When the reservation was committed
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Admission responses
// ============================================================================

/// Result of entering a queue.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueEnterResponse {
    /// Event ID
    pub event_id: EventId,
    /// User ID
    pub user_id: UserId,
    /// 0-based position at the moment of insertion (advisory)
    pub rank: u64,
}

/// Position of a user relative to the admission window.
///
/// `ahead` mirrors `rank`: the number of users in front of this one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueueStatus {
    /// The user holds an admission token.
    Entered,
    /// The user is inside the current admission window and may acquire a token.
    Ready {
        /// 0-based queue position
        rank: u64,
        /// Users ahead in the queue
        ahead: u64,
    },
    /// The user is behind the admission window.
    Waiting {
        /// 0-based queue position
        rank: u64,
        /// Users ahead in the queue
        ahead: u64,
    },
}

impl QueueStatus {
    /// Classify a queue position against the admission window.
    ///
    /// `remaining` is `max(0, maxConcurrent - counter)`.
    #[must_use]
    pub const fn from_rank(rank: u64, remaining: u64) -> Self {
        if rank < remaining {
            Self::Ready { rank, ahead: rank }
        } else {
            Self::Waiting { rank, ahead: rank }
        }
    }

    /// Queue position, if the user is still queued.
    #[must_use]
    pub const fn rank(&self) -> Option<u64> {
        match self {
            Self::Entered => None,
            Self::Ready { rank, .. } | Self::Waiting { rank, .. } => Some(*rank),
        }
    }
}

/// Outcome of the atomic token acquisition script.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenOutcome {
    /// A token exists or was just minted.
    Granted,
    /// The user is queued but behind the admission window.
    NotYet,
    /// The user has neither a token nor a queue entry.
    NotInQueue,
}

impl TokenOutcome {
    /// Map the script's integer return code.
    ///
    /// `1` granted, `-1` not in queue, anything else (including `0`) not yet.
    #[must_use]
    pub const fn from_script_code(code: i64) -> Self {
        match code {
            1 => Self::Granted,
            -1 => Self::NotInQueue,
            _ => Self::NotYet,
        }
    }

    /// The script's integer return code for this outcome.
    #[must_use]
    pub const fn script_code(&self) -> i64 {
        match self {
            Self::Granted => 1,
            Self::NotYet => 0,
            Self::NotInQueue => -1,
        }
    }

    /// Metric label for this outcome.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Granted => "granted",
            Self::NotYet => "not_yet",
            Self::NotInQueue => "not_in_queue",
        }
    }
}

/// Response of `TOKEN_ACQUIRE`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    /// Whether the caller now holds a token
    pub success: bool,
    /// Why
    pub reason: TokenOutcome,
}

impl From<TokenOutcome> for TokenResponse {
    fn from(reason: TokenOutcome) -> Self {
        Self {
            success: matches!(reason, TokenOutcome::Granted),
            reason,
        }
    }
}
