//! HTTP handlers.
//!
//! Handlers are thin: extract, call one service operation, map the result.
//! Domain errors become [`crate::error::AppError`] through `?`.

pub mod admin;
pub mod events;
pub mod health;
pub mod queue;
pub mod reservations;

use serde::Deserialize;
use waiting_room_core::EventId;

/// `?eventId=` query parameter.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventQuery {
    /// Event the request is about
    pub event_id: EventId,
}
