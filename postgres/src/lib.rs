//! `PostgreSQL` seat repository for the virtual waiting room.
//!
//! This crate provides the durable half of the reservation critical section.
//! It implements `SeatRepository` from `waiting-room-core` with sqlx and
//! supports:
//!
//! - Seat catalog storage and listing
//! - Row-locked, transactional seat reservation
//! - Append-only reservation log
//! - Embedded migrations
//!
//! # Example
//!
//! ```ignore
//! use waiting_room_postgres::PostgresSeatRepository;
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let repo = PostgresSeatRepository::connect("postgres://localhost/waiting_room", 20).await?;
//!     repo.migrate().await?;
//!     Ok(())
//! }
//! ```

mod seats;

pub use seats::PostgresSeatRepository;
