//! # Waiting Room Server
//!
//! HTTP adapter for the virtual waiting room.
//!
//! - [`config`]: environment configuration
//! - [`routes`]: the Axum router over [`state::AppState`]
//! - [`lifecycle`]: serving, the liveness reaper task and graceful shutdown
//!
//! The router is generic over the infrastructure adapters. The binary wires
//! Redis and `PostgreSQL`; tests wire the in-memory adapters from
//! `waiting-room-testing`.

pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod lifecycle;
pub mod routes;
pub mod state;

pub use config::Config;
pub use error::AppError;
pub use lifecycle::Application;
pub use routes::build_router;
pub use state::AppState;
