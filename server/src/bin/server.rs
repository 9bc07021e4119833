//! Waiting Room Server
//!
//! This binary:
//! - Connects to Redis (queues, tokens, seat locks)
//! - Connects to `PostgreSQL` and applies migrations (seats, reservations)
//! - Installs the Prometheus recorder
//! - Runs the liveness reaper in the background
//! - Serves the HTTP API until Ctrl+C or SIGTERM
//!
//! # Usage
//!
//! ```bash
//! docker run -d -p 6379:6379 redis:7-alpine
//! docker run -d -p 5432:5432 -e POSTGRES_PASSWORD=postgres -e POSTGRES_DB=waiting_room postgres:16
//!
//! cargo run --bin waiting-room-server
//! ```

use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use waiting_room_core::environment::SystemClock;
use waiting_room_postgres::PostgresSeatRepository;
use waiting_room_redis::{RedisQueueStore, RedisSeatLock};
use waiting_room_runtime::LivenessReaper;
use waiting_room_runtime::metrics::MetricsRecorder;
use waiting_room_server::{AppState, Application, Config, build_router};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,waiting_room_runtime=debug,waiting_room_server=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting waiting room server...");

    // Load configuration
    let config = Config::from_env();
    config.validate()?;
    tracing::info!(
        redis = %config.redis.url,
        max_concurrent = config.queue.max_concurrent,
        admin_enabled = config.admin.enabled,
        "Configuration loaded"
    );

    // Cache tier
    let redis = waiting_room_redis::connect(&config.redis.url).await?;
    let queue = RedisQueueStore::from_manager(redis.clone());
    let lock = RedisSeatLock::from_manager(redis);
    tracing::info!("✓ Redis connected");

    // Durable store
    let seats = PostgresSeatRepository::connect(&config.postgres.url, config.postgres.max_connections)
        .await?
        .with_lock_timeout(config.lock_timeout());
    seats.migrate().await?;
    tracing::info!("✓ PostgreSQL connected, migrations applied");

    // Metrics
    let mut recorder = MetricsRecorder::new();
    recorder.install()?;

    let mut state = AppState::new(
        queue.clone(),
        lock,
        seats,
        config.admission(),
        config.seat_lock(),
        Arc::new(SystemClock),
    )
    .with_admin(config.admin.enabled);
    if let Some(handle) = recorder.handle() {
        state = state.with_metrics(handle.clone());
    }

    let reaper = LivenessReaper::new(queue, config.admission().reap_interval);
    let listener = tokio::net::TcpListener::bind(config.bind_address()).await?;
    let app = Application::new(
        listener,
        build_router(state),
        reaper,
        Duration::from_secs(config.server.shutdown_timeout),
    );

    app.run().await?;
    Ok(())
}
