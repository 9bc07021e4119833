//! Application lifecycle management and graceful shutdown.
//!
//! 1. **Startup**: Spawn the liveness reaper
//! 2. **Runtime**: Serve HTTP until a shutdown signal arrives
//! 3. **Shutdown**: Stop accepting connections, drain in-flight requests,
//!    signal the reaper and wait for it (bounded by `SHUTDOWN_TIMEOUT`)

use std::future::Future;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use waiting_room_core::providers::QueueStore;
use waiting_room_runtime::LivenessReaper;

/// Running application with its background tasks.
pub struct Application<Q: QueueStore + 'static> {
    /// TCP listener for HTTP server
    listener: TcpListener,
    /// Axum router with all HTTP routes
    app: axum::Router,
    /// Liveness reaper, spawned on run
    reaper: LivenessReaper<Q>,
    /// Shutdown signal broadcaster
    shutdown_tx: broadcast::Sender<()>,
    /// How long to wait for background tasks on shutdown
    shutdown_timeout: Duration,
}

impl<Q: QueueStore + 'static> Application<Q> {
    /// Create a new application instance.
    #[must_use]
    pub fn new(
        listener: TcpListener,
        app: axum::Router,
        reaper: LivenessReaper<Q>,
        shutdown_timeout: Duration,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            listener,
            app,
            reaper,
            shutdown_tx,
            shutdown_timeout,
        }
    }

    /// Run until Ctrl+C or SIGTERM.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP server fails.
    pub async fn run(self) -> std::io::Result<()> {
        self.run_until(shutdown_signal()).await
    }

    /// Run until `signal` completes, then shut down gracefully.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP server fails.
    pub async fn run_until(self, signal: impl Future<Output = ()> + Send + 'static) -> std::io::Result<()> {
        let reaper = self.reaper.spawn(self.shutdown_tx.subscribe());

        if let Ok(addr) = self.listener.local_addr() {
            info!(address = %addr, "HTTP server listening for requests");
        }
        let served = axum::serve(self.listener, self.app)
            .with_graceful_shutdown(signal)
            .await;

        info!("HTTP server stopped, initiating graceful shutdown...");

        // Send shutdown signal to all background tasks
        let _ = self.shutdown_tx.send(());
        Self::await_shutdown(reaper, self.shutdown_timeout).await;

        info!("Graceful shutdown complete");
        served
    }

    async fn await_shutdown(handle: JoinHandle<()>, timeout: Duration) {
        match tokio::time::timeout(timeout, handle).await {
            Ok(Ok(())) => info!("Liveness reaper stopped gracefully"),
            Ok(Err(e)) => warn!(error = %e, "Liveness reaper task failed"),
            Err(_) => warn!("Liveness reaper shutdown timed out"),
        }
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
///
/// If a handler cannot be installed, that signal is ignored and the other
/// one still works.
pub async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        () = terminate => {
            info!("Received SIGTERM signal");
        }
    }
}
