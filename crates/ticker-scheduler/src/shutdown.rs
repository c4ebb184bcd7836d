// crates/ticker-scheduler/src/shutdown.rs
//
// Shutdown coordination.
//
// The signal listener only ever flips a shared cancellation token. The
// ticker polls it at safe points and wakes early from its sleeps when it is
// set; it never touches ticker state or the store directly.

use tokio_util::sync::CancellationToken;

use ticker_core::TickerError;

/// Cloneable handle to the process-wide shutdown flag.
#[derive(Debug, Clone, Default)]
pub struct ShutdownCoordinator {
    token: CancellationToken,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request shutdown. Returns `true` only for the first request; later
    /// requests are ignored.
    pub fn request(&self, reason: &str) -> bool {
        if self.token.is_cancelled() {
            tracing::debug!("Ignoring {}: shutdown already in progress", reason);
            return false;
        }
        tracing::info!("Received {}, shutting down after the current step", reason);
        self.token.cancel();
        true
    }

    pub fn is_requested(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once shutdown has been requested.
    pub async fn requested(&self) {
        self.token.cancelled().await
    }
}

/// Forward SIGINT, SIGTERM and SIGQUIT to `coordinator` until the task is
/// dropped. Signals after the first are absorbed so they cannot kill the
/// process before the final checkpoint is written.
#[cfg(unix)]
pub async fn listen_for_signals(coordinator: ShutdownCoordinator) -> Result<(), TickerError> {
    use tokio::signal::unix::{signal, SignalKind};

    let install = |kind: SignalKind, name: &str| {
        signal(kind).map_err(|e| {
            TickerError::Configuration(format!("Failed to install {} handler: {}", name, e))
        })
    };
    let mut interrupt = install(SignalKind::interrupt(), "SIGINT")?;
    let mut terminate = install(SignalKind::terminate(), "SIGTERM")?;
    let mut quit = install(SignalKind::quit(), "SIGQUIT")?;

    loop {
        tokio::select! {
            _ = interrupt.recv() => { coordinator.request("SIGINT"); }
            _ = terminate.recv() => { coordinator.request("SIGTERM"); }
            _ = quit.recv() => { coordinator.request("SIGQUIT"); }
        }
    }
}

#[cfg(not(unix))]
pub async fn listen_for_signals(coordinator: ShutdownCoordinator) -> Result<(), TickerError> {
    loop {
        tokio::signal::ctrl_c().await.map_err(|e| {
            TickerError::Configuration(format!("Failed to install Ctrl+C handler: {}", e))
        })?;
        coordinator.request("Ctrl+C");
    }
}
