//! Cooperative shutdown on SIGINT and SIGTERM
//!
//! The first signal only raises a flag. The protection pass checks it before
//! every page and every repository, so the repository being processed when the
//! signal arrives is finished first. A second signal exits immediately, which
//! covers a request that never returns.

use std::future::Future;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Shared stop flag
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    triggered: Arc<AtomicBool>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.triggered.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    /// Spawn a task that raises the flag when the process is asked to stop,
    /// and exits the process if asked a second time
    pub fn listen(&self) -> JoinHandle<()> {
        let signal = self.clone();
        tokio::spawn(async move {
            match signal.watch(wait_for_shutdown_signal).await {
                Ok(_) => std::process::exit(0),
                Err(e) => warn!("Failed to listen for shutdown signals: {}", e),
            }
        })
    }

    /// Raise the flag on the first signal from `next_signal` and return the
    /// name of the second one
    async fn watch<F, Fut>(&self, mut next_signal: F) -> io::Result<&'static str>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = io::Result<&'static str>>,
    {
        let name = next_signal().await?;
        info!("Received {}, stopping after the current repository", name);
        self.trigger();

        let name = next_signal().await?;
        warn!("Received {} again, exiting now", name);
        Ok(name)
    }
}

/// Wait for SIGTERM or SIGINT (Ctrl+C)
#[cfg(unix)]
async fn wait_for_shutdown_signal() -> io::Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result.map(|_| "SIGINT"),
        _ = terminate.recv() => Ok("SIGTERM"),
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> io::Result<&'static str> {
    tokio::signal::ctrl_c().await.map(|_| "Ctrl+C")
}
