//! Stop coordination for background loops
//!
//! Run-loops and the retention sweeper each own a [`ShutdownCoordinator`].
//! Triggering it flips an atomic flag (for loops that poll between
//! iterations) and broadcasts on a channel (for loops parked in `select!`).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Cancellation token shared between a background task and its owner
#[derive(Debug, Clone)]
pub struct ShutdownCoordinator {
    shutdown_tx: broadcast::Sender<()>,
    shutdown_requested: Arc<AtomicBool>,
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        // A few slots so a burst of stop requests never lags a receiver
        let (shutdown_tx, _) = broadcast::channel(8);
        Self {
            shutdown_tx,
            shutdown_requested: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Subscribe to stop notifications
    ///
    /// Broadcast receivers only see messages sent after they subscribe, so
    /// loops must also check [`is_shutdown_requested`](Self::is_shutdown_requested)
    /// before parking.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Request shutdown; idempotent
    pub fn trigger_shutdown(&self) {
        // Release pairs with the Acquire load in is_shutdown_requested
        self.shutdown_requested.store(true, Ordering::Release);
        let _ = self.shutdown_tx.send(());
    }

    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown_requested.load(Ordering::Acquire)
    }

    /// Resolve once shutdown has been requested
    ///
    /// Safe to race against other futures in `select!`: it returns
    /// immediately when the flag is already set.
    pub async fn wait(&self) {
        let mut rx = self.subscribe();
        if self.is_shutdown_requested() {
            return;
        }
        // Closed or lagged both mean the sender side has moved on
        let _ = rx.recv().await;
    }
}
