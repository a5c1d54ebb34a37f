//! Shutdown coordination.

use tokio::sync::broadcast;

use crate::lifecycle::signals;

/// Broadcasts a single shutdown event to every long-running task.
///
/// Clones share the same channel; any clone may trigger.
#[derive(Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    pub fn trigger(&self) {
        // No receivers left is fine: nothing to stop.
        let _ = self.tx.send(());
    }

    /// Tasks still listening for the event.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Wait for SIGTERM or Ctrl+C, then trigger.
    pub async fn trigger_on_signal(self) {
        let signal = signals::wait_for_termination().await;
        tracing::info!(signal, "Shutdown signal received");
        self.trigger();
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
