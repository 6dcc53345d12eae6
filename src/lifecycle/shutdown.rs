//! Shutdown coordination for the server.

use std::sync::Arc;

use tokio::sync::watch;

/// Why a shutdown was requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownReason {
    /// The owner called `stop()`.
    Requested,
    /// SIGINT / SIGTERM.
    Signal,
    /// A handler hit an unrecoverable condition.
    Fatal(String),
}

/// Coordinator for graceful shutdown.
///
/// Backed by a watch channel so tasks that subscribe after the trigger
/// still observe it. Only the first trigger is recorded.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: Arc<watch::Sender<Option<ShutdownReason>>>,
}

impl Shutdown {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.tx.subscribe(),
        }
    }

    /// Trigger the shutdown signal. Returns false if it was already triggered.
    pub fn trigger(&self, reason: ShutdownReason) -> bool {
        let mut reason = Some(reason);
        let first = self.tx.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = reason.take();
            true
        });
        if first {
            tracing::info!(reason = ?self.reason(), "Shutdown triggered");
        }
        first
    }

    pub fn is_triggered(&self) -> bool {
        self.tx.borrow().is_some()
    }

    pub fn reason(&self) -> Option<ShutdownReason> {
        self.tx.borrow().clone()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// A subscription to a [`Shutdown`].
#[derive(Debug)]
pub struct ShutdownSignal {
    rx: watch::Receiver<Option<ShutdownReason>>,
}

impl ShutdownSignal {
    /// Resolve once shutdown has been triggered.
    pub async fn wait(mut self) -> ShutdownReason {
        match self.rx.wait_for(Option::is_some).await {
            Ok(reason) => reason.clone().unwrap_or(ShutdownReason::Requested),
            // coordinator dropped: nobody can trigger any more
            Err(_) => ShutdownReason::Requested,
        }
    }
}
