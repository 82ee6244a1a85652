//! Cooperative stop signal.

use tokio::sync::watch;

/// Shared cooperative cancellation signal.
///
/// Passed explicitly into every loop; there is no process-global stop
/// state, so independent batch runs cannot interfere with each other.
/// Loops check it at iteration boundaries only: an in-flight collaborator
/// call is never aborted, the next iteration simply does not start.
#[derive(Clone)]
pub struct StopSignal {
    tx: watch::Sender<bool>,
}

impl StopSignal {
    /// Create a new, untriggered signal.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    /// Raise the stop signal. Idempotent.
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    /// Snapshot check, used at loop-iteration boundaries.
    pub fn is_stopped(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolve once the signal has been raised.
    ///
    /// Usable in `tokio::select!` against a blocking acquisition so a
    /// worker parked on an empty pool still observes the stop.
    pub async fn stopped(&self) {
        let mut rx = self.tx.subscribe();
        // Outcome irrelevant: the channel can only close when this signal
        // is dropped, and we hold a sender.
        let _ = rx.wait_for(|stopped| *stopped).await;
    }
}

impl Default for StopSignal {
    fn default() -> Self {
        Self::new()
    }
}
