//! Token pool: the producer/consumer rendezvous point.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use tokio::sync::oneshot;
use tracing::debug;

use opal_models::TokenEntry;

/// Interior pool state, guarded by a single mutex.
///
/// At most one of `entries` / `waiters` is non-empty at any time: a deposit
/// that finds a live waiter hands the entry over instead of storing it, and
/// an acquire that finds an entry takes it instead of blocking.
#[derive(Default)]
struct PoolState {
    /// Idle token entries, oldest first
    entries: VecDeque<TokenEntry>,
    /// Blocked acquisitions, oldest first
    waiters: VecDeque<oneshot::Sender<TokenEntry>>,
}

/// Concurrency-safe mailbox connecting the token harvester (producer) to
/// the generation workers (consumers).
///
/// Both entries and waiters are FIFO, so no token and no waiter is starved
/// as long as deposits keep arriving. A token handed out by [`acquire`] is
/// owned by exactly one worker until it is deposited back; the pool never
/// duplicates an entry and never drops one silently.
///
/// [`acquire`]: TokenPool::acquire
pub struct TokenPool {
    state: Mutex<PoolState>,
}

impl TokenPool {
    /// Create an empty pool.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(PoolState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Deposit a token entry. Never fails.
    ///
    /// If any waiter is blocked, the oldest live waiter is woken with this
    /// entry; otherwise the entry is appended to the idle list. Waiters
    /// whose acquire was cancelled (receiver dropped) are skipped.
    pub fn deposit(&self, entry: TokenEntry) {
        let mut state = self.state();

        let mut entry = entry;
        while let Some(waiter) = state.waiters.pop_front() {
            let email = entry.email.clone();
            match waiter.send(entry) {
                Ok(()) => {
                    debug!(email = %email, "token handed to blocked waiter");
                    return;
                }
                // Receiver side gave up waiting; try the next one.
                Err(returned) => entry = returned,
            }
        }

        debug!(email = %entry.email, idle = state.entries.len() + 1, "token stored in pool");
        state.entries.push_back(entry);
    }

    /// Acquire a token entry, blocking until one is available.
    ///
    /// Returns the oldest idle entry immediately when present. Otherwise
    /// the caller joins a FIFO waiter list and suspends until a matching
    /// deposit occurs. Cancelling the returned future (dropping it) safely
    /// removes the caller from consideration: a deposit that raced the
    /// cancellation is recovered and goes back to the pool, one that
    /// arrives later skips the dead waiter.
    pub async fn acquire(&self) -> TokenEntry {
        let rx = {
            let mut state = self.state();
            if let Some(entry) = state.entries.pop_front() {
                debug!(email = %entry.email, "token acquired from idle list");
                return entry;
            }
            let (tx, rx) = oneshot::channel();
            state.waiters.push_back(tx);
            rx
            // Lock released before awaiting the handoff.
        };

        let mut pending = PendingAcquire {
            pool: self,
            rx,
            received: false,
        };
        match (&mut pending.rx).await {
            Ok(entry) => {
                pending.received = true;
                debug!(email = %entry.email, "token acquired via handoff");
                entry
            }
            // The sender lives in the pool we hold a reference to, so it
            // can only drop if the pool itself is torn down mid-acquire.
            Err(_) => unreachable!("token pool dropped while acquire was pending"),
        }
    }

    /// Advisory snapshot: whether any idle token is currently available.
    ///
    /// Purely informational; the answer may be stale by the time the
    /// caller acts on it.
    pub fn has_tokens(&self) -> bool {
        !self.state().entries.is_empty()
    }

    /// Number of idle entries (excludes tokens held by workers).
    pub fn idle_count(&self) -> usize {
        self.state().entries.len()
    }

    /// Number of blocked waiters.
    pub fn waiter_count(&self) -> usize {
        self.state().waiters.len()
    }
}

impl Default for TokenPool {
    fn default() -> Self {
        Self::new()
    }
}

/// Keeps a parked acquire honest under cancellation: a deposit can complete
/// its handoff just as the acquire future is dropped, leaving the entry
/// buffered in the oneshot channel. The drop recovers it and puts it back
/// into circulation.
struct PendingAcquire<'a> {
    pool: &'a TokenPool,
    rx: oneshot::Receiver<TokenEntry>,
    received: bool,
}

impl Drop for PendingAcquire<'_> {
    fn drop(&mut self) {
        if self.received {
            return;
        }
        self.rx.close();
        if let Ok(entry) = self.rx.try_recv() {
            debug!(email = %entry.email, "cancelled acquire returned its entry to the pool");
            self.pool.deposit(entry);
        }
    }
}
