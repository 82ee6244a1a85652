//! Token harvester: the producer side of the engine.
//!
//! One sequential loop that rotates through the credential list, performs
//! one browser login at a time, and deposits every harvested token into
//! the shared pool. Runs until the stop signal is raised.

use std::sync::Arc;

use tracing::{info, warn};

use opal_models::{Credential, RotationCheckpoint, TokenEntry};
use opal_pool::{CheckpointStore, TokenPool};

use crate::config::EngineConfig;
use crate::report::StatusSink;
use crate::retry::{retry_async_if, RetryConfig};
use crate::session::LoginProvider;
use crate::signal::StopSignal;

/// The harvester loop.
///
/// Per-account login failures are non-fatal: they are logged and the
/// rotation continues, the account gets retried on its next turn. The
/// rotation index is persisted *before* each attempt, so a crash
/// mid-login advances past the poisoned account instead of replaying it
/// forever (at the cost of possibly skipping one account's result).
pub struct Harvester {
    credentials: Arc<Vec<Credential>>,
    pool: Arc<TokenPool>,
    checkpoint: Arc<dyn CheckpointStore>,
    login: Arc<dyn LoginProvider>,
    sink: Arc<dyn StatusSink>,
    config: EngineConfig,
    stop: StopSignal,
}

impl Harvester {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        credentials: Arc<Vec<Credential>>,
        pool: Arc<TokenPool>,
        checkpoint: Arc<dyn CheckpointStore>,
        login: Arc<dyn LoginProvider>,
        sink: Arc<dyn StatusSink>,
        config: EngineConfig,
        stop: StopSignal,
    ) -> Self {
        Self {
            credentials,
            pool,
            checkpoint,
            login,
            sink,
            config,
            stop,
        }
    }

    /// Run the rotation until the stop signal is raised.
    ///
    /// The signal is checked at the top of each iteration: an in-flight
    /// login always completes (token deposited or failure logged) before
    /// the loop exits.
    pub async fn run(self) {
        let count = self.credentials.len();
        if count == 0 {
            warn!("harvester started with no credentials, exiting");
            return;
        }

        let stored = match self.checkpoint.load() {
            Ok(cp) => cp.unwrap_or_default(),
            Err(e) => {
                warn!("failed to load rotation checkpoint, starting from 0: {e}");
                RotationCheckpoint::default()
            }
        };
        let start = stored.start_index(count);
        if stored.last_account_index != start {
            warn!(
                stored = stored.last_account_index,
                accounts = count,
                "rotation checkpoint out of range for credential list, reset to 0"
            );
        }
        info!(start, accounts = count, "harvester rotation starting");

        let mut i = 0usize;
        while !self.stop.is_stopped() {
            let current = (start + i) % count;
            let next = (current + 1) % count;

            // Advance-before-attempt: persist the next index before the
            // login so a crash during this iteration cannot replay it.
            if let Err(e) = self.checkpoint.save(&RotationCheckpoint::new(next)) {
                warn!("failed to save rotation checkpoint: {e}");
            }

            self.harvest(&self.credentials[current]).await;

            // Settle delay lets OS-level profile locks clear before the
            // next session opens.
            tokio::time::sleep(self.config.settle_delay).await;
            i += 1;
        }

        info!("harvester stopped");
    }

    /// Attempt one login and deposit the harvested token.
    async fn harvest(&self, credential: &Credential) {
        let retry = RetryConfig::new(format!("open session for {credential}"))
            .with_max_retries(self.config.session_retry_attempts)
            .with_delay(self.config.session_retry_delay);

        let session = retry_async_if(
            &retry,
            || self.login.open_session(credential),
            |e| e.is_retryable(),
        )
        .await;

        let mut session = match session {
            Ok(session) => session,
            Err(e) => {
                warn!(account = %credential, "could not open login session: {e}");
                self.sink.log(&format!("login session for {credential} failed: {e}"));
                return;
            }
        };

        match session.login().await {
            Ok(token) => {
                info!(account = %credential, "token harvested");
                self.sink.log(&format!("harvested token for {credential}"));
                self.pool.deposit(TokenEntry::new(&credential.email, token));
            }
            Err(e) => {
                warn!(account = %credential, "login failed: {e}");
                self.sink.log(&format!("login for {credential} failed: {e}"));
            }
        }

        // Teardown is unconditional, success or failure.
        session.close().await;
    }
}
