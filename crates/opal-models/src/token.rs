//! Harvested token entries and the rotation checkpoint.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A bearer token harvested from one login session.
///
/// The token is opaque and tied to the credential it was extracted from.
/// Validity is discovered lazily by using it: the pool never probes tokens,
/// workers infer death from classified generation failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenEntry {
    /// Email of the account the token was issued for
    pub email: String,
    /// Opaque bearer token
    pub token: String,
    /// When the harvester extracted this token
    pub harvested_at: DateTime<Utc>,
}

impl TokenEntry {
    /// Create a new token entry stamped with the current time.
    pub fn new(email: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            token: token.into(),
            harvested_at: Utc::now(),
        }
    }
}

/// Persisted rotation state for the harvester.
///
/// Points at the *next* account to attempt. Written before each login
/// attempt so a crash mid-login never replays the same account forever,
/// at the cost of possibly skipping one account's result on crash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RotationCheckpoint {
    /// Index of the next credential to harvest
    pub last_account_index: usize,
}

impl RotationCheckpoint {
    /// Create a checkpoint pointing at the given index.
    pub fn new(last_account_index: usize) -> Self {
        Self { last_account_index }
    }

    /// Clamp the stored index to a credential list of the given length.
    ///
    /// Returns the starting index for the rotation, resetting to 0 when
    /// the list shrank below the stored index.
    pub fn start_index(&self, credential_count: usize) -> usize {
        if self.last_account_index < credential_count {
            self.last_account_index
        } else {
            0
        }
    }
}
