//! Login credentials for Opal accounts.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single Opal account credential.
///
/// Loaded once per batch run from the external account list. The email
/// is the identity key: tokens harvested from a login session are always
/// attributed back to the credential's email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// Account email (identity key)
    pub email: String,
    /// Account password
    pub password: String,
}

impl Credential {
    /// Create a new credential.
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Display for Credential {
    /// Displays only the email. The password never reaches log output.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.email)
    }
}
