//! Login collaborator seams.
//!
//! Browser automation (navigation, human-like clicking, CAPTCHA and
//! consent handling) lives behind these traits. The engine only sees an
//! opaque session that either yields a bearer token or fails.

use async_trait::async_trait;

use opal_models::Credential;

use crate::error::SessionError;

/// Opens isolated login sessions, one per credential identity.
#[async_trait]
pub trait LoginProvider: Send + Sync {
    /// Open a browser session scoped to this credential's profile.
    ///
    /// [`SessionError::ProfileLocked`] signals that the underlying profile
    /// directory is held by a concurrent process; the harvester retries
    /// that case with a bounded local retry. Any other error fails the
    /// current rotation turn only.
    async fn open_session(
        &self,
        credential: &Credential,
    ) -> Result<Box<dyn LoginSession>, SessionError>;
}

/// One live login session.
///
/// May take tens of seconds and perform arbitrary internal retries and
/// interactions; the engine only observes the final token or the failure.
#[async_trait]
pub trait LoginSession: Send {
    /// Perform the login and extract the bearer token.
    async fn login(&mut self) -> Result<String, SessionError>;

    /// Tear the session down. Called unconditionally, success or failure.
    async fn close(self: Box<Self>);
}
