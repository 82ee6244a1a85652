//! Engine error types and the generation failure classifier.

use thiserror::Error;

pub type EngineResult<T> = Result<T, EngineError>;

/// Engine-level errors. Per-job and per-login failures never surface here;
/// they are classified and absorbed by the loops.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no credentials configured, refusing to start batch")]
    NoCredentials,

    #[error("pool error: {0}")]
    Pool(#[from] opal_pool::PoolError),

    #[error("background task failed: {0}")]
    Join(String),
}

/// Errors from the login-session collaborator.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The browser profile is held by a concurrent process. Retryable.
    #[error("browser profile locked: {0}")]
    ProfileLocked(String),

    /// Session setup failed for any other reason. Fails this rotation turn.
    #[error("session failed: {0}")]
    Failed(String),

    /// Login ran but produced no token (bad password, CAPTCHA wall, ...).
    #[error("login failed: {0}")]
    LoginFailed(String),
}

impl SessionError {
    pub fn profile_locked(msg: impl Into<String>) -> Self {
        Self::ProfileLocked(msg.into())
    }

    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }

    pub fn login_failed(msg: impl Into<String>) -> Self {
        Self::LoginFailed(msg.into())
    }

    /// Only profile-lock contention gets bounded local retries.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SessionError::ProfileLocked(_))
    }
}

/// Classified failure kind for a generation call.
///
/// Drives the worker's token disposal policy: `AuthExpired` and
/// `QuotaExceeded` mean the token is dead and must not return to the pool;
/// `Transient` means the token is assumed still good; `UserStopped`
/// propagates the stop to the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GenerateErrorKind {
    /// The run was stopped by the user mid-call
    UserStopped,
    /// The token was rejected (401/403 class)
    AuthExpired,
    /// The account hit its generation quota or a rate limit
    QuotaExceeded,
    /// Anything else: network hiccups, timeouts, flaky API responses
    Transient,
}

impl GenerateErrorKind {
    /// Whether this kind means the token must be discarded.
    pub fn is_token_dead(&self) -> bool {
        matches!(self, GenerateErrorKind::AuthExpired | GenerateErrorKind::QuotaExceeded)
    }
}

/// A classified generation failure.
///
/// Collaborators that know why they failed construct the kind directly.
/// Those that only have an error message can go through
/// [`GenerateError::from_message`], which applies the legacy substring
/// heuristic.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct GenerateError {
    pub kind: GenerateErrorKind,
    pub message: String,
}

impl GenerateError {
    pub fn new(kind: GenerateErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn user_stopped(msg: impl Into<String>) -> Self {
        Self::new(GenerateErrorKind::UserStopped, msg)
    }

    pub fn auth_expired(msg: impl Into<String>) -> Self {
        Self::new(GenerateErrorKind::AuthExpired, msg)
    }

    pub fn quota_exceeded(msg: impl Into<String>) -> Self {
        Self::new(GenerateErrorKind::QuotaExceeded, msg)
    }

    pub fn transient(msg: impl Into<String>) -> Self {
        Self::new(GenerateErrorKind::Transient, msg)
    }

    /// Classify a raw error message with the substring heuristic.
    pub fn from_message(msg: impl Into<String>) -> Self {
        let message = msg.into();
        Self {
            kind: classify_message(&message),
            message,
        }
    }

    /// Whether the failing token must be discarded.
    pub fn is_token_dead(&self) -> bool {
        self.kind.is_token_dead()
    }
}

/// Best-effort classification of a raw generation error message.
///
/// Kept deliberately close to the signatures the Opal API is known to emit.
/// Misclassification is tolerable and asymmetric: a false "token dead"
/// costs one extra harvest cycle, a false "token alive" costs one wasted
/// job attempt.
pub fn classify_message(message: &str) -> GenerateErrorKind {
    let msg = message.to_lowercase();

    if msg.contains("stopped by user") || msg.contains("generation stopped") {
        return GenerateErrorKind::UserStopped;
    }

    if msg.contains("401") || msg.contains("unauthorized") || msg.contains("403") || msg.contains("forbidden") {
        return GenerateErrorKind::AuthExpired;
    }

    if msg.contains("quota")
        || msg.contains("429")
        || msg.contains("too many requests")
        || msg.contains("rate limit")
        || msg.contains("limit reached")
        || msg.contains("limit exceeded")
    {
        return GenerateErrorKind::QuotaExceeded;
    }

    GenerateErrorKind::Transient
}
