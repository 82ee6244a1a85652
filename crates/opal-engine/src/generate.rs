//! Generation collaborator seam.

use std::path::PathBuf;

use async_trait::async_trait;

use opal_models::{GenerationJob, GenerationSettings, TokenEntry};

use crate::error::GenerateError;

/// A finished, downloaded generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedVideo {
    /// Where the collaborator downloaded the result to
    pub path: PathBuf,
}

/// Requests one video generation and downloads the result.
///
/// The HTTP plumbing is opaque to the engine; what matters is the error
/// contract: failures must arrive as a classified
/// [`GenerateError`], so the worker's retry/discard decision is a pure
/// match on the kind instead of a substring search. Collaborators that
/// only have message text can build one via
/// [`GenerateError::from_message`].
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(
        &self,
        token: &TokenEntry,
        job: &GenerationJob,
        settings: &GenerationSettings,
    ) -> Result<GeneratedVideo, GenerateError>;
}
