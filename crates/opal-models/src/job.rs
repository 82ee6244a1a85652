//! Generation jobs and their status lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Job processing status reported to the external status sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Job is waiting in the queue, not yet attempted
    #[default]
    Pending,
    /// A worker is actively running this job
    Processing,
    /// Job completed successfully
    Success,
    /// Job failed and is queued for retry
    Waiting,
    /// Job exhausted its attempt ceiling (terminal)
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Success => "success",
            JobStatus::Waiting => "waiting",
            JobStatus::Failed => "failed",
        }
    }

    /// Check if this is a terminal state (no more transitions expected).
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Success | JobStatus::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One video generation request: a prompt plus an optional reference image.
///
/// `index` is assigned from the job's position in the caller's input and is
/// the stable identity used for status reporting. Retries requeue the same
/// job value, so the index survives any amount of front-of-queue reordering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationJob {
    /// Stable identity, assigned by original input position
    pub index: usize,
    /// Prompt text for the generation
    pub prompt: String,
    /// Optional reference image for image+text generation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_path: Option<PathBuf>,
    /// Current status
    #[serde(default)]
    pub status: JobStatus,
    /// Number of failed attempts so far
    #[serde(default)]
    pub attempts: u32,
    /// When the job was created
    pub created_at: DateTime<Utc>,
}

impl GenerationJob {
    /// Create a new text-only job.
    pub fn new(index: usize, prompt: impl Into<String>) -> Self {
        Self {
            index,
            prompt: prompt.into(),
            image_path: None,
            status: JobStatus::Pending,
            attempts: 0,
            created_at: Utc::now(),
        }
    }

    /// Set the reference image path.
    pub fn with_image(mut self, path: impl Into<PathBuf>) -> Self {
        self.image_path = Some(path.into());
        self
    }

    /// Record a failed attempt.
    pub fn record_attempt(&mut self) {
        self.attempts += 1;
    }

    /// Check whether the job may be requeued given an attempt ceiling.
    pub fn can_retry(&self, max_attempts: u32) -> bool {
        self.attempts < max_attempts
    }
}
