//! Shared data models for the Opalgen generation engine.
//!
//! This crate provides Serde-serializable types for:
//! - Login credentials and harvested token entries
//! - Generation jobs and their status lifecycle
//! - Generation settings passed through to the API collaborator
//! - The rotation checkpoint used for resumable account rotation

pub mod batch;
pub mod credential;
pub mod job;
pub mod settings;
pub mod token;

// Re-export common types
pub use batch::BatchId;
pub use credential::Credential;
pub use job::{GenerationJob, JobStatus};
pub use settings::{AspectRatio, GenerationSettings};
pub use token::{RotationCheckpoint, TokenEntry};
