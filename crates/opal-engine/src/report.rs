//! Status reporting seam.

use tracing::info;

use opal_models::JobStatus;

/// Fire-and-forget observer for job status transitions and log lines.
///
/// Consumed by an external UI/log layer; the engine never waits on it and
/// ignores whatever it does with the events.
pub trait StatusSink: Send + Sync {
    /// Report a job status transition.
    fn job_status(&self, job_index: usize, status: JobStatus);

    /// Emit a human-readable progress line.
    fn log(&self, message: &str);
}

/// Default sink that forwards everything to `tracing`.
#[derive(Debug, Default, Clone)]
pub struct TracingStatusSink;

impl StatusSink for TracingStatusSink {
    fn job_status(&self, job_index: usize, status: JobStatus) {
        info!(job_index, status = %status, "job status");
    }

    fn log(&self, message: &str) {
        info!("{message}");
    }
}
