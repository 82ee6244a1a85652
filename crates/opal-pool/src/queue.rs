//! Ordered job queue with front-of-queue retry insertion.

use std::collections::VecDeque;

use tokio::sync::Mutex;
use tracing::debug;

use opal_models::GenerationJob;

/// Shared, ordered list of pending generation jobs.
///
/// Fresh jobs are consumed FIFO from the front. Failed jobs are re-inserted
/// at the *front* so a retry always takes priority over not-yet-attempted
/// jobs; this keeps a batch from starving when only some accounts are
/// degraded. Workers claim jobs by popping, so a job is never visible to
/// two workers at once.
pub struct JobQueue {
    inner: Mutex<VecDeque<GenerationJob>>,
}

impl JobQueue {
    /// Create a queue from jobs in their original input order.
    pub fn new(jobs: Vec<GenerationJob>) -> Self {
        Self {
            inner: Mutex::new(jobs.into()),
        }
    }

    /// Claim the next job, front first.
    pub async fn pop_front(&self) -> Option<GenerationJob> {
        let mut inner = self.inner.lock().await;
        let job = inner.pop_front();
        if let Some(job) = &job {
            debug!(job_index = job.index, remaining = inner.len(), "job claimed");
        }
        job
    }

    /// Re-insert a failed job at the front for immediate retry.
    pub async fn requeue_front(&self, job: GenerationJob) {
        let mut inner = self.inner.lock().await;
        debug!(job_index = job.index, attempts = job.attempts, "job requeued at front");
        inner.push_front(job);
    }

    /// Number of queued jobs.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    /// Whether the queue is empty.
    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }
}
