//! Batch orchestration: wires the harvester, pool, queue, and workers
//! together for one run and guarantees a clean shutdown.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;

use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use opal_models::{BatchId, Credential, GenerationJob, GenerationSettings, JobStatus};
use opal_pool::{CheckpointStore, JobQueue, TokenPool};

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::generate::Generator;
use crate::generator::GeneratorWorker;
use crate::harvester::Harvester;
use crate::report::{StatusSink, TracingStatusSink};
use crate::session::LoginProvider;
use crate::signal::StopSignal;

/// One requested generation: a prompt plus an optional reference image.
#[derive(Debug, Clone)]
pub struct BatchItem {
    pub prompt: String,
    pub image_path: Option<PathBuf>,
}

impl BatchItem {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            image_path: None,
        }
    }

    /// Attach a reference image.
    pub fn with_image(mut self, path: impl Into<PathBuf>) -> Self {
        self.image_path = Some(path.into());
        self
    }
}

/// Outcome of one batch run.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub batch_id: BatchId,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Final status per job, indexed by job index
    pub statuses: Vec<JobStatus>,
}

/// Forwards status events to the caller's sink while recording the final
/// status of every job for the batch report.
struct RecordingSink {
    inner: Arc<dyn StatusSink>,
    statuses: Mutex<Vec<JobStatus>>,
}

impl RecordingSink {
    fn new(inner: Arc<dyn StatusSink>, total: usize) -> Self {
        Self {
            inner,
            statuses: Mutex::new(vec![JobStatus::Pending; total]),
        }
    }

    fn statuses(&self) -> Vec<JobStatus> {
        self.statuses.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl StatusSink for RecordingSink {
    fn job_status(&self, job_index: usize, status: JobStatus) {
        let mut statuses = self.statuses.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(slot) = statuses.get_mut(job_index) {
            *slot = status;
        }
        drop(statuses);
        self.inner.job_status(job_index, status);
    }

    fn log(&self, message: &str) {
        self.inner.log(message);
    }
}

/// Runs one batch: validates input, builds the shared structures, starts
/// one harvester and `concurrency` workers, and tears everything down.
///
/// Shutdown protocol: the workers are awaited first (queue drained or stop
/// observed by every one of them), then the stop signal is raised so the
/// harvester terminates too. No background loop survives the call.
pub struct BatchRunner {
    credentials: Vec<Credential>,
    login: Arc<dyn LoginProvider>,
    generator: Arc<dyn Generator>,
    checkpoint: Arc<dyn CheckpointStore>,
    sink: Arc<dyn StatusSink>,
    settings: GenerationSettings,
    config: EngineConfig,
}

impl BatchRunner {
    pub fn new(
        credentials: Vec<Credential>,
        login: Arc<dyn LoginProvider>,
        generator: Arc<dyn Generator>,
        checkpoint: Arc<dyn CheckpointStore>,
        settings: GenerationSettings,
    ) -> Self {
        Self {
            credentials,
            login,
            generator,
            checkpoint,
            sink: Arc::new(TracingStatusSink),
            settings,
            config: EngineConfig::default(),
        }
    }

    /// Replace the default tracing status sink.
    pub fn with_sink(mut self, sink: Arc<dyn StatusSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Replace the default engine configuration.
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Run the batch to completion.
    ///
    /// Returns once every job has reached a terminal status or an
    /// external stop was propagated through the workers. The stop signal
    /// is owned by the run: callers wanting to stop a batch early hold a
    /// clone obtained via [`BatchRunner::run_with_stop`].
    pub async fn run(&self, items: Vec<BatchItem>) -> EngineResult<BatchReport> {
        self.run_with_stop(items, StopSignal::new()).await
    }

    /// Run the batch with a caller-controlled stop signal.
    pub async fn run_with_stop(
        &self,
        items: Vec<BatchItem>,
        stop: StopSignal,
    ) -> EngineResult<BatchReport> {
        if self.credentials.is_empty() {
            return Err(EngineError::NoCredentials);
        }

        let batch_id = BatchId::new();
        let total = items.len();
        info!(batch = %batch_id, jobs = total, accounts = self.credentials.len(), "batch starting");

        let jobs: Vec<GenerationJob> = items
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                let job = GenerationJob::new(index, item.prompt);
                match item.image_path {
                    Some(path) => job.with_image(path),
                    None => job,
                }
            })
            .collect();

        let pool = Arc::new(TokenPool::new());
        let queue = Arc::new(JobQueue::new(jobs));
        let recorder = Arc::new(RecordingSink::new(Arc::clone(&self.sink), total));
        let settings = Arc::new(self.settings.clone());

        let harvester = Harvester::new(
            Arc::new(self.credentials.clone()),
            Arc::clone(&pool),
            Arc::clone(&self.checkpoint),
            Arc::clone(&self.login),
            Arc::clone(&recorder) as Arc<dyn StatusSink>,
            self.config.clone(),
            stop.clone(),
        );
        let harvester_handle = tokio::spawn(harvester.run());

        let worker_count = self.config.concurrency.max(1);
        let mut worker_handles = Vec::with_capacity(worker_count);
        for _ in 0..worker_count {
            let worker = GeneratorWorker::new(
                format!("worker-{}", Uuid::new_v4()),
                Arc::clone(&pool),
                Arc::clone(&queue),
                Arc::clone(&self.generator),
                Arc::clone(&settings),
                Arc::clone(&recorder) as Arc<dyn StatusSink>,
                stop.clone(),
                self.config.max_attempts,
            );
            worker_handles.push(tokio::spawn(worker.run()));
        }

        let mut first_error: Option<EngineError> = None;
        for handle in worker_handles {
            if let Err(e) = handle.await {
                warn!(batch = %batch_id, "worker task failed: {e}");
                // A dead worker may have taken a token with it; raise the
                // stop so the remaining workers are not parked forever.
                stop.trigger();
                first_error.get_or_insert(EngineError::Join(e.to_string()));
            }
        }

        // All workers are done; tell the harvester to wind down and wait
        // for it so no background loop outlives the batch call, even when
        // a worker failed.
        stop.trigger();
        if let Err(e) = harvester_handle.await {
            first_error.get_or_insert(EngineError::Join(e.to_string()));
        }
        if let Some(error) = first_error {
            return Err(error);
        }

        let statuses = recorder.statuses();
        let succeeded = statuses.iter().filter(|s| **s == JobStatus::Success).count();
        let failed = statuses.iter().filter(|s| **s == JobStatus::Failed).count();
        info!(batch = %batch_id, succeeded, failed, total, "batch finished");

        Ok(BatchReport {
            batch_id,
            total,
            succeeded,
            failed,
            statuses,
        })
    }
}
