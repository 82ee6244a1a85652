//! Generation worker: the consumer side of the engine.

use std::sync::Arc;

use tracing::{info, warn};

use opal_models::{GenerationJob, GenerationSettings, JobStatus};
use opal_pool::{JobQueue, TokenPool};

use crate::error::GenerateErrorKind;
use crate::generate::Generator;
use crate::report::StatusSink;
use crate::signal::StopSignal;

/// One of N concurrent generation workers.
///
/// Drains the job queue using tokens from the pool. Token death is
/// inferred from the classified generation failure, not from a separate
/// health check: the API gives no independent liveness signal. A dead
/// token is dropped on the floor; the credential produces a fresh one on
/// the harvester's next rotation turn.
pub struct GeneratorWorker {
    name: String,
    pool: Arc<TokenPool>,
    queue: Arc<JobQueue>,
    generator: Arc<dyn Generator>,
    settings: Arc<GenerationSettings>,
    sink: Arc<dyn StatusSink>,
    stop: StopSignal,
    max_attempts: u32,
}

impl GeneratorWorker {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: impl Into<String>,
        pool: Arc<TokenPool>,
        queue: Arc<JobQueue>,
        generator: Arc<dyn Generator>,
        settings: Arc<GenerationSettings>,
        sink: Arc<dyn StatusSink>,
        stop: StopSignal,
        max_attempts: u32,
    ) -> Self {
        Self {
            name: name.into(),
            pool,
            queue,
            generator,
            settings,
            sink,
            stop,
            max_attempts,
        }
    }

    /// Run until the queue is drained or the stop signal is raised.
    pub async fn run(self) {
        loop {
            if self.stop.is_stopped() {
                info!(worker = %self.name, "stop signal observed, worker exiting");
                return;
            }
            if self.queue.is_empty().await {
                info!(worker = %self.name, "queue drained, worker exiting");
                return;
            }

            if !self.pool.has_tokens() {
                self.sink.log(&format!("{} waiting for a token", self.name));
            }

            // Primary suspension point. A stop raised while parked here
            // unblocks the worker; the dropped acquire hands any raced
            // deposit back to the pool.
            let token = tokio::select! {
                biased;
                _ = self.stop.stopped() => {
                    info!(worker = %self.name, "stopped while waiting for a token");
                    return;
                }
                token = self.pool.acquire() => token,
            };

            // Another worker may have drained the queue while this one
            // was parked on the pool.
            let Some(mut job) = self.queue.pop_front().await else {
                self.pool.deposit(token);
                info!(worker = %self.name, "queue drained while waiting, worker exiting");
                return;
            };

            job.status = JobStatus::Processing;
            self.sink.job_status(job.index, JobStatus::Processing);
            info!(worker = %self.name, job_index = job.index, account = %token.email, "generating");

            match self.generator.generate(&token, &job, &self.settings).await {
                Ok(video) => {
                    job.status = JobStatus::Success;
                    self.sink.job_status(job.index, JobStatus::Success);
                    info!(
                        worker = %self.name,
                        job_index = job.index,
                        path = %video.path.display(),
                        "generation succeeded"
                    );
                    // Token assumed still valid, back into circulation.
                    self.pool.deposit(token);
                }
                Err(err) if err.kind == GenerateErrorKind::UserStopped => {
                    // Propagate the stop: job back to the front untouched,
                    // token back to the pool, worker terminates.
                    warn!(worker = %self.name, job_index = job.index, "generation stopped: {err}");
                    job.status = JobStatus::Pending;
                    self.sink.job_status(job.index, JobStatus::Pending);
                    self.queue.requeue_front(job).await;
                    self.pool.deposit(token);
                    return;
                }
                Err(err) if err.is_token_dead() => {
                    warn!(
                        worker = %self.name,
                        job_index = job.index,
                        account = %token.email,
                        "token classified dead, discarding: {err}"
                    );
                    self.sink
                        .log(&format!("token for {} discarded ({err})", token.email));
                    self.finish_failed_attempt(job, &err.to_string()).await;
                    // Token dropped here: dead tokens never return to the
                    // pool, the harvester replaces them next rotation.
                }
                Err(err) => {
                    warn!(
                        worker = %self.name,
                        job_index = job.index,
                        "transient generation failure: {err}"
                    );
                    self.finish_failed_attempt(job, &err.to_string()).await;
                    self.pool.deposit(token);
                }
            }
        }
    }

    /// Count the attempt, then requeue at the front or fail terminally.
    async fn finish_failed_attempt(&self, mut job: GenerationJob, error: &str) {
        job.record_attempt();
        if job.can_retry(self.max_attempts) {
            job.status = JobStatus::Waiting;
            self.sink.job_status(job.index, JobStatus::Waiting);
            self.queue.requeue_front(job).await;
        } else {
            job.status = JobStatus::Failed;
            warn!(
                job_index = job.index,
                attempts = job.attempts,
                "attempt ceiling reached, job failed: {error}"
            );
            self.sink.job_status(job.index, JobStatus::Failed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GenerateError;
    use crate::generate::GeneratedVideo;
    use crate::report::StatusSink;
    use async_trait::async_trait;
    use opal_models::TokenEntry;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Generator that replays a script of outcomes and records the tokens
    /// it was handed.
    struct ScriptedGenerator {
        script: Mutex<VecDeque<Result<(), GenerateError>>>,
        tokens_seen: Mutex<Vec<String>>,
    }

    impl ScriptedGenerator {
        fn new(script: Vec<Result<(), GenerateError>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                tokens_seen: Mutex::new(Vec::new()),
            }
        }

        fn tokens_seen(&self) -> Vec<String> {
            self.tokens_seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Generator for ScriptedGenerator {
        async fn generate(
            &self,
            token: &TokenEntry,
            job: &GenerationJob,
            settings: &GenerationSettings,
        ) -> Result<GeneratedVideo, GenerateError> {
            self.tokens_seen.lock().unwrap().push(token.token.clone());
            match self.script.lock().unwrap().pop_front() {
                Some(Ok(())) => Ok(GeneratedVideo {
                    path: settings.output_dir.join(format!("video_{}.mp4", job.index)),
                }),
                Some(Err(e)) => Err(e),
                None => Ok(GeneratedVideo {
                    path: settings.output_dir.join(format!("video_{}.mp4", job.index)),
                }),
            }
        }
    }

    /// Sink that records every status transition.
    #[derive(Default)]
    struct RecordingSink {
        events: Mutex<Vec<(usize, JobStatus)>>,
    }

    impl RecordingSink {
        fn events(&self) -> Vec<(usize, JobStatus)> {
            self.events.lock().unwrap().clone()
        }
    }

    impl StatusSink for RecordingSink {
        fn job_status(&self, job_index: usize, status: JobStatus) {
            self.events.lock().unwrap().push((job_index, status));
        }

        fn log(&self, _message: &str) {}
    }

    fn jobs(n: usize) -> Vec<GenerationJob> {
        (0..n).map(|i| GenerationJob::new(i, format!("prompt {i}"))).collect()
    }

    fn worker(
        pool: Arc<TokenPool>,
        queue: Arc<JobQueue>,
        generator: Arc<ScriptedGenerator>,
        sink: Arc<RecordingSink>,
        stop: StopSignal,
        max_attempts: u32,
    ) -> GeneratorWorker {
        GeneratorWorker::new(
            "worker-test",
            pool,
            queue,
            generator,
            Arc::new(GenerationSettings::new("opal-v2", "/tmp/out")),
            sink,
            stop,
            max_attempts,
        )
    }

    #[tokio::test]
    async fn success_returns_token_and_drains_queue() {
        let pool = Arc::new(TokenPool::new());
        pool.deposit(TokenEntry::new("a@x.com", "tok-a"));
        let queue = Arc::new(JobQueue::new(jobs(2)));
        let generator = Arc::new(ScriptedGenerator::new(vec![Ok(()), Ok(())]));
        let sink = Arc::new(RecordingSink::default());

        worker(
            Arc::clone(&pool),
            Arc::clone(&queue),
            Arc::clone(&generator),
            Arc::clone(&sink),
            StopSignal::new(),
            5,
        )
        .run()
        .await;

        assert!(queue.is_empty().await);
        // The single token was reused for both jobs and is idle again.
        assert_eq!(generator.tokens_seen(), vec!["tok-a", "tok-a"]);
        assert_eq!(pool.idle_count(), 1);
        assert_eq!(
            sink.events(),
            vec![
                (0, JobStatus::Processing),
                (0, JobStatus::Success),
                (1, JobStatus::Processing),
                (1, JobStatus::Success),
            ]
        );
    }

    #[tokio::test]
    async fn auth_failure_discards_token_and_requeues_front() {
        let pool = Arc::new(TokenPool::new());
        pool.deposit(TokenEntry::new("a@x.com", "tok-dead"));
        pool.deposit(TokenEntry::new("b@x.com", "tok-live"));
        let queue = Arc::new(JobQueue::new(jobs(3)));
        let generator = Arc::new(ScriptedGenerator::new(vec![
            Err(GenerateError::from_message("403 Forbidden")),
            Ok(()),
            Ok(()),
            Ok(()),
        ]));
        let sink = Arc::new(RecordingSink::default());

        worker(
            Arc::clone(&pool),
            Arc::clone(&queue),
            Arc::clone(&generator),
            Arc::clone(&sink),
            StopSignal::new(),
            5,
        )
        .run()
        .await;

        // tok-dead was used once and never again; J0 was retried first,
        // ahead of J1 and J2.
        assert_eq!(
            generator.tokens_seen(),
            vec!["tok-dead", "tok-live", "tok-live", "tok-live"]
        );
        assert_eq!(
            sink.events(),
            vec![
                (0, JobStatus::Processing),
                (0, JobStatus::Waiting),
                (0, JobStatus::Processing),
                (0, JobStatus::Success),
                (1, JobStatus::Processing),
                (1, JobStatus::Success),
                (2, JobStatus::Processing),
                (2, JobStatus::Success),
            ]
        );
        // Only the live token remains in circulation.
        assert_eq!(pool.idle_count(), 1);
        assert_eq!(pool.acquire().await.token, "tok-live");
    }

    #[tokio::test]
    async fn transient_failure_keeps_token() {
        let pool = Arc::new(TokenPool::new());
        pool.deposit(TokenEntry::new("a@x.com", "tok-a"));
        let queue = Arc::new(JobQueue::new(jobs(1)));
        let generator = Arc::new(ScriptedGenerator::new(vec![
            Err(GenerateError::transient("connection reset")),
            Ok(()),
        ]));
        let sink = Arc::new(RecordingSink::default());

        worker(
            Arc::clone(&pool),
            Arc::clone(&queue),
            Arc::clone(&generator),
            Arc::clone(&sink),
            StopSignal::new(),
            5,
        )
        .run()
        .await;

        // Same token retried the job after the transient failure.
        assert_eq!(generator.tokens_seen(), vec!["tok-a", "tok-a"]);
        assert_eq!(pool.idle_count(), 1);
    }

    #[tokio::test]
    async fn user_stop_requeues_job_and_terminates() {
        let pool = Arc::new(TokenPool::new());
        pool.deposit(TokenEntry::new("a@x.com", "tok-a"));
        let queue = Arc::new(JobQueue::new(jobs(2)));
        let generator = Arc::new(ScriptedGenerator::new(vec![Err(GenerateError::user_stopped(
            "generation stopped by user",
        ))]));
        let sink = Arc::new(RecordingSink::default());

        worker(
            Arc::clone(&pool),
            Arc::clone(&queue),
            Arc::clone(&generator),
            Arc::clone(&sink),
            StopSignal::new(),
            5,
        )
        .run()
        .await;

        // Worker stopped after one attempt; J0 is back at the front with
        // no attempt counted, and the token returned to the pool.
        assert_eq!(generator.tokens_seen(), vec!["tok-a"]);
        assert_eq!(queue.len().await, 2);
        let front = queue.pop_front().await.unwrap();
        assert_eq!(front.index, 0);
        assert_eq!(front.attempts, 0);
        assert_eq!(pool.idle_count(), 1);
    }

    #[tokio::test]
    async fn attempt_ceiling_fails_job_terminally() {
        let pool = Arc::new(TokenPool::new());
        pool.deposit(TokenEntry::new("a@x.com", "tok-a"));
        let queue = Arc::new(JobQueue::new(jobs(1)));
        let generator = Arc::new(ScriptedGenerator::new(vec![
            Err(GenerateError::transient("timeout")),
            Err(GenerateError::transient("timeout")),
        ]));
        let sink = Arc::new(RecordingSink::default());

        worker(
            Arc::clone(&pool),
            Arc::clone(&queue),
            Arc::clone(&generator),
            Arc::clone(&sink),
            StopSignal::new(),
            2,
        )
        .run()
        .await;

        assert!(queue.is_empty().await);
        let events = sink.events();
        assert_eq!(events.last(), Some(&(0, JobStatus::Failed)));
        // Transient failures kept the token alive.
        assert_eq!(pool.idle_count(), 1);
    }

    #[tokio::test]
    async fn empty_queue_after_acquire_returns_token() {
        let pool = Arc::new(TokenPool::new());
        let queue = Arc::new(JobQueue::new(jobs(1)));
        let generator = Arc::new(ScriptedGenerator::new(vec![Ok(())]));
        let sink = Arc::new(RecordingSink::default());
        let stop = StopSignal::new();

        // Two workers, one job, one token: exactly one worker processes
        // the job; the other eventually receives the recycled token, sees
        // the queue empty, puts the token back, and exits.
        let w1 = worker(
            Arc::clone(&pool),
            Arc::clone(&queue),
            Arc::clone(&generator),
            Arc::clone(&sink),
            stop.clone(),
            5,
        );
        let w2 = worker(
            Arc::clone(&pool),
            Arc::clone(&queue),
            Arc::clone(&generator),
            Arc::clone(&sink),
            stop.clone(),
            5,
        );
        let h1 = tokio::spawn(w1.run());
        let h2 = tokio::spawn(w2.run());
        pool.deposit(TokenEntry::new("a@x.com", "tok-a"));

        h1.await.unwrap();
        h2.await.unwrap();

        assert_eq!(generator.tokens_seen(), vec!["tok-a"]);
        assert!(queue.is_empty().await);
        assert_eq!(pool.idle_count(), 1);
    }

    #[tokio::test]
    async fn stop_unblocks_worker_parked_on_empty_pool() {
        let pool = Arc::new(TokenPool::new());
        let queue = Arc::new(JobQueue::new(jobs(1)));
        let generator = Arc::new(ScriptedGenerator::new(vec![]));
        let sink = Arc::new(RecordingSink::default());
        let stop = StopSignal::new();

        let w = worker(
            Arc::clone(&pool),
            Arc::clone(&queue),
            Arc::clone(&generator),
            Arc::clone(&sink),
            stop.clone(),
            5,
        );
        let handle = tokio::spawn(w.run());

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(!handle.is_finished());

        stop.trigger();
        handle.await.unwrap();

        // No token ever arrived, the job was never attempted.
        assert!(generator.tokens_seen().is_empty());
        assert_eq!(queue.len().await, 1);
    }
}
