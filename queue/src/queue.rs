use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use chrono::Utc;
use dashmap::DashMap;
use tokio::time::Duration;
use tracing::{debug, error, info, warn};

use crate::config::QueueConfig;
use crate::job::{Job, JobStatus, QueueStats};

type GeneratorResult = Result<(), String>;
type GeneratorFuture = Pin<Box<dyn Future<Output = GeneratorResult> + Send>>;
/// `(memory_id, content, sector) -> future resolving once generate+persist completes`.
pub type Generator = Arc<dyn Fn(String, String, String) -> GeneratorFuture + Send + Sync>;
/// `(memory_id, user_id, success, error)`, called exactly once per job.
pub type OnComplete = Arc<dyn Fn(String, String, bool, Option<String>) + Send + Sync>;

const SCHEDULER_TICK: Duration = Duration::from_millis(100);

/// Bounded-concurrency worker pool driving `EmbeddingEngine → EmbeddingStore`
/// writes off the write path. One scheduling loop runs at a time, spawned on
/// the first `enqueue` after the job table drains.
pub struct EmbeddingQueue {
    config: QueueConfig,
    generator: Arc<RwLock<Option<Generator>>>,
    on_complete: Arc<RwLock<Option<OnComplete>>>,
    jobs: Arc<DashMap<String, Job>>,
    pending: Arc<Mutex<VecDeque<String>>>,
    processing_count: Arc<AtomicUsize>,
    scheduler_running: Arc<AtomicBool>,
}

impl EmbeddingQueue {
    pub fn new(config: QueueConfig) -> Self {
        Self {
            config,
            generator: Arc::new(RwLock::new(None)),
            on_complete: Arc::new(RwLock::new(None)),
            jobs: Arc::new(DashMap::new()),
            pending: Arc::new(Mutex::new(VecDeque::new())),
            processing_count: Arc::new(AtomicUsize::new(0)),
            scheduler_running: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn set_generator(&self, generator: Generator) {
        *self.generator.write().unwrap() = Some(generator);
    }

    pub fn set_on_complete(&self, callback: OnComplete) {
        *self.on_complete.write().unwrap() = Some(callback);
    }

    /// Admits a new job in `pending` state, wakes the scheduler, and returns
    /// immediately with the job id (`emb-<memory_id>-<monotonic-ts>`).
    pub fn enqueue(&self, memory_id: &str, content: &str, sector: &str, user_id: &str) -> String {
        let job_id = format!("emb-{memory_id}-{}", Utc::now().timestamp_millis());
        let job = Job::new(
            job_id.clone(),
            memory_id.to_string(),
            content.to_string(),
            sector.to_string(),
            user_id.to_string(),
        );
        self.jobs.insert(job_id.clone(), job);
        self.pending.lock().unwrap().push_back(job_id.clone());
        debug!(job_id = %job_id, memory_id, "job enqueued");
        self.ensure_scheduler_running();
        job_id
    }

    pub fn status(&self, job_id: &str) -> Option<Job> {
        self.jobs.get(job_id).map(|entry| entry.value().clone())
    }

    pub fn status_by_memory_id(&self, memory_id: &str) -> Option<Job> {
        self.jobs
            .iter()
            .filter(|entry| entry.memory_id == memory_id)
            .max_by_key(|entry| entry.created_at)
            .map(|entry| entry.value().clone())
    }

    pub fn stats(&self) -> QueueStats {
        let mut stats = QueueStats::default();
        for entry in self.jobs.iter() {
            stats.total += 1;
            match entry.status {
                JobStatus::Pending => stats.pending += 1,
                JobStatus::Processing => stats.processing += 1,
                JobStatus::Complete => stats.complete += 1,
                JobStatus::Failed => stats.failed += 1,
            }
        }
        stats
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().unwrap().len()
    }

    pub fn processing_count(&self) -> usize {
        self.processing_count.load(Ordering::SeqCst)
    }

    pub fn is_processing(&self) -> bool {
        self.pending_count() > 0 || self.processing_count() > 0
    }

    /// Removes every job in a terminal state; returns the number removed.
    pub fn clear_finished(&self) -> usize {
        let finished: Vec<String> = self
            .jobs
            .iter()
            .filter(|entry| matches!(entry.status, JobStatus::Complete | JobStatus::Failed))
            .map(|entry| entry.id.clone())
            .collect();
        for id in &finished {
            self.jobs.remove(id);
        }
        finished.len()
    }

    /// Drops all pending entries and clears the job table. In-flight workers
    /// run to completion but their terminal state is discarded.
    pub fn clear(&self) {
        self.pending.lock().unwrap().clear();
        self.jobs.clear();
    }

    /// Polls until both `pending` and `processing` reach zero.
    pub async fn wait_for_completion(&self) {
        while self.is_processing() {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }

    fn ensure_scheduler_running(&self) {
        if self
            .scheduler_running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }

        let config = self.config;
        let jobs = self.jobs.clone();
        let pending = self.pending.clone();
        let processing_count = self.processing_count.clone();
        let scheduler_running = self.scheduler_running.clone();
        let generator = self.generator.clone();
        let on_complete = self.on_complete.clone();

        tokio::spawn(async move {
            loop {
                loop {
                    let has_slot = processing_count.load(Ordering::SeqCst) < config.max_concurrent;
                    if !has_slot {
                        break;
                    }
                    let next = pending.lock().unwrap().pop_front();
                    let Some(job_id) = next else { break };

                    if let Some(mut entry) = jobs.get_mut(&job_id) {
                        entry.status = JobStatus::Processing;
                        entry.attempt += 1;
                        entry.updated_at = Utc::now();
                    }
                    processing_count.fetch_add(1, Ordering::SeqCst);

                    let jobs = jobs.clone();
                    let pending = pending.clone();
                    let processing_count = processing_count.clone();
                    let generator = generator.clone();
                    let on_complete = on_complete.clone();
                    tokio::spawn(async move {
                        process_one(job_id, config, jobs, pending, processing_count, generator, on_complete).await;
                    });
                }

                if pending.lock().unwrap().is_empty() && processing_count.load(Ordering::SeqCst) == 0 {
                    scheduler_running.store(false, Ordering::SeqCst);
                    break;
                }
                tokio::time::sleep(SCHEDULER_TICK).await;
            }
        });
    }
}

async fn process_one(
    job_id: String,
    config: QueueConfig,
    jobs: Arc<DashMap<String, Job>>,
    pending: Arc<Mutex<VecDeque<String>>>,
    processing_count: Arc<AtomicUsize>,
    generator: Arc<RwLock<Option<Generator>>>,
    on_complete: Arc<RwLock<Option<OnComplete>>>,
) {
    let (memory_id, user_id, content, sector, attempt) = {
        let entry = jobs.get(&job_id).expect("job must exist while processing");
        (
            entry.memory_id.clone(),
            entry.user_id.clone(),
            entry.content.clone(),
            entry.sector.clone(),
            entry.attempt,
        )
    };

    let generator = generator.read().unwrap().clone();
    let on_complete = on_complete.read().unwrap().clone();

    let Some(generator) = generator else {
        // No retry path for a missing generator: this is a configuration
        // error, not a transient failure.
        error!(job_id = %job_id, "no embedding generator configured");
        if let Some(mut entry) = jobs.get_mut(&job_id) {
            entry.status = JobStatus::Failed;
            entry.error_message = Some("No embedding generator configured".to_string());
            entry.updated_at = Utc::now();
        }
        if let Some(cb) = &on_complete {
            cb(memory_id, user_id, false, Some("No embedding generator configured".to_string()));
        }
        processing_count.fetch_sub(1, Ordering::SeqCst);
        return;
    };

    let outcome: GeneratorResult = {
        let fut = generator(memory_id.clone(), content, sector);
        match tokio::time::timeout(Duration::from_millis(config.job_timeout_ms), fut).await {
            Ok(result) => result,
            Err(_) => Err(format!("Operation timed out after {}ms", config.job_timeout_ms)),
        }
    };

    match outcome {
        Ok(()) => {
            if let Some(mut entry) = jobs.get_mut(&job_id) {
                entry.status = JobStatus::Complete;
                entry.error_message = None;
                entry.updated_at = Utc::now();
            }
            info!(job_id = %job_id, memory_id, "embedding job complete");
            if let Some(cb) = &on_complete {
                cb(memory_id, user_id, true, None);
            }
        }
        Err(error) => {
            let retry = attempt < config.max_retries;
            if retry {
                let delay_ms = config.backoff_delay_ms(attempt);
                warn!(job_id = %job_id, attempt, delay_ms, %error, "embedding job failed, retrying");
                if let Some(mut entry) = jobs.get_mut(&job_id) {
                    entry.error_message = Some(error.clone());
                    entry.updated_at = Utc::now();
                }
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                if let Some(mut entry) = jobs.get_mut(&job_id) {
                    entry.status = JobStatus::Pending;
                }
                pending.lock().unwrap().push_back(job_id.clone());
            } else {
                error!(job_id = %job_id, attempt, %error, "embedding job failed permanently");
                if let Some(mut entry) = jobs.get_mut(&job_id) {
                    entry.status = JobStatus::Failed;
                    entry.error_message = Some(error.clone());
                    entry.updated_at = Utc::now();
                }
                if let Some(cb) = &on_complete {
                    cb(memory_id, user_id, false, Some(error));
                }
            }
        }
    }

    processing_count.fetch_sub(1, Ordering::SeqCst);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize as StdAtomicUsize;
    use tokio::sync::Mutex as AsyncMutex;

    fn always_succeeds() -> Generator {
        Arc::new(|_memory_id, _content, _sector| Box::pin(async { Ok(()) }))
    }

    fn fails_n_times(n: usize) -> Generator {
        let calls = Arc::new(StdAtomicUsize::new(0));
        Arc::new(move |_memory_id, _content, _sector| {
            let calls = calls.clone();
            Box::pin(async move {
                let call = calls.fetch_add(1, Ordering::SeqCst);
                if call < n {
                    Err("transient failure".to_string())
                } else {
                    Ok(())
                }
            })
        })
    }

    #[tokio::test]
    async fn successful_job_reaches_complete_and_fires_callback() {
        let queue = EmbeddingQueue::new(QueueConfig {
            base_delay_ms: 5,
            ..QueueConfig::default()
        });
        queue.set_generator(always_succeeds());

        let completed = Arc::new(AsyncMutex::new(Vec::new()));
        let completed_clone = completed.clone();
        queue.set_on_complete(Arc::new(move |memory_id, _user_id, success, _error| {
            let completed = completed_clone.clone();
            tokio::spawn(async move {
                completed.lock().await.push((memory_id, success));
            });
        }));

        let job_id = queue.enqueue("m1", "hello", "semantic", "u1");
        queue.wait_for_completion().await;

        let job = queue.status(&job_id).unwrap();
        assert_eq!(job.status, JobStatus::Complete);
        assert_eq!(job.attempt, 1);
    }

    #[tokio::test]
    async fn job_without_generator_fails_immediately() {
        let queue = EmbeddingQueue::new(QueueConfig {
            base_delay_ms: 5,
            max_retries: 0,
            ..QueueConfig::default()
        });

        let job_id = queue.enqueue("m1", "hello", "semantic", "u1");
        queue.wait_for_completion().await;

        let job = queue.status(&job_id).unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error_message.as_deref(), Some("No embedding generator configured"));
    }

    #[tokio::test]
    async fn transient_failures_retry_until_max_retries() {
        let queue = EmbeddingQueue::new(QueueConfig {
            base_delay_ms: 5,
            max_retries: 3,
            ..QueueConfig::default()
        });
        queue.set_generator(fails_n_times(2));

        let job_id = queue.enqueue("m1", "hello", "semantic", "u1");
        queue.wait_for_completion().await;

        let job = queue.status(&job_id).unwrap();
        assert_eq!(job.status, JobStatus::Complete);
        assert_eq!(job.attempt, 3);
    }

    #[tokio::test]
    async fn clear_finished_drops_only_terminal_jobs() {
        let queue = EmbeddingQueue::new(QueueConfig {
            base_delay_ms: 5,
            ..QueueConfig::default()
        });
        queue.set_generator(always_succeeds());
        queue.enqueue("m1", "hello", "semantic", "u1");
        queue.wait_for_completion().await;

        assert_eq!(queue.clear_finished(), 1);
        assert_eq!(queue.stats().total, 0);
    }
}
