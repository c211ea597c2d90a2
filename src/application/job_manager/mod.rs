//! Job registry, FIFO queue and the single background worker.
//!
//! Submission validates synchronously, records a pending job and enqueues its
//! id. One worker task drains the queue in order and runs each job to a
//! terminal state before taking the next, so at most one solver invocation
//! exists at any time.

mod pipeline;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

use metrics::{counter, gauge};
use thiserror::Error;
use tokio::sync::{Mutex as AsyncMutex, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::application::lock::{mutex_lock, rw_read, rw_write};
use crate::domain::error::{DomainError, ValidationError};
use crate::domain::job::Job;
use crate::domain::request::validate_request;
use crate::domain::types::{JobId, JobRequest};

pub use pipeline::{CalculationPipeline, JobError, JobExecutor};

pub const METRIC_JOBS_SUBMITTED: &str = "ladle_jobs_submitted_total";
pub const METRIC_JOBS_COMPLETED: &str = "ladle_jobs_completed_total";
pub const METRIC_JOBS_FAILED: &str = "ladle_jobs_failed_total";
pub const METRIC_JOBS_QUEUED: &str = "ladle_jobs_queued";

const SOURCE: &str = "application::job_manager";
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("job queue is closed")]
    QueueClosed,
}

#[derive(Debug, Error)]
pub enum WaitError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("job `{job_id}` did not finish within {timeout:?}")]
    TimedOut { job_id: JobId, timeout: Duration },
}

#[derive(Default)]
struct Registry {
    jobs: HashMap<JobId, Job>,
    /// Ids in submission order.
    order: Vec<JobId>,
}

type QueueReceiver = Arc<AsyncMutex<mpsc::UnboundedReceiver<JobId>>>;

struct Worker {
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

pub struct JobManager {
    registry: Arc<RwLock<Registry>>,
    queue: mpsc::UnboundedSender<JobId>,
    /// Held by whichever worker is draining; a worker detached by `stop`
    /// keeps it until its in-flight job ends.
    receiver: QueueReceiver,
    worker: Mutex<Option<Worker>>,
    executor: Arc<dyn JobExecutor>,
}

impl JobManager {
    pub fn new(executor: Arc<dyn JobExecutor>) -> Self {
        let (queue, receiver) = mpsc::unbounded_channel();
        Self {
            registry: Arc::new(RwLock::new(Registry::default())),
            queue,
            receiver: Arc::new(AsyncMutex::new(receiver)),
            worker: Mutex::new(None),
            executor,
        }
    }

    /// Validate, record and enqueue a request. Returns without waiting for
    /// execution; a rejected request never becomes a job.
    pub fn submit(&self, request: JobRequest) -> Result<JobId, SubmitError> {
        let verdict = validate_request(&request).inspect_err(|err| {
            warn!(
                target = SOURCE,
                op = "job_manager::submit",
                result = "rejected",
                error = %err,
                "Job request rejected"
            );
        })?;

        let calc_type = request.calc_type;
        let job_id = {
            let mut registry = rw_write(&self.registry, SOURCE, "submit");
            let mut job_id = JobId::generate();
            while registry.jobs.contains_key(&job_id) {
                job_id = JobId::generate();
            }
            registry
                .jobs
                .insert(job_id.clone(), Job::new(job_id.clone(), request));
            registry.order.push(job_id.clone());
            job_id
        };

        if self.queue.send(job_id.clone()).is_err() {
            let mut registry = rw_write(&self.registry, SOURCE, "submit");
            registry.jobs.remove(&job_id);
            registry.order.retain(|id| id != &job_id);
            error!(
                target = SOURCE,
                op = "job_manager::submit",
                result = "error",
                job_id = %job_id,
                "Job queue closed; submission discarded"
            );
            return Err(SubmitError::QueueClosed);
        }

        counter!(METRIC_JOBS_SUBMITTED).increment(1);
        gauge!(METRIC_JOBS_QUEUED).increment(1.0);
        info!(
            target = SOURCE,
            op = "job_manager::submit",
            result = "enqueued",
            job_id = %job_id,
            calc_type = %calc_type,
            verdict = ?verdict.level,
            "Job enqueued"
        );
        Ok(job_id)
    }

    /// Snapshot of one job.
    pub fn get(&self, job_id: &JobId) -> Option<Job> {
        rw_read(&self.registry, SOURCE, "get")
            .jobs
            .get(job_id)
            .cloned()
    }

    /// Every job, most recently submitted first.
    pub fn list_all(&self) -> Vec<Job> {
        let registry = rw_read(&self.registry, SOURCE, "list_all");
        registry
            .order
            .iter()
            .rev()
            .filter_map(|id| registry.jobs.get(id).cloned())
            .collect()
    }

    pub fn is_running(&self) -> bool {
        mutex_lock(&self.worker, SOURCE, "is_running")
            .as_ref()
            .is_some_and(|worker| !worker.handle.is_finished())
    }

    /// Spawn the worker. Calling this while a worker runs is a no-op.
    ///
    /// After a `stop` whose grace period ran out, the new worker takes the
    /// queue once the detached job has finished.
    pub fn start(&self) {
        let mut worker = mutex_lock(&self.worker, SOURCE, "start");
        if worker
            .as_ref()
            .is_some_and(|worker| !worker.handle.is_finished())
        {
            return;
        }

        let (shutdown, shutdown_rx) = oneshot::channel();
        let handle = tokio::spawn(run_worker(
            Arc::clone(&self.receiver),
            shutdown_rx,
            Arc::clone(&self.registry),
            Arc::clone(&self.executor),
        ));
        *worker = Some(Worker { shutdown, handle });
        info!(
            target = SOURCE,
            op = "job_manager::start",
            result = "started",
            "Job worker started"
        );
    }

    /// Stop taking jobs from the queue.
    ///
    /// A job already executing is left to finish; this waits up to `grace`
    /// for it and detaches the worker after that. Queued jobs stay pending
    /// and run after a later `start`.
    pub async fn stop(&self, grace: Duration) {
        let Some(worker) = mutex_lock(&self.worker, SOURCE, "stop").take() else {
            return;
        };
        let _ = worker.shutdown.send(());

        let mut handle = worker.handle;
        match tokio::time::timeout(grace, &mut handle).await {
            Ok(Ok(())) => {
                info!(
                    target = SOURCE,
                    op = "job_manager::stop",
                    result = "stopped",
                    "Job worker stopped"
                );
            }
            Ok(Err(join_err)) => {
                error!(
                    target = SOURCE,
                    op = "job_manager::stop",
                    result = "error",
                    error = %join_err,
                    "Job worker ended abnormally"
                );
            }
            Err(_) => {
                warn!(
                    target = SOURCE,
                    op = "job_manager::stop",
                    result = "detached",
                    grace_ms = grace.as_millis() as u64,
                    "In-flight job still running after grace period; leaving it to finish"
                );
            }
        }
    }

    /// Poll until the job is terminal or `timeout` passes.
    pub async fn wait(&self, job_id: &JobId, timeout: Duration) -> Result<Job, WaitError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let job = self.get(job_id).ok_or(DomainError::not_found("job"))?;
            if job.status().is_terminal() {
                return Ok(job);
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(WaitError::TimedOut {
                    job_id: job_id.clone(),
                    timeout,
                });
            }
            tokio::time::sleep(WAIT_POLL_INTERVAL).await;
        }
    }
}

async fn run_worker(
    receiver: QueueReceiver,
    mut shutdown: oneshot::Receiver<()>,
    registry: Arc<RwLock<Registry>>,
    executor: Arc<dyn JobExecutor>,
) {
    let mut receiver = tokio::select! {
        biased;
        _ = &mut shutdown => return,
        guard = receiver.lock_owned() => guard,
    };
    loop {
        let job_id = tokio::select! {
            biased;
            _ = &mut shutdown => break,
            next = receiver.recv() => match next {
                Some(job_id) => job_id,
                None => break,
            },
        };
        gauge!(METRIC_JOBS_QUEUED).decrement(1.0);
        process_job(&job_id, &registry, &executor).await;
    }
}

async fn process_job(
    job_id: &JobId,
    registry: &RwLock<Registry>,
    executor: &Arc<dyn JobExecutor>,
) {
    let started_at = Instant::now();
    let request = {
        let mut registry = rw_write(registry, SOURCE, "process_job");
        let Some(job) = registry.jobs.get_mut(job_id) else {
            warn!(
                target = SOURCE,
                op = "job_manager::process_job",
                result = "skipped",
                job_id = %job_id,
                "Dequeued id has no job record"
            );
            return;
        };
        if let Err(err) = job.start() {
            warn!(
                target = SOURCE,
                op = "job_manager::process_job",
                result = "skipped",
                job_id = %job_id,
                error = %err,
                "Job is not pending"
            );
            return;
        }
        job.request().clone()
    };

    info!(
        target = SOURCE,
        op = "job_manager::process_job",
        result = "started",
        job_id = %job_id,
        calc_type = %request.calc_type,
        "Job started"
    );

    let outcome = {
        let executor = Arc::clone(executor);
        let job_id = job_id.clone();
        tokio::spawn(async move { executor.execute(&job_id, &request).await })
    }
    .await
    .unwrap_or_else(|join_err| Err(JobError::aborted(join_err)));
    let elapsed_ms = started_at.elapsed().as_millis() as u64;

    let mut registry = rw_write(registry, SOURCE, "process_job");
    let Some(job) = registry.jobs.get_mut(job_id) else {
        return;
    };
    let recorded = match outcome {
        Ok(result) => {
            let alpha_g = result.alpha_g;
            job.complete(result).inspect(|()| {
                counter!(METRIC_JOBS_COMPLETED).increment(1);
                info!(
                    target = SOURCE,
                    op = "job_manager::process_job",
                    result = "completed",
                    job_id = %job_id,
                    elapsed_ms,
                    alpha_g,
                    "Job completed"
                );
            })
        }
        Err(err) => {
            let message = err.to_string();
            job.fail(message.clone()).inspect(|()| {
                counter!(METRIC_JOBS_FAILED).increment(1);
                error!(
                    target = SOURCE,
                    op = "job_manager::process_job",
                    result = "failed",
                    job_id = %job_id,
                    elapsed_ms,
                    error = %message,
                    "Job failed"
                );
            })
        }
    };

    if let Err(err) = recorded {
        error!(
            target = SOURCE,
            op = "job_manager::process_job",
            result = "error",
            job_id = %job_id,
            error = %err,
            "Could not record job outcome"
        );
    }
}
