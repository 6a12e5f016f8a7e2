//! Fixed-size worker pool for blocking, CPU-heavy tasks.
//!
//! The pool owns a set of long-lived worker threads created at startup. A
//! caller submits one task and blocks until that task settles; jobs flow to
//! the workers over a shared channel, results come back on a per-call reply
//! channel. The pool never grows or shrinks, and there is no queue that
//! outlives a call: each task is owned by exactly one submission.

use harvester_common::protocol::error::{HarvestError, Result};
use serde_json::Value;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

/// The three task families the worker service executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    /// Full-page screenshot capture
    Screenshot,
    /// Page-performance analysis
    Performance,
    /// Image download + thumbnail generation
    ImageBatch,
}

/// Function executed by worker threads for every task.
///
/// The dispatcher is injected at pool construction so tests can instrument
/// it; production wires in [`crate::tasks::dispatch`]. A `String` error is
/// a normal, recoverable task failure.
pub type TaskDispatcher =
    Arc<dyn Fn(TaskKind, Value) -> std::result::Result<Value, String> + Send + Sync>;

/// Configuration for the worker pool.
#[derive(Clone, Debug)]
pub struct PoolConfig {
    /// Number of worker threads, fixed for the life of the pool
    pub pool_size: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        // Default to host core count, like multiprocessing pools do.
        let pool_size = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        Self { pool_size }
    }
}

/// One submitted task plus the channel its result returns on.
struct Job {
    kind: TaskKind,
    input: Value,
    reply: Sender<std::result::Result<Value, String>>,
}

/// Fixed pool of worker threads executing one task per submission.
///
/// # Failure Semantics
///
/// - A task error (or a panic inside the dispatcher) is caught on the
///   worker thread and returned to the caller as
///   [`HarvestError::TaskExecution`]; it never kills the worker or the
///   pool.
/// - A worker that vanished mid-task, or a pool that has shut down,
///   surfaces as [`HarvestError::PoolFatal`]: the caller gets an error,
///   never a hang. Dead workers are not respawned.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use harvester_worker::pool::{PoolConfig, TaskKind, WorkerPool};
/// use serde_json::json;
///
/// let pool = WorkerPool::new(
///     PoolConfig { pool_size: 2 },
///     Arc::new(|_kind, input| Ok(input)),
/// );
/// let result = pool.submit_and_wait(TaskKind::Performance, json!({"url": "x"}));
/// assert!(result.is_ok());
/// ```
pub struct WorkerPool {
    job_tx: Mutex<Option<Sender<Job>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    tasks_completed: Arc<AtomicU64>,
    pool_size: usize,
}

impl WorkerPool {
    /// Creates a pool of `config.pool_size` worker threads.
    ///
    /// Every worker runs the same dispatcher. Worker threads are spawned
    /// eagerly and live until [`shutdown`] drops the job channel.
    ///
    /// [`shutdown`]: WorkerPool::shutdown
    pub fn new(config: PoolConfig, dispatcher: TaskDispatcher) -> Self {
        let (job_tx, job_rx) = channel::<Job>();
        let job_rx = Arc::new(Mutex::new(job_rx));
        let tasks_completed = Arc::new(AtomicU64::new(0));

        let mut workers = Vec::with_capacity(config.pool_size);
        for worker_id in 0..config.pool_size {
            let rx = Arc::clone(&job_rx);
            let dispatcher = Arc::clone(&dispatcher);
            let counter = Arc::clone(&tasks_completed);
            workers.push(std::thread::spawn(move || {
                worker_loop(worker_id, rx, dispatcher, counter);
            }));
        }

        tracing::info!(pool_size = config.pool_size, "worker pool started");

        Self {
            job_tx: Mutex::new(Some(job_tx)),
            workers: Mutex::new(workers),
            tasks_completed,
            pool_size: config.pool_size,
        }
    }

    /// Submits one task and blocks until it settles.
    ///
    /// At-most-once: the task exists only for the duration of this call and
    /// is never requeued.
    ///
    /// # Errors
    ///
    /// - [`HarvestError::TaskExecution`] when the task function failed
    /// - [`HarvestError::PoolFatal`] when the pool has shut down or the
    ///   executing worker died before producing a result
    pub fn submit_and_wait(&self, kind: TaskKind, input: Value) -> Result<Value> {
        let job_tx = {
            let guard = self
                .job_tx
                .lock()
                .map_err(|_| HarvestError::PoolFatal("pool state poisoned".to_string()))?;
            guard
                .as_ref()
                .cloned()
                .ok_or_else(|| HarvestError::PoolFatal("pool is shut down".to_string()))?
        };

        let (reply_tx, reply_rx) = channel();
        job_tx
            .send(Job {
                kind,
                input,
                reply: reply_tx,
            })
            .map_err(|_| HarvestError::PoolFatal("no worker threads remain".to_string()))?;

        match reply_rx.recv() {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(message)) => Err(HarvestError::TaskExecution(message)),
            Err(_) => Err(HarvestError::PoolFatal(
                "worker exited before returning a result".to_string(),
            )),
        }
    }

    /// Number of worker threads in the pool.
    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Total tasks completed across all workers since startup.
    pub fn tasks_completed(&self) -> u64 {
        self.tasks_completed.load(Ordering::SeqCst)
    }

    /// Shuts the pool down: closes the job channel and joins every worker.
    ///
    /// Submissions after shutdown fail with [`HarvestError::PoolFatal`].
    pub fn shutdown(&self) {
        if let Ok(mut guard) = self.job_tx.lock() {
            guard.take();
        }
        if let Ok(mut workers) = self.workers.lock() {
            for handle in workers.drain(..) {
                let _ = handle.join();
            }
        }
        tracing::info!("worker pool shut down");
    }
}

/// Body of each worker thread: pull a job, run it, send the result back.
///
/// Panics inside the dispatcher are caught and converted to task errors so
/// a single bad task cannot take the worker down with it.
fn worker_loop(
    worker_id: usize,
    job_rx: Arc<Mutex<Receiver<Job>>>,
    dispatcher: TaskDispatcher,
    tasks_completed: Arc<AtomicU64>,
) {
    tracing::debug!(worker_id, "worker thread started");
    loop {
        let job = {
            let Ok(guard) = job_rx.lock() else {
                return;
            };
            match guard.recv() {
                Ok(job) => job,
                // Channel closed: pool shut down.
                Err(_) => break,
            }
        };

        tracing::debug!(worker_id, kind = ?job.kind, "executing task");
        let outcome = match catch_unwind(AssertUnwindSafe(|| dispatcher(job.kind, job.input))) {
            Ok(result) => result,
            Err(panic) => {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "task panicked".to_string());
                tracing::error!(worker_id, %message, "task panicked");
                Err(message)
            }
        };

        tasks_completed.fetch_add(1, Ordering::SeqCst);
        // The submitter may have gone away; that is its problem, not ours.
        let _ = job.reply.send(outcome);
    }
    tracing::debug!(worker_id, "worker thread exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn echo_pool(size: usize) -> WorkerPool {
        WorkerPool::new(
            PoolConfig { pool_size: size },
            Arc::new(|_kind, input| Ok(input)),
        )
    }

    #[test]
    fn submit_returns_task_output() {
        let pool = echo_pool(2);
        let result = pool
            .submit_and_wait(TaskKind::Screenshot, json!({"url": "https://example.com"}))
            .unwrap();
        assert_eq!(result, json!({"url": "https://example.com"}));
        pool.shutdown();
    }

    #[test]
    fn task_error_is_task_execution() {
        let pool = WorkerPool::new(
            PoolConfig { pool_size: 1 },
            Arc::new(|_kind, _input| Err("deliberate failure".to_string())),
        );
        let result = pool.submit_and_wait(TaskKind::Performance, json!({}));
        match result {
            Err(HarvestError::TaskExecution(msg)) => assert_eq!(msg, "deliberate failure"),
            other => panic!("expected TaskExecution, got {:?}", other),
        }
        pool.shutdown();
    }

    #[test]
    fn panicking_task_does_not_kill_the_pool() {
        let pool = WorkerPool::new(
            PoolConfig { pool_size: 1 },
            Arc::new(|_kind, input| {
                if input.get("boom").is_some() {
                    panic!("kaboom");
                }
                Ok(input)
            }),
        );

        let result = pool.submit_and_wait(TaskKind::ImageBatch, json!({"boom": true}));
        assert!(matches!(result, Err(HarvestError::TaskExecution(_))));

        // Same single worker must still be alive and serving.
        let result = pool
            .submit_and_wait(TaskKind::ImageBatch, json!({"ok": true}))
            .unwrap();
        assert_eq!(result, json!({"ok": true}));
        pool.shutdown();
    }

    #[test]
    fn submit_after_shutdown_is_pool_fatal() {
        let pool = echo_pool(1);
        pool.shutdown();
        let result = pool.submit_and_wait(TaskKind::Screenshot, json!({}));
        assert!(matches!(result, Err(HarvestError::PoolFatal(_))));
    }

    #[test]
    fn pool_bounds_concurrent_task_execution() {
        const POOL_SIZE: usize = 2;
        const SUBMISSIONS: usize = 8;

        let in_flight = Arc::new(AtomicUsize::new(0));
        let max_in_flight = Arc::new(AtomicUsize::new(0));

        let dispatcher: TaskDispatcher = {
            let in_flight = Arc::clone(&in_flight);
            let max_in_flight = Arc::clone(&max_in_flight);
            Arc::new(move |_kind, input| {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                max_in_flight.fetch_max(now, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(30));
                in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok(input)
            })
        };

        let pool = Arc::new(WorkerPool::new(
            PoolConfig {
                pool_size: POOL_SIZE,
            },
            dispatcher,
        ));

        let mut handles = Vec::new();
        for i in 0..SUBMISSIONS {
            let pool = Arc::clone(&pool);
            handles.push(std::thread::spawn(move || {
                pool.submit_and_wait(TaskKind::Performance, json!({"n": i}))
            }));
        }
        for handle in handles {
            assert!(handle.join().unwrap().is_ok());
        }

        assert!(
            max_in_flight.load(Ordering::SeqCst) <= POOL_SIZE,
            "observed {} concurrent tasks with pool size {}",
            max_in_flight.load(Ordering::SeqCst),
            POOL_SIZE
        );
        assert_eq!(pool.tasks_completed(), SUBMISSIONS as u64);
        pool.shutdown();
    }

    #[test]
    fn default_pool_size_is_positive() {
        assert!(PoolConfig::default().pool_size > 0);
    }
}
