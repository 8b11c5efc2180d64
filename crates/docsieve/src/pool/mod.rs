//! Adaptive worker pool for CPU and memory heavy extraction work.
//!
//! The pool size is the smaller of a CPU ceiling (`max_processes`) and a memory
//! ceiling (`memory_limit_bytes / task_memory`). The underlying rayon pool is built
//! lazily on first submission and rebuilt, after draining the old one, whenever a
//! submission needs a different worker count.
//!
//! Dropping an [`AdaptiveWorkerPool`] shuts it down and waits for queued work, so
//! an owner going out of scope (normally or by unwinding) always cleans up.

pub mod system;

use crate::core::config::WorkerPoolConfig;
use crate::{DocsieveError, Result};
use once_cell::sync::Lazy;
use parking_lot::{Condvar, Mutex};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use system::{HostReadings, available_memory, platform};
use tokio::sync::{OwnedSemaphorePermit, Semaphore, oneshot};

pub use system::SystemInfo;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;
const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;
const DEFAULT_MEMORY_FRACTION: f64 = 0.75;

type TaskOutcome<T> = std::thread::Result<Result<T>>;

/// Counts queued and running jobs of one rayon pool so shutdown can wait for them.
#[derive(Default)]
struct DrainTracker {
    pending: Mutex<usize>,
    idle: Condvar,
}

impl DrainTracker {
    fn enter(self: &Arc<Self>) -> DrainToken {
        *self.pending.lock() += 1;
        DrainToken(Arc::clone(self))
    }

    fn wait_idle(&self) {
        let mut pending = self.pending.lock();
        while *pending > 0 {
            self.idle.wait(&mut pending);
        }
    }
}

struct DrainToken(Arc<DrainTracker>);

impl Drop for DrainToken {
    fn drop(&mut self) {
        let mut pending = self.0.pending.lock();
        *pending = pending.saturating_sub(1);
        if *pending == 0 {
            self.0.idle.notify_all();
        }
    }
}

struct ActiveTask(Arc<AtomicUsize>);

impl ActiveTask {
    fn enter(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(counter))
    }
}

impl Drop for ActiveTask {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

struct PoolHandle {
    pool: rayon::ThreadPool,
    workers: usize,
    drain: Arc<DrainTracker>,
}

/// Worker pool sized by CPU and memory limits.
///
/// # Example
///
/// ```rust,no_run
/// use docsieve::pool::AdaptiveWorkerPool;
///
/// # async fn example() -> docsieve::Result<()> {
/// let pool = AdaptiveWorkerPool::new(Some(4), Some(2.0));
/// let words = pool
///     .submit_task(|| Ok("a b c".split_whitespace().count()), Some(256.0))
///     .await?;
/// assert_eq!(words, 3);
/// # Ok(())
/// # }
/// ```
pub struct AdaptiveWorkerPool {
    max_processes: usize,
    memory_limit_bytes: u64,
    live: Mutex<Option<Arc<PoolHandle>>>,
    active_tasks: Arc<AtomicUsize>,
}

impl AdaptiveWorkerPool {
    /// Create a pool manager.
    ///
    /// `max_processes` defaults to the number of logical CPUs, `memory_limit_gb`
    /// to 75% of the memory available right now.
    pub fn new(max_processes: Option<usize>, memory_limit_gb: Option<f64>) -> Self {
        let max_processes = max_processes.unwrap_or_else(num_cpus::get).max(1);
        let memory_limit_bytes = match memory_limit_gb {
            Some(gb) => (gb * BYTES_PER_GB) as u64,
            None => (available_memory() as f64 * DEFAULT_MEMORY_FRACTION) as u64,
        };
        Self {
            max_processes,
            memory_limit_bytes,
            live: Mutex::new(None),
            active_tasks: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn from_config(config: &WorkerPoolConfig) -> Self {
        Self::new(config.max_processes, config.memory_limit_gb)
    }

    pub fn max_processes(&self) -> usize {
        self.max_processes
    }

    pub fn memory_limit_bytes(&self) -> u64 {
        self.memory_limit_bytes
    }

    /// Tasks submitted and not yet finished.
    pub fn active_tasks(&self) -> usize {
        self.active_tasks.load(Ordering::SeqCst)
    }

    /// Worker count of the live pool, if one exists.
    pub fn pool_size(&self) -> Option<usize> {
        self.live.lock().as_ref().map(|handle| handle.workers)
    }

    /// Safe worker count for tasks needing about `task_memory_mb` each.
    ///
    /// Pure: depends only on the configured limits and the estimate.
    pub fn get_optimal_workers(&self, task_memory_mb: f64) -> usize {
        let cpu_bound = self.max_processes;
        let task_bytes = task_memory_mb * BYTES_PER_MB;
        let memory_bound = if task_bytes > 0.0 {
            ((self.memory_limit_bytes as f64 / task_bytes).floor() as usize).max(1)
        } else {
            cpu_bound
        };
        cpu_bound.min(memory_bound).max(1)
    }

    /// Run one task on the pool and return its result.
    ///
    /// Errors returned by the task are propagated unchanged. A panicking task is
    /// reported as [`DocsieveError::Internal`].
    pub async fn submit_task<F, T>(&self, task: F, task_memory_mb: Option<f64>) -> Result<T>
    where
        F: FnOnce() -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let handle = self.prepare(self.workers_for(task_memory_mb)).await?;
        let receiver = self.dispatch(&handle, task, None);
        unpack(receiver.await)
    }

    /// Blocking variant of [`AdaptiveWorkerPool::submit_task`].
    ///
    /// Must not be called from inside an async runtime.
    pub fn submit_task_blocking<F, T>(&self, task: F, task_memory_mb: Option<f64>) -> Result<T>
    where
        F: FnOnce() -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let (handle, retired) = self.ensure_pool(self.workers_for(task_memory_mb))?;
        if let Some(old) = retired {
            old.drain.wait_idle();
        }
        let receiver = self.dispatch(&handle, task, None);
        unpack(receiver.blocking_recv())
    }

    /// Run `task` over every argument, returning results in input order.
    ///
    /// At most `max_concurrent` tasks (capped at the pool size) are queued on the
    /// pool at once. The first failing task's error is returned.
    pub async fn submit_batch<F, A, T>(
        &self,
        task: F,
        arg_batches: Vec<A>,
        max_concurrent: Option<usize>,
        task_memory_mb: Option<f64>,
    ) -> Result<Vec<T>>
    where
        F: Fn(A) -> Result<T> + Send + Sync + 'static,
        A: Send + 'static,
        T: Send + 'static,
    {
        if arg_batches.is_empty() {
            return Ok(Vec::new());
        }

        let workers = self.workers_for(task_memory_mb);
        let handle = self.prepare(workers).await?;
        let limit = max_concurrent.unwrap_or(workers).clamp(1, workers);
        let semaphore = Arc::new(Semaphore::new(limit));
        let task = Arc::new(task);

        tracing::debug!(tasks = arg_batches.len(), workers, limit, "Submitting batch to worker pool");

        let mut receivers = Vec::with_capacity(arg_batches.len());
        for args in arg_batches {
            let permit = Arc::clone(&semaphore)
                .acquire_owned()
                .await
                .map_err(|e| DocsieveError::Internal(format!("Worker pool semaphore closed: {}", e)))?;
            let task = Arc::clone(&task);
            receivers.push(self.dispatch(&handle, move || task(args), Some(permit)));
        }

        let mut results = Vec::with_capacity(receivers.len());
        for receiver in receivers {
            results.push(unpack(receiver.await)?);
        }
        Ok(results)
    }

    /// Snapshot of host resources and pool counters. Never waits on the pool.
    pub fn get_system_info(&self) -> SystemInfo {
        let readings = HostReadings::capture();
        SystemInfo {
            cpu_count: num_cpus::get(),
            cpu_percent: readings.cpu_percent,
            memory_total: readings.memory_total,
            memory_available: readings.memory_available,
            memory_percent: readings.memory_percent(),
            active_tasks: self.active_tasks(),
            max_processes: self.max_processes,
            memory_limit: self.memory_limit_bytes,
            platform: platform(),
        }
    }

    /// Release the live pool. With `wait`, block until its queued work finishes.
    ///
    /// A no-op when no pool is live. A later submission builds a fresh pool.
    pub fn shutdown(&self, wait: bool) {
        let handle = self.live.lock().take();
        if let Some(handle) = handle {
            if wait {
                handle.drain.wait_idle();
            }
            tracing::debug!(workers = handle.workers, wait, "Worker pool shut down");
        }
    }

    /// Async variant of `shutdown(true)` that drains on a blocking thread.
    pub async fn shutdown_async(&self) {
        let handle = self.live.lock().take();
        if let Some(handle) = handle {
            let workers = handle.workers;
            if let Err(e) = tokio::task::spawn_blocking(move || handle.drain.wait_idle()).await {
                tracing::warn!("Worker pool drain did not complete: {}", e);
            }
            tracing::debug!(workers, "Worker pool shut down");
        }
    }

    fn workers_for(&self, task_memory_mb: Option<f64>) -> usize {
        match task_memory_mb {
            Some(mb) => self.get_optimal_workers(mb),
            None => self.max_processes,
        }
    }

    async fn prepare(&self, workers: usize) -> Result<Arc<PoolHandle>> {
        let (handle, retired) = self.ensure_pool(workers)?;
        if let Some(old) = retired {
            tokio::task::spawn_blocking(move || old.drain.wait_idle())
                .await
                .map_err(|e| DocsieveError::Internal(format!("Worker pool drain failed: {}", e)))?;
        }
        Ok(handle)
    }

    /// Return a pool with `workers` threads plus the pool it replaced, if any.
    fn ensure_pool(&self, workers: usize) -> Result<(Arc<PoolHandle>, Option<Arc<PoolHandle>>)> {
        let mut live = self.live.lock();
        if let Some(handle) = live.as_ref()
            && handle.workers == workers
        {
            return Ok((Arc::clone(handle), None));
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|index| format!("docsieve-worker-{}", index))
            .build()
            .map_err(|e| {
                DocsieveError::resource_exhausted(format!("Failed to create worker pool with {} threads: {}", workers, e))
            })?;
        let handle = Arc::new(PoolHandle {
            pool,
            workers,
            drain: Arc::new(DrainTracker::default()),
        });

        let retired = live.replace(Arc::clone(&handle));
        match &retired {
            Some(old) => tracing::debug!(from = old.workers, to = workers, "Resizing worker pool"),
            None => tracing::debug!(workers, "Created worker pool"),
        }
        Ok((handle, retired))
    }

    fn dispatch<F, T>(
        &self,
        handle: &PoolHandle,
        task: F,
        permit: Option<OwnedSemaphorePermit>,
    ) -> oneshot::Receiver<TaskOutcome<T>>
    where
        F: FnOnce() -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let (sender, receiver) = oneshot::channel();
        let active = ActiveTask::enter(&self.active_tasks);
        let drain = handle.drain.enter();
        handle.pool.spawn(move || {
            let outcome = panic::catch_unwind(AssertUnwindSafe(task));
            drop(active);
            drop(permit);
            let _ = sender.send(outcome);
            drop(drain);
        });
        receiver
    }
}

impl Default for AdaptiveWorkerPool {
    fn default() -> Self {
        Self::new(None, None)
    }
}

impl Drop for AdaptiveWorkerPool {
    fn drop(&mut self) {
        self.shutdown(true);
    }
}

fn unpack<T>(received: std::result::Result<TaskOutcome<T>, oneshot::error::RecvError>) -> Result<T> {
    match received {
        Ok(Ok(result)) => result,
        Ok(Err(payload)) => Err(DocsieveError::Internal(format!(
            "Worker task panicked: {}",
            panic_message(payload.as_ref())
        ))),
        Err(_) => Err(DocsieveError::Internal(
            "Worker pool dropped a task before it completed".to_string(),
        )),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

static WORKER_POOL: Lazy<AdaptiveWorkerPool> = Lazy::new(AdaptiveWorkerPool::default);

/// The process-wide worker pool used for batch extraction.
pub fn get_worker_pool() -> &'static AdaptiveWorkerPool {
    &WORKER_POOL
}

/// Shut down the process-wide worker pool. It is rebuilt on next use.
pub fn shutdown_worker_pool(wait: bool) {
    WORKER_POOL.shutdown(wait);
}
