//! Task admission and pool lifecycle.
//!
//! [`Executor`] is the public entry point: it owns the work queue and the
//! worker pool, assigns sequence numbers at admission, and enforces the
//! monotonic `Running -> ShuttingDown -> Shutdown` lifecycle plus the
//! permanent broken flag.

mod pool;
mod queue;
mod task;
mod worker;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::handle::TaskHandle;
use crate::map::MapResults;
use crate::substrate::Job;
use pool::WorkerPool;
use queue::WorkQueue;
use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

const RUNNING: u8 = 0;
const SHUTTING_DOWN: u8 = 1;
const SHUTDOWN: u8 = 2;

/// Schedules tasks onto a bounded pool of worker contexts.
///
/// Dropping the executor performs a waiting shutdown, so a plain lexical
/// scope gives context-manager semantics: every task submitted inside the
/// scope has completed once the executor goes out of scope, even if the
/// scope unwinds. See also [`scope`].
pub struct Executor {
    queue: Arc<WorkQueue>,
    pool: WorkerPool,
    lifecycle: AtomicU8,
    broken: Arc<AtomicBool>,
    next_seq: AtomicU64,
    pending: Arc<AtomicUsize>,
    config: Config,
}

impl Executor {
    /// Build a pool per `config` and start its workers.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let queue = Arc::new(WorkQueue::new());
        let broken = Arc::new(AtomicBool::new(false));
        let pool = WorkerPool::new(&config, queue.clone(), broken.clone())?;
        let pending = pool.pending_counter();

        Ok(Self {
            queue,
            pool,
            lifecycle: AtomicU8::new(RUNNING),
            broken,
            next_seq: AtomicU64::new(0),
            pending,
            config,
        })
    }

    /// Enqueue `f` and return its handle immediately.
    ///
    /// Fails with [`Error::BrokenPool`] once a worker context has died, and
    /// with [`Error::Rejected`] once shutdown has begun.
    pub fn submit<F, T>(&self, f: F) -> Result<TaskHandle<T>>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        self.check_admission()?;

        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let handle = TaskHandle::new(seq);
        let shared = handle.shared();
        let control = handle.shared();

        // The job settles its own handle; a panic in `f` is captured there
        // instead of unwinding the worker.
        let job: Job = Box::new(move || match catch_unwind(AssertUnwindSafe(f)) {
            Ok(value) => shared.set_result(value),
            Err(payload) => {
                shared.set_exception(Error::task_failed(task::panic_message(payload)))
            }
        });

        self.pending.fetch_add(1, Ordering::Relaxed);
        if self
            .queue
            .push(task::TaskDescriptor { seq, job, control })
            .is_err()
        {
            // Lost the race against a concurrent shutdown or break.
            self.pending.fetch_sub(1, Ordering::Relaxed);
            return Err(self.admission_error());
        }

        Ok(handle)
    }

    /// Apply `f` to every element, returning a lazy sequence of results in
    /// input order regardless of completion order.
    pub fn map<F, I, T>(&self, f: F, inputs: I) -> Result<MapResults<T>>
    where
        I: IntoIterator,
        I::Item: Send + 'static,
        F: Fn(I::Item) -> T + Send + Sync + 'static,
        T: Send + 'static,
    {
        self.map_inner(f, inputs, None)
    }

    /// Like [`map`](Executor::map), with one overall deadline measured from
    /// this call; each element's wait fails with [`Error::Timeout`] once it
    /// passes.
    pub fn map_timeout<F, I, T>(&self, f: F, inputs: I, timeout: Duration) -> Result<MapResults<T>>
    where
        I: IntoIterator,
        I::Item: Send + 'static,
        F: Fn(I::Item) -> T + Send + Sync + 'static,
        T: Send + 'static,
    {
        self.map_inner(f, inputs, Some(Instant::now() + timeout))
    }

    fn map_inner<F, I, T>(
        &self,
        f: F,
        inputs: I,
        deadline: Option<Instant>,
    ) -> Result<MapResults<T>>
    where
        I: IntoIterator,
        I::Item: Send + 'static,
        F: Fn(I::Item) -> T + Send + Sync + 'static,
        T: Send + 'static,
    {
        let f = Arc::new(f);
        let mut handles = VecDeque::new();
        for item in inputs {
            let f = f.clone();
            handles.push_back(self.submit(move || f(item))?);
        }
        Ok(MapResults::new(handles, deadline))
    }

    /// Begin shutdown: no further submissions are accepted and the queue is
    /// closed once all already-queued tasks are claimable. With `wait`, block
    /// until every worker has drained and exited. Idempotent; never
    /// interrupts a running task.
    pub fn shutdown(&self, wait: bool) {
        self.lifecycle.fetch_max(SHUTTING_DOWN, Ordering::AcqRel);
        self.queue.close();
        if wait {
            self.pool.join();
            self.lifecycle.fetch_max(SHUTDOWN, Ordering::AcqRel);
        }
    }

    /// Number of worker contexts.
    pub fn max_workers(&self) -> usize {
        self.pool.num_workers()
    }

    /// Tasks submitted but not yet settled.
    pub fn pending_tasks(&self) -> usize {
        self.pool.pending()
    }

    /// Tasks executed to completion across all workers.
    pub fn completed_tasks(&self) -> u64 {
        self.pool.tasks_executed()
    }

    /// Tasks a worker dequeued but dropped because they were already
    /// cancelled.
    pub fn cancelled_tasks(&self) -> u64 {
        self.pool.tasks_cancelled()
    }

    /// Permanent once a process worker context dies.
    pub fn is_broken(&self) -> bool {
        self.broken.load(Ordering::Acquire)
    }

    /// AND of all worker liveness flags.
    pub fn workers_alive(&self) -> bool {
        self.pool.all_alive()
    }

    /// The configuration this executor was built from.
    pub fn config(&self) -> &Config {
        &self.config
    }

    fn check_admission(&self) -> Result<()> {
        if self.is_broken() || self.lifecycle.load(Ordering::Acquire) != RUNNING {
            return Err(self.admission_error());
        }
        Ok(())
    }

    fn admission_error(&self) -> Error {
        if self.is_broken() {
            Error::broken_pool("cannot schedule new tasks on a broken pool")
        } else {
            Error::rejected("executor has shut down")
        }
    }
}

impl Drop for Executor {
    fn drop(&mut self) {
        self.shutdown(true);
    }
}

impl std::fmt::Debug for Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("max_workers", &self.max_workers())
            .field("pending", &self.pending_tasks())
            .field("broken", &self.is_broken())
            .finish()
    }
}

/// Run `f` with a freshly started executor, shutting it down (waiting for
/// all submitted tasks) when `f` returns or unwinds.
pub fn scope<F, R>(config: Config, f: F) -> Result<R>
where
    F: FnOnce(&Executor) -> R,
{
    let executor = Executor::new(config)?;
    // If `f` unwinds, Drop performs the waiting shutdown during unwind.
    let result = f(&executor);
    executor.shutdown(true);
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_pool() -> Executor {
        let config = Config::builder().max_workers(2).build().unwrap();
        Executor::new(config).unwrap()
    }

    #[test]
    fn submit_returns_a_resolving_handle() {
        let pool = small_pool();
        let handle = pool.submit(|| 5 * 2).unwrap();
        assert_eq!(handle.result().unwrap(), 10);
    }

    #[test]
    fn sequence_numbers_follow_submission_order() {
        let pool = small_pool();
        let a = pool.submit(|| ()).unwrap();
        let b = pool.submit(|| ()).unwrap();
        let c = pool.submit(|| ()).unwrap();
        assert!(a.seq() < b.seq() && b.seq() < c.seq());
    }

    #[test]
    fn every_submission_after_shutdown_is_rejected() {
        let pool = small_pool();
        pool.shutdown(true);

        for _ in 0..3 {
            let err = pool.submit(|| 1).unwrap_err();
            assert!(matches!(err, Error::Rejected(_)));
        }
    }

    #[test]
    fn shutdown_without_wait_is_nonblocking_and_idempotent() {
        let pool = small_pool();
        let handle = pool.submit(|| 3).unwrap();
        pool.shutdown(false);
        pool.shutdown(false);
        // Queued work still completes.
        assert_eq!(handle.result().unwrap(), 3);
        pool.shutdown(true);
    }

    #[test]
    fn task_panic_is_captured_not_propagated() {
        let pool = small_pool();
        let bad = pool.submit(|| -> i32 { panic!("the value 5 is no good") }).unwrap();
        let good = pool.submit(|| 6).unwrap();

        assert!(matches!(bad.result(), Err(Error::TaskFailed(_))));
        // The worker survived and the pool is still healthy.
        assert_eq!(good.result().unwrap(), 6);
        assert!(!pool.is_broken());
    }
}
