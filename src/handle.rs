//! Future-style task handles.
//!
//! A [`TaskHandle`] is a single-assignment cell shared between the submitter
//! (and any clones it hands out) and the one worker that executes the task.
//! The worker settles the cell exactly once; every blocked reader is woken by
//! broadcast and observes the same final state.

use crate::error::{Error, Result};
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Lifecycle of a submitted task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Queued, not yet claimed by a worker.
    Pending,
    /// Claimed and executing.
    Running,
    /// Settled with exactly one of a value or an error. Terminal.
    Done,
    /// Cancelled before a worker claimed it. Terminal.
    Cancelled,
}

impl TaskState {
    fn is_terminal(self) -> bool {
        matches!(self, TaskState::Done | TaskState::Cancelled)
    }
}

struct Inner<T> {
    state: TaskState,
    outcome: Option<std::result::Result<T, Error>>,
}

/// Shared settle cell behind a handle. One writer, many readers.
pub(crate) struct Shared<T> {
    inner: Mutex<Inner<T>>,
    settled: Condvar,
}

impl<T> Shared<T> {
    fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: TaskState::Pending,
                outcome: None,
            }),
            settled: Condvar::new(),
        }
    }

    /// Pending -> Running. False if the task was cancelled first (or has
    /// already settled), in which case the claimer must drop the job.
    pub(crate) fn claim(&self) -> bool {
        let mut inner = self.inner.lock();
        if inner.state == TaskState::Pending {
            inner.state = TaskState::Running;
            true
        } else {
            false
        }
    }

    pub(crate) fn set_result(&self, value: T) {
        self.settle(Ok(value));
    }

    pub(crate) fn set_exception(&self, err: Error) {
        self.settle(Err(err));
    }

    /// Settle with an error unless the cell already reached a terminal
    /// state. Used by the pool to fail claimed-but-unfinished tasks when a
    /// worker context dies.
    pub(crate) fn fail(&self, err: Error) {
        let mut inner = self.inner.lock();
        if inner.state.is_terminal() {
            return;
        }
        inner.state = TaskState::Done;
        inner.outcome = Some(Err(err));
        drop(inner);
        self.settled.notify_all();
    }

    fn settle(&self, outcome: std::result::Result<T, Error>) {
        let mut inner = self.inner.lock();
        debug_assert_eq!(inner.state, TaskState::Running, "settled twice");
        if inner.state.is_terminal() {
            return;
        }
        inner.state = TaskState::Done;
        inner.outcome = Some(outcome);
        drop(inner);
        self.settled.notify_all();
    }
}

/// Caller-visible handle to a task's eventual outcome.
///
/// Cloning the handle does not clone the task; all clones observe the same
/// cell. The stored value is returned by clone so that any number of readers
/// can call [`result`](TaskHandle::result).
pub struct TaskHandle<T> {
    shared: Arc<Shared<T>>,
    seq: u64,
}

impl<T> Clone for TaskHandle<T> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
            seq: self.seq,
        }
    }
}

impl<T> std::fmt::Debug for TaskHandle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskHandle")
            .field("seq", &self.seq)
            .field("state", &self.state())
            .finish()
    }
}

impl<T> TaskHandle<T> {
    pub(crate) fn new(seq: u64) -> Self {
        Self {
            shared: Arc::new(Shared::new()),
            seq,
        }
    }

    pub(crate) fn shared(&self) -> Arc<Shared<T>> {
        self.shared.clone()
    }

    /// Sequence number assigned at submission; submission order within one
    /// executor.
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Current lifecycle state.
    pub fn state(&self) -> TaskState {
        self.shared.inner.lock().state
    }

    /// Non-blocking: true once the task has settled or was cancelled.
    pub fn done(&self) -> bool {
        self.state().is_terminal()
    }

    /// Cancel the task if no worker has claimed it yet.
    ///
    /// Returns true on success. Cancelling a running or settled task is a
    /// no-op returning false; the pool does not interrupt running work.
    pub fn cancel(&self) -> bool {
        let mut inner = self.shared.inner.lock();
        if inner.state == TaskState::Pending {
            inner.state = TaskState::Cancelled;
            drop(inner);
            self.shared.settled.notify_all();
            true
        } else {
            false
        }
    }

    fn wait_settled(&self, deadline: Option<Instant>) -> Result<MutexGuard<'_, Inner<T>>> {
        let mut inner = self.shared.inner.lock();
        while !inner.state.is_terminal() {
            match deadline {
                None => self.shared.settled.wait(&mut inner),
                Some(d) => {
                    if self.shared.settled.wait_until(&mut inner, d).timed_out()
                        && !inner.state.is_terminal()
                    {
                        return Err(Error::Timeout);
                    }
                }
            }
        }
        Ok(inner)
    }

    pub(crate) fn result_deadline(&self, deadline: Option<Instant>) -> Result<T>
    where
        T: Clone,
    {
        let inner = self.wait_settled(deadline)?;
        match inner.state {
            TaskState::Cancelled => Err(Error::Cancelled),
            TaskState::Done => match inner.outcome.as_ref() {
                Some(Ok(value)) => Ok(value.clone()),
                Some(Err(err)) => Err(err.clone()),
                None => unreachable!("settled handle has no outcome"),
            },
            _ => unreachable!("wait_settled returned on a live task"),
        }
    }

    /// Block until the task settles, then return its value or replay its
    /// error. Fails with [`Error::Cancelled`] if the handle was cancelled.
    pub fn result(&self) -> Result<T>
    where
        T: Clone,
    {
        self.result_deadline(None)
    }

    /// Like [`result`](TaskHandle::result), but gives up with
    /// [`Error::Timeout`] once `timeout` elapses.
    pub fn result_timeout(&self, timeout: Duration) -> Result<T>
    where
        T: Clone,
    {
        self.result_deadline(Some(Instant::now() + timeout))
    }

    /// Block until the task settles and return its stored error, if any,
    /// without replaying it. `Ok(None)` means the task succeeded.
    pub fn exception(&self) -> Result<Option<Error>> {
        self.exception_deadline(None)
    }

    /// Like [`exception`](TaskHandle::exception) with a deadline.
    pub fn exception_timeout(&self, timeout: Duration) -> Result<Option<Error>> {
        self.exception_deadline(Some(Instant::now() + timeout))
    }

    fn exception_deadline(&self, deadline: Option<Instant>) -> Result<Option<Error>> {
        let inner = self.wait_settled(deadline)?;
        match inner.state {
            TaskState::Cancelled => Err(Error::Cancelled),
            TaskState::Done => match inner.outcome.as_ref() {
                Some(Ok(_)) => Ok(None),
                Some(Err(err)) => Ok(Some(err.clone())),
                None => unreachable!("settled handle has no outcome"),
            },
            _ => unreachable!("wait_settled returned on a live task"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn result_returns_stored_value() {
        let handle: TaskHandle<i32> = TaskHandle::new(0);
        let shared = handle.shared();
        assert!(shared.claim());
        shared.set_result(7);

        assert!(handle.done());
        assert_eq!(handle.result().unwrap(), 7);
        // Readers can observe the value more than once.
        assert_eq!(handle.result().unwrap(), 7);
        assert!(handle.exception().unwrap().is_none());
    }

    #[test]
    fn exception_and_result_agree() {
        let handle: TaskHandle<i32> = TaskHandle::new(0);
        let shared = handle.shared();
        assert!(shared.claim());
        shared.set_exception(Error::task_failed("the value 5 is no good"));

        let stored = handle.exception().unwrap();
        assert!(matches!(stored, Some(Error::TaskFailed(_))));
        assert!(matches!(handle.result(), Err(Error::TaskFailed(_))));
    }

    #[test]
    fn blocked_readers_are_woken_by_broadcast() {
        let handle: TaskHandle<&'static str> = TaskHandle::new(0);
        let shared = handle.shared();

        let readers: Vec<_> = (0..3)
            .map(|_| {
                let h = handle.clone();
                thread::spawn(move || h.result().unwrap())
            })
            .collect();

        thread::sleep(Duration::from_millis(20));
        assert!(shared.claim());
        shared.set_result("done");

        for reader in readers {
            assert_eq!(reader.join().unwrap(), "done");
        }
    }

    #[test]
    fn cancel_only_while_pending() {
        let handle: TaskHandle<i32> = TaskHandle::new(0);
        assert!(handle.cancel());
        assert!(!handle.cancel());
        assert_eq!(handle.state(), TaskState::Cancelled);
        assert!(matches!(handle.result(), Err(Error::Cancelled)));
        assert!(matches!(handle.exception(), Err(Error::Cancelled)));

        let running: TaskHandle<i32> = TaskHandle::new(1);
        assert!(running.shared().claim());
        assert!(!running.cancel());
        assert_eq!(running.state(), TaskState::Running);
    }

    #[test]
    fn claim_fails_after_cancel() {
        let handle: TaskHandle<i32> = TaskHandle::new(0);
        let shared = handle.shared();
        assert!(handle.cancel());
        assert!(!shared.claim());
    }

    #[test]
    fn result_timeout_elapses_on_unsettled_handle() {
        let handle: TaskHandle<i32> = TaskHandle::new(0);
        let err = handle.result_timeout(Duration::from_millis(20));
        assert!(matches!(err, Err(Error::Timeout)));
    }
}
