//! Execution substrates: worker threads sharing process memory, or worker
//! processes behind a transport boundary.

use std::fmt;
use std::sync::Arc;

/// A claimed unit of work, ready to run. Executing it settles the owning
/// task handle (value, captured panic, or error) as a side effect.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Which kind of worker context the pool drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Substrate {
    /// Workers are threads in this process. Task failures are captured per
    /// handle; a thread-substrate pool never breaks.
    Thread,
    /// Workers front separate process contexts reached through a
    /// [`ProcessTransport`]. A context that exits unexpectedly breaks the
    /// whole pool.
    Process,
}

impl Default for Substrate {
    fn default() -> Self {
        Substrate::Thread
    }
}

/// Reported when a process context terminates without settling its job.
#[derive(Debug, Clone)]
pub struct ContextExit {
    /// Human-readable cause, e.g. the signal or exit status observed.
    pub detail: String,
}

impl ContextExit {
    /// Exit report with the given cause.
    pub fn new<S: Into<String>>(detail: S) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

impl fmt::Display for ContextExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.detail)
    }
}

/// Boundary to a process-backed worker context.
///
/// The pool does not model IPC itself; it hands each claimed job to the
/// transport and only cares whether the context survived. `Err(ContextExit)`
/// means the context died without settling the job, which breaks the pool.
///
/// Arguments and results must cross this boundary explicitly. In particular,
/// plain in-memory sharing with process contexts is impossible; shared state
/// has to go through an injected proxy such as [`crate::SharedVec`].
pub trait ProcessTransport: Send + Sync + 'static {
    /// Run one job on the given worker's context.
    fn dispatch(&self, worker: usize, job: Job) -> std::result::Result<(), ContextExit>;
}

/// Transport that runs jobs on the worker thread itself.
///
/// Stand-in used when no real child-process transport is wired up; it keeps
/// the process-substrate control flow (dispatch, exit detection, monitor)
/// exercisable on a single host.
#[derive(Debug, Default)]
pub struct LocalTransport;

impl ProcessTransport for LocalTransport {
    fn dispatch(&self, _worker: usize, job: Job) -> std::result::Result<(), ContextExit> {
        job();
        Ok(())
    }
}

pub(crate) fn default_transport() -> Arc<dyn ProcessTransport> {
    Arc::new(LocalTransport)
}
