// worker loop

use super::queue::WorkQueue;
use super::task::{SettleControl, TaskDescriptor};
use crate::error::Error;
use crate::substrate::{ContextExit, ProcessTransport};
use crossbeam_channel::Sender;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

pub(crate) type WorkerId = usize;

// per-worker counters
pub(crate) struct WorkerState {
    pub tasks_executed: AtomicU64,
    pub tasks_cancelled: AtomicU64,
}

impl WorkerState {
    fn new() -> Self {
        Self {
            tasks_executed: AtomicU64::new(0),
            tasks_cancelled: AtomicU64::new(0),
        }
    }
}

/// Sent to the pool monitor when a process context terminates without
/// settling its job.
pub(crate) struct ContextExitEvent {
    pub worker: WorkerId,
    pub exit: ContextExit,
    pub in_flight: Option<Arc<dyn SettleControl>>,
}

pub(crate) enum WorkerRole {
    Thread,
    Process {
        transport: Arc<dyn ProcessTransport>,
        exits: Sender<ContextExitEvent>,
    },
}

pub(crate) struct Worker {
    pub id: WorkerId,
    /// Flips to false only on unexpected context termination; a normal
    /// shutdown exit leaves it true.
    pub alive: Arc<AtomicBool>,
    pub state: Arc<WorkerState>,
}

impl Worker {
    pub fn new(id: WorkerId) -> Self {
        Self {
            id,
            alive: Arc::new(AtomicBool::new(true)),
            state: Arc::new(WorkerState::new()),
        }
    }

    // main loop: pop -> claim -> execute -> settle. Returns when the queue
    // is closed and drained, or (process role) when the context dies.
    pub fn run(
        &self,
        queue: Arc<WorkQueue>,
        broken: Arc<AtomicBool>,
        pending: Arc<AtomicUsize>,
        role: WorkerRole,
    ) {
        while let Some(task) = queue.pop() {
            let TaskDescriptor { job, control, .. } = task;

            if !control.claim() {
                // cancelled before any worker got to it
                self.state.tasks_cancelled.fetch_add(1, Ordering::Relaxed);
                pending.fetch_sub(1, Ordering::Relaxed);
                continue;
            }

            if broken.load(Ordering::Acquire) {
                control.fail(Error::broken_pool("pool broke before this task ran"));
                pending.fetch_sub(1, Ordering::Relaxed);
                continue;
            }

            match &role {
                WorkerRole::Thread => {
                    // The job settles its own handle, capturing any panic;
                    // a failing task never takes the worker down with it.
                    job();
                }
                WorkerRole::Process { transport, exits } => {
                    if let Err(exit) = transport.dispatch(self.id, job) {
                        self.alive.store(false, Ordering::Release);
                        pending.fetch_sub(1, Ordering::Relaxed);
                        let _ = exits.send(ContextExitEvent {
                            worker: self.id,
                            exit,
                            in_flight: Some(control),
                        });
                        return; // terminal: no replacement is spawned
                    }
                }
            }

            self.state.tasks_executed.fetch_add(1, Ordering::Relaxed);
            pending.fetch_sub(1, Ordering::Relaxed);
        }
    }
}
