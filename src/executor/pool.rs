use super::queue::WorkQueue;
use super::task::TaskDescriptor;
use super::worker::{ContextExitEvent, Worker, WorkerId, WorkerRole, WorkerState};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::substrate::{default_transport, Substrate};
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Fixed set of worker contexts pulling from one [`WorkQueue`].
///
/// On the process substrate a separate monitor thread supervises context
/// exits: it marks the pool broken, fails the dead context's in-flight
/// handle, and drains the queue failing everything still pending. The
/// normal task-completion path never goes through the monitor.
pub(crate) struct WorkerPool {
    workers: Mutex<Vec<WorkerHandle>>,
    monitor: Mutex<Option<JoinHandle<()>>>,
    exit_tx: Mutex<Option<Sender<ContextExitEvent>>>,
    liveness: Vec<Arc<AtomicBool>>,
    states: Vec<Arc<WorkerState>>,
    num_workers: usize,
    pending: Arc<AtomicUsize>,
}

struct WorkerHandle {
    #[allow(dead_code)]
    id: WorkerId,
    thread: Option<JoinHandle<()>>,
}

impl WorkerPool {
    pub fn new(config: &Config, queue: Arc<WorkQueue>, broken: Arc<AtomicBool>) -> Result<Self> {
        let num_workers = config.worker_count();
        if num_workers == 0 {
            return Err(Error::config("need at least 1 worker"));
        }

        let pending = Arc::new(AtomicUsize::new(0));

        let (exit_tx, monitor, transport) = match config.substrate {
            Substrate::Thread => (None, None, None),
            Substrate::Process => {
                let (tx, rx) = unbounded();
                let transport = config.transport.clone().unwrap_or_else(default_transport);
                let monitor = spawn_monitor(
                    config,
                    rx,
                    broken.clone(),
                    queue.clone(),
                    pending.clone(),
                )?;
                (Some(tx), Some(monitor), Some(transport))
            }
        };

        let mut handles = Vec::with_capacity(num_workers);
        let mut liveness = Vec::with_capacity(num_workers);
        let mut states = Vec::with_capacity(num_workers);

        for id in 0..num_workers {
            let worker = Worker::new(id);
            liveness.push(worker.alive.clone());
            states.push(worker.state.clone());

            let role = match config.substrate {
                Substrate::Thread => WorkerRole::Thread,
                Substrate::Process => WorkerRole::Process {
                    // Both are Some on this substrate by construction.
                    transport: transport.clone().ok_or_else(|| Error::executor("missing transport"))?,
                    exits: exit_tx.clone().ok_or_else(|| Error::executor("missing exit channel"))?,
                },
            };

            let queue = queue.clone();
            let broken = broken.clone();
            let pending = pending.clone();
            let name = format!("{}-{}", config.thread_name_prefix, id);

            let mut builder = thread::Builder::new().name(name);
            if let Some(stack_size) = config.stack_size {
                builder = builder.stack_size(stack_size);
            }

            let thread = builder
                .spawn(move || worker.run(queue, broken, pending, role))
                .map_err(|e| Error::executor(format!("spawn failed: {}", e)))?;

            handles.push(WorkerHandle {
                id,
                thread: Some(thread),
            });
        }

        Ok(Self {
            workers: Mutex::new(handles),
            monitor: Mutex::new(monitor),
            exit_tx: Mutex::new(exit_tx),
            liveness,
            states,
            num_workers,
            pending,
        })
    }

    pub fn num_workers(&self) -> usize {
        self.num_workers
    }

    pub fn pending_counter(&self) -> Arc<AtomicUsize> {
        self.pending.clone()
    }

    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Relaxed)
    }

    /// Pool health: AND of all liveness flags.
    pub fn all_alive(&self) -> bool {
        self.liveness
            .iter()
            .all(|alive| alive.load(Ordering::Acquire))
    }

    pub fn tasks_executed(&self) -> u64 {
        self.states
            .iter()
            .map(|s| s.tasks_executed.load(Ordering::Relaxed))
            .sum()
    }

    pub fn tasks_cancelled(&self) -> u64 {
        self.states
            .iter()
            .map(|s| s.tasks_cancelled.load(Ordering::Relaxed))
            .sum()
    }

    /// Join all workers (and the monitor). The queue must already be
    /// closed, otherwise idle workers never exit. Idempotent.
    pub fn join(&self) {
        // Dropping our sender lets the monitor's recv disconnect once the
        // last worker-held clone is gone.
        self.exit_tx.lock().take();

        let mut workers = self.workers.lock();
        for worker in workers.iter_mut() {
            if let Some(thread) = worker.thread.take() {
                let _ = thread.join();
            }
        }
        drop(workers);

        if let Some(monitor) = self.monitor.lock().take() {
            let _ = monitor.join();
        }
    }
}

fn spawn_monitor(
    config: &Config,
    events: Receiver<ContextExitEvent>,
    broken: Arc<AtomicBool>,
    queue: Arc<WorkQueue>,
    pending: Arc<AtomicUsize>,
) -> Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(format!("{}-monitor", config.thread_name_prefix))
        .spawn(move || monitor_loop(events, broken, queue, pending))
        .map_err(|e| Error::executor(format!("spawn failed: {}", e)))
}

fn monitor_loop(
    events: Receiver<ContextExitEvent>,
    broken: Arc<AtomicBool>,
    queue: Arc<WorkQueue>,
    pending: Arc<AtomicUsize>,
) {
    while let Ok(event) = events.recv() {
        eprintln!(
            "[workpool] worker {} context died: {}",
            event.worker, event.exit
        );

        // Order matters: new submissions must start failing before the
        // dead context's handle resolves.
        broken.store(true, Ordering::Release);

        if let Some(control) = event.in_flight {
            control.fail(Error::broken_pool(event.exit.detail.clone()));
        }

        // Nothing queued can run to completion on a broken pool.
        queue.close();
        while let Some(TaskDescriptor { control, .. }) = queue.try_pop() {
            control.fail(Error::broken_pool("pool broke while task was queued"));
            pending.fetch_sub(1, Ordering::Relaxed);
        }
    }
}
