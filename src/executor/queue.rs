//! FIFO work queue feeding the worker pool.

use super::task::TaskDescriptor;
use crossbeam_channel::{unbounded, Receiver, Sender, TryRecvError};
use parking_lot::Mutex;

/// Ordered, thread-safe queue of pending tasks.
///
/// `push` never blocks; `pop` parks the calling worker until an item is
/// available or the queue has been closed and drained. The channel delivers
/// each descriptor to exactly one receiver, which is the exactly-once
/// dequeue guarantee.
pub(crate) struct WorkQueue {
    tx: Mutex<Option<Sender<TaskDescriptor>>>,
    rx: Receiver<TaskDescriptor>,
}

impl WorkQueue {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self {
            tx: Mutex::new(Some(tx)),
            rx,
        }
    }

    /// Enqueue a task. Fails (returning the descriptor) once the queue has
    /// been closed.
    pub fn push(&self, task: TaskDescriptor) -> Result<(), TaskDescriptor> {
        match self.tx.lock().as_ref() {
            Some(tx) => tx.send(task).map_err(|e| e.into_inner()),
            None => Err(task),
        }
    }

    /// Blocking dequeue. `None` means the queue is closed and fully drained;
    /// an idle worker receiving it exits its loop.
    pub fn pop(&self) -> Option<TaskDescriptor> {
        self.rx.recv().ok()
    }

    /// Non-blocking dequeue, used to drain the queue when the pool breaks.
    pub fn try_pop(&self) -> Option<TaskDescriptor> {
        match self.rx.try_recv() {
            Ok(task) => Some(task),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Stop accepting work. Already-queued tasks stay claimable; once they
    /// drain, `pop` returns `None`. Idempotent.
    pub fn close(&self) {
        self.tx.lock().take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::TaskHandle;
    use std::sync::Arc;

    fn descriptor(seq: u64) -> TaskDescriptor {
        let handle: TaskHandle<()> = TaskHandle::new(seq);
        TaskDescriptor {
            seq,
            job: Box::new(|| {}),
            control: handle.shared(),
        }
    }

    #[test]
    fn fifo_order_is_preserved() {
        let queue = WorkQueue::new();
        for seq in 0..3 {
            queue.push(descriptor(seq)).unwrap();
        }

        assert_eq!(queue.pop().unwrap().seq, 0);
        assert_eq!(queue.pop().unwrap().seq, 1);
        assert_eq!(queue.pop().unwrap().seq, 2);
    }

    #[test]
    fn close_drains_then_signals_no_more_work() {
        let queue = WorkQueue::new();
        queue.push(descriptor(0)).unwrap();
        queue.close();

        assert!(queue.push(descriptor(1)).is_err());
        // Queued work survives the close.
        assert_eq!(queue.pop().unwrap().seq, 0);
        assert!(queue.pop().is_none());
    }

    #[test]
    fn each_task_is_dequeued_exactly_once() {
        let queue = Arc::new(WorkQueue::new());
        for seq in 0..100 {
            queue.push(descriptor(seq)).unwrap();
        }
        queue.close();

        let consumers: Vec<_> = (0..4)
            .map(|_| {
                let queue = queue.clone();
                std::thread::spawn(move || {
                    let mut seen = Vec::new();
                    while let Some(task) = queue.pop() {
                        seen.push(task.seq);
                    }
                    seen
                })
            })
            .collect();

        let mut all: Vec<u64> = consumers
            .into_iter()
            .flat_map(|c| c.join().unwrap())
            .collect();
        all.sort_unstable();
        assert_eq!(all, (0..100).collect::<Vec<_>>());
    }
}
