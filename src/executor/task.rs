//! Internal task representation.

use crate::error::Error;
use crate::handle::Shared;
use crate::substrate::Job;
use std::sync::Arc;

/// Claim/fail view of a handle's settle cell, type-erased so the queue and
/// pool can hold descriptors of mixed output types.
pub(crate) trait SettleControl: Send + Sync {
    /// Pending -> Running; false means the task was cancelled and the job
    /// must be dropped unexecuted.
    fn claim(&self) -> bool;

    /// Settle with an error unless already settled.
    fn fail(&self, err: Error);
}

impl<T: Send> SettleControl for Shared<T> {
    fn claim(&self) -> bool {
        Shared::claim(self)
    }

    fn fail(&self, err: Error) {
        Shared::fail(self, err)
    }
}

/// A queued unit of work: the erased job plus the control side of its
/// handle. Owned by the queue until exactly one worker receives it.
pub(crate) struct TaskDescriptor {
    pub seq: u64,
    pub job: Job,
    pub control: Arc<dyn SettleControl>,
}

impl std::fmt::Debug for TaskDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskDescriptor").field("seq", &self.seq).finish()
    }
}

/// Best-effort message out of a panic payload.
pub(crate) fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_message_downcasts_common_payloads() {
        assert_eq!(panic_message(Box::new("boom")), "boom");
        assert_eq!(panic_message(Box::new("boom".to_string())), "boom");
        assert_eq!(panic_message(Box::new(17u32)), "unknown panic");
    }
}
