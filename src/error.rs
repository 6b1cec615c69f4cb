//! Error taxonomy.

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the executor and by task handles.
///
/// Stored errors are replayed to every reader of a handle, so all variants
/// carry owned, cloneable payloads.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// The task's own failure, captured by the worker and replayed to the
    /// caller on `result()`.
    #[error("task failed: {0}")]
    TaskFailed(String),

    /// A worker context died unexpectedly; the pool no longer schedules
    /// work and must be discarded.
    #[error("worker context died unexpectedly: {0}")]
    BrokenPool(String),

    /// Submission after shutdown began.
    #[error("submission rejected: {0}")]
    Rejected(String),

    /// A caller-specified deadline elapsed while waiting.
    #[error("timed out waiting for task to settle")]
    Timeout,

    /// The handle was cancelled before any worker claimed it.
    #[error("task was cancelled before it ran")]
    Cancelled,

    /// Invalid pool construction configuration.
    #[error("config error: {0}")]
    Config(String),

    /// Pool machinery failure, e.g. a worker thread could not be spawned.
    #[error("executor error: {0}")]
    Executor(String),
}

#[allow(missing_docs)]
impl Error {
    pub fn task_failed<S: Into<String>>(msg: S) -> Self {
        Error::TaskFailed(msg.into())
    }

    pub fn broken_pool<S: Into<String>>(msg: S) -> Self {
        Error::BrokenPool(msg.into())
    }

    pub fn rejected<S: Into<String>>(msg: S) -> Self {
        Error::Rejected(msg.into())
    }

    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }

    pub fn executor<S: Into<String>>(msg: S) -> Self {
        Error::Executor(msg.into())
    }

    /// True for errors that indicate the pool itself is unusable, as opposed
    /// to a single task's failure.
    pub fn is_pool_error(&self) -> bool {
        matches!(self, Error::BrokenPool(_) | Error::Rejected(_))
    }
}
