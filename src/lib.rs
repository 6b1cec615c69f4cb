//! workpool - bounded worker-pool executor with future-style task handles.
//!
//! Independent units of work are scheduled onto a fixed set of worker
//! contexts; each submission returns a [`TaskHandle`] that resolves
//! asynchronously to the task's value or its captured failure.
//!
//! # Quick Start
//!
//! ```
//! use workpool::{Config, Executor};
//!
//! let config = Config::builder().max_workers(2).build().unwrap();
//! let pool = Executor::new(config).unwrap();
//!
//! let handle = pool.submit(|| 6 * 7).unwrap();
//! assert_eq!(handle.result().unwrap(), 42);
//!
//! // Ordered bulk mapping: results come back in input order.
//! let squares: Vec<i32> = pool
//!     .map(|n: i32| n * n, 1..=4)
//!     .unwrap()
//!     .map(|r| r.unwrap())
//!     .collect();
//! assert_eq!(squares, vec![1, 4, 9, 16]);
//!
//! pool.shutdown(true);
//! ```
//!
//! # Features
//!
//! - **Future-style handles**: blocking and deadline-bounded observation,
//!   error inspection without propagation, pre-claim cancellation
//! - **Ordered mapping**: lazy result sequence in input order regardless of
//!   completion order
//! - **Failure isolation**: a panicking task settles only its own handle on
//!   the thread substrate; a dying process context breaks the pool and
//!   fails every affected handle instead of hanging it
//! - **Cooperative shutdown**: queued work drains, running work is never
//!   interrupted, and dropping the executor waits for completion

#![warn(missing_docs, missing_debug_implementations)]

pub mod config;
pub mod error;
pub mod executor;
pub mod handle;
pub mod map;
pub mod prelude;
pub mod shared;
pub mod substrate;

pub use config::{Config, ConfigBuilder};
pub use error::{Error, Result};
pub use executor::{scope, Executor};
pub use handle::{TaskHandle, TaskState};
pub use map::MapResults;
pub use shared::SharedVec;
pub use substrate::{ContextExit, Job, LocalTransport, ProcessTransport, Substrate};
