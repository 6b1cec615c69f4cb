//! Convenience re-exports.

pub use crate::config::{Config, ConfigBuilder};
pub use crate::error::{Error, Result};
pub use crate::executor::{scope, Executor};
pub use crate::handle::{TaskHandle, TaskState};
pub use crate::map::MapResults;
pub use crate::shared::SharedVec;
pub use crate::substrate::Substrate;
