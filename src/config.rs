//! Pool construction configuration.

use crate::error::{Error, Result};
use crate::substrate::{ProcessTransport, Substrate};
use std::fmt;
use std::sync::Arc;

/// Pool construction configuration.
#[derive(Clone)]
pub struct Config {
    /// Worker count; defaults to the number of logical CPUs.
    pub max_workers: Option<usize>,
    /// Thread or process execution substrate.
    pub substrate: Substrate,
    /// Worker threads are named `{prefix}-{id}`.
    pub thread_name_prefix: String,
    /// Stack size per worker thread.
    pub stack_size: Option<usize>,
    /// Transport for process-substrate pools. Ignored on the thread
    /// substrate; defaults to [`crate::substrate::LocalTransport`].
    pub transport: Option<Arc<dyn ProcessTransport>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_workers: None,
            substrate: Substrate::default(),
            thread_name_prefix: "workpool-worker".to_string(),
            stack_size: Some(2 * 1024 * 1024),
            transport: None,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("max_workers", &self.max_workers)
            .field("substrate", &self.substrate)
            .field("thread_name_prefix", &self.thread_name_prefix)
            .field("stack_size", &self.stack_size)
            .field("transport", &self.transport.as_ref().map(|_| ".."))
            .finish()
    }
}

impl Config {
    /// Start building a config from the defaults.
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    /// Bounds-check the configuration.
    pub fn validate(&self) -> Result<()> {
        if let Some(n) = self.max_workers {
            if n == 0 {
                return Err(Error::config("max_workers must be > 0"));
            }
            if n > 1024 {
                return Err(Error::config("max_workers too large (max 1024)"));
            }
        }

        if self.thread_name_prefix.is_empty() {
            return Err(Error::config("thread_name_prefix must not be empty"));
        }

        Ok(())
    }

    /// Effective worker count after applying the CPU-count default.
    pub fn worker_count(&self) -> usize {
        self.max_workers.unwrap_or_else(num_cpus::get)
    }
}

/// Builder for [`Config`].
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

#[allow(missing_docs)]
impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn max_workers(mut self, n: usize) -> Self {
        self.config.max_workers = Some(n);
        self
    }

    pub fn substrate(mut self, substrate: Substrate) -> Self {
        self.config.substrate = substrate;
        self
    }

    pub fn thread_name_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.config.thread_name_prefix = prefix.into();
        self
    }

    pub fn stack_size(mut self, size: usize) -> Self {
        self.config.stack_size = Some(size);
        self
    }

    pub fn transport(mut self, transport: Arc<dyn ProcessTransport>) -> Self {
        self.config.transport = Some(transport);
        self
    }

    /// Validate and finish.
    pub fn build(self) -> Result<Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}
