//! Engine configuration.
//!
//! Configuration is small on purpose: the pool size used inside delegated regions,
//! the thread name prefix, and the edge limit enforced at load time.

use serde::{Deserialize, Serialize};

use crate::{
    error::{OlapError, Result},
    graph::MAX_NUM_EDGES,
};

/// Settings for a [`Worker`](crate::Worker) and the graphs that use it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Number of fork-join threads per parallel region. `None` uses the available parallelism.
    pub num_threads: Option<usize>,
    /// Name prefix for the delegate thread and its pool threads.
    pub thread_name: String,
    /// Maximum number of edges accepted by `load_from_array`.
    pub max_num_edges: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            num_threads: None,
            thread_name: "halo-olap".to_owned(),
            max_num_edges: MAX_NUM_EDGES,
        }
    }
}

impl EngineConfig {
    /// Environment variable overriding [`EngineConfig::num_threads`].
    pub const THREADS_ENV: &'static str = "HALO_OLAP_THREADS";

    /// Parses a configuration from a JSON document. Missing fields take their defaults.
    ///
    /// # Errors
    /// Returns [`OlapError::ConfigParse`] for malformed JSON and
    /// [`OlapError::InvalidConfig`] for out-of-range values.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Builds the default configuration, applying `HALO_OLAP_THREADS` if set.
    ///
    /// # Errors
    /// Returns [`OlapError::InvalidConfig`] if the variable is not a positive integer.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Ok(raw) = std::env::var(Self::THREADS_ENV) {
            let threads = raw.trim().parse::<usize>().map_err(|e| {
                OlapError::InvalidConfig(format!("{}={raw:?}: {e}", Self::THREADS_ENV))
            })?;
            config.num_threads = Some(threads);
        }
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    /// Returns [`OlapError::InvalidConfig`] on zero threads or a zero edge limit.
    pub fn validate(&self) -> Result<()> {
        if self.num_threads == Some(0) {
            return Err(OlapError::InvalidConfig("num_threads must be > 0".into()));
        }
        if self.max_num_edges == 0 {
            return Err(OlapError::InvalidConfig("max_num_edges must be > 0".into()));
        }
        Ok(())
    }

    /// The pool size this configuration resolves to on the current machine.
    pub fn resolved_threads(&self) -> usize {
        self.num_threads.unwrap_or_else(|| {
            std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
        })
    }

    /// Returns a copy with an explicit thread count.
    #[must_use]
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.num_threads = Some(threads);
        self
    }
}
