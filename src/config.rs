//! Driver configuration.
//!
//! [`DriverConfig`] bundles everything a [`Driver`](crate::Driver) needs:
//! where to connect, how results are read, how metadata is cached and how
//! logging is set up.

use crate::connection::ConnectionParams;
use crate::error::ConnectionError;
use crate::logging::LogConfig;
use std::time::Duration;

/// Default cap on rows returned per statement unless full results are requested.
pub const DEFAULT_MAX_RESULTS: usize = 1000;

/// Default byte budget requested per `fetch` round-trip.
pub const DEFAULT_FETCH_BYTES: u64 = 4 * 1024 * 1024;

pub const DEFAULT_CACHE_CAPACITY: u64 = 100;

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(10 * 60);

/// Result reading limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutorConfig {
    pub max_results: usize,
    pub fetch_bytes: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_results: DEFAULT_MAX_RESULTS,
            fetch_bytes: DEFAULT_FETCH_BYTES,
        }
    }
}

/// Metadata cache limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum number of cached queries.
    pub capacity: u64,
    /// Time after insertion at which an entry expires.
    pub time_to_live: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CACHE_CAPACITY,
            time_to_live: DEFAULT_CACHE_TTL,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DriverConfig {
    pub connection: ConnectionParams,
    pub executor: ExecutorConfig,
    pub cache: CacheConfig,
    pub logging: LogConfig,
}

impl DriverConfig {
    pub fn new(connection: ConnectionParams) -> Self {
        Self {
            connection,
            executor: ExecutorConfig::default(),
            cache: CacheConfig::default(),
            logging: LogConfig::default(),
        }
    }

    /// Configuration with connection settings from `EXASOL_*` variables and
    /// default limits.
    pub fn from_env() -> Result<Self, ConnectionError> {
        Ok(Self::new(ConnectionParams::from_env()?))
    }

    pub fn with_executor(mut self, executor: ExecutorConfig) -> Self {
        self.executor = executor;
        self
    }

    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_logging(mut self, logging: LogConfig) -> Self {
        self.logging = logging;
        self
    }
}
