//! Logging setup.
//!
//! The crate logs through `tracing`. Applications that already install a
//! subscriber need nothing from this module; everyone else can call
//! [`init_logging`] once.
//!
//! ## Configuration priority
//!
//! 1. [`LogConfig::level`] (highest)
//! 2. `RUST_LOG` environment variable
//! 3. Default: `exaquery=warn`
//!
//! ```bash
//! RUST_LOG=exaquery=debug ./my_app
//! ```

use std::path::PathBuf;
use std::sync::OnceLock;
use tracing_subscriber::{
    fmt::{self, time::SystemTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

static LOGGING_INITIALIZED: OnceLock<()> = OnceLock::new();

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogConfig {
    /// "off", "error", "warn", "info", "debug" or "trace".
    pub level: Option<String>,
    /// Append to this file instead of writing to stderr.
    pub file: Option<PathBuf>,
}

impl LogConfig {
    pub fn level(mut self, level: impl Into<String>) -> Self {
        self.level = Some(level.into());
        self
    }

    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    fn filter(&self) -> Option<EnvFilter> {
        match self.level.as_deref() {
            Some(level) if level.eq_ignore_ascii_case("off") => None,
            Some(level) => Some(EnvFilter::new(format!(
                "exaquery={}",
                level.to_lowercase()
            ))),
            None => Some(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("exaquery=warn")),
            ),
        }
    }
}

/// Install the global `tracing` subscriber.
///
/// Only the first call in a process has any effect. If another subscriber
/// is already installed it is left in place.
pub fn init_logging(config: &LogConfig) {
    LOGGING_INITIALIZED.get_or_init(|| {
        let Some(filter) = config.filter() else {
            return;
        };

        if let Some(ref path) = config.file {
            let file = match std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
            {
                Ok(f) => f,
                Err(e) => {
                    eprintln!("exaquery: failed to open log file {}: {}", path.display(), e);
                    return;
                }
            };

            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_writer(file)
                        .with_ansi(false)
                        .with_timer(SystemTime),
                )
                .try_init()
                .ok();
        } else {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_timer(SystemTime),
                )
                .try_init()
                .ok();
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_config_default() {
        let config = LogConfig::default();
        assert!(config.level.is_none());
        assert!(config.file.is_none());
    }

    #[test]
    fn test_off_disables_subscriber() {
        assert!(LogConfig::default().level("OFF").filter().is_none());
    }

    #[test]
    fn test_level_is_scoped_to_crate() {
        let filter = LogConfig::default().level("DEBUG").filter().unwrap();
        assert_eq!(filter.to_string(), "exaquery=debug");
    }
}
