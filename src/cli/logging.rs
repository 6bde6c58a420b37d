//! Diagnostic logging for ecsforge.
//!
//! User-facing results go through [`crate::cli::output`] on stdout. Everything
//! emitted with the `tracing` macros lands on stderr, filtered by `RUST_LOG`
//! when it is set and by `-v` / `-q` otherwise.

use std::sync::Once;

use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: Once = Once::new();

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Minimum level for ecsforge's own events.
    pub level: Level,
    /// Include the module target (e.g. `ecsforge::engine`).
    pub include_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::WARN,
            include_target: false,
        }
    }
}

impl LoggingConfig {
    /// Level chosen by the global `-v` / `-q` flags.
    pub fn from_flags(verbose: bool, quiet: bool) -> Self {
        match (verbose, quiet) {
            (true, _) => Self {
                level: Level::DEBUG,
                include_target: true,
            },
            (false, true) => Self {
                level: Level::ERROR,
                ..Self::default()
            },
            (false, false) => Self::default(),
        }
    }

    /// Filter directive used when `RUST_LOG` is not set.
    pub fn directive(&self) -> String {
        format!("ecsforge={}", self.level.as_str().to_lowercase())
    }
}

/// Install the global subscriber. Later calls are ignored.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.directive()));

        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(config.include_target)
                    .without_time(),
            )
            .try_init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_quiet_unless_warned() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, Level::WARN);
        assert_eq!(config.directive(), "ecsforge=warn");
    }

    #[test]
    fn verbose_wins_over_quiet() {
        let config = LoggingConfig::from_flags(true, true);
        assert_eq!(config.level, Level::DEBUG);
        assert!(config.include_target);
    }

    #[test]
    fn quiet_only_shows_errors() {
        assert_eq!(LoggingConfig::from_flags(false, true).directive(), "ecsforge=error");
    }
}
