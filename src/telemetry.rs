//! Tracing subscriber setup.
//!
//! Logs go to stderr; stdout is reserved for command output.

use clap::ValueEnum;
use std::sync::Once;
use tracing_subscriber::EnvFilter;

static TRACING_INIT: Once = Once::new();

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human readable lines
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

/// Default filter directive when `RUST_LOG` is not set.
pub fn default_directive(verbose: bool) -> &'static str {
    if verbose { "saldo=debug" } else { "saldo=warn" }
}

/// Initialize the global subscriber. Later calls are no-ops.
pub fn init(format: LogFormat, verbose: bool) {
    TRACING_INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

        let builder = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr);

        // try_init: a test harness may already have installed a subscriber
        let _ = match format {
            LogFormat::Pretty => builder.with_target(false).try_init(),
            LogFormat::Json => builder.json().try_init(),
        };
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent() {
        init(LogFormat::Pretty, false);
        init(LogFormat::Json, true);
    }

    #[test]
    fn verbose_raises_level() {
        assert_eq!(default_directive(false), "saldo=warn");
        assert_eq!(default_directive(true), "saldo=debug");
    }
}
