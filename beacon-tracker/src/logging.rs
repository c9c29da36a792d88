//! Tracing initialization for hosts that do not install their own subscriber.

use std::sync::Once;

use beacon_core::config::defaults::{DEFAULT_LOG_FILTER, LOG_ENV_VAR};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

static INIT: Once = Once::new();

/// Output format of the installed subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Install a global subscriber filtered by `BEACON_LOG`.
///
/// Format: `BEACON_LOG=beacon_storage=debug,beacon_tracker=info`.
/// Falls back to `info` when the variable is unset or invalid.
///
/// Idempotent. If the host already installed a global subscriber this is a
/// no-op.
pub fn init_tracing(format: LogFormat) {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
        install(filter, format);
    });
}

/// Same as [`init_tracing`] with an explicit filter directive, ignoring the
/// environment. Debug hosts use `"beacon=debug"` style directives here.
pub fn init_tracing_with_filter(directive: &str, format: LogFormat) {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
        install(filter, format);
    });
}

fn install(filter: EnvFilter, format: LogFormat) {
    let result = match format {
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .with(filter)
            .try_init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_current_span(false),
            )
            .with(filter)
            .try_init(),
    };
    if result.is_err() {
        tracing::debug!("global tracing subscriber already installed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_init_is_harmless() {
        init_tracing(LogFormat::Pretty);
        init_tracing(LogFormat::Json);
        init_tracing_with_filter("beacon_tracker=debug", LogFormat::Pretty);
        tracing::info!("still logging");
    }
}
