//! Bootstrap utilities for dispatcher binaries.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogConfig, LogFormat, LOG_ENV_VAR};

/// Initialize tracing with the LAMBDA_DISPATCH_LOG environment variable.
///
/// Falls back to the configured filter when LAMBDA_DISPATCH_LOG is not set.
/// Lambda already prefixes every line with a timestamp and request id, so
/// the text format omits both the time and ANSI colours.
pub fn init_tracing(log: &LogConfig) {
    let filter =
        EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new(&log.filter));

    let registry = tracing_subscriber::registry().with(filter);

    match log.format {
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .flatten_event(true)
                    .with_current_span(false),
            )
            .init(),
        LogFormat::Text => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .without_time()
                    .with_ansi(false),
            )
            .init(),
    }
}
