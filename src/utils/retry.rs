//! Retry utilities: backoff builders.
//!
//! Uses `backon` for exponential backoff with jitter.

use std::time::Duration;

use backon::ExponentialBuilder;

use crate::config::CompensationConfig;

/// Backoff for the compensation delete call.
///
/// `max_attempts` counts the first try, so the builder gets one fewer retry.
/// Jitter enabled.
pub fn compensation_backoff(config: &CompensationConfig) -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(Duration::from_millis(config.min_delay_ms))
        .with_max_delay(Duration::from_millis(config.max_delay_ms))
        .with_max_times(config.max_attempts.saturating_sub(1))
        .with_jitter()
}
