//! Dispatch error types.
//!
//! Only one `DispatchError` ever reaches the hosting runtime per invocation.
//! The runtime treats any error as "redeliver what was not acknowledged" and
//! does not distinguish between variants.

use crate::compensation::CompensationError;

/// Error returned by a record handler.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Result type for dispatch operations.
pub type Result<T> = std::result::Result<T, DispatchError>;

/// Errors surfaced by the router to the hosting runtime.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// A single-invocation source (notification, rule) failed.
    #[error("handler for {source_arn} failed: {cause}")]
    Handler {
        source_arn: String,
        #[source]
        cause: HandlerError,
    },

    /// Some records of an unordered batch failed. Every record was attempted.
    #[error("{failed} of {total} records failed for {source_arn}")]
    BatchFailure {
        source_arn: String,
        failed: usize,
        total: usize,
        errors: Vec<HandlerError>,
    },

    /// An ordered batch stopped at its first failing record.
    ///
    /// `failed` counts the failing record plus every record after it that
    /// was never attempted.
    #[error("{failed} of {total} records not processed for {source_arn}: {cause}")]
    OrderedBatchFailure {
        source_arn: String,
        failed: usize,
        total: usize,
        #[source]
        cause: HandlerError,
    },

    /// Acknowledging fulfilled records failed; supersedes the batch summary.
    #[error("compensation failed: {0}")]
    Compensation(#[from] CompensationError),

    /// More than one binding failed under fan-out routing.
    #[error("{} bindings failed: {}", .0.len(), join_messages(.0))]
    Multiple(Vec<DispatchError>),
}

impl DispatchError {
    /// Number of records reported as not processed, if this is a batch error.
    pub fn failed_count(&self) -> Option<usize> {
        match self {
            DispatchError::BatchFailure { failed, .. }
            | DispatchError::OrderedBatchFailure { failed, .. } => Some(*failed),
            _ => None,
        }
    }

    /// Returns true if compensation itself failed anywhere in this error.
    pub fn is_compensation_failure(&self) -> bool {
        match self {
            DispatchError::Compensation(_) => true,
            DispatchError::Multiple(errors) => errors.iter().any(Self::is_compensation_failure),
            _ => false,
        }
    }
}

fn join_messages(errors: &[DispatchError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
