//! Compensation: acknowledging fulfilled records of a failed batch.
//!
//! When a queue batch fails partially, the runtime will redeliver the whole
//! batch unless the records that did succeed are removed from the queue
//! first. A [`Compensator`] performs that removal.
//!
//! Implementations:
//! - `SqsCompensator`: AWS SQS `DeleteMessageBatch` (feature `sqs`)
//! - `MockCompensator`: In-memory recorder for testing

use async_trait::async_trait;

use crate::event::QueueMessage;

pub mod mock;
#[cfg(feature = "sqs")]
pub mod sqs;

pub use mock::MockCompensator;
#[cfg(feature = "sqs")]
pub use sqs::SqsCompensator;

/// Result type for compensation operations.
pub type Result<T> = std::result::Result<T, CompensationError>;

/// Errors that can occur while acknowledging fulfilled records.
#[derive(Debug, thiserror::Error)]
pub enum CompensationError {
    #[error("Invalid queue ARN: {0}")]
    InvalidArn(String),

    #[error("Failed to resolve queue URL for {queue}: {message}")]
    QueueUrl { queue: String, message: String },

    #[error("Delete batch failed for {queue}: {message}")]
    DeleteBatch { queue: String, message: String },

    #[error("Invalid delete entry for {queue}: {message}")]
    InvalidEntry { queue: String, message: String },

    #[error("{} entries could not be deleted from {queue}: {}", failed_ids.len(), failed_ids.join(", "))]
    PartialDelete {
        queue: String,
        failed_ids: Vec<String>,
    },

    #[error("Mock compensation failure")]
    Mock,
}

/// One record to acknowledge: its message id and receipt token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompensationEntry {
    pub id: String,
    pub receipt_handle: String,
}

impl CompensationEntry {
    pub fn new(id: impl Into<String>, receipt_handle: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            receipt_handle: receipt_handle.into(),
        }
    }
}

impl CompensationEntry {
    /// Entry for a queue message; `None` if it lacks an id or receipt handle.
    pub fn from_message(message: &QueueMessage) -> Option<Self> {
        Some(Self::new(
            message.message_id.as_deref()?,
            message.receipt_handle.as_deref()?,
        ))
    }
}

/// Upstream acknowledgment call.
///
/// `entries` is non-empty and ordered as the records were fulfilled. Records
/// not listed stay eligible for redelivery. Errors are never swallowed by
/// callers: if this fails, the batch outcome is unknown upstream.
#[async_trait]
pub trait Compensator: Send + Sync {
    async fn compensate(&self, queue_arn: &str, entries: &[CompensationEntry]) -> Result<()>;
}

/// Queue ARN decomposed into the parts needed to address the queue.
///
/// Format: `arn:<partition>:sqs:<region>:<account-id>:<queue-name>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueArn {
    pub partition: String,
    pub region: String,
    pub account_id: String,
    pub name: String,
}

impl QueueArn {
    pub fn parse(arn: &str) -> Result<Self> {
        let parts: Vec<&str> = arn.splitn(6, ':').collect();
        let [prefix, partition, service, region, account_id, name] = parts.as_slice() else {
            return Err(CompensationError::InvalidArn(arn.to_string()));
        };

        if *prefix != "arn" || *service != "sqs" {
            return Err(CompensationError::InvalidArn(arn.to_string()));
        }
        if region.is_empty() || account_id.is_empty() || name.is_empty() {
            return Err(CompensationError::InvalidArn(arn.to_string()));
        }

        Ok(Self {
            partition: partition.to_string(),
            region: region.to_string(),
            account_id: account_id.to_string(),
            name: name.to_string(),
        })
    }

    /// FIFO queue names end in `.fifo`.
    pub fn is_fifo(&self) -> bool {
        self.name.ends_with(".fifo")
    }
}
