//! Batch execution strategies.
//!
//! This module contains:
//! - `Strategy`: concurrent (unordered queues) or sequential (FIFO, streams)
//! - `BatchOutcome`: fulfilled records and collected errors of one run
//! - `settle`: turns an outcome into success or a summary error, acknowledging
//!   fulfilled records first when the batch did not succeed in full
//!
//! Every record ends up in exactly one of: fulfilled, attempted-and-failed,
//! never attempted (sequential only).

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::compensation::{CompensationEntry, Compensator};
use crate::error::{DispatchError, HandlerError, Result};
use crate::event::{QueueMessage, StreamRecord};
use crate::handler::RecordHandler;

mod concurrent;
mod sequential;

pub use concurrent::run_concurrent;
pub use sequential::run_sequential;

/// How a batch's records are handed to the handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// All records at once; failures are isolated from each other.
    Concurrent,
    /// One at a time in arrival order; stops at the first failure.
    Sequential,
}

/// Result of running one batch through a strategy.
pub struct BatchOutcome<R> {
    pub strategy: Strategy,
    /// Records whose handler resolved without error, in arrival order.
    pub fulfilled: Vec<Arc<R>>,
    /// One error per failed invocation (at most one for `Sequential`).
    pub errors: Vec<HandlerError>,
    /// Number of records in the input batch.
    pub total: usize,
}

impl<R> BatchOutcome<R> {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    /// Records that were not fulfilled: failed or never attempted.
    pub fn unprocessed(&self) -> usize {
        self.total - self.fulfilled.len()
    }
}

/// Record handles that can be removed from upstream redelivery.
pub trait Acknowledge {
    /// `None` when the source has no per-record acknowledgment.
    fn compensation_entry(&self) -> Option<CompensationEntry>;
}

impl Acknowledge for QueueMessage {
    fn compensation_entry(&self) -> Option<CompensationEntry> {
        CompensationEntry::from_message(self)
    }
}

impl Acknowledge for StreamRecord {
    fn compensation_entry(&self) -> Option<CompensationEntry> {
        None
    }
}

/// Run `records` through `handler` using `strategy`.
pub async fn run<R>(
    strategy: Strategy,
    records: Vec<Arc<R>>,
    handler: &Arc<dyn RecordHandler<R>>,
) -> BatchOutcome<R>
where
    R: Send + Sync + 'static,
{
    match strategy {
        Strategy::Concurrent => run_concurrent(records, handler).await,
        Strategy::Sequential => run_sequential(records, handler).await,
    }
}

/// Resolve a batch outcome.
///
/// On failure: every handler error is logged, fulfilled records are
/// acknowledged through `compensator` (awaited; its failure is returned
/// as-is and supersedes the summary), then the summary error is returned.
pub async fn settle<R: Acknowledge>(
    outcome: BatchOutcome<R>,
    source_arn: &str,
    compensator: Option<&dyn Compensator>,
) -> Result<()> {
    if outcome.is_success() {
        info!(source = %source_arn, records = outcome.total, "Batch processed");
        return Ok(());
    }

    for e in &outcome.errors {
        error!(source = %source_arn, error = %e, "Record handler failed");
    }

    let entries: Vec<CompensationEntry> = outcome
        .fulfilled
        .iter()
        .filter_map(|record| record.compensation_entry())
        .collect();

    if !entries.is_empty() {
        match compensator {
            Some(compensator) => {
                warn!(
                    source = %source_arn,
                    fulfilled = entries.len(),
                    total = outcome.total,
                    "Acknowledging fulfilled records of failed batch"
                );
                if let Err(e) = compensator.compensate(source_arn, &entries).await {
                    error!(source = %source_arn, error = %e, "Compensation failed");
                    return Err(DispatchError::Compensation(e));
                }
            }
            None => warn!(
                source = %source_arn,
                fulfilled = entries.len(),
                "No compensator configured, fulfilled records will be redelivered"
            ),
        }
    }

    let failed = outcome.unprocessed();
    let total = outcome.total;
    let mut errors = outcome.errors;

    Err(match outcome.strategy {
        Strategy::Concurrent => DispatchError::BatchFailure {
            source_arn: source_arn.to_string(),
            failed,
            total,
            errors,
        },
        Strategy::Sequential => DispatchError::OrderedBatchFailure {
            source_arn: source_arn.to_string(),
            failed,
            total,
            cause: errors.remove(0),
        },
    })
}
