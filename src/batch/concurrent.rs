//! Concurrent strategy for unordered queues.

use std::sync::Arc;

use tokio::task::JoinSet;

use super::{BatchOutcome, Strategy};
use crate::error::HandlerError;
use crate::handler::RecordHandler;

/// Invoke `handler` on every record at once and wait for all of them.
///
/// Each invocation runs as its own task, so a failing or panicking handler
/// neither blocks nor cancels its siblings. Results are funneled back
/// through the join set; fulfilled records are returned in arrival order
/// regardless of completion order.
pub async fn run_concurrent<R>(
    records: Vec<Arc<R>>,
    handler: &Arc<dyn RecordHandler<R>>,
) -> BatchOutcome<R>
where
    R: Send + Sync + 'static,
{
    let total = records.len();
    let mut tasks = JoinSet::new();

    for (index, record) in records.iter().enumerate() {
        let handler = Arc::clone(handler);
        let record = Arc::clone(record);
        tasks.spawn(async move { (index, handler.handle(record).await) });
    }

    let mut fulfilled_indices = Vec::with_capacity(total);
    let mut errors: Vec<HandlerError> = Vec::new();

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, Ok(()))) => fulfilled_indices.push(index),
            Ok((_, Err(e))) => errors.push(e),
            // Panicked handler: counts as that record's failure
            Err(join_error) => errors.push(Box::new(join_error)),
        }
    }

    fulfilled_indices.sort_unstable();
    let fulfilled = fulfilled_indices
        .into_iter()
        .map(|index| Arc::clone(&records[index]))
        .collect();

    BatchOutcome {
        strategy: Strategy::Concurrent,
        fulfilled,
        errors,
        total,
    }
}
