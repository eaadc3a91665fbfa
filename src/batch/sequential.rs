//! Sequential strategy for ordered (FIFO) queues and streams.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;

use super::{BatchOutcome, Strategy};
use crate::error::HandlerError;
use crate::handler::RecordHandler;

/// Invoke `handler` on each record in arrival order, one at a time.
///
/// Stops at the first failure: later records are never attempted, since
/// running record k+1 after record k failed would let its side effects
/// overtake k's redelivery.
pub async fn run_sequential<R>(
    records: Vec<Arc<R>>,
    handler: &Arc<dyn RecordHandler<R>>,
) -> BatchOutcome<R>
where
    R: Send + Sync + 'static,
{
    let total = records.len();
    let mut fulfilled = Vec::with_capacity(total);
    let mut errors: Vec<HandlerError> = Vec::new();

    for record in records {
        // Wrapped in a block so a panic raised while building the future is caught too
        let invocation =
            AssertUnwindSafe(async { handler.handle(Arc::clone(&record)).await }).catch_unwind();
        match invocation.await {
            Ok(Ok(())) => fulfilled.push(record),
            Ok(Err(e)) => {
                errors.push(e);
                break;
            }
            Err(panic) => {
                errors.push(panic_message(panic).into());
                break;
            }
        }
    }

    BatchOutcome {
        strategy: Strategy::Sequential,
        fulfilled,
        errors,
        total,
    }
}

fn panic_message(panic: Box<dyn std::any::Any + Send>) -> String {
    let detail = panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    format!("handler panicked: {}", detail)
}
