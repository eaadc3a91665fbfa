//! Lambda Dispatch - source-routed batch dispatch
//!
//! Routes serverless invocation payloads (notifications, queue batches,
//! log-stream batches and rule triggers) to handlers registered per source,
//! runs queue and stream batches concurrently or in order, and acknowledges
//! the fulfilled part of a partially failed queue batch so only failed
//! records are redelivered.

pub mod batch;
pub mod classify;
pub mod compensation;
pub mod config;
pub mod error;
pub mod event;
pub mod handler;
pub mod router;
#[cfg(feature = "lambda")]
pub mod runtime;
pub mod utils;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use batch::Strategy;
pub use compensation::{CompensationEntry, CompensationError, Compensator};
pub use error::{DispatchError, HandlerError, Result};
pub use event::RawEvent;
pub use handler::{RecordHandler, TriggerHandler};
pub use router::{Router, RouterBuilder, RoutingPolicy};
