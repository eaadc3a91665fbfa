//! Record handler traits.
//!
//! A handler is opaque to the dispatcher beyond "resolved" or "failed with
//! an error". Both traits return `'static` boxed futures so invocations can
//! be spawned onto the runtime independently of the router's borrow.

use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::error::HandlerError;

/// Processes one record handle of type `R`.
///
/// Implemented for any `Fn(Arc<R>) -> impl Future<Output = Result<(), HandlerError>>`.
pub trait RecordHandler<R>: Send + Sync {
    fn handle(&self, record: Arc<R>) -> BoxFuture<'static, Result<(), HandlerError>>;
}

impl<R, F, Fut> RecordHandler<R> for F
where
    R: Send + Sync + 'static,
    F: Fn(Arc<R>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    fn handle(&self, record: Arc<R>) -> BoxFuture<'static, Result<(), HandlerError>> {
        Box::pin(self(record))
    }
}

/// Handler for sources that carry no per-record payload (scheduled rules).
pub trait TriggerHandler: Send + Sync {
    fn trigger(&self) -> BoxFuture<'static, Result<(), HandlerError>>;
}

impl<F, Fut> TriggerHandler for F
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    fn trigger(&self) -> BoxFuture<'static, Result<(), HandlerError>> {
        Box::pin(self())
    }
}
