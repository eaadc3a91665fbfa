//! Hosting-runtime adapter.
//!
//! Feeds every invocation payload through [`Router::handle_value`]. Any
//! returned error fails the invocation, so the platform redelivers whatever
//! was not acknowledged.

use std::sync::Arc;

use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;
use tracing::{error, info_span, Instrument};

use crate::router::Router;

/// Serve invocations until the runtime shuts down.
pub async fn run(router: Arc<Router>) -> Result<(), Error> {
    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| {
        let router = Arc::clone(&router);
        async move { invoke(&router, event).await }
    }))
    .await
}

async fn invoke(router: &Router, event: LambdaEvent<Value>) -> Result<(), Error> {
    let (payload, context) = event.into_parts();
    let span = info_span!("invocation", request_id = %context.request_id);

    async {
        router.handle_value(payload).await.map_err(|e| {
            error!(error = %e, "Invocation failed");
            Error::from(e)
        })
    }
    .instrument(span)
    .await
}
