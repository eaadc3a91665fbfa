//! lambda-dispatch-log: Logging dispatcher
//!
//! Lambda function that routes every configured source to a handler which
//! logs the record and succeeds. Useful for verifying event source mappings
//! and IAM permissions before deploying real handlers.
//!
//! ## Architecture
//! ```text
//! [SNS / SQS / MSK / EventBridge] --(invoke)--> [lambda-dispatch-log]
//!                                                        |
//!                                                        v
//!                                                 CloudWatch Logs
//! ```
//!
//! ## Configuration
//! - LAMBDA_DISPATCH_CONFIG: Path to the YAML config declaring bindings
//! - LAMBDA_DISPATCH__*: Overrides for individual config keys
//! - LAMBDA_DISPATCH_LOG: Tracing filter directive (default from config)

use std::sync::Arc;

use serde_json::Value;
use tracing::{info, warn};

use lambda_dispatch::compensation::SqsCompensator;
use lambda_dispatch::config::{BindingConfig, Config, SourceKind};
use lambda_dispatch::error::HandlerError;
use lambda_dispatch::event::{
    NotificationMessage, QueueMessage, QueueMessageExt, StreamRecord, StreamRecordExt,
};
use lambda_dispatch::router::{Router, RouterBuilder};
use lambda_dispatch::runtime;
use lambda_dispatch::utils::bootstrap::init_tracing;

async fn log_notification(message: Arc<NotificationMessage>) -> Result<(), HandlerError> {
    info!(
        topic = %message.topic_arn,
        message_id = %message.message_id,
        subject = ?message.subject,
        message = %message.message,
        "notification"
    );
    Ok(())
}

async fn log_queue_message(message: Arc<QueueMessage>) -> Result<(), HandlerError> {
    info!(
        queue = message.event_source_arn.as_deref().unwrap_or_default(),
        message_id = message.message_id.as_deref().unwrap_or_default(),
        group = ?message.message_group_id(),
        body = message.body.as_deref().unwrap_or_default(),
        "queue message"
    );
    Ok(())
}

/// Never fails; an undecodable value is logged as a warning.
async fn log_stream_record(record: Arc<StreamRecord>) -> Result<(), HandlerError> {
    match record.decoded_value() {
        Ok(value) => info!(
            partition = %record.partition_key(),
            offset = record.offset,
            value = %String::from_utf8_lossy(&value.unwrap_or_default()),
            "stream record"
        ),
        Err(e) => warn!(
            partition = %record.partition_key(),
            offset = record.offset,
            error = %e,
            "stream record value is not valid base64"
        ),
    }
    Ok(())
}

async fn log_trigger() -> Result<(), HandlerError> {
    info!("scheduled trigger");
    Ok(())
}

async fn log_rule_detail(detail: Arc<Value>) -> Result<(), HandlerError> {
    info!(detail = %detail, "rule event");
    Ok(())
}

fn register(builder: RouterBuilder, binding: &BindingConfig) -> RouterBuilder {
    let source = binding.source.clone();
    match binding.kind {
        SourceKind::Notification => builder.notification(source, log_notification),
        SourceKind::Queue => builder.queue(source, log_queue_message),
        SourceKind::OrderedQueue => builder.ordered_queue(source, log_queue_message),
        SourceKind::LogStream => {
            let topic = binding.topic.clone().unwrap_or_default();
            builder.stream(source, topic, log_stream_record)
        }
        SourceKind::ScheduledRule => builder.scheduled_rule(source, log_trigger),
        SourceKind::GenericRule => builder.generic_rule(source, log_rule_detail),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = Config::load(None)?;
    init_tracing(&config.log);

    let compensator = SqsCompensator::new(&config.aws, &config.compensation).await;

    let router = config
        .bindings
        .iter()
        .fold(Router::builder(), register)
        .policy(config.routing.policy)
        .compensator(Arc::new(compensator))
        .build()?;

    info!(
        bindings = router.bindings().len(),
        policy = ?router.policy(),
        "lambda-dispatch-log started"
    );

    runtime::run(Arc::new(router)).await
}
