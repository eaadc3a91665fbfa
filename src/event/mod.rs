//! Inbound event shapes.
//!
//! The hosting runtime hands every invocation a single JSON payload. This
//! module turns it into a [`RawEvent`]: a tagged union over the upstream
//! origins this crate routes. Payload types come from `aws_lambda_events`;
//! this module only decides which of them a payload is.
//!
//! Shape discrimination is structural only:
//! - `Records` array whose first element carries `Sns` → notification
//! - `Records` array whose first element carries `receiptHandle` → queue batch
//! - `records` object keyed by partition plus `eventSource` → log-stream batch
//! - `source` string plus `resources` array → rule trigger
//!
//! Origin tags (`aws:sns`, `aws:sqs`, ...) are *not* checked here; that is the
//! classifier's job, so a well-shaped payload from an unexpected origin still
//! parses and simply matches no binding.

use aws_lambda_events::{
    cloudwatch_events::CloudWatchEvent,
    kafka::{KafkaEvent, KafkaRecord},
    sns::{SnsEvent, SnsMessage, SnsRecord},
    sqs::{SqsEvent, SqsMessage},
};
use base64::prelude::*;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

/// Origin tag carried by notification records.
pub const NOTIFICATION_ORIGIN: &str = "aws:sns";
/// Origin tag carried by queue records (standard and FIFO).
pub const QUEUE_ORIGIN: &str = "aws:sqs";
/// Origin tag carried by log-stream batches.
pub const STREAM_ORIGIN: &str = "aws:kafka";
/// Origin tag carried by scheduled and event-pattern rule triggers.
pub const RULE_ORIGIN: &str = "aws.events";

/// Notification batch (one record in practice).
pub type NotificationEvent = SnsEvent;
/// Envelope around one notification.
pub type NotificationRecord = SnsRecord;
/// The notification body handed to notification handlers.
pub type NotificationMessage = SnsMessage;
/// Queue batch, standard or FIFO.
pub type QueueEvent = SqsEvent;
/// One queue message: the record handle for queue bindings.
pub type QueueMessage = SqsMessage;
/// Log-stream batch: partition key → records in offset order.
pub type StreamEvent = KafkaEvent;
/// One log-stream record: the record handle for stream bindings.
pub type StreamRecord = KafkaRecord;
/// Scheduled or event-pattern rule trigger.
pub type RuleEvent = CloudWatchEvent;

/// A single inbound invocation payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(from = "Value")]
pub enum RawEvent {
    /// Pub/sub notification batch.
    Notification(NotificationEvent),
    /// Point-to-point queue batch, standard or FIFO.
    Queue(QueueEvent),
    /// Partition-keyed log-stream batch.
    Stream(StreamEvent),
    /// Scheduled or event-pattern rule trigger.
    Rule(RuleEvent),
    /// A payload whose shape matches no known origin.
    Unrecognized(Value),
}

impl RawEvent {
    /// Classify a JSON payload by shape.
    ///
    /// Never fails: payloads that do not deserialize into the shape they
    /// resemble become [`RawEvent::Unrecognized`].
    pub fn from_value(value: Value) -> Self {
        let parsed = match shape_of(&value) {
            Shape::Notification => NotificationEvent::deserialize(&value).map(RawEvent::Notification),
            Shape::Queue => QueueEvent::deserialize(&value).map(RawEvent::Queue),
            Shape::Stream => StreamEvent::deserialize(&value).map(RawEvent::Stream),
            Shape::Rule => RuleEvent::deserialize(&value).map(RawEvent::Rule),
            Shape::Unknown => return RawEvent::Unrecognized(value),
        };

        match parsed {
            Ok(event) => event,
            Err(e) => {
                debug!(error = %e, "Payload resembles a known origin but failed to parse");
                RawEvent::Unrecognized(value)
            }
        }
    }

    /// Short label for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            RawEvent::Notification(_) => "notification",
            RawEvent::Queue(_) => "queue",
            RawEvent::Stream(_) => "stream",
            RawEvent::Rule(_) => "rule",
            RawEvent::Unrecognized(_) => "unrecognized",
        }
    }
}

impl From<Value> for RawEvent {
    fn from(value: Value) -> Self {
        RawEvent::from_value(value)
    }
}

enum Shape {
    Notification,
    Queue,
    Stream,
    Rule,
    Unknown,
}

fn shape_of(value: &Value) -> Shape {
    if let Some(first) = value
        .get("Records")
        .and_then(Value::as_array)
        .and_then(|records| records.first())
    {
        if first.get("Sns").is_some() {
            return Shape::Notification;
        }
        if first.get("receiptHandle").is_some() {
            return Shape::Queue;
        }
        return Shape::Unknown;
    }

    if value.get("records").is_some_and(Value::is_object) && value.get("eventSource").is_some() {
        return Shape::Stream;
    }

    if value.get("source").is_some_and(Value::is_string)
        && value.get("resources").is_some_and(Value::is_array)
    {
        return Shape::Rule;
    }

    Shape::Unknown
}

/// Accessors over queue message attributes.
pub trait QueueMessageExt {
    /// FIFO message group, if the queue is ordered.
    fn message_group_id(&self) -> Option<&str>;
    /// How many times this message has been received, including this one.
    fn receive_count(&self) -> Option<u32>;
}

impl QueueMessageExt for QueueMessage {
    fn message_group_id(&self) -> Option<&str> {
        self.attributes.get("MessageGroupId").map(String::as_str)
    }

    fn receive_count(&self) -> Option<u32> {
        self.attributes
            .get("ApproximateReceiveCount")
            .and_then(|count| count.parse().ok())
    }
}

/// Base64 and partition helpers for log-stream records.
pub trait StreamRecordExt {
    /// Partition key as used in the batch mapping (`{topic}-{partition}`).
    fn partition_key(&self) -> String;
    /// Decode the base64 value. `Ok(None)` for tombstones.
    fn decoded_value(&self) -> Result<Option<Vec<u8>>, base64::DecodeError>;
    /// Decode the base64 key, if any.
    fn decoded_key(&self) -> Result<Option<Vec<u8>>, base64::DecodeError>;
}

impl StreamRecordExt for StreamRecord {
    fn partition_key(&self) -> String {
        format!("{}-{}", self.topic.as_deref().unwrap_or_default(), self.partition)
    }

    fn decoded_value(&self) -> Result<Option<Vec<u8>>, base64::DecodeError> {
        self.value.as_deref().map(|v| BASE64_STANDARD.decode(v)).transpose()
    }

    fn decoded_key(&self) -> Result<Option<Vec<u8>>, base64::DecodeError> {
        self.key.as_deref().map(|k| BASE64_STANDARD.decode(k)).transpose()
    }
}
