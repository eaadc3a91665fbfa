//! Test utilities: event builders and recording handlers.
//!
//! Lets tests drive the router with realistic payloads without a live
//! upstream service.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use base64::prelude::*;
use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::error::HandlerError;
use crate::event::{
    NotificationEvent, QueueEvent, QueueMessage, RawEvent, RuleEvent, StreamEvent, StreamRecord,
    NOTIFICATION_ORIGIN, QUEUE_ORIGIN, RULE_ORIGIN, STREAM_ORIGIN,
};
use crate::handler::{RecordHandler, TriggerHandler};

/// Body that makes [`fails_on_body`] reject a queue message.
pub const FAILED_BODY: &str = "FAILED";

fn fixture<T: DeserializeOwned>(payload: Value) -> T {
    serde_json::from_value(payload).expect("fixture payload must match the platform event shape")
}

/// Build a single-record notification event.
pub fn notification_event(topic_arn: &str, message: &str) -> RawEvent {
    RawEvent::Notification(fixture::<NotificationEvent>(json!({
        "Records": [{
            "EventSource": NOTIFICATION_ORIGIN,
            "EventVersion": "1.0",
            "EventSubscriptionArn": format!("{}:abcdefg", topic_arn),
            "Sns": {
                "Type": "Notification",
                "MessageId": "abcdefghijklmnopqrstuvwxyz",
                "TopicArn": topic_arn,
                "Subject": "TestInvoke",
                "Message": message,
                "Timestamp": "2021-12-02T20:21:00.000Z",
                "SignatureVersion": "1",
                "Signature": "EXAMPLE",
                "SigningCertUrl": "https://sns.us-east-1.amazonaws.com/cert.pem",
                "UnsubscribeUrl": "https://sns.us-east-1.amazonaws.com/?Action=Unsubscribe",
                "MessageAttributes": {}
            }
        }]
    })))
}

/// Build a queue message. The receipt handle is `rh-{id}`.
pub fn queue_message(id: &str, body: &str, queue_arn: &str) -> QueueMessage {
    fixture(json!({
        "messageId": id,
        "receiptHandle": format!("rh-{}", id),
        "body": body,
        "attributes": { "ApproximateReceiveCount": "1" },
        "messageAttributes": {},
        "md5OfBody": "098f6bcd4621d373cade4e832627b4f6",
        "eventSource": QUEUE_ORIGIN,
        "eventSourceARN": queue_arn,
        "awsRegion": "us-east-1"
    }))
}

/// Build a queue batch event.
pub fn queue_event(records: Vec<QueueMessage>) -> RawEvent {
    let mut event: QueueEvent = fixture(json!({ "Records": [] }));
    event.records = records;
    RawEvent::Queue(event)
}

/// Build a stream record with a base64-encoded value.
pub fn stream_record(topic: &str, partition: i64, offset: i64, value: &str) -> StreamRecord {
    fixture(json!({
        "topic": topic,
        "partition": partition,
        "offset": offset,
        "timestamp": 1_545_084_650_987_i64,
        "timestampType": "CREATE_TIME",
        "key": null,
        "value": BASE64_STANDARD.encode(value),
        "headers": []
    }))
}

/// Build a stream event from `(partition key, records)` pairs.
pub fn stream_event(source_arn: &str, partitions: Vec<(&str, Vec<StreamRecord>)>) -> RawEvent {
    let mut event: StreamEvent = fixture(json!({
        "eventSource": STREAM_ORIGIN,
        "eventSourceArn": source_arn,
        "bootstrapServers": "b-1:9092",
        "records": {}
    }));
    event.records = partitions
        .into_iter()
        .map(|(key, records)| (key.to_string(), records))
        .collect();
    RawEvent::Stream(event)
}

/// Build a rule trigger event.
pub fn rule_event(resources: Vec<String>, detail: Value) -> RawEvent {
    RawEvent::Rule(fixture::<RuleEvent>(json!({
        "version": "0",
        "id": "1",
        "detail-type": "Scheduled Event",
        "source": RULE_ORIGIN,
        "account": "1234567890",
        "time": "2021-12-02T20:21:00Z",
        "region": "us-east-1",
        "resources": resources,
        "detail": detail
    })))
}

/// Failure predicate: queue messages whose body is [`FAILED_BODY`].
pub fn fails_on_body(message: &QueueMessage) -> bool {
    message.body.as_deref() == Some(FAILED_BODY)
}

/// Handler that records every record it is invoked with.
///
/// Records are captured when the invocation starts, so the recorded order
/// is invocation order.
pub struct RecordingHandler<R> {
    seen: Arc<Mutex<Vec<Arc<R>>>>,
    fail_when: fn(&R) -> bool,
    delay: Option<fn(&R) -> Duration>,
}

impl<R> Clone for RecordingHandler<R> {
    fn clone(&self) -> Self {
        Self {
            seen: Arc::clone(&self.seen),
            fail_when: self.fail_when,
            delay: self.delay,
        }
    }
}

impl<R> RecordingHandler<R> {
    /// A handler that always succeeds.
    pub fn new() -> Self {
        Self::failing_when(|_| false)
    }

    /// A handler that fails for records matching `fail_when`.
    pub fn failing_when(fail_when: fn(&R) -> bool) -> Self {
        Self {
            seen: Arc::new(Mutex::new(Vec::new())),
            fail_when,
            delay: None,
        }
    }

    /// Sleep before resolving, per record.
    pub fn with_delay(mut self, delay: fn(&R) -> Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn seen(&self) -> Vec<Arc<R>> {
        self.seen.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn count(&self) -> usize {
        self.seen.lock().map(|s| s.len()).unwrap_or_default()
    }
}

impl<R> Default for RecordingHandler<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Send + Sync + 'static> RecordHandler<R> for RecordingHandler<R> {
    fn handle(&self, record: Arc<R>) -> BoxFuture<'static, Result<(), HandlerError>> {
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(Arc::clone(&record));
        }
        let fail = (self.fail_when)(&record);
        let delay = self.delay.map(|d| d(&record));

        Box::pin(async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            let result: Result<(), HandlerError> = if fail {
                Err("SQS FAILED".into())
            } else {
                Ok(())
            };
            result
        })
    }
}

/// Trigger handler that counts invocations.
#[derive(Clone, Default)]
pub struct CountingTrigger {
    count: Arc<AtomicUsize>,
    fail: bool,
}

impl CountingTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            count: Arc::new(AtomicUsize::new(0)),
            fail: true,
        }
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

impl TriggerHandler for CountingTrigger {
    fn trigger(&self) -> BoxFuture<'static, Result<(), HandlerError>> {
        self.count.fetch_add(1, Ordering::SeqCst);
        let fail = self.fail;
        Box::pin(async move {
            let result: Result<(), HandlerError> = if fail {
                Err("trigger failed".into())
            } else {
                Ok(())
            };
            result
        })
    }
}
