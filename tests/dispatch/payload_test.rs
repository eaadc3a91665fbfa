//! Raw JSON payload tests.
//!
//! Payloads mirror what the platform actually delivers for each origin.

use std::sync::Arc;

use serde_json::{json, Value};

use lambda_dispatch::compensation::MockCompensator;
use lambda_dispatch::event::{
    NotificationMessage, QueueMessage, QueueMessageExt, StreamRecord, StreamRecordExt,
};
use lambda_dispatch::test_utils::{CountingTrigger, RecordingHandler};
use lambda_dispatch::{RawEvent, Router};

const TOPIC_ARN: &str = "arn:aws:sns:us-east-1:1234567890:topic-1234";
const QUEUE_ARN: &str = "arn:aws:sqs:us-east-1:1234567890:sqs.fifo";
const CLUSTER_ARN: &str = "arn:aws:kafka:us-east-1:1234567890:cluster/vpc-2priv-2pub/1";
const RULE_ARN: &str = "arn:aws:events:us-east-1:1234567890:rule/abcdefg";

fn sns_payload(topic_arn: &str) -> Value {
    json!({
        "Records": [{
            "EventSource": "aws:sns",
            "EventVersion": "1.0",
            "EventSubscriptionArn": format!("{topic_arn}:sub"),
            "Sns": {
                "Type": "Notification",
                "SignatureVersion": "1",
                "Signature": "tcc6faL2yUC6dgZdmrwh1Y4cGa/ebXEkAi6RibDsvpi+tE/1+82j...65r==",
                "SigningCertUrl": "https://sns.us-east-1.amazonaws.com/SimpleNotificationService-ac565b8b1a6c5d002d285f9598aa1d9b.pem",
                "UnsubscribeUrl": format!("https://sns.us-east-1.amazonaws.com/?Action=Unsubscribe&SubscriptionArn={topic_arn}:sub"),
                "MessageId": "95df01b4-ee98-5cb9-9903-4c221d41eb5e",
                "TopicArn": topic_arn,
                "Subject": "TestInvoke",
                "Message": "Hello from SNS!",
                "Timestamp": "2021-12-02T20:21:00.000Z",
                "MessageAttributes": {}
            }
        }]
    })
}

fn sqs_payload() -> Value {
    json!({
        "Records": [
            {
                "messageId": "059f36b4-87a3-44ab-83d2-661975830a7d",
                "receiptHandle": "AQEBwJnKyrHigUMZj6rYigCgxlaS3SLy0a",
                "body": "test",
                "attributes": {
                    "ApproximateReceiveCount": "1",
                    "MessageGroupId": "group-1",
                    "SentTimestamp": "1545082649183"
                },
                "messageAttributes": {},
                "md5OfBody": "098f6bcd4621d373cade4e832627b4f6",
                "eventSource": "aws:sqs",
                "eventSourceARN": QUEUE_ARN,
                "awsRegion": "us-east-1"
            },
            {
                "messageId": "2e1424d4-f796-459a-8184-9c92662be6da",
                "receiptHandle": "AQEBzWwaftRI0KuVm4tP+/7q1rGgNqicHq",
                "body": "test",
                "attributes": {
                    "ApproximateReceiveCount": "2",
                    "MessageGroupId": "group-1"
                },
                "messageAttributes": {},
                "md5OfBody": "098f6bcd4621d373cade4e832627b4f6",
                "eventSource": "aws:sqs",
                "eventSourceARN": QUEUE_ARN,
                "awsRegion": "us-east-1"
            }
        ]
    })
}

fn msk_payload() -> Value {
    json!({
        "eventSource": "aws:kafka",
        "eventSourceArn": CLUSTER_ARN,
        "bootstrapServers": "b-2.demo-cluster-1.a1bcde.c1.kafka.us-east-1.amazonaws.com:9092",
        "records": {
            "mytopic-0": [{
                "topic": "mytopic",
                "partition": 0,
                "offset": 15,
                "timestamp": 1545084650987_i64,
                "timestampType": "CREATE_TIME",
                "key": "a2V5",
                "value": "SGVsbG8sIHRoaXMgaXMgYSB0ZXN0Lg==",
                "headers": [{ "headerKey": [104, 101, 97, 100, 101, 114, 86, 97, 108, 117, 101] }]
            }]
        }
    })
}

fn rule_payload() -> Value {
    json!({
        "version": "0",
        "id": "53dc4d37-cffa-4f76-80c9-8b7d4a4d2eaa",
        "detail-type": "Scheduled Event",
        "source": "aws.events",
        "account": "1234567890",
        "time": "2021-12-02T20:21:00Z",
        "region": "us-east-1",
        "resources": [RULE_ARN],
        "detail": {}
    })
}

#[tokio::test]
async fn test_notification_payload() {
    let handler = RecordingHandler::<NotificationMessage>::new();
    let router = Router::builder()
        .notification(TOPIC_ARN, handler.clone())
        .build()
        .unwrap();

    router.handle_value(sns_payload(TOPIC_ARN)).await.unwrap();

    let seen = handler.seen();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].message, "Hello from SNS!");
    assert_eq!(seen[0].subject.as_deref(), Some("TestInvoke"));
}

#[tokio::test]
async fn test_notification_for_other_topic_is_not_dispatched() {
    let handler = RecordingHandler::<NotificationMessage>::new();
    let router = Router::builder()
        .notification(TOPIC_ARN, handler.clone())
        .build()
        .unwrap();

    router
        .handle_value(sns_payload("arn:aws:sns:us-east-1:1234567890:other"))
        .await
        .unwrap();

    assert_eq!(handler.count(), 0);
}

#[tokio::test]
async fn test_fifo_payload() {
    let handler = RecordingHandler::<QueueMessage>::new();
    let router = Router::builder()
        .ordered_queue(QUEUE_ARN, handler.clone())
        .compensator(Arc::new(MockCompensator::new()))
        .build()
        .unwrap();

    router.handle_value(sqs_payload()).await.unwrap();

    let seen = handler.seen();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].message_group_id(), Some("group-1"));
    assert_eq!(seen[1].receive_count(), Some(2));
}

#[tokio::test]
async fn test_msk_payload() {
    let handler = RecordingHandler::<StreamRecord>::new();
    let router = Router::builder()
        .stream(CLUSTER_ARN, "mytopic", handler.clone())
        .build()
        .unwrap();

    router.handle_value(msk_payload()).await.unwrap();

    let seen = handler.seen();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].partition_key(), "mytopic-0");
    assert_eq!(seen[0].decoded_key().unwrap().unwrap(), b"key");
    assert_eq!(
        seen[0].decoded_value().unwrap().unwrap(),
        b"Hello, this is a test."
    );
}

#[tokio::test]
async fn test_scheduled_rule_payload() {
    let trigger = CountingTrigger::new();
    let other = CountingTrigger::new();
    let router = Router::builder()
        .scheduled_rule(RULE_ARN, trigger.clone())
        .scheduled_rule("arn:aws:events:us-east-1:1234567890:rule/other", other.clone())
        .build()
        .unwrap();

    router.handle_value(rule_payload()).await.unwrap();

    assert_eq!(trigger.count(), 1);
    assert_eq!(other.count(), 0);
}

#[tokio::test]
async fn test_unknown_payload_matches_nothing() {
    let trigger = CountingTrigger::new();
    let router = Router::builder()
        .scheduled_rule(RULE_ARN, trigger.clone())
        .build()
        .unwrap();

    let payload = json!({ "Records": [{ "eventSource": "aws:dynamodb" }] });
    assert!(matches!(
        RawEvent::from_value(payload.clone()),
        RawEvent::Unrecognized(_)
    ));
    router.handle_value(payload).await.unwrap();

    assert_eq!(trigger.count(), 0);
}
