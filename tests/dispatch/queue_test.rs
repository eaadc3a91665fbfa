//! Queue batch dispatch tests.
//!
//! Unordered queues attempt every record; FIFO queues stop at the first
//! failure. Both acknowledge fulfilled records when the batch fails.

use std::sync::Arc;

use lambda_dispatch::compensation::MockCompensator;
use lambda_dispatch::event::QueueMessage;
use lambda_dispatch::test_utils::{
    fails_on_body, queue_event, queue_message, RecordingHandler, FAILED_BODY,
};
use lambda_dispatch::{DispatchError, RawEvent, Router};

const QUEUE_ARN: &str = "arn:aws:sqs:us-east-1:1234567890:sqs";
const FIFO_ARN: &str = "arn:aws:sqs:us-east-1:1234567890:sqs.fifo";

fn three_record_batch(queue_arn: &str) -> RawEvent {
    queue_event(vec![
        queue_message("1", "first", queue_arn),
        queue_message("2", FAILED_BODY, queue_arn),
        queue_message("3", "third", queue_arn),
    ])
}

fn ids(records: &[Arc<QueueMessage>]) -> Vec<String> {
    records
        .iter()
        .map(|r| r.message_id.clone().unwrap_or_default())
        .collect()
}

#[tokio::test]
async fn test_unordered_queue_partial_failure() {
    let handler = RecordingHandler::failing_when(fails_on_body);
    let compensator = Arc::new(MockCompensator::new());
    let router = Router::builder()
        .queue(QUEUE_ARN, handler.clone())
        .compensator(compensator.clone())
        .build()
        .unwrap();

    let err = router.handle(&three_record_batch(QUEUE_ARN)).await.unwrap_err();

    assert_eq!(handler.count(), 3);
    let mut compensated = compensator.compensated_ids().await;
    compensated.sort();
    assert_eq!(compensated, vec!["1", "3"]);
    assert_eq!(
        err.to_string(),
        format!("1 of 3 records failed for {}", QUEUE_ARN)
    );
}

#[tokio::test]
async fn test_ordered_queue_stops_at_first_failure() {
    let handler = RecordingHandler::failing_when(fails_on_body);
    let compensator = Arc::new(MockCompensator::new());
    let router = Router::builder()
        .ordered_queue(FIFO_ARN, handler.clone())
        .compensator(compensator.clone())
        .build()
        .unwrap();

    let err = router.handle(&three_record_batch(FIFO_ARN)).await.unwrap_err();

    assert_eq!(ids(&handler.seen()), vec!["1", "2"]);
    assert_eq!(compensator.compensated_ids().await, vec!["1"]);
    match err {
        DispatchError::OrderedBatchFailure {
            failed,
            total,
            cause,
            ..
        } => {
            assert_eq!((failed, total), (2, 3));
            assert_eq!(cause.to_string(), "SQS FAILED");
        }
        other => panic!("expected OrderedBatchFailure, got {other}"),
    }
}

#[tokio::test]
async fn test_full_success_never_compensates() {
    let handler = RecordingHandler::<QueueMessage>::new();
    let compensator = Arc::new(MockCompensator::new());
    let router = Router::builder()
        .queue(QUEUE_ARN, handler.clone())
        .compensator(compensator.clone())
        .build()
        .unwrap();

    let event = queue_event(vec![
        queue_message("1", "a", QUEUE_ARN),
        queue_message("2", "b", QUEUE_ARN),
    ]);
    router.handle(&event).await.unwrap();

    assert_eq!(handler.count(), 2);
    assert_eq!(compensator.call_count().await, 0);
}

#[tokio::test]
async fn test_compensation_failure_is_surfaced() {
    let compensator = Arc::new(MockCompensator::new());
    compensator.set_fail_on_compensate(true).await;
    let router = Router::builder()
        .queue(QUEUE_ARN, RecordingHandler::failing_when(fails_on_body))
        .compensator(compensator.clone())
        .build()
        .unwrap();

    let err = router.handle(&three_record_batch(QUEUE_ARN)).await.unwrap_err();

    assert!(err.is_compensation_failure());
    assert_eq!(compensator.call_count().await, 1);
}

#[tokio::test]
async fn test_batch_from_other_queue_is_ignored() {
    let handler = RecordingHandler::<QueueMessage>::new();
    let compensator = Arc::new(MockCompensator::new());
    let router = Router::builder()
        .queue(QUEUE_ARN, handler.clone())
        .queue("", handler.clone())
        .compensator(compensator)
        .build()
        .unwrap();

    let event = three_record_batch("arn:aws:sqs:us-east-1:1234567890:other");
    router.handle(&event).await.unwrap();

    assert_eq!(handler.count(), 0);
}

#[tokio::test]
async fn test_fifo_batch_from_other_queue_is_ignored() {
    let handler = RecordingHandler::<QueueMessage>::new();
    let compensator = Arc::new(MockCompensator::new());
    let router = Router::builder()
        .ordered_queue(FIFO_ARN, handler.clone())
        .ordered_queue("", handler.clone())
        .compensator(compensator.clone())
        .build()
        .unwrap();

    let event = three_record_batch("arn:aws:sqs:us-east-1:1234567890:other.fifo");
    router.handle(&event).await.unwrap();

    assert_eq!(handler.count(), 0);
    assert_eq!(compensator.call_count().await, 0);
}
