//! Routing policy tests across mixed bindings.

use std::sync::Arc;

use serde_json::Value;

use lambda_dispatch::compensation::MockCompensator;
use lambda_dispatch::event::QueueMessage;
use lambda_dispatch::test_utils::{
    fails_on_body, queue_event, queue_message, rule_event, CountingTrigger, RecordingHandler,
    FAILED_BODY,
};
use lambda_dispatch::{DispatchError, Router, RoutingPolicy};

const QUEUE_ARN: &str = "arn:aws:sqs:us-east-1:1234567890:sqs";
const RULE_ARN: &str = "arn:aws:events:us-east-1:1234567890:rule/abcdefg";

#[tokio::test]
async fn test_fan_out_waits_for_every_binding() {
    let audit = RecordingHandler::<QueueMessage>::new()
        .with_delay(|_| std::time::Duration::from_millis(30));
    let primary = RecordingHandler::failing_when(fails_on_body);
    let compensator = Arc::new(MockCompensator::new());
    let router = Router::builder()
        .queue(QUEUE_ARN, primary.clone())
        .queue(QUEUE_ARN, audit.clone())
        .compensator(compensator.clone())
        .build()
        .unwrap();

    let event = queue_event(vec![
        queue_message("1", "a", QUEUE_ARN),
        queue_message("2", FAILED_BODY, QUEUE_ARN),
    ]);
    let err = router.handle(&event).await.unwrap_err();

    // The slow binding finished before the failure was returned
    assert_eq!(audit.count(), 2);
    assert_eq!(primary.count(), 2);
    assert!(matches!(err, DispatchError::BatchFailure { .. }));
    assert_eq!(compensator.compensated_ids().await, vec!["1"]);
}

#[tokio::test]
async fn test_first_match_uses_registration_order() {
    let first = RecordingHandler::<QueueMessage>::new();
    let second = RecordingHandler::<QueueMessage>::new();
    let router = Router::builder()
        .policy(RoutingPolicy::FirstMatch)
        .queue(QUEUE_ARN, first.clone())
        .queue(QUEUE_ARN, second.clone())
        .compensator(Arc::new(MockCompensator::new()))
        .build()
        .unwrap();

    let event = queue_event(vec![queue_message("1", "a", QUEUE_ARN)]);
    router.handle(&event).await.unwrap();

    assert_eq!((first.count(), second.count()), (1, 0));
}

#[tokio::test]
async fn test_mixed_bindings_only_matching_kind_runs() {
    let queue = RecordingHandler::<QueueMessage>::new();
    let trigger = CountingTrigger::new();
    let router = Router::builder()
        .queue(QUEUE_ARN, queue.clone())
        .scheduled_rule(RULE_ARN, trigger.clone())
        .compensator(Arc::new(MockCompensator::new()))
        .build()
        .unwrap();

    router
        .handle(&rule_event(vec![RULE_ARN.to_string()], Value::Null))
        .await
        .unwrap();

    assert_eq!(queue.count(), 0);
    assert_eq!(trigger.count(), 1);
}

#[tokio::test]
async fn test_generic_rule_for_other_rule_is_ignored() {
    let details = RecordingHandler::<Value>::new();
    let router = Router::builder()
        .generic_rule(RULE_ARN, details.clone())
        .generic_rule("", details.clone())
        .build()
        .unwrap();

    let event = rule_event(
        vec!["arn:aws:events:us-east-1:1234567890:rule/other".to_string()],
        serde_json::json!({ "k": 1 }),
    );
    router.handle(&event).await.unwrap();

    assert_eq!(details.count(), 0);
}
