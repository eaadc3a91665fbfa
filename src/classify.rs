//! Record classification.
//!
//! One pure function per source kind. Each takes the raw event plus the
//! binding's identifier and returns `None` when the binding does not apply,
//! or the record handles scoped to that binding. A mismatch is never an
//! error: it just means the binding stays inert for this event.
//!
//! An empty identifier never matches. Placeholder bindings registered with
//! `""` must not process anything, even if an upstream field is also empty.

use crate::event::{
    NotificationMessage, QueueMessage, RawEvent, RuleEvent, StreamRecord, NOTIFICATION_ORIGIN,
    QUEUE_ORIGIN, RULE_ORIGIN, STREAM_ORIGIN,
};

/// The notification addressed to `topic_arn`, if any.
///
/// The platform delivers exactly one notification per invocation, so only
/// the first record is considered.
pub fn notification<'a>(event: &'a RawEvent, topic_arn: &str) -> Option<&'a NotificationMessage> {
    if topic_arn.is_empty() {
        return None;
    }
    let RawEvent::Notification(notification) = event else {
        return None;
    };

    let record = notification.records.first()?;
    (record.event_source == NOTIFICATION_ORIGIN && record.sns.topic_arn == topic_arn)
        .then_some(&record.sns)
}

/// The full batch, if it came from `queue_arn`.
///
/// Only the first record's origin is checked. Upstream batches are sourced
/// from one queue, so they are homogeneous; a mixed batch would be accepted
/// or rejected as a whole based on its first record.
pub fn queue_batch<'a>(event: &'a RawEvent, queue_arn: &str) -> Option<&'a [QueueMessage]> {
    if queue_arn.is_empty() {
        return None;
    }
    let RawEvent::Queue(queue) = event else {
        return None;
    };

    let first = queue.records.first()?;
    (first.event_source.as_deref() == Some(QUEUE_ORIGIN)
        && first.event_source_arn.as_deref() == Some(queue_arn))
    .then_some(queue.records.as_slice())
}

/// Records of `topic` from the stream identified by `source_arn`.
///
/// Per-partition order is preserved; partitions are visited in partition-key
/// order (the payload mapping itself is unordered). Returns `None` when the
/// stream matches but holds no record of `topic`, so first-match routing can
/// move on to a binding that does.
pub fn stream_records<'a>(
    event: &'a RawEvent,
    source_arn: &str,
    topic: &str,
) -> Option<Vec<&'a StreamRecord>> {
    if source_arn.is_empty() {
        return None;
    }
    let RawEvent::Stream(stream) = event else {
        return None;
    };
    if stream.event_source.as_deref() != Some(STREAM_ORIGIN)
        || stream.event_source_arn.as_deref() != Some(source_arn)
    {
        return None;
    }

    let mut partitions: Vec<_> = stream.records.iter().collect();
    partitions.sort_unstable_by(|(a, _), (b, _)| a.cmp(b));

    let records: Vec<&StreamRecord> = partitions
        .into_iter()
        .flat_map(|(_, records)| records)
        .filter(|record| record.topic.as_deref() == Some(topic))
        .collect();

    (!records.is_empty()).then_some(records)
}

/// The rule trigger, if `rule_arn` is among its resources.
pub fn rule<'a>(event: &'a RawEvent, rule_arn: &str) -> Option<&'a RuleEvent> {
    if rule_arn.is_empty() {
        return None;
    }
    let RawEvent::Rule(rule) = event else {
        return None;
    };

    (rule.source.as_deref() == Some(RULE_ORIGIN) && rule.resources.iter().any(|r| r == rule_arn))
        .then_some(rule)
}
