//! Source bindings and their per-event invocations.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use crate::batch::{self, Strategy};
use crate::classify;
use crate::compensation::Compensator;
use crate::error::{DispatchError, Result};
use crate::event::{NotificationMessage, QueueMessage, RawEvent, StreamRecord};
use crate::handler::{RecordHandler, TriggerHandler};

/// Upstream source kind of a binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Notification,
    Queue,
    OrderedQueue,
    LogStream,
    ScheduledRule,
    GenericRule,
}

/// One registration: source identifier, handler and execution strategy.
///
/// An empty or non-matching identifier leaves the binding inert.
pub enum Binding {
    Notification {
        topic_arn: String,
        handler: Arc<dyn RecordHandler<NotificationMessage>>,
    },
    Queue {
        queue_arn: String,
        strategy: Strategy,
        handler: Arc<dyn RecordHandler<QueueMessage>>,
    },
    Stream {
        source_arn: String,
        topic: String,
        strategy: Strategy,
        handler: Arc<dyn RecordHandler<StreamRecord>>,
    },
    ScheduledRule {
        rule_arn: String,
        handler: Arc<dyn TriggerHandler>,
    },
    GenericRule {
        rule_arn: String,
        handler: Arc<dyn RecordHandler<Value>>,
    },
}

impl Binding {
    pub fn kind(&self) -> SourceKind {
        match self {
            Binding::Notification { .. } => SourceKind::Notification,
            Binding::Queue {
                strategy: Strategy::Sequential,
                ..
            } => SourceKind::OrderedQueue,
            Binding::Queue { .. } => SourceKind::Queue,
            Binding::Stream { .. } => SourceKind::LogStream,
            Binding::ScheduledRule { .. } => SourceKind::ScheduledRule,
            Binding::GenericRule { .. } => SourceKind::GenericRule,
        }
    }

    /// The source identifier this binding filters on.
    pub fn source(&self) -> &str {
        match self {
            Binding::Notification { topic_arn, .. } => topic_arn,
            Binding::Queue { queue_arn, .. } => queue_arn,
            Binding::Stream { source_arn, .. } => source_arn,
            Binding::ScheduledRule { rule_arn, .. } | Binding::GenericRule { rule_arn, .. } => {
                rule_arn
            }
        }
    }

    /// Batch strategy; `None` for single-invocation sources.
    pub fn strategy(&self) -> Option<Strategy> {
        match self {
            Binding::Queue { strategy, .. } | Binding::Stream { strategy, .. } => Some(*strategy),
            _ => None,
        }
    }

    /// Classify `event` for this binding.
    ///
    /// `None` means the binding does not apply. Records are copied out of
    /// the event so handler futures can own them.
    pub(crate) fn prepare(&self, event: &RawEvent) -> Option<Invocation<'_>> {
        match self {
            Binding::Notification { topic_arn, handler } => {
                let message = classify::notification(event, topic_arn)?;
                Some(Invocation::Notification {
                    source: topic_arn,
                    handler,
                    message: Arc::new(message.clone()),
                })
            }
            Binding::Queue {
                queue_arn,
                strategy,
                handler,
            } => {
                let records = classify::queue_batch(event, queue_arn)?;
                Some(Invocation::Queue {
                    source: queue_arn,
                    strategy: *strategy,
                    handler,
                    records: records.iter().cloned().map(Arc::new).collect(),
                })
            }
            Binding::Stream {
                source_arn,
                topic,
                strategy,
                handler,
            } => {
                let records = classify::stream_records(event, source_arn, topic)?;
                Some(Invocation::Stream {
                    source: source_arn,
                    strategy: *strategy,
                    handler,
                    records: records.into_iter().cloned().map(Arc::new).collect(),
                })
            }
            Binding::ScheduledRule { rule_arn, handler } => {
                classify::rule(event, rule_arn)?;
                Some(Invocation::ScheduledRule {
                    source: rule_arn,
                    handler,
                })
            }
            Binding::GenericRule { rule_arn, handler } => {
                let rule = classify::rule(event, rule_arn)?;
                Some(Invocation::GenericRule {
                    source: rule_arn,
                    handler,
                    detail: Arc::new(rule.detail.clone().unwrap_or(Value::Null)),
                })
            }
        }
    }
}

impl std::fmt::Debug for Binding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Binding")
            .field("kind", &self.kind())
            .field("source", &self.source())
            .field("strategy", &self.strategy())
            .finish()
    }
}

/// A binding that matched an event, with its records extracted.
pub(crate) enum Invocation<'a> {
    Notification {
        source: &'a str,
        handler: &'a Arc<dyn RecordHandler<NotificationMessage>>,
        message: Arc<NotificationMessage>,
    },
    Queue {
        source: &'a str,
        strategy: Strategy,
        handler: &'a Arc<dyn RecordHandler<QueueMessage>>,
        records: Vec<Arc<QueueMessage>>,
    },
    Stream {
        source: &'a str,
        strategy: Strategy,
        handler: &'a Arc<dyn RecordHandler<StreamRecord>>,
        records: Vec<Arc<StreamRecord>>,
    },
    ScheduledRule {
        source: &'a str,
        handler: &'a Arc<dyn TriggerHandler>,
    },
    GenericRule {
        source: &'a str,
        handler: &'a Arc<dyn RecordHandler<Value>>,
        detail: Arc<Value>,
    },
}

impl Invocation<'_> {
    pub(crate) async fn run(self, compensator: Option<&dyn Compensator>) -> Result<()> {
        match self {
            Invocation::Notification {
                source,
                handler,
                message,
            } => {
                info!(source = %source, message_id = %message.message_id, "Dispatching notification");
                handler.handle(message).await.map_err(|cause| DispatchError::Handler {
                    source_arn: source.to_string(),
                    cause,
                })
            }
            Invocation::Queue {
                source,
                strategy,
                handler,
                records,
            } => {
                info!(source = %source, ?strategy, records = records.len(), "Dispatching queue batch");
                let outcome = batch::run(strategy, records, handler).await;
                batch::settle(outcome, source, compensator).await
            }
            Invocation::Stream {
                source,
                strategy,
                handler,
                records,
            } => {
                info!(source = %source, ?strategy, records = records.len(), "Dispatching stream batch");
                let outcome = batch::run(strategy, records, handler).await;
                batch::settle(outcome, source, None).await
            }
            Invocation::ScheduledRule { source, handler } => {
                info!(source = %source, "Dispatching scheduled rule");
                handler.trigger().await.map_err(|cause| DispatchError::Handler {
                    source_arn: source.to_string(),
                    cause,
                })
            }
            Invocation::GenericRule {
                source,
                handler,
                detail,
            } => {
                info!(source = %source, "Dispatching rule event");
                handler.handle(detail).await.map_err(|cause| DispatchError::Handler {
                    source_arn: source.to_string(),
                    cause,
                })
            }
        }
    }
}
