//! Event router.
//!
//! Holds an immutable set of bindings built once at cold start. Each
//! invocation classifies the raw event against every binding and runs the
//! ones that apply, according to the [`RoutingPolicy`].

use std::sync::Arc;

use futures::future::join_all;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::batch::Strategy;
use crate::compensation::Compensator;
use crate::error::{DispatchError, Result};
use crate::event::{NotificationMessage, QueueMessage, RawEvent, StreamRecord};
use crate::handler::{RecordHandler, TriggerHandler};

mod binding;

pub use binding::{Binding, SourceKind};

/// How the router resolves an event matching several bindings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingPolicy {
    /// Every applicable binding runs, concurrently. All are awaited before
    /// the invocation resolves.
    #[default]
    FanOut,
    /// Only the first applicable binding, in registration order, runs.
    FirstMatch,
}

/// Errors building a router.
#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    #[error("queue binding for {0} requires a compensator")]
    MissingCompensator(String),
}

/// Dispatch entrypoint.
pub struct Router {
    bindings: Vec<Binding>,
    policy: RoutingPolicy,
    compensator: Option<Arc<dyn Compensator>>,
}

impl Router {
    pub fn builder() -> RouterBuilder {
        RouterBuilder::default()
    }

    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    pub fn policy(&self) -> RoutingPolicy {
        self.policy
    }

    /// Route one raw event.
    ///
    /// An event matching no binding resolves successfully. Otherwise the
    /// invocation resolves only after every started binding has settled;
    /// a single failure is returned as-is, several as
    /// [`DispatchError::Multiple`].
    pub async fn handle(&self, event: &RawEvent) -> Result<()> {
        let invocations: Vec<_> = match self.policy {
            RoutingPolicy::FanOut => self
                .bindings
                .iter()
                .filter_map(|binding| binding.prepare(event))
                .collect(),
            RoutingPolicy::FirstMatch => self
                .bindings
                .iter()
                .find_map(|binding| binding.prepare(event))
                .into_iter()
                .collect(),
        };

        if invocations.is_empty() {
            debug!(kind = event.kind(), "No binding matched event");
            return Ok(());
        }

        let compensator = self.compensator.as_deref();
        let mut errors: Vec<DispatchError> =
            join_all(invocations.into_iter().map(|inv| inv.run(compensator)))
                .await
                .into_iter()
                .filter_map(|result| result.err())
                .collect();

        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            n => {
                warn!(failed = n, "Multiple bindings failed");
                Err(DispatchError::Multiple(errors))
            }
        }
    }

    /// Classify a JSON payload and route it.
    pub async fn handle_value(&self, value: Value) -> Result<()> {
        self.handle(&RawEvent::from_value(value)).await
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("bindings", &self.bindings)
            .field("policy", &self.policy)
            .field("compensator", &self.compensator.is_some())
            .finish()
    }
}

/// Collects bindings in registration order.
#[derive(Default)]
pub struct RouterBuilder {
    bindings: Vec<Binding>,
    policy: RoutingPolicy,
    compensator: Option<Arc<dyn Compensator>>,
}

impl RouterBuilder {
    /// One handler call per notification published to `topic_arn`.
    pub fn notification(
        self,
        topic_arn: impl Into<String>,
        handler: impl RecordHandler<NotificationMessage> + 'static,
    ) -> Self {
        self.binding(Binding::Notification {
            topic_arn: topic_arn.into(),
            handler: Arc::new(handler),
        })
    }

    /// Unordered queue: records run concurrently.
    pub fn queue(
        self,
        queue_arn: impl Into<String>,
        handler: impl RecordHandler<QueueMessage> + 'static,
    ) -> Self {
        self.binding(Binding::Queue {
            queue_arn: queue_arn.into(),
            strategy: Strategy::Concurrent,
            handler: Arc::new(handler),
        })
    }

    /// FIFO queue: records run one at a time, stopping at the first failure.
    pub fn ordered_queue(
        self,
        queue_arn: impl Into<String>,
        handler: impl RecordHandler<QueueMessage> + 'static,
    ) -> Self {
        self.binding(Binding::Queue {
            queue_arn: queue_arn.into(),
            strategy: Strategy::Sequential,
            handler: Arc::new(handler),
        })
    }

    /// Log stream records of `topic`, sequential within the batch.
    pub fn stream(
        self,
        source_arn: impl Into<String>,
        topic: impl Into<String>,
        handler: impl RecordHandler<StreamRecord> + 'static,
    ) -> Self {
        self.binding(Binding::Stream {
            source_arn: source_arn.into(),
            topic: topic.into(),
            strategy: Strategy::Sequential,
            handler: Arc::new(handler),
        })
    }

    /// Zero-argument trigger fired by a schedule rule.
    pub fn scheduled_rule(
        self,
        rule_arn: impl Into<String>,
        handler: impl TriggerHandler + 'static,
    ) -> Self {
        self.binding(Binding::ScheduledRule {
            rule_arn: rule_arn.into(),
            handler: Arc::new(handler),
        })
    }

    /// Rule handler receiving the event `detail`.
    pub fn generic_rule(
        self,
        rule_arn: impl Into<String>,
        handler: impl RecordHandler<Value> + 'static,
    ) -> Self {
        self.binding(Binding::GenericRule {
            rule_arn: rule_arn.into(),
            handler: Arc::new(handler),
        })
    }

    pub fn binding(mut self, binding: Binding) -> Self {
        self.bindings.push(binding);
        self
    }

    pub fn policy(mut self, policy: RoutingPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn compensator(mut self, compensator: Arc<dyn Compensator>) -> Self {
        self.compensator = Some(compensator);
        self
    }

    /// Freeze the binding set.
    ///
    /// Fails if a queue binding with a non-empty identifier has no
    /// compensator to acknowledge fulfilled records.
    pub fn build(self) -> std::result::Result<Router, RouterError> {
        if self.compensator.is_none() {
            let needs_compensator = self
                .bindings
                .iter()
                .find(|b| matches!(b, Binding::Queue { .. }) && !b.source().is_empty());
            if let Some(binding) = needs_compensator {
                return Err(RouterError::MissingCompensator(binding.source().to_string()));
            }
        }

        Ok(Router {
            bindings: self.bindings,
            policy: self.policy,
            compensator: self.compensator,
        })
    }
}
