//! Inbound Ports (Driving Ports)
//!
//! The API that connection handlers and application code use to register
//! subscriptions and announce events.

use async_trait::async_trait;
use serde_json::Value;
use shared_types::{ChannelId, ExecutionFault, QueryDocument};

use crate::domain::{SubscriptionRecord, TopicKey};
use crate::error::{SubscribeError, TriggerError};

/// A request to register one channel's subscription.
#[derive(Clone, Debug)]
pub struct SubscribeRequest {
    pub channel: ChannelId,
    pub query: QueryDocument,
    /// Context data handed to the executor and read by scope bindings.
    pub context: Value,
    /// `(event name, raw arguments)` pairs the subscription listens on.
    pub events: Vec<(String, Value)>,
}

impl SubscribeRequest {
    pub fn new(channel: impl Into<ChannelId>, query: QueryDocument) -> Self {
        Self {
            channel: channel.into(),
            query,
            context: Value::Null,
            events: Vec::new(),
        }
    }

    /// Builder-style method to set the context
    #[must_use]
    pub fn context(mut self, context: Value) -> Self {
        self.context = context;
        self
    }

    /// Builder-style method to listen on an event; may be repeated
    #[must_use]
    pub fn event(mut self, name: impl Into<String>, arguments: Value) -> Self {
        self.events.push((name.into(), arguments));
        self
    }
}

/// An event announcement.
#[derive(Clone, Debug)]
pub struct TriggerRequest {
    pub event: String,
    pub arguments: Value,
    /// Root value for re-execution.
    pub payload: Value,
    /// Audience partition; ignored for events without a scope binding.
    pub scope: Option<Value>,
}

impl TriggerRequest {
    pub fn new(event: impl Into<String>, arguments: Value, payload: Value) -> Self {
        Self {
            event: event.into(),
            arguments,
            payload,
            scope: None,
        }
    }

    /// Builder-style method to set the scope
    #[must_use]
    pub fn scope(mut self, scope: Value) -> Self {
        self.scope = Some(scope);
        self
    }
}

/// Outcome of one trigger's fan-out.
#[derive(Clone, Debug, PartialEq)]
pub struct TriggerReport {
    pub topic: TopicKey,
    /// Channels indexed under the topic when the trigger began
    pub matched: usize,
    /// Results handed to the delivery sink
    pub delivered: usize,
    /// Executions that asked for no delivery
    pub skipped: usize,
    /// Channels unsubscribed after a final result
    pub completed: usize,
    /// Channels deleted between enumeration and read
    pub missing: usize,
    /// Faults isolated under `FaultPolicy::IsolateAndContinue`
    pub faults: Vec<(ChannelId, ExecutionFault)>,
}

impl TriggerReport {
    pub fn empty(topic: TopicKey) -> Self {
        Self {
            topic,
            matched: 0,
            delivered: 0,
            skipped: 0,
            completed: 0,
            missing: 0,
            faults: Vec::new(),
        }
    }
}

/// Primary dispatch API (Driving Port)
#[async_trait]
pub trait SubscriptionApi: Send + Sync {
    /// Register a subscription. Nothing is stored unless every step succeeds.
    async fn subscribe(
        &self,
        request: SubscribeRequest,
    ) -> Result<SubscriptionRecord, SubscribeError>;

    /// Announce an event and fan out to matching channels.
    async fn trigger(&self, request: TriggerRequest) -> Result<TriggerReport, TriggerError>;

    /// Remove a channel. Always succeeds.
    async fn unsubscribe(&self, channel: &ChannelId);
}
