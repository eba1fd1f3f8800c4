//! Outbound Ports (Driven Ports)
//!
//! These traits define what the dispatcher needs from its collaborators:
//! a subscription store, a query executor and a delivery sink.

use async_trait::async_trait;
use serde_json::Value;
use shared_types::{ChannelId, ExecutionFault, ExecutionResult, QueryDocument, QueryError};
use std::collections::BTreeSet;

use crate::domain::{CoercedArguments, SubscriptionRecord, TopicKey};
use crate::error::StoreError;

/// Subscription persistence (Driven Port)
///
/// Holds one record per channel plus a topic key to channel index.
/// Implementations must make `channels_for` atomic with respect to
/// concurrent `write`/`delete` on the same topic.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Upsert `record` and index its channel under every key in `topics`.
    ///
    /// Replaces any prior record and topic memberships for the channel.
    async fn write(
        &self,
        record: SubscriptionRecord,
        topics: BTreeSet<TopicKey>,
    ) -> Result<(), StoreError>;

    /// Snapshot of the channels indexed under `topic`, in insertion order.
    async fn channels_for(&self, topic: &TopicKey) -> Result<Vec<ChannelId>, StoreError>;

    /// Read a channel's record. Absent channels return `StoreError::NotFound`.
    async fn read(&self, channel: &ChannelId) -> Result<SubscriptionRecord, StoreError>;

    /// Remove a channel's record and scrub it from every topic.
    ///
    /// Idempotent: deleting an absent channel succeeds. Returns whether a
    /// record was actually removed.
    async fn delete(&self, channel: &ChannelId) -> Result<bool, StoreError>;

    /// Topics a channel is indexed under (empty if absent).
    async fn topics_for(&self, channel: &ChannelId) -> Result<BTreeSet<TopicKey>, StoreError>;

    /// Number of stored records.
    async fn len(&self) -> Result<usize, StoreError>;
}

/// Everything the executor needs to re-run one stored query.
#[derive(Clone, Copy, Debug)]
pub struct ExecutionRequest<'a> {
    pub record: &'a SubscriptionRecord,
    /// The triggered event.
    pub event: &'a str,
    /// Coerced trigger arguments.
    pub arguments: &'a CoercedArguments,
    /// The trigger payload, used as the root value.
    pub root_value: &'a Value,
}

impl<'a> ExecutionRequest<'a> {
    pub fn query(&self) -> &'a QueryDocument {
        &self.record.query
    }

    pub fn operation_name(&self) -> Option<&'a str> {
        self.record.query.operation_name.as_deref()
    }

    pub fn variables(&self) -> &'a serde_json::Map<String, Value> {
        &self.record.query.variables
    }

    pub fn context(&self) -> &'a Value {
        &self.record.context
    }

    pub fn channel(&self) -> &'a ChannelId {
        &self.record.channel_id
    }
}

/// What the dispatcher should do with one channel after execution.
#[derive(Clone, Debug, PartialEq)]
pub enum SubscriptionUpdate {
    /// Deliver this result.
    Deliver(ExecutionResult),
    /// Nothing to deliver for this trigger.
    Skip,
    /// Deliver the optional final result, then unsubscribe the channel.
    Complete(Option<ExecutionResult>),
}

/// Query execution engine (Driven Port)
///
/// Handled query-level errors belong in the returned result's error list.
/// `Err` is reserved for unrecoverable faults.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Subscribe-time structural check of a stored query.
    async fn validate(&self, _record: &SubscriptionRecord) -> Result<(), Vec<QueryError>> {
        Ok(())
    }

    /// Re-execute a stored query against a trigger payload.
    async fn execute(
        &self,
        request: ExecutionRequest<'_>,
    ) -> Result<SubscriptionUpdate, ExecutionFault>;
}

/// Result delivery (Driven Port)
///
/// Fire-and-forget: reaching the remote client is the sink's concern.
#[async_trait]
pub trait DeliverySink: Send + Sync {
    async fn deliver(&self, channel: &ChannelId, result: ExecutionResult);
}
