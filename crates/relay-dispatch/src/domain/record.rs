//! Stored subscription records

use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared_types::{ChannelId, QueryDocument};
use std::collections::BTreeSet;

use crate::domain::coercion::CoercedArguments;
use crate::domain::topic::TopicKey;

/// One event a subscription listens on.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventSubscription {
    /// Event name.
    pub event: String,
    /// Coerced arguments the topic key was built from.
    pub arguments: CoercedArguments,
    /// Name of the scope binding, for scoped events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope_binding: Option<String>,
    /// Scope value extracted from the subscriber's context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<Value>,
    pub topic: TopicKey,
}

/// A subscriber registration, owned by the subscription store.
///
/// Immutable once written; re-subscribing under the same channel replaces it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionRecord {
    pub channel_id: ChannelId,
    pub query: QueryDocument,
    /// Caller-supplied context handed back to the executor on every trigger.
    pub context: Value,
    pub events: Vec<EventSubscription>,
    /// Creation time, milliseconds since the Unix epoch.
    pub created_at_ms: u64,
}

impl SubscriptionRecord {
    /// The distinct topic keys this record is indexed under.
    #[must_use]
    pub fn topics(&self) -> BTreeSet<TopicKey> {
        self.events.iter().map(|e| e.topic.clone()).collect()
    }

    /// The subscription entry for `event`, if the record listens on it.
    #[must_use]
    pub fn event(&self, event: &str) -> Option<&EventSubscription> {
        self.events.iter().find(|e| e.event == event)
    }
}
