//! In-memory Subscription Store
//!
//! Implements the `SubscriptionStore` port with an owning record table and a
//! secondary topic index. Each record keeps the topics it was indexed under,
//! so rewrites and deletes scrub exactly those entries.

use crate::domain::{SubscriptionRecord, TopicKey};
use crate::error::StoreError;
use crate::ports::outbound::SubscriptionStore;
use async_trait::async_trait;
use indexmap::IndexSet;
use parking_lot::RwLock;
use shared_types::ChannelId;
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

struct StoredSubscription {
    record: SubscriptionRecord,
    topics: BTreeSet<TopicKey>,
}

#[derive(Default)]
struct StoreState {
    records: HashMap<ChannelId, StoredSubscription>,
    /// topic -> channels, in insertion order
    topics: HashMap<TopicKey, IndexSet<ChannelId>>,
}

impl StoreState {
    fn unindex(&mut self, channel: &ChannelId, topics: &BTreeSet<TopicKey>) {
        for topic in topics {
            if let Some(channels) = self.topics.get_mut(topic) {
                channels.shift_remove(channel);
                if channels.is_empty() {
                    self.topics.remove(topic);
                }
            }
        }
    }
}

/// In-memory subscription store.
///
/// All state sits behind one lock, so readers observe either the complete
/// before or the complete after of any write or delete.
pub struct InMemorySubscriptionStore {
    state: RwLock<StoreState>,
}

impl InMemorySubscriptionStore {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(StoreState::default()),
        }
    }

    /// Number of topic keys with at least one channel.
    pub fn topic_count(&self) -> usize {
        self.state.read().topics.len()
    }
}

impl Default for InMemorySubscriptionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SubscriptionStore for InMemorySubscriptionStore {
    async fn write(
        &self,
        record: SubscriptionRecord,
        topics: BTreeSet<TopicKey>,
    ) -> Result<(), StoreError> {
        let channel = record.channel_id.clone();
        let mut state = self.state.write();

        if let Some(previous) = state.records.remove(&channel) {
            state.unindex(&channel, &previous.topics);
        }

        for topic in &topics {
            state
                .topics
                .entry(topic.clone())
                .or_default()
                .insert(channel.clone());
        }

        debug!(channel = %channel, topics = topics.len(), "Stored subscription");
        state
            .records
            .insert(channel, StoredSubscription { record, topics });
        Ok(())
    }

    async fn channels_for(&self, topic: &TopicKey) -> Result<Vec<ChannelId>, StoreError> {
        Ok(self
            .state
            .read()
            .topics
            .get(topic)
            .map(|channels| channels.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn read(&self, channel: &ChannelId) -> Result<SubscriptionRecord, StoreError> {
        self.state
            .read()
            .records
            .get(channel)
            .map(|stored| stored.record.clone())
            .ok_or_else(|| StoreError::NotFound(channel.clone()))
    }

    async fn delete(&self, channel: &ChannelId) -> Result<bool, StoreError> {
        let mut state = self.state.write();
        match state.records.remove(channel) {
            Some(previous) => {
                state.unindex(channel, &previous.topics);
                debug!(channel = %channel, "Deleted subscription");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn topics_for(&self, channel: &ChannelId) -> Result<BTreeSet<TopicKey>, StoreError> {
        Ok(self
            .state
            .read()
            .records
            .get(channel)
            .map(|stored| stored.topics.clone())
            .unwrap_or_default())
    }

    async fn len(&self) -> Result<usize, StoreError> {
        Ok(self.state.read().records.len())
    }
}
