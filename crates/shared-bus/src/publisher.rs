//! # Delivery Publisher
//!
//! Defines the publishing side of the delivery bus.

use crate::events::{ChannelFilter, Delivery};
use crate::subscriber::{ChannelSubscription, DeliveryStream};
use crate::DEFAULT_CHANNEL_CAPACITY;
use async_trait::async_trait;
use shared_types::{ChannelId, ExecutionResult};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;
use tracing::debug;

/// Trait for publishing results to subscriber channels.
#[async_trait]
pub trait DeliveryPublisher: Send + Sync {
    /// Publish a result addressed to `channel`.
    ///
    /// # Returns
    ///
    /// The number of active receivers the delivery was handed to. Receivers
    /// filter by channel, so this is an upper bound on actual consumers.
    async fn publish(&self, channel: ChannelId, result: ExecutionResult) -> usize;

    /// Get the total number of deliveries published.
    fn deliveries_published(&self) -> u64;
}

/// In-memory implementation of the delivery bus.
///
/// Uses `tokio::sync::broadcast` for multi-producer, multi-consumer semantics.
/// Suitable for single-process deployments; a distributed deployment would
/// publish to an external broker instead.
pub struct InMemoryDeliveryBus {
    /// Broadcast sender for deliveries.
    sender: broadcast::Sender<Delivery>,

    /// Active receiver count by channel.
    listeners: Arc<RwLock<HashMap<ChannelId, usize>>>,

    /// Next delivery sequence number.
    sequence: AtomicU64,

    /// Total deliveries published.
    deliveries_published: AtomicU64,

    /// Channel capacity.
    capacity: usize,
}

impl InMemoryDeliveryBus {
    /// Create a new in-memory delivery bus with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a new in-memory delivery bus with specified capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            listeners: Arc::new(RwLock::new(HashMap::new())),
            sequence: AtomicU64::new(0),
            deliveries_published: AtomicU64::new(0),
            capacity,
        }
    }

    /// Receive deliveries matching a filter.
    ///
    /// Returns a `ChannelSubscription` handle; dropping it stops delivery.
    #[must_use]
    pub fn subscribe(&self, filter: ChannelFilter) -> ChannelSubscription {
        let receiver = self.sender.subscribe();

        if let Ok(mut listeners) = self.listeners.write() {
            for channel in &filter.channels {
                *listeners.entry(channel.clone()).or_insert(0) += 1;
            }
        }

        debug!(channels = filter.channels.len(), "New delivery receiver created");

        ChannelSubscription::new(receiver, filter, self.listeners.clone())
    }

    /// Receive deliveries for a single channel.
    #[must_use]
    pub fn subscribe_channel(&self, channel: ChannelId) -> ChannelSubscription {
        self.subscribe(ChannelFilter::channel(channel))
    }

    /// Get a stream of deliveries matching a filter.
    #[must_use]
    pub fn delivery_stream(&self, filter: ChannelFilter) -> DeliveryStream {
        DeliveryStream::new(self.subscribe(filter))
    }

    /// Get the number of active receivers.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Get the number of receivers explicitly listening on `channel`.
    #[must_use]
    pub fn listener_count(&self, channel: &ChannelId) -> usize {
        self.listeners
            .read()
            .map(|listeners| listeners.get(channel).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    /// Get the channel capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for InMemoryDeliveryBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DeliveryPublisher for InMemoryDeliveryBus {
    async fn publish(&self, channel: ChannelId, result: ExecutionResult) -> usize {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);

        // Always increment counter (delivery was attempted)
        self.deliveries_published.fetch_add(1, Ordering::Relaxed);

        let delivery = Delivery {
            channel,
            result,
            sequence,
        };

        match self.sender.send(delivery) {
            Ok(receiver_count) => {
                debug!(sequence, receivers = receiver_count, "Delivery published");
                receiver_count
            }
            Err(broadcast::error::SendError(dropped)) => {
                // No receivers; the client is gone or not yet listening
                debug!(
                    channel = %dropped.channel,
                    sequence,
                    "Delivery dropped (no receivers)"
                );
                0
            }
        }
    }

    fn deliveries_published(&self) -> u64 {
        self.deliveries_published.load(Ordering::Relaxed)
    }
}
