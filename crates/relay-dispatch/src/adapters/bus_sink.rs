//! Delivery sink backed by the shared delivery bus
//!
//! Connection handlers hold a `ChannelSubscription` for their channel; the
//! dispatcher publishes results through this sink.

use crate::ports::outbound::DeliverySink;
use async_trait::async_trait;
use shared_bus::{DeliveryPublisher, InMemoryDeliveryBus};
use shared_types::{ChannelId, ExecutionResult};
use std::sync::Arc;
use tracing::debug;

/// Publishes every result onto an [`InMemoryDeliveryBus`].
#[derive(Clone)]
pub struct BusDeliverySink {
    bus: Arc<InMemoryDeliveryBus>,
}

impl BusDeliverySink {
    pub fn new(bus: Arc<InMemoryDeliveryBus>) -> Self {
        Self { bus }
    }

    /// The underlying bus, for handing out channel subscriptions.
    pub fn bus(&self) -> &Arc<InMemoryDeliveryBus> {
        &self.bus
    }
}

#[async_trait]
impl DeliverySink for BusDeliverySink {
    async fn deliver(&self, channel: &ChannelId, result: ExecutionResult) {
        if self.bus.listener_count(channel) == 0 {
            debug!(channel = %channel, "No listener on channel; delivery will be dropped");
        }
        self.bus.publish(channel.clone(), result).await;
    }
}
