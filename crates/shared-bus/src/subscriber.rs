//! # Delivery Subscriber
//!
//! Defines the receiving side of the delivery bus.

use crate::events::{ChannelFilter, Delivery};
use futures::stream::{self, BoxStream, StreamExt};
use shared_types::ChannelId;
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::{Arc, RwLock};
use std::task::{Context, Poll};
use thiserror::Error;
use tokio::sync::broadcast;
use tokio_stream::Stream;
use tracing::debug;

/// Errors from receiving operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// The delivery bus was closed.
    #[error("Delivery bus closed")]
    Closed,
}

/// A receiving handle for deliveries addressed to a set of channels.
///
/// When dropped, the channel listener counts are released.
pub struct ChannelSubscription {
    /// The broadcast receiver.
    receiver: broadcast::Receiver<Delivery>,

    /// Filter for this receiver.
    filter: ChannelFilter,

    /// Reference to listener tracking (for cleanup).
    listeners: Arc<RwLock<HashMap<ChannelId, usize>>>,
}

impl ChannelSubscription {
    /// Create a new receiving handle.
    pub(crate) fn new(
        receiver: broadcast::Receiver<Delivery>,
        filter: ChannelFilter,
        listeners: Arc<RwLock<HashMap<ChannelId, usize>>>,
    ) -> Self {
        Self {
            receiver,
            filter,
            listeners,
        }
    }

    /// Receive the next delivery that matches the filter.
    ///
    /// # Returns
    ///
    /// - `Some(delivery)` - The next matching delivery
    /// - `None` - The bus was dropped
    pub async fn recv(&mut self) -> Option<Delivery> {
        loop {
            let delivery = match self.receiver.recv().await {
                Ok(d) => d,
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    debug!(lagged = count, "Receiver lagged, some deliveries dropped");
                    continue;
                }
            };

            if self.filter.matches(&delivery) {
                return Some(delivery);
            }
        }
    }

    /// Try to receive the next delivery without blocking.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(delivery))` - A delivery was available and matched
    /// - `Ok(None)` - No delivery available (would block)
    /// - `Err(SubscriptionError::Closed)` - The bus was dropped
    pub fn try_recv(&mut self) -> Result<Option<Delivery>, SubscriptionError> {
        loop {
            let delivery = match self.receiver.try_recv() {
                Ok(d) => d,
                Err(broadcast::error::TryRecvError::Empty) => return Ok(None),
                Err(broadcast::error::TryRecvError::Closed) => {
                    return Err(SubscriptionError::Closed)
                }
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
            };

            if self.filter.matches(&delivery) {
                return Ok(Some(delivery));
            }
        }
    }

    /// Get the filter for this receiver.
    #[must_use]
    pub fn filter(&self) -> &ChannelFilter {
        &self.filter
    }
}

impl Drop for ChannelSubscription {
    fn drop(&mut self) {
        let Ok(mut listeners) = self.listeners.write() else {
            return;
        };

        for channel in &self.filter.channels {
            let Some(count) = listeners.get_mut(channel) else {
                continue;
            };
            *count = count.saturating_sub(1);
            if *count == 0 {
                listeners.remove(channel);
            }
        }
        debug!(channels = self.filter.channels.len(), "Delivery receiver dropped");
    }
}

/// A stream wrapper for receiving handles.
///
/// Implements `tokio_stream::Stream` for use with stream combinators.
pub struct DeliveryStream {
    filter: ChannelFilter,
    inner: BoxStream<'static, Delivery>,
}

impl DeliveryStream {
    /// Create a new delivery stream from a receiving handle.
    #[must_use]
    pub fn new(subscription: ChannelSubscription) -> Self {
        let filter = subscription.filter().clone();
        let inner = stream::unfold(subscription, |mut subscription| async move {
            let delivery = subscription.recv().await?;
            Some((delivery, subscription))
        })
        .boxed();

        Self { filter, inner }
    }

    /// Get the filter for this stream.
    #[must_use]
    pub fn filter(&self) -> &ChannelFilter {
        &self.filter
    }
}

impl Stream for DeliveryStream {
    type Item = Delivery;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}
