//! # Deliveries
//!
//! Defines the envelope that flows through the bus and the filter a
//! receiver uses to pick out its own channels.

use serde::{Deserialize, Serialize};
use shared_types::{ChannelId, ExecutionResult};
use std::collections::HashSet;

/// One execution result addressed to one subscriber channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delivery {
    /// Destination channel.
    pub channel: ChannelId,
    /// Result of re-executing the channel's stored query.
    pub result: ExecutionResult,
    /// Bus-wide publish sequence number.
    pub sequence: u64,
}

/// Filter for receiving deliveries addressed to specific channels.
#[derive(Debug, Clone, Default)]
pub struct ChannelFilter {
    /// Channels to include. Empty means all channels.
    pub channels: HashSet<ChannelId>,
}

impl ChannelFilter {
    /// Create a filter that accepts every delivery.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Create a filter for a single channel.
    #[must_use]
    pub fn channel(channel: ChannelId) -> Self {
        Self {
            channels: HashSet::from([channel]),
        }
    }

    /// Create a filter for a set of channels.
    #[must_use]
    pub fn channels<I>(channels: I) -> Self
    where
        I: IntoIterator<Item = ChannelId>,
    {
        Self {
            channels: channels.into_iter().collect(),
        }
    }

    /// Check if a delivery matches this filter.
    #[must_use]
    pub fn matches(&self, delivery: &Delivery) -> bool {
        self.channels.is_empty() || self.channels.contains(&delivery.channel)
    }
}
