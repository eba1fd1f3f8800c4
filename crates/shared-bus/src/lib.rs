//! # Shared Bus - Delivery Bus for Subscription Results
//!
//! Carries execution results from the dispatcher to the connection handlers
//! that own subscriber channels.
//!
//! ```text
//! ┌──────────────┐                    ┌──────────────────┐
//! │  Dispatcher  │                    │ Connection task  │
//! │              │    publish()       │  (channel "1")   │
//! │              │ ──────┐            │                  │
//! └──────────────┘       │            └──────────────────┘
//!                        ▼                    ↑
//!                  ┌──────────────┐          │
//!                  │ Delivery Bus │          │
//!                  │              │ ─────────┘
//!                  └──────────────┘  subscribe_channel()
//! ```
//!
//! Every connection handler receives only the deliveries addressed to the
//! channels in its [`ChannelFilter`]. The bus is fire-and-forget: a delivery
//! published while nobody listens on its channel is dropped.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod events;
pub mod publisher;
pub mod subscriber;

// Re-export main types
pub use events::{ChannelFilter, Delivery};
pub use publisher::{DeliveryPublisher, InMemoryDeliveryBus};
pub use subscriber::{ChannelSubscription, DeliveryStream, SubscriptionError};

/// Maximum deliveries to buffer per receiver before lagging receivers skip.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;
