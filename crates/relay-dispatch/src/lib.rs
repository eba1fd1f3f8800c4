//! # Relay Dispatch
//!
//! Topic-keyed subscription dispatch: clients register long-lived queries
//! against a named event and argument set; when application code triggers
//! that event, every matching subscriber's query is re-executed against the
//! event payload and the result is pushed to the subscriber's channel.
//!
//! ## Architecture
//!
//! This crate follows Hexagonal Architecture (Ports & Adapters):
//!
//! - **Domain Layer** (`domain/`): Pure logic, no I/O
//!   - `ArgumentCoercer`: Normalizes raw arguments against a declared schema
//!   - `TopicKeyBuilder`: Derives deterministic topic keys
//!   - `EventRegistry`: Event schemas and their scope bindings
//!   - `DispatcherConfig`: Fault policy, fan-out limits, timeouts
//!
//! - **Ports Layer** (`ports/`): Trait definitions
//!   - `SubscriptionApi`: Driving port (subscribe / trigger / unsubscribe)
//!   - `SubscriptionStore`, `QueryExecutor`, `DeliverySink`: Driven ports
//!
//! - **Service Layer** (`service/`): Orchestration
//!   - `Dispatcher`: Implements `SubscriptionApi`
//!
//! - **Adapters Layer** (`adapters/`): Reference implementations
//!   - `InMemorySubscriptionStore`: Record table plus topic index
//!   - `BusDeliverySink`: Publishes results onto the shared delivery bus
//!
//! ## Invariants
//!
//! - Argument maps that differ only in key order, key spelling or
//!   default-value elision produce the same topic key.
//! - A channel is associated with at most one record; deleting it scrubs it
//!   from every topic it was indexed under.
//! - Triggering a topic with no indexed channels is a no-op.
//! - A scoped subscription is only reached by triggers carrying its scope.
//!
//! ## Usage Example
//!
//! ```ignore
//! use relay_dispatch::{
//!     ArgumentDefinition, ArgumentType, Dispatcher, EventRegistry, EventSchema,
//!     InMemorySubscriptionStore,
//! };
//! use std::sync::Arc;
//!
//! let registry = EventRegistry::new().with_event(
//!     EventSchema::new("payload")
//!         .argument(ArgumentDefinition::new("id", ArgumentType::Id.non_null())),
//! )?;
//!
//! let dispatcher = Dispatcher::new(
//!     Arc::new(registry),
//!     Arc::new(InMemorySubscriptionStore::new()),
//!     executor,
//!     sink,
//! );
//!
//! dispatcher.subscribe_event("payload", json!({"id": "100"}), "1".into(), query, json!({})).await?;
//! dispatcher.trigger_event("payload", json!({"id": "100"}), json!({"value": 1}), None).await?;
//! ```

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod domain;
pub mod error;
pub mod metrics;
pub mod ports;
pub mod service;

// Re-exports for convenience
pub use adapters::{BusDeliverySink, InMemorySubscriptionStore};
pub use domain::{
    ArgumentCoercer, ArgumentDefinition, ArgumentType, CoercedArguments, DispatcherConfig,
    DispatcherConfigBuilder, EnumType, EventRegistry, EventSchema, EventSubscription,
    FaultPolicy, InputObjectType, ScopeBinding, SubscriptionRecord, TopicKey, TopicKeyBuilder,
};
pub use error::{ArgumentError, ConfigError, SchemaError, StoreError, SubscribeError, TriggerError};
pub use metrics::{Metrics, MetricsRecorder, MetricsSnapshot, NoOpMetrics};
pub use ports::{
    DeliverySink, ExecutionRequest, QueryExecutor, SubscribeRequest, SubscriptionApi,
    SubscriptionStore, SubscriptionUpdate, TriggerReport, TriggerRequest,
};
pub use service::Dispatcher;
