//! Domain Layer - Pure dispatch logic
//!
//! This layer contains:
//! - Argument schema and coercion
//! - Topic key derivation
//! - Event schemas, scope bindings and the event registry
//! - Subscription records
//! - Dispatcher configuration
//!
//! RULES:
//! - No I/O operations
//! - No async code
//! - Pure functions where possible

pub mod arguments;
pub mod coercion;
pub mod config;
pub mod event;
pub mod record;
pub mod topic;

pub use arguments::{
    is_valid_name, ArgumentDefinition, ArgumentType, EnumType, InputObjectType,
};
pub use coercion::{ArgumentCoercer, CoercedArguments};
pub use config::{DispatcherConfig, DispatcherConfigBuilder, FaultPolicy};
pub use event::{EventRegistry, EventSchema, ScopeBinding};
pub use record::{EventSubscription, SubscriptionRecord};
pub use topic::{TopicKey, TopicKeyBuilder};
