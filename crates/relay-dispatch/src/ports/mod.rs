//! Ports Layer
//!
//! Defines the interfaces (traits) for:
//! - Driving Ports (inbound) - API for connection handlers and application code
//! - Driven Ports (outbound) - Store, executor and delivery collaborators

pub mod inbound;
pub mod outbound;

pub use inbound::{SubscribeRequest, SubscriptionApi, TriggerReport, TriggerRequest};
pub use outbound::{
    DeliverySink, ExecutionRequest, QueryExecutor, SubscriptionStore, SubscriptionUpdate,
};
