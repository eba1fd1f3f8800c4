//! Adapters Layer
//!
//! Reference implementations of the driven ports:
//! - `InMemorySubscriptionStore` - record table plus topic index
//! - `BusDeliverySink` - publishes results onto the shared delivery bus

pub mod bus_sink;
pub mod memory_store;

pub use bus_sink::BusDeliverySink;
pub use memory_store::InMemorySubscriptionStore;
