//! Service Layer
//!
//! Contains the dispatcher that orchestrates domain logic and coordinates
//! with the store, executor and sink via ports.

pub mod dispatcher;

pub use dispatcher::Dispatcher;
