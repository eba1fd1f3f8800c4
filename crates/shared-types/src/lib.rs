//! # Shared Types Crate
//!
//! This crate contains the values that cross crate boundaries in the relay:
//! the dispatcher hands them to query executors and delivery sinks, and the
//! delivery bus carries them to subscribed clients.
//!
//! ## Design Principles
//!
//! - **Channels are opaque**: a `ChannelId` identifies one live subscriber
//!   connection and carries no structure the relay depends on.
//! - **Handled errors are data**: query-level failures travel inside
//!   `ExecutionResult::errors`; only unrecoverable faults use `Err`.

pub mod entities;
pub mod errors;

pub use entities::*;
pub use errors::*;
