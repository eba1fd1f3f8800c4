//! # Error Types
//!
//! Defines error types used across crates.

use thiserror::Error;

/// An unrecoverable fault raised while executing a stored query.
///
/// Executors return this for programming-level errors in field resolution.
/// Unlike [`crate::QueryError`], a fault is never embedded in a delivered
/// result; it escalates to whoever triggered the event.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("execution fault: {message}")]
pub struct ExecutionFault {
    /// Description of the fault.
    pub message: String,
}

impl ExecutionFault {
    /// Create a fault with the given description.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
