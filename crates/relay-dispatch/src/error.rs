//! Error types for the dispatch subsystem

use shared_types::{ChannelId, ExecutionFault, QueryError};
use std::time::Duration;
use thiserror::Error;

/// Caller-input errors raised while coercing raw arguments.
///
/// Surfaced synchronously to the caller of `subscribe`/`trigger`; never
/// delivered to a client channel.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArgumentError {
    #[error("Unknown argument: {path}")]
    UnknownArgument { path: String },

    #[error("Cannot coerce argument {path}: {reason}")]
    Coercion { path: String, reason: String },
}

impl ArgumentError {
    /// Dotted path of the offending argument.
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Self::UnknownArgument { path } | Self::Coercion { path, .. } => path,
        }
    }
}

/// Errors raised while registering event schemas.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("Invalid name: {0:?}")]
    InvalidName(String),

    #[error("Duplicate argument {argument} on {owner}")]
    DuplicateArgument { owner: String, argument: String },

    #[error("Argument {argument} on {owner} has alias {alias:?}, which already names {existing}")]
    AliasCollision {
        owner: String,
        argument: String,
        alias: String,
        existing: String,
    },

    #[error("Invalid default for {event}: {source}")]
    InvalidDefault {
        event: String,
        #[source]
        source: ArgumentError,
    },

    #[error("Scope binding {0:?} has an empty context path")]
    EmptyScopePath(String),
}

/// Dispatcher configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    InvalidParameters(String),
}

/// Errors from subscription store backends.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Channel not found: {0}")]
    NotFound(ChannelId),

    #[error("Store backend error: {0}")]
    Backend(String),
}

/// Errors returned from `subscribe`. No partial state is committed.
#[derive(Debug, Error)]
pub enum SubscribeError {
    #[error("Unknown event: {0}")]
    UnknownEvent(String),

    #[error(transparent)]
    Arguments(#[from] ArgumentError),

    #[error("Event {event} is scoped by {binding} but the context has no value for it")]
    MissingScope { event: String, binding: String },

    #[error("Invalid stored query: {}", join_messages(.0))]
    InvalidQuery(Vec<QueryError>),

    #[error("Subscription names no events")]
    NoEvents,

    #[error("Too many events in one subscription: {count} > {max}")]
    TooManyEvents { count: usize, max: usize },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Errors returned from `trigger`.
#[derive(Debug, Error)]
pub enum TriggerError {
    #[error("Unknown event: {0}")]
    UnknownEvent(String),

    #[error(transparent)]
    Arguments(#[from] ArgumentError),

    #[error("Channel {channel} faulted: {fault}")]
    Fault {
        channel: ChannelId,
        #[source]
        fault: ExecutionFault,
    },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Trigger fan-out timed out after {elapsed:?}")]
    TimedOut { elapsed: Duration },
}

fn join_messages(errors: &[QueryError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}
