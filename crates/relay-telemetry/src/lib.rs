//! # Relay Telemetry
//!
//! Structured logging for the topic relay.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use relay_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() {
//!     let config = TelemetryConfig::from_env();
//!     init_telemetry(&config).expect("Failed to init telemetry");
//!
//!     // Dispatcher spans and events are now emitted
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `RELAY_SERVICE_NAME` | `topic-relay` | Service name attached to logs |
//! | `RELAY_LOG_LEVEL` | `info` | Log level filter (falls back to `RUST_LOG`) |
//! | `RELAY_JSON_LOGS` | `false` | Emit JSON formatted logs |
//! | `RELAY_CONSOLE_OUTPUT` | `true` | Write logs to stdout |

mod config;
mod logging;

pub use config::TelemetryConfig;
pub use logging::init_logging;

use thiserror::Error;

#[doc(hidden)]
pub use tracing;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Invalid log filter '{filter}': {reason}")]
    InvalidFilter { filter: String, reason: String },

    #[error("A global tracing subscriber is already installed")]
    AlreadyInitialized,
}

/// Initialize structured logging for the relay.
///
/// Safe to call more than once; later calls report
/// [`TelemetryError::AlreadyInitialized`] instead of replacing the subscriber.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    init_logging(config)?;

    tracing::info!(
        service = %config.service_name,
        log_level = %config.log_level,
        json_logs = config.json_logs,
        "Telemetry initialized"
    );

    Ok(())
}

/// Log a channel-scoped event with standard fields.
#[macro_export]
macro_rules! log_channel_event {
    ($level:ident, $channel:expr, $msg:expr $(, $($field:tt)*)?) => {
        $crate::tracing::$level!(
            channel = %$channel,
            $($($field)*,)?
            $msg
        )
    };
}

/// Log a topic-scoped event with standard fields.
#[macro_export]
macro_rules! log_topic_event {
    ($level:ident, $event:expr, $topic:expr, $msg:expr $(, $($field:tt)*)?) => {
        $crate::tracing::$level!(
            event = %$event,
            topic = %$topic,
            $($($field)*,)?
            $msg
        )
    };
}
