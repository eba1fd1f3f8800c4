//! Dispatcher configuration and validation
//!
//! # Example
//!
//! ```ignore
//! use relay_dispatch::{DispatcherConfigBuilder, FaultPolicy};
//!
//! let config = DispatcherConfigBuilder::new()
//!     .fault_policy(FaultPolicy::IsolateAndContinue)
//!     .max_concurrent_deliveries(8)
//!     .trigger_timeout(Duration::from_secs(5))
//!     .build()?;
//! ```

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What a trigger does when the executor faults on one channel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultPolicy {
    /// Stop the fan-out and return the fault to the caller.
    #[default]
    AbortOnFault,
    /// Record the fault in the trigger report and keep delivering.
    IsolateAndContinue,
}

/// Dispatcher configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatcherConfig {
    pub fault_policy: FaultPolicy,
    /// Channels processed concurrently within one trigger (1 = sequential)
    pub max_concurrent_deliveries: usize,
    /// Overall fan-out timeout for a single trigger
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_timeout_ms: Option<u64>,
    /// Ask the executor to validate stored queries at subscribe time
    pub validate_on_subscribe: bool,
    /// Maximum events one subscription may listen on
    pub max_topics_per_subscription: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            fault_policy: FaultPolicy::AbortOnFault,
            max_concurrent_deliveries: 1,
            trigger_timeout_ms: None,
            validate_on_subscribe: true,
            max_topics_per_subscription: 16,
        }
    }
}

impl DispatcherConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrent_deliveries == 0 {
            return Err(ConfigError::InvalidParameters(
                "max_concurrent_deliveries must be at least 1".to_string(),
            ));
        }

        if self.max_topics_per_subscription == 0 {
            return Err(ConfigError::InvalidParameters(
                "max_topics_per_subscription must be at least 1".to_string(),
            ));
        }

        if self.trigger_timeout_ms == Some(0) {
            return Err(ConfigError::InvalidParameters(
                "trigger_timeout_ms cannot be 0".to_string(),
            ));
        }

        Ok(())
    }

    /// The fan-out timeout, if one is configured.
    #[must_use]
    pub fn trigger_timeout(&self) -> Option<Duration> {
        self.trigger_timeout_ms.map(Duration::from_millis)
    }

    /// Builder-style method to set the fault policy
    #[must_use]
    pub fn with_fault_policy(mut self, policy: FaultPolicy) -> Self {
        self.fault_policy = policy;
        self
    }
}

/// Builder for DispatcherConfig with validation
#[derive(Default)]
pub struct DispatcherConfigBuilder {
    fault_policy: Option<FaultPolicy>,
    max_concurrent_deliveries: Option<usize>,
    trigger_timeout: Option<Duration>,
    validate_on_subscribe: Option<bool>,
    max_topics_per_subscription: Option<usize>,
}

impl DispatcherConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fault_policy(mut self, policy: FaultPolicy) -> Self {
        self.fault_policy = Some(policy);
        self
    }

    pub fn max_concurrent_deliveries(mut self, limit: usize) -> Self {
        self.max_concurrent_deliveries = Some(limit);
        self
    }

    /// Sub-millisecond timeouts round up to the next whole millisecond.
    pub fn trigger_timeout(mut self, timeout: Duration) -> Self {
        self.trigger_timeout = Some(timeout);
        self
    }

    pub fn validate_on_subscribe(mut self, enabled: bool) -> Self {
        self.validate_on_subscribe = Some(enabled);
        self
    }

    pub fn max_topics_per_subscription(mut self, max: usize) -> Self {
        self.max_topics_per_subscription = Some(max);
        self
    }

    /// Build the DispatcherConfig, validating all parameters
    pub fn build(self) -> Result<DispatcherConfig, ConfigError> {
        let defaults = DispatcherConfig::default();

        let config = DispatcherConfig {
            fault_policy: self.fault_policy.unwrap_or(defaults.fault_policy),
            max_concurrent_deliveries: self
                .max_concurrent_deliveries
                .unwrap_or(defaults.max_concurrent_deliveries),
            trigger_timeout_ms: self
                .trigger_timeout
                .map(|t| u64::try_from(t.as_nanos().div_ceil(1_000_000)).unwrap_or(u64::MAX))
                .or(defaults.trigger_timeout_ms),
            validate_on_subscribe: self
                .validate_on_subscribe
                .unwrap_or(defaults.validate_on_subscribe),
            max_topics_per_subscription: self
                .max_topics_per_subscription
                .unwrap_or(defaults.max_topics_per_subscription),
        };

        config.validate()?;
        Ok(config)
    }
}
