//! Configuration for the analysis engine

use crate::error::{EngineError, Result};
use argus_providers::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for analysis runs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// How long a cached agent result stays fresh
    pub cache_ttl: Duration,

    /// Retries allowed after the initial attempt of a provider call
    pub max_retries: u32,

    /// Linear backoff unit between retries
    pub retry_backoff_unit: Duration,

    /// Upper bound on a single provider call
    pub call_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(900), // 15 minutes
            max_retries: 1,
            retry_backoff_unit: Duration::from_secs(2),
            call_timeout: Duration::from_secs(30),
        }
    }
}

impl EngineConfig {
    /// Create a new configuration builder
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.cache_ttl.is_zero() {
            return Err(EngineError::Config(
                "cache_ttl must be non-zero".to_string(),
            ));
        }

        if self.call_timeout.is_zero() {
            return Err(EngineError::Config(
                "call_timeout must be non-zero".to_string(),
            ));
        }

        Ok(())
    }

    /// The retry policy provider calls run under
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, self.retry_backoff_unit)
    }
}

/// Builder for EngineConfig
#[derive(Debug, Default)]
pub struct EngineConfigBuilder {
    cache_ttl: Option<Duration>,
    max_retries: Option<u32>,
    retry_backoff_unit: Option<Duration>,
    call_timeout: Option<Duration>,
}

impl EngineConfigBuilder {
    /// Set the cache TTL
    pub fn cache_ttl(mut self, duration: Duration) -> Self {
        self.cache_ttl = Some(duration);
        self
    }

    /// Set maximum retries
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = Some(retries);
        self
    }

    /// Set the linear backoff unit
    pub fn retry_backoff_unit(mut self, duration: Duration) -> Self {
        self.retry_backoff_unit = Some(duration);
        self
    }

    /// Set the per-call timeout
    pub fn call_timeout(mut self, duration: Duration) -> Self {
        self.call_timeout = Some(duration);
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<EngineConfig> {
        let defaults = EngineConfig::default();

        let config = EngineConfig {
            cache_ttl: self.cache_ttl.unwrap_or(defaults.cache_ttl),
            max_retries: self.max_retries.unwrap_or(defaults.max_retries),
            retry_backoff_unit: self
                .retry_backoff_unit
                .unwrap_or(defaults.retry_backoff_unit),
            call_timeout: self.call_timeout.unwrap_or(defaults.call_timeout),
        };

        config.validate()?;
        Ok(config)
    }
}
