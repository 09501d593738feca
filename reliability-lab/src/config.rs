//! Lab configuration.
//!
//! [`LabConfig`] holds where the backend lives and how the schedulers pace
//! themselves. [`LabProfile`] describes the policies the hardened backend
//! advertises; the explainer reads its timeout.

use std::ops::RangeInclusive;
use std::time::Duration;

use reliability_lab_core::BaseUrl;

use crate::error::ConfigError;
use crate::trace::DEFAULT_TRACE_CAPACITY;

/// Backend location used when nothing is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

/// Environment variable overriding the backend location.
pub const ENV_BASE_URL: &str = "LAB_API_BASE_URL";
/// Environment variable overriding the continuous cadence.
pub const ENV_CONTINUOUS_INTERVAL_MS: &str = "LAB_CONTINUOUS_INTERVAL_MS";
/// Environment variable overriding the status poll cadence.
pub const ENV_STATUS_INTERVAL_MS: &str = "LAB_STATUS_INTERVAL_MS";
/// Environment variable overriding the per-request transport timeout.
pub const ENV_REQUEST_TIMEOUT_MS: &str = "LAB_REQUEST_TIMEOUT_MS";

/// Policies enforced by the hardened backend.
#[derive(Debug, Clone, PartialEq)]
pub struct LabProfile {
    /// Time limit on the guarded dependency call.
    pub timeout: Duration,
    /// Bulkhead size.
    pub bulkhead_max_concurrent: u32,
    /// Failure percentage that opens the breaker.
    pub failure_rate_threshold: f64,
    /// Calls in the breaker's sliding window.
    pub sliding_window: u32,
    /// Call ordinals forced to fail under `fail-window`.
    pub fail_window: RangeInclusive<u32>,
}

impl Default for LabProfile {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(200),
            bulkhead_max_concurrent: 10,
            failure_rate_threshold: 50.0,
            sliding_window: 10,
            fail_window: 6..=12,
        }
    }
}

/// Lab configuration.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use reliability_lab::LabConfig;
///
/// let config = LabConfig::builder()
///     .base_url("http://127.0.0.1:9000")
///     .continuous_interval(Duration::from_millis(500))
///     .build()
///     .unwrap();
/// assert_eq!(config.base_url(), "http://127.0.0.1:9000");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct LabConfig {
    base_url: String,
    trace_capacity: usize,
    continuous_interval: Duration,
    status_interval: Duration,
    request_timeout: Duration,
    profile: LabProfile,
}

impl Default for LabConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            trace_capacity: DEFAULT_TRACE_CAPACITY,
            continuous_interval: Duration::from_millis(800),
            status_interval: Duration::from_millis(1000),
            request_timeout: Duration::from_secs(10),
            profile: LabProfile::default(),
        }
    }
}

impl LabConfig {
    /// Start building a configuration from the defaults.
    pub fn builder() -> LabConfigBuilder {
        LabConfigBuilder::default()
    }

    /// Defaults overridden by the `LAB_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each `LAB_*`
    /// variable.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Self::builder();
        if let Some(url) = lookup(ENV_BASE_URL).filter(|v| !v.trim().is_empty()) {
            builder = builder.base_url(url.trim());
        }
        if let Some(value) = lookup(ENV_CONTINUOUS_INTERVAL_MS) {
            let interval = parse_millis(ENV_CONTINUOUS_INTERVAL_MS, &value)?;
            builder = builder.continuous_interval(interval);
        }
        if let Some(value) = lookup(ENV_STATUS_INTERVAL_MS) {
            builder = builder.status_interval(parse_millis(ENV_STATUS_INTERVAL_MS, &value)?);
        }
        if let Some(value) = lookup(ENV_REQUEST_TIMEOUT_MS) {
            builder = builder.request_timeout(parse_millis(ENV_REQUEST_TIMEOUT_MS, &value)?);
        }
        builder.build()
    }

    /// Backend base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Rows kept in the trace.
    pub fn trace_capacity(&self) -> usize {
        self.trace_capacity
    }

    /// Cadence of continuous traffic.
    pub fn continuous_interval(&self) -> Duration {
        self.continuous_interval
    }

    /// Cadence of admin status polling.
    pub fn status_interval(&self) -> Duration {
        self.status_interval
    }

    /// Transport-level bound on a single request.
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Backend policy profile.
    pub fn profile(&self) -> &LabProfile {
        &self.profile
    }
}

fn parse_millis(var: &'static str, value: &str) -> Result<Duration, ConfigError> {
    match value.trim().parse::<u64>() {
        Ok(ms) if ms > 0 => Ok(Duration::from_millis(ms)),
        _ => Err(ConfigError::InvalidDuration {
            var,
            value: value.to_string(),
        }),
    }
}

/// Builder for [`LabConfig`].
#[derive(Debug, Clone, Default)]
pub struct LabConfigBuilder {
    config: LabConfig,
}

impl LabConfigBuilder {
    /// Set the backend base URL.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    /// Set the trace capacity.
    pub fn trace_capacity(mut self, capacity: usize) -> Self {
        self.config.trace_capacity = capacity;
        self
    }

    /// Set the continuous traffic cadence.
    pub fn continuous_interval(mut self, interval: Duration) -> Self {
        self.config.continuous_interval = interval;
        self
    }

    /// Set the status poll cadence.
    pub fn status_interval(mut self, interval: Duration) -> Self {
        self.config.status_interval = interval;
        self
    }

    /// Set the per-request transport timeout.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Set the backend policy profile.
    pub fn profile(mut self, profile: LabProfile) -> Self {
        self.config.profile = profile;
        self
    }

    /// Validate and build.
    pub fn build(self) -> Result<LabConfig, ConfigError> {
        BaseUrl::parse(&self.config.base_url)?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = LabConfig::from_lookup(lookup(&[])).unwrap();

        assert_eq!(config.base_url(), "http://localhost:8080");
        assert_eq!(config.trace_capacity(), 10);
        assert_eq!(config.continuous_interval(), Duration::from_millis(800));
        assert_eq!(config.status_interval(), Duration::from_millis(1000));
        assert_eq!(config.profile().timeout, Duration::from_millis(200));
        assert_eq!(config.profile().fail_window, 6..=12);
    }

    #[test]
    fn test_env_overrides() {
        let config = LabConfig::from_lookup(lookup(&[
            (ENV_BASE_URL, "http://10.0.0.5:9090"),
            (ENV_CONTINUOUS_INTERVAL_MS, "250"),
            (ENV_REQUEST_TIMEOUT_MS, " 1500 "),
        ]))
        .unwrap();

        assert_eq!(config.base_url(), "http://10.0.0.5:9090");
        assert_eq!(config.continuous_interval(), Duration::from_millis(250));
        assert_eq!(config.request_timeout(), Duration::from_millis(1500));
        assert_eq!(config.status_interval(), Duration::from_millis(1000));
    }

    #[test]
    fn test_blank_base_url_keeps_default() {
        let config = LabConfig::from_lookup(lookup(&[(ENV_BASE_URL, "  ")])).unwrap();
        assert_eq!(config.base_url(), DEFAULT_BASE_URL);
    }

    #[test]
    fn test_rejects_bad_values() {
        let err = LabConfig::from_lookup(lookup(&[(ENV_STATUS_INTERVAL_MS, "0")])).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidDuration {
                var: ENV_STATUS_INTERVAL_MS,
                ..
            }
        ));

        let err = LabConfig::builder()
            .base_url("ftp://backend")
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBaseUrl(_)));
    }
}
