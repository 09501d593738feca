//! Client for the backend's admin and info endpoints.

use std::fmt;
use std::time::Duration;

use reliability_lab_core::{HttpClient, HttpRequest, Providers, TimeProvider};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::AdminError;

/// State of the backend's circuit breaker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CircuitBreakerState {
    /// Calls flow through.
    Closed,
    /// Calls are rejected without reaching the dependency.
    Open,
    /// A few trial calls are let through.
    HalfOpen,
    /// Any other state name the backend reports, kept verbatim.
    Other(String),
}

impl From<String> for CircuitBreakerState {
    fn from(value: String) -> Self {
        match value.as_str() {
            "CLOSED" => CircuitBreakerState::Closed,
            "OPEN" => CircuitBreakerState::Open,
            "HALF_OPEN" => CircuitBreakerState::HalfOpen,
            _ => CircuitBreakerState::Other(value),
        }
    }
}

impl From<CircuitBreakerState> for String {
    fn from(value: CircuitBreakerState) -> Self {
        value.to_string()
    }
}

impl fmt::Display for CircuitBreakerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CircuitBreakerState::Closed => f.write_str("CLOSED"),
            CircuitBreakerState::Open => f.write_str("OPEN"),
            CircuitBreakerState::HalfOpen => f.write_str("HALF_OPEN"),
            CircuitBreakerState::Other(name) => f.write_str(name),
        }
    }
}

/// Snapshot of the breaker's sliding-window metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminStatus {
    /// Breaker state.
    pub circuit_breaker_state: CircuitBreakerState,
    /// Failure percentage, or negative while the window is not yet full.
    pub failure_rate: f64,
    /// Failed calls in the window.
    pub failed_calls: u32,
    /// Calls in the window.
    pub buffered_calls: u32,
}

impl AdminStatus {
    /// Failure rate, or `None` while the backend reports it as unavailable.
    pub fn failure_rate(&self) -> Option<f64> {
        (self.failure_rate >= 0.0).then_some(self.failure_rate)
    }

    /// Failure rate formatted for display (`N/A` when unavailable).
    pub fn failure_rate_label(&self) -> String {
        match self.failure_rate() {
            Some(rate) => format!("{rate}%"),
            None => "N/A".to_string(),
        }
    }
}

/// Acknowledgement of a lab reset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetAck {
    /// Backend confirmation text.
    #[serde(default)]
    pub message: String,
}

/// Backend identification from `/api/info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceInfo {
    /// Service name.
    pub service: String,
    /// Runtime version reported by the backend.
    #[serde(default)]
    pub java_version: Option<String>,
    /// Server time of the response.
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Typed access to `/api/admin/*` and `/api/info`.
///
/// Every call is bounded by the request timeout, so a backend that accepts
/// the connection but never answers surfaces as [`AdminError::TimedOut`].
#[derive(Debug, Clone)]
pub struct AdminClient<P: Providers> {
    providers: P,
    request_timeout: Duration,
}

impl<P: Providers> AdminClient<P> {
    /// Create a client; `request_timeout` bounds each call.
    pub fn new(providers: P, request_timeout: Duration) -> Self {
        Self {
            providers,
            request_timeout,
        }
    }

    /// `GET /api/admin/status`
    pub async fn status(&self) -> Result<AdminStatus, AdminError> {
        self.call(HttpRequest::get("/api/admin/status")).await
    }

    /// `POST /api/admin/reset`
    pub async fn reset(&self) -> Result<ResetAck, AdminError> {
        self.call(HttpRequest::post("/api/admin/reset")).await
    }

    /// `GET /api/info`
    pub async fn info(&self) -> Result<ServiceInfo, AdminError> {
        self.call(HttpRequest::get("/api/info")).await
    }

    async fn call<T: DeserializeOwned>(&self, request: HttpRequest) -> Result<T, AdminError> {
        let response = self
            .providers
            .time()
            .timeout(self.request_timeout, self.providers.http().send(request))
            .await
            .map_err(|_| AdminError::TimedOut(self.request_timeout))??;
        if !response.is_success() {
            return Err(AdminError::Status(response.status));
        }
        Ok(serde_json::from_slice(&response.body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{run_paused, StubBackend, StubReply};

    const TIMEOUT: Duration = Duration::from_secs(10);

    #[test]
    fn test_status_decodes() {
        run_paused(async {
            let backend = StubBackend::new();
            backend.script(|_| {
                StubReply::json(
                    200,
                    r#"{"circuitBreakerState":"HALF_OPEN","failureRate":62.5,"bufferedCalls":8,"failedCalls":5}"#,
                )
            });
            let admin = AdminClient::new(backend.providers(), TIMEOUT);

            let status = admin.status().await.unwrap();
            assert_eq!(status.circuit_breaker_state, CircuitBreakerState::HalfOpen);
            assert_eq!(status.failure_rate(), Some(62.5));
            assert_eq!(status.failed_calls, 5);
            assert_eq!(status.buffered_calls, 8);
            assert_eq!(backend.requests()[0].path, "/api/admin/status");
        });
    }

    #[test]
    fn test_unavailable_failure_rate() {
        let status: AdminStatus = serde_json::from_str(
            r#"{"circuitBreakerState":"CLOSED","failureRate":-1.0,"bufferedCalls":0,"failedCalls":0}"#,
        )
        .unwrap();

        assert_eq!(status.failure_rate(), None);
        assert_eq!(status.failure_rate_label(), "N/A");
    }

    #[test]
    fn test_unknown_breaker_state_kept() {
        let state: CircuitBreakerState = serde_json::from_str("\"FORCED_OPEN\"").unwrap();
        assert_eq!(state, CircuitBreakerState::Other("FORCED_OPEN".into()));
        assert_eq!(serde_json::to_string(&state).unwrap(), "\"FORCED_OPEN\"");
    }

    #[test]
    fn test_reset_posts() {
        run_paused(async {
            let backend = StubBackend::new();
            backend.script(|_| {
                StubReply::json(200, r#"{"message":"Lab state reset successfully"}"#)
            });
            let admin = AdminClient::new(backend.providers(), TIMEOUT);

            let ack = admin.reset().await.unwrap();
            assert_eq!(ack.message, "Lab state reset successfully");
            assert_eq!(
                backend.requests()[0].method,
                reliability_lab_core::HttpMethod::Post
            );
        });
    }

    #[test]
    fn test_errors() {
        run_paused(async {
            let backend = StubBackend::new();
            let admin = AdminClient::new(backend.providers(), TIMEOUT);

            backend.script(|_| StubReply::json(500, "{}"));
            assert!(matches!(admin.status().await, Err(AdminError::Status(500))));

            backend.script(|_| StubReply::raw(200, "not json"));
            assert!(matches!(admin.info().await, Err(AdminError::Decode(_))));

            backend.script(|_| StubReply::fail("connection refused"));
            let err = admin.reset().await.unwrap_err();
            assert_eq!(err.to_string(), "admin request failed: connection refused");
        });
    }

    #[test]
    fn test_hung_reset_times_out() {
        run_paused(async {
            let backend = StubBackend::new();
            backend.script(|_| {
                StubReply::json(200, r#"{"message":"late"}"#).delayed(Duration::from_secs(3600))
            });
            let admin = AdminClient::new(backend.providers(), Duration::from_secs(2));

            let started = tokio::time::Instant::now();
            let err = admin.reset().await.unwrap_err();

            assert!(matches!(err, AdminError::TimedOut(_)));
            assert_eq!(started.elapsed(), Duration::from_secs(2));
            assert_eq!(err.to_string(), "admin request timed out after 2s");
        });
    }
}
