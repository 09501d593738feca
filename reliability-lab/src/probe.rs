//! Probe client: one call to a backend endpoint, always resolved to an
//! [`Outcome`].
//!
//! ```text
//! probe(endpoint, mode, scenario)
//!   │ CorrelationId::generate()            before anything leaves the process
//!   │ started = time.now()
//!   ▼
//! GET /api/{endpoint}?mode=..&scenario=..   X-Correlation-Id: <id>
//!   │
//!   ├─ body parsed ──► Outcome { status: response status,
//!   │                            latency_ms: server value if non-zero, else measured }
//!   │
//!   └─ transport / decode / timeout failure
//!                  ──► Outcome { ok: false, status: 500, latency_ms: measured,
//!                                message: error text or fallback }
//! ```

use std::time::Duration;

use reliability_lab_core::{
    HttpClient, HttpRequest, HttpResponse, Providers, TimeProvider, TransportError,
};
use serde::Deserialize;
use thiserror::Error;

use crate::outcome::{CorrelationId, Endpoint, Mode, Outcome, Scenario};

/// Header carrying the correlation id.
pub const CORRELATION_HEADER: &str = "X-Correlation-Id";

/// Status recorded when a call never completed.
pub const TRANSPORT_FAILURE_STATUS: u16 = 500;

/// Message recorded when a transport failure carries no text of its own.
pub const NETWORK_ERROR_FALLBACK: &str = "Network error or backend unreachable";

/// Why a probe produced no usable response.
#[derive(Debug, Error)]
enum ProbeFailure {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("malformed response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("request timed out")]
    TimedOut,
}

/// The parts of a probe response body the client reads.
///
/// Endpoint, mode, scenario and correlation id are echoed by the backend
/// but the values the client sent are authoritative.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProbeBody {
    ok: Option<bool>,
    latency_ms: Option<u64>,
    message: Option<String>,
    fail_window_index: Option<u32>,
    in_fail_window: Option<bool>,
}

/// Issues probes against the backend.
#[derive(Debug, Clone)]
pub struct ProbeClient<P: Providers> {
    providers: P,
    request_timeout: Duration,
}

impl<P: Providers> ProbeClient<P> {
    /// Create a client; `request_timeout` bounds each call at the transport.
    pub fn new(providers: P, request_timeout: Duration) -> Self {
        Self {
            providers,
            request_timeout,
        }
    }

    /// Probe `endpoint` under `mode` and `scenario`.
    ///
    /// Never fails: every failure path yields a well-formed failed outcome.
    pub async fn probe(&self, endpoint: Endpoint, mode: Mode, scenario: Scenario) -> Outcome {
        let correlation_id = CorrelationId::generate(self.providers.random());
        let time = self.providers.time();
        let started = time.now();

        let result = self.exchange(endpoint, mode, scenario, &correlation_id).await;
        let elapsed_ms = time.now().saturating_sub(started).as_millis() as u64;

        let outcome = match result {
            Ok((response, body)) => {
                let in_window = scenario == Scenario::FailWindow;
                let status = response.status;
                Outcome {
                    ok: body.ok.unwrap_or_else(|| response.is_success()),
                    endpoint,
                    mode,
                    scenario,
                    correlation_id,
                    latency_ms: body.latency_ms.filter(|ms| *ms > 0).unwrap_or(elapsed_ms),
                    status,
                    message: body.message.unwrap_or_else(|| format!("HTTP {status}")),
                    fail_window_index: body.fail_window_index.filter(|_| in_window),
                    in_fail_window: body.in_fail_window.filter(|_| in_window),
                }
            }
            Err(failure) => {
                let text = failure.to_string();
                tracing::warn!(
                    correlation_id = %correlation_id,
                    endpoint = %endpoint,
                    error = %text,
                    "probe failed before a response arrived"
                );
                Outcome {
                    ok: false,
                    endpoint,
                    mode,
                    scenario,
                    correlation_id,
                    latency_ms: elapsed_ms,
                    status: TRANSPORT_FAILURE_STATUS,
                    message: if text.trim().is_empty() {
                        NETWORK_ERROR_FALLBACK.to_string()
                    } else {
                        text
                    },
                    fail_window_index: None,
                    in_fail_window: None,
                }
            }
        };

        tracing::debug!(
            correlation_id = %outcome.correlation_id,
            endpoint = %endpoint,
            mode = %mode,
            scenario = %scenario,
            status = outcome.status,
            latency_ms = outcome.latency_ms,
            "probe completed"
        );
        outcome
    }

    async fn exchange(
        &self,
        endpoint: Endpoint,
        mode: Mode,
        scenario: Scenario,
        correlation_id: &CorrelationId,
    ) -> Result<(HttpResponse, ProbeBody), ProbeFailure> {
        let request = HttpRequest::get(format!(
            "/api/{endpoint}?mode={mode}&scenario={scenario}"
        ))
        .header(CORRELATION_HEADER, correlation_id.as_str());

        let response = self
            .providers
            .time()
            .timeout(self.request_timeout, self.providers.http().send(request))
            .await
            .map_err(|_| ProbeFailure::TimedOut)??;

        let body: ProbeBody = serde_json::from_slice(&response.body)?;
        Ok((response, body))
    }
}
