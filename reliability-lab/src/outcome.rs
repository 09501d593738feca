//! The outcome of one probe, and the vocabulary it is expressed in.

use std::fmt;
use std::str::FromStr;

use reliability_lab_core::RandomProvider;
use serde::{Deserialize, Serialize};

/// Logical operation exposed by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Endpoint {
    /// `/api/profile`
    Profile,
    /// `/api/search`
    Search,
}

impl Endpoint {
    /// Wire name, also the path segment.
    pub fn as_str(&self) -> &'static str {
        match self {
            Endpoint::Profile => "profile",
            Endpoint::Search => "search",
        }
    }
}

/// Which backend variant serves a probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Direct calls, no resilience policies.
    #[default]
    Baseline,
    /// Calls guarded by timeout, circuit breaker and bulkhead.
    Hardened,
}

impl Mode {
    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Baseline => "baseline",
            Mode::Hardened => "hardened",
        }
    }
}

/// Fault profile the backend injects into its simulated dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scenario {
    /// ~30ms, always succeeds.
    #[default]
    Normal,
    /// +400ms latency injection.
    Slow,
    /// 30% random dependency failures.
    Fail,
    /// Calls 6-12 of the backend's counter fail, the rest succeed.
    FailWindow,
}

impl Scenario {
    /// Every scenario, in menu order.
    pub const ALL: [Scenario; 4] = [
        Scenario::Normal,
        Scenario::Slow,
        Scenario::Fail,
        Scenario::FailWindow,
    ];

    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Scenario::Normal => "normal",
            Scenario::Slow => "slow",
            Scenario::Fail => "fail",
            Scenario::FailWindow => "fail-window",
        }
    }

    /// Operator-facing description.
    pub fn label(&self) -> &'static str {
        match self {
            Scenario::Normal => "Normal (~30ms)",
            Scenario::Slow => "Slow (+400ms delay)",
            Scenario::Fail => "Failing (30% error rate)",
            Scenario::FailWindow => "Fail Window (calls 6-12 fail 100%)",
        }
    }
}

/// Error for parsing an unknown wire name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} `{value}`")]
pub struct ParseNameError {
    kind: &'static str,
    value: String,
}

macro_rules! wire_name {
    ($ty:ty, $kind:literal, [$($variant:expr),+ $(,)?]) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.pad(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = ParseNameError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                [$($variant),+]
                    .into_iter()
                    .find(|v| v.as_str().eq_ignore_ascii_case(s))
                    .ok_or_else(|| ParseNameError {
                        kind: $kind,
                        value: s.to_string(),
                    })
            }
        }
    };
}

wire_name!(Endpoint, "endpoint", [Endpoint::Profile, Endpoint::Search]);
wire_name!(Mode, "mode", [Mode::Baseline, Mode::Hardened]);
wire_name!(
    Scenario,
    "scenario",
    [
        Scenario::Normal,
        Scenario::Slow,
        Scenario::Fail,
        Scenario::FailWindow
    ]
);

/// Length of a generated correlation id.
pub const CORRELATION_ID_LEN: usize = 7;

const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Opaque per-call identifier sent as `X-Correlation-Id`.
///
/// Seven base-36 characters: distinct enough to tell apart the calls of
/// one burst, not meant to be globally unique.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(String);

impl CorrelationId {
    /// Draw a fresh id.
    pub fn generate<R: RandomProvider>(random: &R) -> Self {
        let id = (0..CORRELATION_ID_LEN)
            .map(|_| char::from(BASE36[random.random_range(0..BASE36.len())]))
            .collect();
        Self(id)
    }

    /// The id as sent on the wire.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for CorrelationId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The record of one probe.
///
/// `ok` mirrors the backend's own verdict and is not forced to agree with
/// `status`; the two only diverge when the backend says so.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Outcome {
    /// Backend verdict, or `false` for a transport failure.
    pub ok: bool,
    /// Operation probed.
    pub endpoint: Endpoint,
    /// Backend variant.
    pub mode: Mode,
    /// Injected fault profile.
    pub scenario: Scenario,
    /// Id generated before dispatch.
    pub correlation_id: CorrelationId,
    /// Server-reported latency when non-zero, else the client measurement.
    pub latency_ms: u64,
    /// HTTP status, or 500 when the call never completed.
    pub status: u16,
    /// Server or client diagnostic.
    pub message: String,
    /// 1-based ordinal within the fail window (fail-window only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fail_window_index: Option<u32>,
    /// Whether the call fell inside the forced-failure range (fail-window only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_fail_window: Option<bool>,
}

impl Outcome {
    /// Row colouring used by the trace view.
    pub fn severity(&self) -> Severity {
        if self.status >= 500 {
            Severity::Fail
        } else if self.latency_ms > SLOW_ROW_MS {
            Severity::Warning
        } else {
            Severity::Success
        }
    }
}

/// Latency above which a non-failing row is flagged.
pub const SLOW_ROW_MS: u64 = 300;

/// Coarse classification of a trace row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Completed quickly without a server error.
    Success,
    /// Completed, but slower than 300ms.
    Warning,
    /// Status 500 or above.
    Fail,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Severity::Success => "OK",
            Severity::Warning => "SLOW",
            Severity::Fail => "FAIL",
        })
    }
}
