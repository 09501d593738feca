//! Causal explanations for trace rows.
//!
//! [`explain`] is a pure function of the outcome, the lab's mode and
//! scenario, and the hardened timeout. Rules are tried in order and the
//! first match wins:
//!
//! | # | Condition | Explanation |
//! |---|-----------|-------------|
//! | 1 | fail-window, hardened, 503 | forced circuit-breaker recovery |
//! | 1 | fail-window, otherwise | the outcome's own message |
//! | 2 | baseline, slow, ok | blocking wait on the slow dependency |
//! | 2 | baseline, fail, not ok | dependency failure passed through |
//! | 3 | hardened, 504 | fail-fast timeout |
//! | 3 | hardened, 503 | circuit open, immediate rejection |
//! | 3 | hardened, ok, latency > timeout | configuration anomaly |
//! | 4 | anything else | normal expected behavior |

use std::fmt;
use std::time::Duration;

use crate::outcome::{Mode, Outcome, Scenario};

/// Text shown when a fail-window outcome carries no message of its own.
pub const NO_MESSAGE: &str = "Backend returned no diagnostic message.";

/// Why an outcome looks the way it does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Explanation<'a> {
    /// Fail-window call rejected by the open breaker.
    ForcedRecovery,
    /// Fail-window call explained by the backend's own message.
    Passthrough(&'a str),
    /// Baseline call that sat through the injected latency.
    BlockingWait,
    /// Baseline call whose dependency failure reached the caller.
    DependencyFailure,
    /// Hardened call cut off by the timeout.
    FailFast {
        /// Timeout the backend enforces, in milliseconds.
        timeout_ms: u64,
    },
    /// Hardened call rejected without reaching the dependency.
    CircuitOpen,
    /// Hardened call that succeeded slower than its own timeout allows.
    TimeoutAnomaly,
    /// Nothing noteworthy happened.
    Normal,
}

impl fmt::Display for Explanation<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Explanation::ForcedRecovery => {
                f.write_str("Circuit breaker is open! Forced recovery to protect the system.")
            }
            Explanation::Passthrough(message) => f.write_str(message),
            Explanation::BlockingWait => {
                f.write_str("The UI waited for the slow dependency to finish. Feels hung.")
            }
            Explanation::DependencyFailure => {
                f.write_str("Direct dependency failure. The 502 error is passed to the UI.")
            }
            Explanation::FailFast { timeout_ms } => write!(
                f,
                "Fail-fast! Timeout at {timeout_ms}ms prevented the UI from hanging."
            ),
            Explanation::CircuitOpen => {
                f.write_str("Circuit breaker is open! Immediate rejection to protect the system.")
            }
            Explanation::TimeoutAnomaly => {
                f.write_str("Hardened call completed, but exceeded timeout? (Check config)")
            }
            Explanation::Normal => f.write_str("Normal expected behavior."),
        }
    }
}

/// Explain `outcome` as seen under `mode` and `scenario`.
pub fn explain(
    outcome: &Outcome,
    mode: Mode,
    scenario: Scenario,
    timeout: Duration,
) -> Explanation<'_> {
    if scenario == Scenario::FailWindow {
        if mode == Mode::Hardened && outcome.status == 503 {
            return Explanation::ForcedRecovery;
        }
        if outcome.message.trim().is_empty() {
            return Explanation::Passthrough(NO_MESSAGE);
        }
        return Explanation::Passthrough(&outcome.message);
    }

    match mode {
        Mode::Baseline => {
            if scenario == Scenario::Slow && outcome.ok {
                return Explanation::BlockingWait;
            }
            if scenario == Scenario::Fail && !outcome.ok {
                return Explanation::DependencyFailure;
            }
        }
        Mode::Hardened => {
            if outcome.status == 504 {
                return Explanation::FailFast {
                    timeout_ms: timeout.as_millis() as u64,
                };
            }
            if outcome.status == 503 {
                return Explanation::CircuitOpen;
            }
            if outcome.ok && u128::from(outcome.latency_ms) > timeout.as_millis() {
                return Explanation::TimeoutAnomaly;
            }
        }
    }

    Explanation::Normal
}

/// Explain an outcome under the mode and scenario it was recorded with.
pub fn explain_recorded(outcome: &Outcome, timeout: Duration) -> Explanation<'_> {
    explain(outcome, outcome.mode, outcome.scenario, timeout)
}
