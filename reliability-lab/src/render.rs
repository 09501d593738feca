//! Plain-text panels for terminal output.

use std::fmt;

use crate::admin::CircuitBreakerState;
use crate::config::LabProfile;
use crate::explain::{explain, Explanation};
use crate::outcome::{Mode, Outcome, Scenario};
use crate::poller::StatusSnapshot;
use crate::Lab;
use reliability_lab_core::Providers;

/// One trace entry with its explanation.
#[derive(Debug, Clone, Copy)]
pub struct TraceRow<'a> {
    outcome: &'a Outcome,
    explanation: Explanation<'a>,
}

impl<'a> TraceRow<'a> {
    /// Pair an outcome with its explanation.
    pub fn new(outcome: &'a Outcome, explanation: Explanation<'a>) -> Self {
        Self {
            outcome,
            explanation,
        }
    }
}

impl fmt::Display for TraceRow<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let o = self.outcome;
        write!(
            f,
            "[{:<4}] {:<8} /api/{:<8} {:>6}ms  {}  scenario={}",
            o.severity(),
            o.mode,
            o.endpoint,
            o.latency_ms,
            o.status,
            o.scenario
        )?;
        if let Some(index) = o.fail_window_index {
            write!(f, " call=#{index}")?;
        }
        write!(f, "  CID: {}", o.correlation_id)?;
        write!(f, "\n       {}", self.explanation)
    }
}

/// The live traffic trace, newest first.
#[derive(Debug, Clone)]
pub struct TracePanel {
    outcomes: Vec<Outcome>,
    mode: Mode,
    scenario: Scenario,
    profile: LabProfile,
    simulating: bool,
    loading: bool,
}

impl TracePanel {
    /// Capture the trace of `lab` as it is now.
    pub fn capture<P: Providers>(lab: &Lab<P>) -> Self {
        Self {
            outcomes: lab.trace(),
            mode: lab.mode(),
            scenario: lab.scenario(),
            profile: lab.profile().clone(),
            simulating: lab.is_simulating(),
            loading: lab.is_loading(),
        }
    }
}

impl fmt::Display for TracePanel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Live Traffic Trace")?;
        if self.simulating {
            f.write_str("  [AUTOPILOT ACTIVE]")?;
        }
        if self.loading {
            f.write_str("  (requests in flight...)")?;
        }
        writeln!(f)?;

        if self.outcomes.is_empty() {
            return writeln!(f, "  no traffic yet");
        }
        for outcome in &self.outcomes {
            let explanation = explain(outcome, self.mode, self.scenario, self.profile.timeout);
            writeln!(f, "{}", TraceRow::new(outcome, explanation))?;
        }
        Ok(())
    }
}

/// Circuit breaker status panel.
#[derive(Debug, Clone, Copy)]
pub struct StatusPanel<'a>(pub &'a StatusSnapshot);

impl fmt::Display for StatusPanel<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Circuit Breaker Status")?;
        let Some(status) = self.0.latest() else {
            return writeln!(f, "  Connecting to backend metrics...");
        };

        let marker = match status.circuit_breaker_state {
            CircuitBreakerState::Open => "!!",
            CircuitBreakerState::HalfOpen => "~",
            _ => "",
        };
        writeln!(f, "  State:        {}{marker}", status.circuit_breaker_state)?;
        writeln!(f, "  Failure Rate: {}", status.failure_rate_label())?;
        writeln!(
            f,
            "  Calls (F/T):  {} / {}",
            status.failed_calls, status.buffered_calls
        )?;
        if let StatusSnapshot::Stale { error, .. } = self.0 {
            writeln!(f, "  (stale: {error})")?;
        }
        Ok(())
    }
}

/// Hardened policy summary.
#[derive(Debug, Clone, Copy)]
pub struct ProfilePanel<'a>(pub &'a LabProfile);

impl fmt::Display for ProfilePanel<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let profile = self.0;
        writeln!(f, "Lab Configuration")?;
        writeln!(f, "  Timeout:      {}ms", profile.timeout.as_millis())?;
        writeln!(f, "  Bulkhead:     {} concurrent", profile.bulkhead_max_concurrent)?;
        writeln!(f, "  CB Threshold: {}% failure", profile.failure_rate_threshold)?;
        writeln!(f, "  Window:       {} requests", profile.sliding_window)?;
        writeln!(
            f,
            "  Fail window:  calls {}-{}",
            profile.fail_window.start(),
            profile.fail_window.end()
        )
    }
}
