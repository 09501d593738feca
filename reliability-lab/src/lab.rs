//! The simulation scheduler.
//!
//! [`Lab`] owns the simulation state (mode, scenario, trace, loading and
//! simulating flags) and decides when probes fire:
//!
//! ```text
//!   run_one ─────┐
//!   run_both ────┼──► ProbeClient ──► Outcome ──► TraceBuffer (newest first)
//!   continuous ──┘        (search only, one per tick)
//!
//!   StatusPoller ──► StatusSnapshot        (independent, 1s cadence)
//! ```
//!
//! Manual triggers are refused while continuous traffic runs so that the
//! trace order stays meaningful. Stopping continuous traffic takes effect
//! at the next tick boundary; a probe already in flight completes and is
//! recorded.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use reliability_lab_core::{CancellationToken, Providers, TaskProvider, Ticker};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::admin::{AdminClient, ResetAck, ServiceInfo};
use crate::config::{LabConfig, LabProfile};
use crate::error::{AdminError, LabError, LabResult};
use crate::explain::{explain, Explanation};
use crate::outcome::{Endpoint, Mode, Outcome, Scenario};
use crate::poller::{StatusPoller, StatusSnapshot};
use crate::probe::ProbeClient;
use crate::trace::TraceBuffer;

// ============================================================================
// State
// ============================================================================

#[derive(Debug)]
struct LabState {
    mode: Mode,
    scenario: Scenario,
    in_flight: usize,
    trace: TraceBuffer,
}

struct Continuous {
    token: CancellationToken,
    _handle: JoinHandle<()>,
}

struct LabInner<P: Providers> {
    providers: P,
    config: LabConfig,
    probe: ProbeClient<P>,
    admin: AdminClient<P>,
    poller: StatusPoller<P>,
    state: RefCell<LabState>,
    continuous: RefCell<Option<Continuous>>,
    /// Held by a continuous loop for the length of each probe. A loop that
    /// was stopped mid-probe keeps it until that probe is recorded.
    continuous_lane: Mutex<()>,
}

/// Marks one dispatch as in flight for as long as it lives.
struct Loading<'a> {
    state: &'a RefCell<LabState>,
}

impl<'a> Loading<'a> {
    fn enter(state: &'a RefCell<LabState>) -> Self {
        state.borrow_mut().in_flight += 1;
        Self { state }
    }
}

impl Drop for Loading<'_> {
    fn drop(&mut self) {
        let mut state = self.state.borrow_mut();
        state.in_flight = state.in_flight.saturating_sub(1);
    }
}

// ============================================================================
// Lab
// ============================================================================

/// Scheduler and state container for a lab session.
///
/// Cloning yields another handle to the same session. Everything runs on a
/// single thread; operations that spawn background work
/// ([`start_continuous`](Lab::start_continuous),
/// [`start_status_polling`](Lab::start_status_polling)) must be called
/// inside a `LocalSet`.
pub struct Lab<P: Providers> {
    inner: Rc<LabInner<P>>,
}

impl<P: Providers> Clone for Lab<P> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<P: Providers> Lab<P> {
    /// Create a session in baseline mode with the normal scenario.
    pub fn new(providers: P, config: LabConfig) -> Self {
        let inner = LabInner {
            probe: ProbeClient::new(providers.clone(), config.request_timeout()),
            admin: AdminClient::new(providers.clone(), config.request_timeout()),
            poller: StatusPoller::new(
                providers.clone(),
                config.status_interval(),
                config.request_timeout(),
            ),
            state: RefCell::new(LabState {
                mode: Mode::default(),
                scenario: Scenario::default(),
                in_flight: 0,
                trace: TraceBuffer::with_capacity(config.trace_capacity()),
            }),
            continuous: RefCell::new(None),
            continuous_lane: Mutex::new(()),
            providers,
            config,
        };
        Self {
            inner: Rc::new(inner),
        }
    }

    /// Session configuration.
    pub fn config(&self) -> &LabConfig {
        &self.inner.config
    }

    /// Policies of the hardened backend.
    pub fn profile(&self) -> &LabProfile {
        self.inner.config.profile()
    }

    /// Current backend variant.
    pub fn mode(&self) -> Mode {
        self.inner.state.borrow().mode
    }

    /// Select the backend variant for subsequent probes.
    pub fn set_mode(&self, mode: Mode) {
        self.inner.state.borrow_mut().mode = mode;
    }

    /// Current fault scenario.
    pub fn scenario(&self) -> Scenario {
        self.inner.state.borrow().scenario
    }

    /// Select the fault scenario for subsequent probes.
    pub fn set_scenario(&self, scenario: Scenario) {
        self.inner.state.borrow_mut().scenario = scenario;
    }

    /// Whether continuous traffic is running.
    pub fn is_simulating(&self) -> bool {
        self.inner.continuous.borrow().is_some()
    }

    /// Whether any probe dispatched by the lab is still in flight.
    pub fn is_loading(&self) -> bool {
        self.inner.state.borrow().in_flight > 0
    }

    /// Trace entries, newest first.
    pub fn trace(&self) -> Vec<Outcome> {
        self.inner.state.borrow().trace.snapshot()
    }

    /// Latest admin status as seen by the poller.
    pub fn status(&self) -> StatusSnapshot {
        self.inner.poller.snapshot()
    }

    /// Explain `outcome` under the lab's current mode and scenario.
    pub fn explain<'a>(&self, outcome: &'a Outcome) -> Explanation<'a> {
        let state = self.inner.state.borrow();
        explain(outcome, state.mode, state.scenario, self.profile().timeout)
    }

    /// Probe one endpoint and record the outcome.
    pub async fn run_one(&self, endpoint: Endpoint) -> LabResult<Outcome> {
        self.ensure_manual()?;
        Ok(dispatch(&self.inner, endpoint).await)
    }

    /// Probe both endpoints concurrently and record the pair.
    ///
    /// Both requests are in flight at once, so this takes as long as the
    /// slower of the two. The pair is inserted as one unit with the profile
    /// outcome at the head of the trace and the search outcome behind it.
    pub async fn run_both(&self) -> LabResult<[Outcome; 2]> {
        self.ensure_manual()?;

        let inner = &self.inner;
        let _loading = Loading::enter(&inner.state);
        let (mode, scenario) = inner.selection();

        let (profile, search) = tokio::join!(
            inner.probe.probe(Endpoint::Profile, mode, scenario),
            inner.probe.probe(Endpoint::Search, mode, scenario),
        );

        inner
            .state
            .borrow_mut()
            .trace
            .record_batch([profile.clone(), search.clone()]);
        Ok([profile, search])
    }

    /// Start continuous traffic: one search probe per tick.
    ///
    /// Returns `false` if continuous traffic was already running.
    pub fn start_continuous(&self) -> bool {
        if self.is_simulating() {
            return false;
        }

        let token = CancellationToken::new();
        let interval = self.inner.config.continuous_interval();
        let mut ticker = Ticker::new(
            self.inner.providers.time().clone(),
            interval,
            token.clone(),
        );
        let lab: Weak<LabInner<P>> = Rc::downgrade(&self.inner);
        let stopped = token.clone();

        let handle = self.inner.providers.task().spawn_task("continuous", async move {
            while let Some(tick) = ticker.tick().await {
                let Some(inner) = lab.upgrade() else {
                    break;
                };
                tracing::trace!(tick, "continuous tick");
                let _lane = inner.continuous_lane.lock().await;
                if stopped.is_cancelled() {
                    break;
                }
                dispatch(&inner, Endpoint::Search).await;
            }
            tracing::debug!(
                ticks = ticker.ticks(),
                skipped = ticker.skipped(),
                "continuous traffic stopped"
            );
        });

        *self.inner.continuous.borrow_mut() = Some(Continuous {
            token,
            _handle: handle,
        });
        tracing::info!(
            interval_ms = interval.as_millis() as u64,
            "continuous traffic started"
        );
        true
    }

    /// Stop continuous traffic. No-op when it is not running.
    ///
    /// A probe already in flight still completes and is recorded. Until it
    /// does, a restarted loop holds its first probe back.
    pub fn stop_continuous(&self) {
        if let Some(continuous) = self.inner.continuous.borrow_mut().take() {
            continuous.token.cancel();
            tracing::info!("continuous traffic stop requested");
        }
    }

    /// Stop continuous traffic and wait until a probe still in flight has
    /// been recorded.
    pub async fn stop_continuous_and_wait(&self) {
        self.stop_continuous();
        let _lane = self.inner.continuous_lane.lock().await;
    }

    /// Reset the backend, then the local session.
    ///
    /// Local state is only touched once the backend acknowledges: the trace
    /// is cleared, the scenario returns to normal, continuous traffic stops
    /// and the status is refreshed. The mode is kept. On failure nothing
    /// local changes.
    pub async fn reset(&self) -> LabResult<ResetAck> {
        let ack = self.inner.admin.reset().await.map_err(|error| {
            tracing::warn!(error = %error, "backend did not acknowledge reset");
            LabError::Reset(error)
        })?;

        self.stop_continuous();
        {
            let mut state = self.inner.state.borrow_mut();
            state.trace.clear();
            state.scenario = Scenario::Normal;
        }
        tracing::info!(message = %ack.message, "lab reset");

        self.inner.poller.refresh_now().await;
        Ok(ack)
    }

    /// Backend identification.
    pub async fn info(&self) -> Result<ServiceInfo, AdminError> {
        self.inner.admin.info().await
    }

    /// Start the admin status poller. Returns `false` if already running.
    pub fn start_status_polling(&self) -> bool {
        self.inner.poller.start()
    }

    /// Stop the admin status poller.
    pub fn stop_status_polling(&self) {
        self.inner.poller.stop();
    }

    /// Fetch the admin status now, outside the poll cadence.
    pub async fn refresh_status(&self) -> StatusSnapshot {
        self.inner.poller.refresh_now().await
    }

    /// Stop every background activity of the session.
    pub fn shutdown(&self) {
        self.stop_continuous();
        self.stop_status_polling();
    }

    fn ensure_manual(&self) -> LabResult<()> {
        if self.is_simulating() {
            return Err(LabError::ContinuousActive);
        }
        Ok(())
    }
}

impl<P: Providers> LabInner<P> {
    fn selection(&self) -> (Mode, Scenario) {
        let state = self.state.borrow();
        (state.mode, state.scenario)
    }
}

async fn dispatch<P: Providers>(inner: &LabInner<P>, endpoint: Endpoint) -> Outcome {
    let _loading = Loading::enter(&inner.state);
    let (mode, scenario) = inner.selection();
    let outcome = inner.probe.probe(endpoint, mode, scenario).await;
    inner.state.borrow_mut().trace.record(outcome.clone());
    outcome
}
