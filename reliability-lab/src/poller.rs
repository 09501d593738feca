//! Periodic admin status polling.
//!
//! The poller fetches `/api/admin/status` immediately on start and then on
//! a fixed cadence. A failed fetch never discards the last good snapshot;
//! it only marks it stale.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use reliability_lab_core::{CancellationToken, Providers, TaskProvider, Ticker};
use tokio::task::JoinHandle;

use crate::admin::{AdminClient, AdminStatus};
use crate::error::AdminError;

/// What the lab currently knows about the breaker.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum StatusSnapshot {
    /// No fetch has succeeded yet.
    #[default]
    Unknown,
    /// The most recent fetch succeeded.
    Fresh(AdminStatus),
    /// The most recent fetch failed.
    Stale {
        /// Last successfully fetched status, if any.
        last: Option<AdminStatus>,
        /// Error of the most recent fetch.
        error: String,
    },
}

impl StatusSnapshot {
    /// Last successfully fetched status.
    pub fn latest(&self) -> Option<&AdminStatus> {
        match self {
            StatusSnapshot::Unknown => None,
            StatusSnapshot::Fresh(status) => Some(status),
            StatusSnapshot::Stale { last, .. } => last.as_ref(),
        }
    }

    /// Whether the most recent fetch succeeded.
    pub fn is_fresh(&self) -> bool {
        matches!(self, StatusSnapshot::Fresh(_))
    }

    /// Fold a fetch result into the snapshot.
    pub fn apply(&mut self, result: Result<AdminStatus, AdminError>) {
        *self = match result {
            Ok(status) => StatusSnapshot::Fresh(status),
            Err(error) => StatusSnapshot::Stale {
                last: self.latest().cloned(),
                error: error.to_string(),
            },
        };
    }
}

struct Running {
    token: CancellationToken,
    _handle: JoinHandle<()>,
}

/// Keeps a [`StatusSnapshot`] up to date in the background.
pub struct StatusPoller<P: Providers> {
    providers: P,
    admin: AdminClient<P>,
    interval: Duration,
    snapshot: Rc<RefCell<StatusSnapshot>>,
    running: RefCell<Option<Running>>,
}

impl<P: Providers> StatusPoller<P> {
    /// Create a stopped poller; each fetch is bounded by `request_timeout`.
    pub fn new(providers: P, interval: Duration, request_timeout: Duration) -> Self {
        Self {
            admin: AdminClient::new(providers.clone(), request_timeout),
            providers,
            interval,
            snapshot: Rc::new(RefCell::new(StatusSnapshot::Unknown)),
            running: RefCell::new(None),
        }
    }

    /// Start polling: one fetch now, then one per interval.
    ///
    /// Returns `false` if already running. Must be called inside a
    /// `LocalSet`.
    pub fn start(&self) -> bool {
        if self.is_running() {
            return false;
        }

        let token = CancellationToken::new();
        let mut ticker = Ticker::immediate(
            self.providers.time().clone(),
            self.interval,
            token.clone(),
        );
        let admin = self.admin.clone();
        let snapshot = self.snapshot.clone();

        let handle = self.providers.task().spawn_task("status-poller", async move {
            while let Some(tick) = ticker.tick().await {
                tracing::trace!(tick, "polling admin status");
                refresh(&admin, &snapshot).await;
            }
            tracing::debug!("status poller stopped");
        });

        *self.running.borrow_mut() = Some(Running {
            token,
            _handle: handle,
        });
        true
    }

    /// Stop polling. A fetch already in flight still lands.
    pub fn stop(&self) {
        if let Some(running) = self.running.borrow_mut().take() {
            running.token.cancel();
        }
    }

    /// Whether the background task is active.
    pub fn is_running(&self) -> bool {
        self.running.borrow().is_some()
    }

    /// Fetch once, outside the cadence.
    pub async fn refresh_now(&self) -> StatusSnapshot {
        refresh(&self.admin, &self.snapshot).await
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> StatusSnapshot {
        self.snapshot.borrow().clone()
    }
}

impl<P: Providers> Drop for StatusPoller<P> {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn refresh<P: Providers>(
    admin: &AdminClient<P>,
    snapshot: &RefCell<StatusSnapshot>,
) -> StatusSnapshot {
    let result = admin.status().await;
    if let Err(error) = &result {
        tracing::warn!(error = %error, "failed to fetch admin status; keeping last snapshot");
    }
    let mut current = snapshot.borrow_mut();
    current.apply(result);
    current.clone()
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::admin::CircuitBreakerState;
    use crate::test_support::{run_paused, StubBackend, StubReply};

    const CLOSED: &str =
        r#"{"circuitBreakerState":"CLOSED","failureRate":-1.0,"bufferedCalls":2,"failedCalls":0}"#;
    const OPEN: &str =
        r#"{"circuitBreakerState":"OPEN","failureRate":70.0,"bufferedCalls":10,"failedCalls":7}"#;

    const INTERVAL: Duration = Duration::from_millis(1000);
    const TIMEOUT: Duration = Duration::from_secs(10);

    #[test]
    fn test_apply_keeps_last_good_status() {
        let status: AdminStatus = serde_json::from_str(CLOSED).unwrap();
        let mut snapshot = StatusSnapshot::Unknown;

        snapshot.apply(Err(AdminError::Status(502)));
        assert_eq!(snapshot.latest(), None);
        assert!(!snapshot.is_fresh());

        snapshot.apply(Ok(status.clone()));
        assert!(snapshot.is_fresh());

        snapshot.apply(Err(AdminError::Status(502)));
        assert_eq!(snapshot.latest(), Some(&status));
        assert!(matches!(
            &snapshot,
            StatusSnapshot::Stale { error, .. } if error == "admin endpoint returned status 502"
        ));
    }

    #[test]
    fn test_polls_immediately_then_on_cadence() {
        run_paused(async {
            let backend = StubBackend::new();
            backend.script(|_| StubReply::json(200, CLOSED).delayed(Duration::from_millis(5)));
            let poller = StatusPoller::new(backend.providers(), INTERVAL, TIMEOUT);
            assert_eq!(poller.snapshot(), StatusSnapshot::Unknown);

            assert!(poller.start());
            assert!(!poller.start());

            tokio::time::sleep(Duration::from_millis(50)).await;
            assert_eq!(backend.count("/api/admin/status"), 1);
            assert!(poller.snapshot().is_fresh());

            tokio::time::sleep(Duration::from_millis(3000)).await;
            assert_eq!(backend.count("/api/admin/status"), 4);

            poller.stop();
            tokio::time::sleep(Duration::from_millis(5000)).await;
            assert_eq!(backend.count("/api/admin/status"), 4);
        });
    }

    #[test]
    fn test_failures_do_not_clear_snapshot() {
        run_paused(async {
            let backend = StubBackend::new();
            let calls = Rc::new(Cell::new(0u32));
            let counter = calls.clone();
            backend.script(move |_| {
                counter.set(counter.get() + 1);
                match counter.get() {
                    1 => StubReply::json(200, OPEN),
                    _ => StubReply::fail("connection refused"),
                }
            });
            let poller = StatusPoller::new(backend.providers(), INTERVAL, TIMEOUT);
            poller.start();

            tokio::time::sleep(Duration::from_millis(2500)).await;
            assert_eq!(calls.get(), 3);

            let snapshot = poller.snapshot();
            assert!(!snapshot.is_fresh());
            let latest = snapshot.latest().unwrap();
            assert_eq!(latest.circuit_breaker_state, CircuitBreakerState::Open);
            assert_eq!(latest.failed_calls, 7);
        });
    }

    #[test]
    fn test_refresh_now_without_start() {
        run_paused(async {
            let backend = StubBackend::new();
            backend.script(|_| StubReply::json(200, CLOSED));
            let poller = StatusPoller::new(backend.providers(), INTERVAL, TIMEOUT);

            let snapshot = poller.refresh_now().await;
            assert!(snapshot.is_fresh());
            assert!(!poller.is_running());
            assert_eq!(poller.snapshot(), snapshot);
        });
    }

    #[test]
    fn test_hung_fetch_does_not_stall_polling() {
        run_paused(async {
            let backend = StubBackend::new();
            backend.script(|_| StubReply::json(200, CLOSED).delayed(Duration::from_secs(3600)));
            let poller =
                StatusPoller::new(backend.providers(), INTERVAL, Duration::from_millis(500));
            poller.start();

            tokio::time::sleep(Duration::from_millis(9_700)).await;
            assert_eq!(backend.count("/api/admin/status"), 10);
            assert!(matches!(
                poller.snapshot(),
                StatusSnapshot::Stale { last: None, error }
                    if error == "admin request timed out after 500ms"
            ));
            poller.stop();
        });
    }
}
