//! Scripted in-memory backend for unit tests.
//!
//! Replies are produced by a script closure and delayed on the tokio clock,
//! so tests run on a paused runtime and observe exact virtual latencies.

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::rc::Rc;
use std::time::Duration;

use async_trait::async_trait;
use reliability_lab_core::{
    HttpClient, HttpRequest, HttpResponse, Providers, SeededRandomProvider, TimeProvider,
    TokioTaskProvider, TokioTimeProvider, TransportError,
};

/// Run `future` inside a `LocalSet` on a current-thread runtime whose clock
/// starts paused and auto-advances when every task is idle.
pub(crate) fn run_paused<F: Future>(future: F) -> F::Output {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .start_paused(true)
        .build()
        .expect("failed to build test runtime");
    tokio::task::LocalSet::new().block_on(&runtime, future)
}

/// What the stub does with one request.
pub(crate) struct StubReply {
    delay: Duration,
    result: Result<HttpResponse, String>,
}

impl StubReply {
    /// Respond with a JSON body.
    pub(crate) fn json(status: u16, body: &str) -> Self {
        Self::raw(status, body)
    }

    /// Respond with an arbitrary body.
    pub(crate) fn raw(status: u16, body: &str) -> Self {
        Self {
            delay: Duration::ZERO,
            result: Ok(HttpResponse::new(status, body.to_string())),
        }
    }

    /// Fail at the transport with the given error text.
    pub(crate) fn fail(message: &str) -> Self {
        Self {
            delay: Duration::ZERO,
            result: Err(message.to_string()),
        }
    }

    /// Hold the reply back for `delay`.
    pub(crate) fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

type Script = Rc<dyn Fn(&HttpRequest) -> StubReply>;

struct StubState {
    time: TokioTimeProvider,
    script: RefCell<Script>,
    requests: RefCell<Vec<HttpRequest>>,
    in_flight: Cell<usize>,
    max_in_flight: Cell<usize>,
}

/// Handle used by tests to script the backend and inspect traffic.
#[derive(Clone)]
pub(crate) struct StubBackend {
    state: Rc<StubState>,
}

impl StubBackend {
    /// Backend answering every request with a 30ms success.
    pub(crate) fn new() -> Self {
        let script: Script = Rc::new(|_| {
            StubReply::json(200, r#"{"ok":true,"message":"Success"}"#)
                .delayed(Duration::from_millis(30))
        });
        Self {
            state: Rc::new(StubState {
                time: TokioTimeProvider::new(),
                script: RefCell::new(script),
                requests: RefCell::new(Vec::new()),
                in_flight: Cell::new(0),
                max_in_flight: Cell::new(0),
            }),
        }
    }

    /// Replace the script.
    pub(crate) fn script<F>(&self, script: F)
    where
        F: Fn(&HttpRequest) -> StubReply + 'static,
    {
        *self.state.script.borrow_mut() = Rc::new(script);
    }

    /// Providers whose HTTP client is this stub.
    pub(crate) fn providers(&self) -> StubProviders {
        StubProviders {
            time: self.state.time.clone(),
            task: TokioTaskProvider,
            random: SeededRandomProvider::new(0x5eed),
            http: StubHttpClient {
                state: self.state.clone(),
            },
        }
    }

    /// Every request received so far.
    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.state.requests.borrow().clone()
    }

    /// Requests received for a route.
    pub(crate) fn count(&self, route: &str) -> usize {
        self.state
            .requests
            .borrow()
            .iter()
            .filter(|r| r.route() == route)
            .count()
    }

    /// Highest number of requests in flight at once.
    pub(crate) fn max_in_flight(&self) -> usize {
        self.state.max_in_flight.get()
    }
}

#[derive(Clone)]
pub(crate) struct StubHttpClient {
    state: Rc<StubState>,
}

#[async_trait(?Send)]
impl HttpClient for StubHttpClient {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let script = self.state.script.borrow().clone();
        let reply = script(&request);
        self.state.requests.borrow_mut().push(request);

        let in_flight = self.state.in_flight.get() + 1;
        self.state.in_flight.set(in_flight);
        self.state
            .max_in_flight
            .set(self.state.max_in_flight.get().max(in_flight));

        if !reply.delay.is_zero() {
            let _ = self.state.time.sleep(reply.delay).await;
        }
        self.state.in_flight.set(self.state.in_flight.get() - 1);

        reply.result.map_err(TransportError::Other)
    }
}

#[derive(Clone)]
pub(crate) struct StubProviders {
    time: TokioTimeProvider,
    task: TokioTaskProvider,
    random: SeededRandomProvider,
    http: StubHttpClient,
}

impl Providers for StubProviders {
    type Time = TokioTimeProvider;
    type Task = TokioTaskProvider;
    type Random = SeededRandomProvider;
    type Http = StubHttpClient;

    fn time(&self) -> &Self::Time {
        &self.time
    }

    fn task(&self) -> &Self::Task {
        &self.task
    }

    fn random(&self) -> &Self::Random {
        &self.random
    }

    fn http(&self) -> &Self::Http {
        &self.http
    }
}
