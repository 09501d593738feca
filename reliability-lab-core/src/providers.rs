//! Provider bundle trait for simplified type parameters.
//!
//! Lab components carry a single `P: Providers` instead of one type
//! parameter per concern:
//!
//! ```text
//! struct ProbeClient<P: Providers>
//! ```

use crate::{
    HttpClient, HyperHttpClient, RandomProvider, TaskProvider, TimeProvider, TokioNetworkProvider,
    TokioRandomProvider, TokioTaskProvider, TokioTimeProvider, TransportError,
};

/// Bundle of all provider types for a runtime environment.
///
/// ## Implementations
///
/// - [`TokioProviders`]: real clock, `spawn_local`, thread RNG and hyper
///   over TCP.
/// - Test bundles pair the Tokio clock with scripted HTTP clients and a
///   seeded RNG.
pub trait Providers: Clone + 'static {
    /// Time provider type for sleep, timeout, and time queries.
    type Time: TimeProvider + Clone + 'static;

    /// Task provider type for spawning local tasks.
    type Task: TaskProvider + Clone + 'static;

    /// Random provider type for correlation ids.
    type Random: RandomProvider + Clone + 'static;

    /// HTTP client that reaches the backend.
    type Http: HttpClient + Clone + 'static;

    /// Get the time provider instance.
    fn time(&self) -> &Self::Time;

    /// Get the task provider instance.
    fn task(&self) -> &Self::Task;

    /// Get the random provider instance.
    fn random(&self) -> &Self::Random;

    /// Get the HTTP client instance.
    fn http(&self) -> &Self::Http;
}

/// Production providers using the Tokio runtime.
///
/// ## Example
///
/// ```rust,ignore
/// use reliability_lab_core::{Providers, TokioProviders};
///
/// let providers = TokioProviders::new("http://localhost:8080")?;
/// let started = providers.time().now();
/// ```
#[derive(Clone, Debug)]
pub struct TokioProviders {
    time: TokioTimeProvider,
    task: TokioTaskProvider,
    random: TokioRandomProvider,
    http: HyperHttpClient<TokioNetworkProvider, TokioTaskProvider>,
}

impl TokioProviders {
    /// Create a production bundle talking to `base_url`.
    pub fn new(base_url: &str) -> Result<Self, TransportError> {
        Ok(Self {
            time: TokioTimeProvider::new(),
            task: TokioTaskProvider,
            random: TokioRandomProvider::new(),
            http: HyperHttpClient::new(TokioNetworkProvider::new(), TokioTaskProvider, base_url)?,
        })
    }
}

impl Providers for TokioProviders {
    type Time = TokioTimeProvider;
    type Task = TokioTaskProvider;
    type Random = TokioRandomProvider;
    type Http = HyperHttpClient<TokioNetworkProvider, TokioTaskProvider>;

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
