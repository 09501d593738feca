//! # reliability-lab-core
//!
//! Runtime abstractions for the reliability lab.
//!
//! - **Provider traits**: time, tasks, randomness and networking, so the
//!   same scheduling code runs against the real clock or a paused one.
//! - **HTTP seam**: [`HttpClient`] and the hyper-based [`HyperHttpClient`].
//! - **Ticker**: [`Ticker`], a fixed-cadence loop driver stopped by a
//!   cancellation token.
//!
//! ## Provider Traits
//!
//! - [`TimeProvider`]: Sleep, timeout, and monotonic time
//! - [`TaskProvider`]: Task spawning for single-threaded environments
//! - [`RandomProvider`]: Random draws for correlation ids
//! - [`NetworkProvider`]: outbound TCP connections
//! - [`Providers`]: the bundle of all of the above plus an [`HttpClient`]

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]

mod http;
mod network;
mod providers;
mod random;
mod task;
mod ticker;
mod time;

pub use http::{
    BaseUrl, HttpClient, HttpMethod, HttpRequest, HttpResponse, HyperHttpClient, TransportError,
};
pub use network::{NetworkProvider, TokioNetworkProvider};
pub use providers::{Providers, TokioProviders};
pub use random::{RandomProvider, SeededRandomProvider, TokioRandomProvider};
pub use task::{TaskProvider, TokioTaskProvider};
pub use ticker::Ticker;
pub use time::{TimeError, TimeProvider, TokioTimeProvider};

pub use tokio_util::sync::CancellationToken;
