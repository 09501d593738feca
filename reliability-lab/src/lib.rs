//! # Reliability Lab
//!
//! Client-side harness for exercising a backend's resilience policies
//! (timeout, bulkhead, circuit breaker) under injected faults, and for
//! explaining what each call went through.
//!
//! ## Crate Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │              reliability-lab (this crate)                   │
//! │   Lab scheduler · trace · explainer · CLI                   │
//! ├──────────────────────────┬──────────────────────────────────┤
//! │  ProbeClient             │       AdminClient + StatusPoller │
//! │  • /api/{profile,search} │       • /api/admin/status (1s)   │
//! │  • never fails: Outcome  │       • /api/admin/reset         │
//! ├──────────────────────────┴──────────────────────────────────┤
//! │                 reliability-lab-core                        │
//! │  Provider traits: Time, Task, Random, Network, Http         │
//! │  Ticker + CancellationToken                                 │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use reliability_lab::{Endpoint, Lab, LabConfig, Mode, Scenario, TokioProviders};
//!
//! let config = LabConfig::from_env()?;
//! let lab = Lab::new(TokioProviders::new(config.base_url())?, config);
//! lab.set_mode(Mode::Hardened);
//! lab.set_scenario(Scenario::Slow);
//! let outcome = lab.run_one(Endpoint::Search).await?;
//! println!("{}", lab.explain(&outcome));
//! ```
//!
//! Everything runs on one thread: construct and drive a [`Lab`] inside a
//! `tokio::task::LocalSet` on a current-thread runtime.

#![deny(missing_docs)]

mod admin;
mod config;
mod error;
pub mod explain;
mod lab;
mod outcome;
mod poller;
mod probe;
pub mod render;
mod trace;

#[cfg(test)]
mod test_support;

pub use reliability_lab_core::*;

pub use admin::{AdminClient, AdminStatus, CircuitBreakerState, ResetAck, ServiceInfo};
pub use config::{
    LabConfig, LabConfigBuilder, LabProfile, DEFAULT_BASE_URL, ENV_BASE_URL,
    ENV_CONTINUOUS_INTERVAL_MS, ENV_REQUEST_TIMEOUT_MS, ENV_STATUS_INTERVAL_MS,
};
pub use error::{AdminError, ConfigError, LabError, LabResult};
pub use explain::{explain, explain_recorded, Explanation};
pub use lab::Lab;
pub use outcome::{
    CorrelationId, Endpoint, Mode, Outcome, ParseNameError, Scenario, Severity,
    CORRELATION_ID_LEN, SLOW_ROW_MS,
};
pub use poller::{StatusPoller, StatusSnapshot};
pub use probe::{ProbeClient, CORRELATION_HEADER, NETWORK_ERROR_FALLBACK, TRANSPORT_FAILURE_STATUS};
pub use trace::{TraceBuffer, DEFAULT_TRACE_CAPACITY};
