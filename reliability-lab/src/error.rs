//! Error types for the lab.
//!
//! Probe failures are not here: a probe always yields an
//! [`Outcome`](crate::Outcome), failed or not.

use std::time::Duration;

use reliability_lab_core::TransportError;
use thiserror::Error;

/// Errors from the admin endpoints.
#[derive(Debug, Error)]
pub enum AdminError {
    /// The request never completed.
    #[error("admin request failed: {0}")]
    Transport(#[from] TransportError),

    /// The backend answered with a non-success status.
    #[error("admin endpoint returned status {0}")]
    Status(u16),

    /// The body was not the expected JSON.
    #[error("malformed admin response: {0}")]
    Decode(#[from] serde_json::Error),

    /// No response within the request timeout.
    #[error("admin request timed out after {0:?}")]
    TimedOut(Duration),
}

/// Errors from building a [`LabConfig`](crate::LabConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The base URL cannot be dialled.
    #[error(transparent)]
    InvalidBaseUrl(#[from] TransportError),

    /// An interval variable is not a positive integer of milliseconds.
    #[error("{var} must be a positive number of milliseconds, got `{value}`")]
    InvalidDuration {
        /// Environment variable name.
        var: &'static str,
        /// Rejected value.
        value: String,
    },
}

/// Errors returned by [`Lab`](crate::Lab) operations.
#[derive(Debug, Error)]
pub enum LabError {
    /// Manual probes are disabled while continuous traffic runs.
    #[error("continuous traffic is running; stop it before triggering probes manually")]
    ContinuousActive,

    /// The backend did not acknowledge the reset; local state is untouched.
    #[error("lab reset failed: {0}")]
    Reset(#[source] AdminError),
}

/// Result alias for lab operations.
pub type LabResult<T> = Result<T, LabError>;
