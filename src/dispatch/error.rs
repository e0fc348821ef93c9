//! Dispatch error taxonomy.

use axum::http::StatusCode;
use thiserror::Error;

use crate::dispatch::forward::ForwardError;
use crate::resilience::{CircuitOpen, Elapsed};

/// Why a request was not answered by its upstream.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("no route matches '{0}'")]
    RouteNotFound(String),

    #[error(transparent)]
    CircuitOpen(#[from] CircuitOpen),

    #[error("no live instance of service '{service}'")]
    ResolutionFailed { service: String },

    #[error(transparent)]
    UpstreamTimeout(#[from] Elapsed),

    #[error("upstream connection failed: {0}")]
    UpstreamConnection(#[from] ForwardError),

    #[error("upstream answered with failure status {0}")]
    UpstreamStatus(StatusCode),

    #[error("invalid upstream uri '{0}'")]
    InvalidUpstreamUri(String),
}

impl DispatchError {
    /// Short label for logs and the `reason` metric label.
    pub fn reason(&self) -> &'static str {
        match self {
            DispatchError::RouteNotFound(_) => "route_not_found",
            DispatchError::CircuitOpen(_) => "circuit_open",
            DispatchError::ResolutionFailed { .. } => "resolution_failed",
            DispatchError::UpstreamTimeout(_) => "upstream_timeout",
            DispatchError::UpstreamConnection(_) => "upstream_connection",
            DispatchError::UpstreamStatus(_) => "upstream_status",
            DispatchError::InvalidUpstreamUri(_) => "invalid_upstream_uri",
        }
    }

    /// Whether this error is fed to the breaker as a failed call.
    ///
    /// A rejected permit is the breaker's own decision and an unmatched
    /// path never had one.
    pub fn is_breaker_failure(&self) -> bool {
        !matches!(self, DispatchError::RouteNotFound(_) | DispatchError::CircuitOpen(_))
    }
}
