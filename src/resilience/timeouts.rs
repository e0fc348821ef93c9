//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap registry lookups and upstream calls with a deadline
//! - Cancel the wrapped operation when the deadline passes
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Timeout errors are distinct from other errors

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

/// A bounded operation ran past its deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{operation} timed out after {after:?}")]
pub struct Elapsed {
    pub operation: &'static str,
    pub after: Duration,
}

/// Run `future` with a deadline. The future is dropped when it expires.
pub async fn with_timeout<F>(operation: &'static str, after: Duration, future: F) -> Result<F::Output, Elapsed>
where
    F: Future,
{
    tokio::time::timeout(after, future)
        .await
        .map_err(|_| Elapsed { operation, after })
}
