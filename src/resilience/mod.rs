//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to upstream:
//!     → circuit_breaker.rs (permit or fail fast)
//!     → timeouts.rs (bounded registry lookup and upstream call)
//!     → circuit_breaker.rs (record outcome, maybe transition)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - A timeout is a failure outcome for the breaker
//! - No retries at this layer

pub mod breakers;
pub mod circuit_breaker;
pub mod timeouts;

pub use breakers::BreakerRegistry;
pub use circuit_breaker::{
    BreakerSnapshot, CircuitBreaker, CircuitBreakerConfig, CircuitOpen, CircuitState, Permit,
    StatusPolicy,
};
pub use timeouts::{with_timeout, Elapsed};
