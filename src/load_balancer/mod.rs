//! Instance selection subsystem.
//!
//! # Data Flow
//! ```text
//! Registry returns live instances for a service
//!     → Apply selection strategy:
//!         - first.rs (registry order, always the first instance)
//!         - round_robin.rs (rotate through instances per service)
//!     → Return one instance or None
//! ```
//!
//! # Design Decisions
//! - Selectors never talk to the registry; they only pick from a fresh list
//! - Strategy is explicit configuration, `first` unless stated otherwise
//! - Empty list → None, never a panic

pub mod first;
pub mod round_robin;

use crate::config::SelectionStrategy;
use crate::discovery::ServiceInstance;

/// Trait for instance selection algorithms.
pub trait InstanceSelector: Send + Sync + std::fmt::Debug {
    /// Pick one instance of `service` from `instances`.
    fn select(&self, service: &str, instances: &[ServiceInstance]) -> Option<ServiceInstance>;
}

/// Build the selector named in configuration.
pub fn selector_for(strategy: SelectionStrategy) -> Box<dyn InstanceSelector> {
    match strategy {
        SelectionStrategy::First => Box::new(first::FirstInstance),
        SelectionStrategy::RoundRobin => Box::new(round_robin::RoundRobin::new()),
    }
}
