//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (path)
//!     → router.rs (ordered route lookup)
//!     → matcher.rs (evaluate path pattern, capture variables)
//!     → Return: matched Route + captures, or NoMatch
//!
//! Route Compilation (at startup and on reload):
//!     RouteConfig[]
//!     → Compile path patterns
//!     → Bind breaker and fallback by id
//!     → Freeze as immutable RouteTable, swapped in atomically
//! ```
//!
//! # Design Decisions
//! - Routes compiled at load time, immutable at runtime
//! - No regex in hot path
//! - Deterministic: same input always matches same route
//! - First match wins (registration order)

pub mod matcher;
pub mod router;

pub use matcher::{Captures, PathPattern, PatternError};
pub use router::{Route, RouteMatch, RouteSummary, RouteTable, RouteTarget};
