//! Request dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request
//!     → dispatcher.rs (match route, ask breaker for a permit)
//!     → discovery (resolve service target) or static base URI
//!     → forward.rs (upstream call under deadline)
//!     → dispatcher.rs (record outcome, stream response or serve fallback)
//! ```
//!
//! # Design Decisions
//! - Exactly one upstream attempt per request; no retries
//! - Every failure after a permit is granted counts against the breaker
//! - Unmatched paths never touch the registry or any upstream

pub mod dispatcher;
pub mod error;
pub mod forward;

pub use dispatcher::Dispatcher;
pub use error::DispatchError;
pub use forward::{ForwardError, Forwarder, HttpForwarder};
