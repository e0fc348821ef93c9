//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (request ID, upstream request preparation)
//!     → dispatch (route, breaker, discovery, forward)
//!     → response.rs (strip hop-by-hop headers, stream back)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{RequestIdExt, RequestIdLayer, X_REQUEST_ID};
pub use server::HttpServer;
