//! API gateway library.
//!
//! Routes inbound HTTP requests to upstream services resolved through a
//! service registry, protecting each route with a circuit breaker and a
//! fallback response.

// Core subsystems
pub mod config;
pub mod dispatch;
pub mod http;
pub mod routing;

// Upstream selection
pub mod discovery;
pub mod load_balancer;

// Degraded operation
pub mod fallback;
pub mod resilience;

// Cross-cutting concerns
pub mod admin;
pub mod lifecycle;
pub mod observability;

pub use config::schema::GatewayConfig;
pub use dispatch::Dispatcher;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
