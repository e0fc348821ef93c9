//! Service discovery subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatcher needs an upstream for "account-service"
//!     → client.rs (deadline, error absorption)
//!     → registry.rs (ServiceRegistry trait: static or eureka.rs)
//!     → load_balancer (pick one instance)
//!     → Return: ServiceInstance or None
//! ```
//!
//! # Design Decisions
//! - The registry is an injected trait object, not a global
//! - Lookups happen per dispatch; topology changes are seen immediately
//! - Registry failures never surface as errors to the dispatcher

pub mod client;
pub mod eureka;
pub mod instance;
pub mod registry;

pub use client::ServiceRegistryClient;
pub use eureka::EurekaRegistry;
pub use instance::{InstanceParseError, ServiceInstance};
pub use registry::{RegistryError, ServiceRegistry, StaticRegistry};
