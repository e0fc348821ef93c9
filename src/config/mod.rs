//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks, dangling references)
//!     → GatewayConfig (validated, immutable)
//!     → compiled into breakers, fallbacks and the route table
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → atomic swap of the route table
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Invalid configuration is fatal at startup and ignored on reload

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    AdminConfig, BreakerConfig, BreakerSettings, DiscoveryConfig, FallbackConfig, GatewayConfig,
    ListenerConfig, LogFormat, ObservabilityConfig, RegistryKind, RouteConfig, SelectionStrategy,
    StaticServiceConfig, TimeoutConfig, DEFAULT_FALLBACK_ID,
};
pub use validation::{validate_config, ValidationError};
