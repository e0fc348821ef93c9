//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Id of the fallback handler that is always registered.
pub const DEFAULT_FALLBACK_ID: &str = "default";

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Service discovery settings.
    pub discovery: DiscoveryConfig,

    /// Settings for breakers created implicitly for routes without `breaker`.
    pub breaker_defaults: BreakerSettings,

    /// Named circuit breakers routes can share.
    pub breakers: Vec<BreakerConfig>,

    /// Named fallback handlers.
    pub fallbacks: Vec<FallbackConfig>,

    /// Route definitions, evaluated in order (first match wins).
    pub routes: Vec<RouteConfig>,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    #[serde(default)]
    pub admin: AdminConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:9000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:9000".to_string(),
        }
    }
}

/// Route configuration mapping a path pattern to an upstream.
///
/// Exactly one of `service` and `uri` must be set.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Route identifier for logging/metrics.
    pub id: String,

    /// Path pattern, e.g. `/api/v1/account` or `/eureka/**`.
    pub path: String,

    /// Service name resolved through the registry.
    #[serde(default)]
    pub service: Option<String>,

    /// Static upstream base URI (no discovery).
    #[serde(default)]
    pub uri: Option<String>,

    /// Replacement path template, may reference `{vars}` captured by `path`.
    #[serde(default)]
    pub rewrite_path: Option<String>,

    /// Breaker id; a dedicated breaker named after the route when absent.
    #[serde(default)]
    pub breaker: Option<String>,

    /// Fallback handler id.
    #[serde(default = "default_fallback_id")]
    pub fallback: String,
}

fn default_fallback_id() -> String {
    DEFAULT_FALLBACK_ID.to_string()
}

impl RouteConfig {
    /// Route to a discovered service.
    pub fn service(id: impl Into<String>, path: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
            service: Some(service.into()),
            uri: None,
            rewrite_path: None,
            breaker: None,
            fallback: default_fallback_id(),
        }
    }

    /// Route to a fixed upstream URI.
    pub fn static_uri(id: impl Into<String>, path: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
            service: None,
            uri: Some(uri.into()),
            rewrite_path: None,
            breaker: None,
            fallback: default_fallback_id(),
        }
    }

    /// Id of the breaker protecting this route.
    pub fn breaker_id(&self) -> &str {
        self.breaker.as_deref().unwrap_or(&self.id)
    }
}

/// Tunables of a circuit breaker.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct BreakerSettings {
    /// Failures within `window_ms` that open the circuit.
    pub failure_threshold: u32,

    /// Time the circuit stays open before admitting probes.
    pub open_duration_ms: u64,

    /// Concurrent probes admitted while half-open.
    pub half_open_trial_count: u32,

    /// Sliding window for counting failures while closed.
    pub window_ms: u64,

    /// Upstream statuses counted as failures. Empty means every 5xx.
    pub failure_status_codes: Vec<u16>,
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            open_duration_ms: 30_000,
            half_open_trial_count: 1,
            window_ms: 60_000,
            failure_status_codes: Vec::new(),
        }
    }
}

/// A named circuit breaker.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BreakerConfig {
    pub id: String,

    #[serde(flatten)]
    pub settings: BreakerSettings,
}

/// A named fallback response. Fallbacks always answer 503; only the body varies.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FallbackConfig {
    pub id: String,

    #[serde(default = "default_fallback_body")]
    pub body: String,
}

fn default_fallback_body() -> String {
    "Service Unavailable".to_string()
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            id: default_fallback_id(),
            body: default_fallback_body(),
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Overall inbound request timeout in seconds.
    pub request_secs: u64,

    /// Upstream connection establishment timeout in milliseconds.
    pub connect_ms: u64,

    /// Upstream call timeout (until response headers) in milliseconds.
    pub upstream_ms: u64,

    /// Registry lookup timeout in milliseconds.
    pub registry_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 30,
            connect_ms: 2_000,
            upstream_ms: 10_000,
            registry_ms: 500,
        }
    }
}

/// Which registry backs service resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RegistryKind {
    /// Instances listed in `discovery.services`.
    #[default]
    Static,
    /// Eureka REST API at `discovery.eureka_url`.
    Eureka,
}

/// How one instance is picked from the live set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SelectionStrategy {
    /// Always the first instance the registry returns.
    #[default]
    First,
    /// Rotate through instances per service.
    RoundRobin,
}

/// Service discovery configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct DiscoveryConfig {
    pub registry: RegistryKind,

    /// Eureka base URL, e.g. "http://localhost:8761/eureka".
    pub eureka_url: Option<String>,

    pub selection: SelectionStrategy,

    /// Address used when the registry has no instance, e.g.
    /// "http://localhost:8080/{service}". Unset means fall back instead.
    pub static_default: Option<String>,

    /// Instances for the static registry.
    pub services: Vec<StaticServiceConfig>,
}

/// Statically known instances of one service.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StaticServiceConfig {
    pub name: String,

    /// Instance base URLs, e.g. "http://127.0.0.1:3001".
    pub instances: Vec<String>,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
            bind_address: "127.0.0.1:9001".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_reference_routes() {
        let raw = r#"
            [discovery]
            registry = "eureka"
            eureka_url = "http://localhost:8761/eureka"
            static_default = "http://localhost:8080/{service}"

            [[breakers]]
            id = "discoveryServiceCircuitBreaker"
            failure_threshold = 3
            open_duration_ms = 1000

            [[routes]]
            id = "account-service"
            path = "/api/v1/account"
            service = "account-service"

            [[routes]]
            id = "discovery-service"
            path = "/eureka/web"
            uri = "http://localhost:8761"
            rewrite_path = "/"
            breaker = "discoveryServiceCircuitBreaker"
        "#;
        let config: GatewayConfig = toml::from_str(raw).unwrap();

        assert_eq!(config.discovery.registry, RegistryKind::Eureka);
        assert_eq!(config.discovery.selection, SelectionStrategy::First);
        assert_eq!(config.routes.len(), 2);
        assert_eq!(config.routes[0].breaker_id(), "account-service");
        assert_eq!(config.routes[0].fallback, DEFAULT_FALLBACK_ID);
        assert_eq!(config.routes[1].breaker_id(), "discoveryServiceCircuitBreaker");

        let breaker = &config.breakers[0].settings;
        assert_eq!(breaker.failure_threshold, 3);
        assert_eq!(breaker.open_duration_ms, 1000);
        // Unspecified fields keep their defaults.
        assert_eq!(breaker.half_open_trial_count, 1);
        assert!(breaker.failure_status_codes.is_empty());
    }

    #[test]
    fn fallback_defaults_to_service_unavailable_body() {
        let config: GatewayConfig = toml::from_str("[[fallbacks]]\nid = \"fallbackRoute\"\n").unwrap();
        let fallback = &config.fallbacks[0];
        assert_eq!(fallback.body, "Service Unavailable");
    }
}
