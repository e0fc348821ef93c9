//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the service registry selected by configuration
//! - Wire registry client, forwarder, breakers and routes into a dispatcher
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Components are wired by construction; there are no globals

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::config::{ConfigError, DiscoveryConfig, GatewayConfig, RegistryKind};
use crate::discovery::{EurekaRegistry, RegistryError, ServiceRegistry, ServiceRegistryClient, StaticRegistry};
use crate::dispatch::{Dispatcher, HttpForwarder};
use crate::load_balancer::selector_for;

/// Fatal errors while bringing the gateway up.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("service registry: {0}")]
    Registry(#[from] RegistryError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
}

/// Build the configured registry implementation.
pub fn build_registry(
    config: &DiscoveryConfig,
    timeout: Duration,
) -> Result<Arc<dyn ServiceRegistry>, RegistryError> {
    match config.registry {
        RegistryKind::Static => {
            tracing::info!(services = config.services.len(), "Using static service registry");
            Ok(Arc::new(StaticRegistry::from_config(&config.services)?))
        }
        RegistryKind::Eureka => {
            let url = config
                .eureka_url
                .as_deref()
                .ok_or_else(|| RegistryError::Address("discovery.eureka_url is not set".to_string()))?;
            tracing::info!(eureka_url = %url, "Using Eureka service registry");
            Ok(Arc::new(EurekaRegistry::new(url, timeout)?))
        }
    }
}

/// Build the dispatcher for `config`.
pub fn build_dispatcher(config: &GatewayConfig) -> Result<Dispatcher, StartupError> {
    let registry_timeout = Duration::from_millis(config.timeouts.registry_ms);
    let registry = build_registry(&config.discovery, registry_timeout)?;
    let client = ServiceRegistryClient::new(registry, selector_for(config.discovery.selection), registry_timeout);
    let forwarder = Arc::new(HttpForwarder::new(Duration::from_millis(config.timeouts.connect_ms)));

    Dispatcher::new(config, client, forwarder).map_err(|errors| StartupError::Config(ConfigError::Validation(errors)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RouteConfig;

    #[test]
    fn test_default_config_builds() {
        let dispatcher = build_dispatcher(&GatewayConfig::default()).unwrap();
        assert_eq!(dispatcher.route_count(), 0);
    }

    #[test]
    fn test_dangling_reference_is_fatal() {
        let mut config = GatewayConfig::default();
        let mut route = RouteConfig::service("account-service", "/api/v1/account", "account-service");
        route.fallback = "nowhere".into();
        config.routes.push(route);

        let err = build_dispatcher(&config).unwrap_err();
        assert!(matches!(err, StartupError::Config(ConfigError::Validation(_))));
    }

    #[test]
    fn test_https_upstream_is_fatal() {
        let mut config = GatewayConfig::default();
        config.routes.push(RouteConfig::static_uri(
            "discovery-service",
            "/eureka/web",
            "https://127.0.0.1:8443",
        ));
        config.discovery.static_default = Some("https://localhost:8443/{service}".into());

        let err = build_dispatcher(&config).unwrap_err();
        match err {
            StartupError::Config(ConfigError::Validation(errors)) => assert_eq!(errors.len(), 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_eureka_without_url_is_fatal() {
        let mut config = GatewayConfig::default();
        config.discovery.registry = RegistryKind::Eureka;
        assert!(matches!(build_dispatcher(&config), Err(StartupError::Registry(_))));
    }
}
