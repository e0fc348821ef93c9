//! Registry client used by the dispatcher.
//!
//! # Responsibilities
//! - Ask the registry for live instances of a service, with a deadline
//! - Pick one instance using the configured selection strategy
//! - Turn every registry problem into an empty resolution
//!
//! # Design Decisions
//! - Never raises: timeout, registry error and empty result all yield `None`
//! - No caching; every dispatch sees the registry's current view

use std::sync::Arc;
use std::time::Duration;

use crate::discovery::instance::ServiceInstance;
use crate::discovery::registry::ServiceRegistry;
use crate::load_balancer::{first::FirstInstance, InstanceSelector};
use crate::observability::metrics;
use crate::resilience::with_timeout;

/// Resolves service names to one live instance.
#[derive(Debug)]
pub struct ServiceRegistryClient {
    registry: Arc<dyn ServiceRegistry>,
    selector: Box<dyn InstanceSelector>,
    timeout: Duration,
}

impl ServiceRegistryClient {
    pub fn new(registry: Arc<dyn ServiceRegistry>, selector: Box<dyn InstanceSelector>, timeout: Duration) -> Self {
        Self {
            registry,
            selector,
            timeout,
        }
    }

    /// Client that always picks the first instance.
    pub fn first_instance(registry: Arc<dyn ServiceRegistry>, timeout: Duration) -> Self {
        Self::new(registry, Box::new(FirstInstance), timeout)
    }

    /// Resolve `service` to one instance, or `None` if none is available.
    pub async fn resolve(&self, service: &str) -> Option<ServiceInstance> {
        let lookup = self.registry.get_instances(service);
        let instances = match with_timeout("registry lookup", self.timeout, lookup).await {
            Ok(Ok(instances)) => instances,
            Ok(Err(e)) => {
                tracing::warn!(service = %service, error = %e, "Registry lookup failed");
                metrics::record_registry_lookup(service, "error");
                return None;
            }
            Err(elapsed) => {
                tracing::warn!(service = %service, error = %elapsed, "Registry lookup timed out");
                metrics::record_registry_lookup(service, "timeout");
                return None;
            }
        };

        match self.selector.select(service, &instances) {
            Some(instance) => {
                tracing::debug!(service = %service, instance = %instance, live = instances.len(), "Resolved service");
                metrics::record_registry_lookup(service, "resolved");
                Some(instance)
            }
            None => {
                tracing::debug!(service = %service, "No live instances");
                metrics::record_registry_lookup(service, "empty");
                None
            }
        }
    }
}
