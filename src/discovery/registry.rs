//! The registry lookup contract and the in-memory registry.

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::StaticServiceConfig;
use crate::discovery::instance::{InstanceParseError, ServiceInstance};

/// Error raised by a registry implementation. The registry client turns every
/// one of these into an empty resolution.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("registry request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("registry answered with status {0}")]
    Status(u16),
    #[error("invalid registry address: {0}")]
    Address(String),
    #[error("invalid instance: {0}")]
    Instance(#[from] InstanceParseError),
}

/// External directory of live backend addresses by service name.
#[async_trait]
pub trait ServiceRegistry: Send + Sync + std::fmt::Debug {
    /// All live instances of `service`, in registry order.
    async fn get_instances(&self, service: &str) -> Result<Vec<ServiceInstance>, RegistryError>;
}

/// Registry backed by instances listed in configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticRegistry {
    services: HashMap<String, Vec<ServiceInstance>>,
}

impl StaticRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(services: &[StaticServiceConfig]) -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        for service in services {
            let instances = service
                .instances
                .iter()
                .map(|raw| ServiceInstance::parse(raw))
                .collect::<Result<Vec<_>, _>>()?;
            registry.services.insert(service.name.clone(), instances);
        }
        Ok(registry)
    }

    /// Builder-style insertion, mostly for tests and embedding.
    pub fn with_service(mut self, name: impl Into<String>, instances: Vec<ServiceInstance>) -> Self {
        self.services.insert(name.into(), instances);
        self
    }
}

#[async_trait]
impl ServiceRegistry for StaticRegistry {
    async fn get_instances(&self, service: &str) -> Result<Vec<ServiceInstance>, RegistryError> {
        Ok(self.services.get(service).cloned().unwrap_or_default())
    }
}
