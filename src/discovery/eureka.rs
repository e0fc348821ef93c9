//! Eureka registry client.
//!
//! # Responsibilities
//! - Query `GET {base}/apps/{APP}` with `Accept: application/json`
//! - Keep only instances whose status is `UP`
//! - Use the plain port; instances reachable only over the secure port are skipped
//!
//! # Design Decisions
//! - Eureka upper-cases application names, so lookups do too
//! - 404 means the application is not registered: an empty list, not an error
//! - The HTTP client carries its own timeout as a backstop; the registry
//!   client applies the configured lookup deadline on top

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header::ACCEPT, StatusCode};
use serde::Deserialize;
use url::Url;

use crate::discovery::instance::ServiceInstance;
use crate::discovery::registry::{RegistryError, ServiceRegistry};

#[derive(Debug, Deserialize)]
struct ApplicationEnvelope {
    application: Application,
}

#[derive(Debug, Deserialize)]
struct Application {
    #[serde(default)]
    instance: OneOrMany<EurekaInstance>,
}

/// Eureka's JSON encoder collapses single-element arrays into objects.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> Default for OneOrMany<T> {
    fn default() -> Self {
        OneOrMany::Many(Vec::new())
    }
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::Many(items) => items,
            OneOrMany::One(item) => vec![item],
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EurekaInstance {
    host_name: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    port: Option<EurekaPort>,
}

#[derive(Debug, Deserialize)]
struct EurekaPort {
    #[serde(rename = "$")]
    port: u16,
    #[serde(rename = "@enabled", default)]
    enabled: Flag,
}

/// Eureka reports flags as `"true"` strings; some servers send booleans.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Flag {
    Bool(bool),
    Text(String),
}

impl Default for Flag {
    fn default() -> Self {
        Flag::Bool(true)
    }
}

impl Flag {
    fn is_set(&self) -> bool {
        match self {
            Flag::Bool(b) => *b,
            Flag::Text(t) => t.eq_ignore_ascii_case("true"),
        }
    }
}

impl EurekaInstance {
    fn is_up(&self) -> bool {
        self.status
            .as_deref()
            .map(|s| s.eq_ignore_ascii_case("UP"))
            .unwrap_or(true)
    }

    fn into_service_instance(self) -> Option<ServiceInstance> {
        let port = self.port.as_ref().filter(|p| p.enabled.is_set())?;
        Some(ServiceInstance::new(self.host_name.clone(), port.port, "http"))
    }
}

/// Registry backed by a Eureka server.
#[derive(Debug, Clone)]
pub struct EurekaRegistry {
    base: Url,
    client: reqwest::Client,
}

impl EurekaRegistry {
    /// `base` is the Eureka REST root, e.g. `http://localhost:8761/eureka`.
    pub fn new(base: &str, timeout: Duration) -> Result<Self, RegistryError> {
        let mut base = Url::parse(base).map_err(|e| RegistryError::Address(format!("{base}: {e}")))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { base, client })
    }

    fn app_url(&self, service: &str) -> Result<Url, RegistryError> {
        self.base
            .join(&format!("apps/{}", service.to_ascii_uppercase()))
            .map_err(|e| RegistryError::Address(e.to_string()))
    }
}

#[async_trait]
impl ServiceRegistry for EurekaRegistry {
    async fn get_instances(&self, service: &str) -> Result<Vec<ServiceInstance>, RegistryError> {
        let url = self.app_url(service)?;
        let response = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => return Ok(Vec::new()),
            status if !status.is_success() => return Err(RegistryError::Status(status.as_u16())),
            _ => {}
        }

        let envelope: ApplicationEnvelope = response.json().await?;
        Ok(envelope
            .application
            .instance
            .into_vec()
            .into_iter()
            .filter(EurekaInstance::is_up)
            .filter_map(EurekaInstance::into_service_instance)
            .collect())
    }
}
