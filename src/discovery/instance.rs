//! A live address of a backend service.

use std::fmt;

use serde::Serialize;
use thiserror::Error;
use url::Url;

/// Error for an instance address that cannot be used as an upstream.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InstanceParseError {
    #[error("invalid URL '{0}'")]
    Url(String),
    #[error("URL '{0}' has no host")]
    MissingHost(String),
    #[error("URL '{0}' has no port and no known default for its scheme")]
    MissingPort(String),
}

/// One instance returned by the registry. Created per dispatch, never cached.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ServiceInstance {
    pub host: String,
    pub port: u16,
    pub scheme: String,
}

impl ServiceInstance {
    pub fn new(host: impl Into<String>, port: u16, scheme: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            scheme: scheme.into(),
        }
    }

    /// Parse an instance from a base URL such as `http://10.0.0.7:8081`.
    pub fn parse(raw: &str) -> Result<Self, InstanceParseError> {
        let url = Url::parse(raw).map_err(|_| InstanceParseError::Url(raw.to_string()))?;
        let host = url
            .host_str()
            .ok_or_else(|| InstanceParseError::MissingHost(raw.to_string()))?;
        let port = url
            .port_or_known_default()
            .ok_or_else(|| InstanceParseError::MissingPort(raw.to_string()))?;
        Ok(Self::new(host, port, url.scheme()))
    }
}

impl fmt::Display for ServiceInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}:{}", self.scheme, self.host, self.port)
    }
}
