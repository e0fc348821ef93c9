//! Fallback responses for routes that cannot be served.
//!
//! A fallback never touches the network, so it answers even when every
//! upstream is down. Every handler answers `503`; configured handlers only
//! choose the body. The built-in `default` answers `Service Unavailable`.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, HeaderValue, Response, StatusCode},
};

use crate::config::{FallbackConfig, DEFAULT_FALLBACK_ID};

/// A fixed degraded response.
#[derive(Debug, Clone)]
pub struct FallbackHandler {
    id: String,
    body: String,
}

impl FallbackHandler {
    pub fn new(id: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            body: body.into(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Build the fallback response. Neither status nor body depend on the route.
    pub fn handle(&self, route_id: &str) -> Response<Body> {
        tracing::debug!(route = %route_id, fallback = %self.id, "Serving fallback");
        let mut response = Response::new(Body::from(self.body.clone()));
        *response.status_mut() = StatusCode::SERVICE_UNAVAILABLE;
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        response
    }
}

impl Default for FallbackHandler {
    fn default() -> Self {
        Self::new(DEFAULT_FALLBACK_ID, "Service Unavailable")
    }
}

impl From<&FallbackConfig> for FallbackHandler {
    fn from(config: &FallbackConfig) -> Self {
        Self::new(config.id.clone(), config.body.clone())
    }
}

/// Fallback handlers by id. Always contains `default`.
#[derive(Debug, Clone)]
pub struct FallbackRegistry {
    handlers: HashMap<String, Arc<FallbackHandler>>,
}

impl FallbackRegistry {
    /// Build from configuration; a configured `default` replaces the built-in one.
    pub fn from_config(configs: &[FallbackConfig]) -> Self {
        let mut registry = Self::default();
        for config in configs {
            registry
                .handlers
                .insert(config.id.clone(), Arc::new(FallbackHandler::from(config)));
        }
        registry
    }

    pub fn get(&self, id: &str) -> Option<Arc<FallbackHandler>> {
        self.handlers.get(id).cloned()
    }
}

impl Default for FallbackRegistry {
    fn default() -> Self {
        let mut handlers = HashMap::new();
        handlers.insert(DEFAULT_FALLBACK_ID.to_string(), Arc::new(FallbackHandler::default()));
        Self { handlers }
    }
}
