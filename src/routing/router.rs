//! Route table and lookup.
//!
//! # Responsibilities
//! - Compile route configuration into matchable routes
//! - Bind each route to its breaker and fallback handler at load time
//! - Look up the first matching route for a request path
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) ordered scan; registration order is the tie-break
//! - Explicit NoMatch rather than silent default
//! - Dangling breaker/fallback references fail compilation, never a request

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use url::Url;

use crate::config::validation::ValidationError;
use crate::config::{GatewayConfig, RouteConfig};
use crate::fallback::{FallbackHandler, FallbackRegistry};
use crate::resilience::{BreakerRegistry, CircuitBreaker};
use crate::routing::matcher::{expand_template, Captures, PathPattern};

/// Where a route sends traffic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteTarget {
    /// Resolved per request through the service registry.
    Service(String),
    /// Fixed upstream base URI.
    Static(Url),
}

/// A compiled route.
#[derive(Debug)]
pub struct Route {
    pub id: String,
    pub pattern: PathPattern,
    pub target: RouteTarget,
    pub rewrite: Option<String>,
    pub breaker: Arc<CircuitBreaker>,
    pub fallback: Arc<FallbackHandler>,
}

impl Route {
    /// Path to send upstream: the rewrite template if configured, else the
    /// request path unchanged.
    pub fn upstream_path(&self, path: &str, captures: &Captures) -> String {
        match &self.rewrite {
            Some(template) => expand_template(template, captures),
            None => path.to_string(),
        }
    }

    pub fn breaker_id(&self) -> &str {
        self.breaker.id()
    }

    pub fn fallback_id(&self) -> &str {
        self.fallback.id()
    }
}

/// Summary of a route for the admin API.
#[derive(Debug, Clone, Serialize)]
pub struct RouteSummary {
    pub id: String,
    pub path: String,
    pub target: String,
    pub rewrite_path: Option<String>,
    pub breaker: String,
    pub fallback: String,
}

impl From<&Route> for RouteSummary {
    fn from(route: &Route) -> Self {
        let target = match &route.target {
            RouteTarget::Service(name) => format!("lb://{name}"),
            RouteTarget::Static(url) => url.to_string(),
        };
        Self {
            id: route.id.clone(),
            path: route.pattern.to_string(),
            target,
            rewrite_path: route.rewrite.clone(),
            breaker: route.breaker_id().to_string(),
            fallback: route.fallback_id().to_string(),
        }
    }
}

/// A successful lookup.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    pub route: Arc<Route>,
    pub captures: Captures,
}

/// Ordered route table, first match wins.
#[derive(Debug, Default)]
pub struct RouteTable {
    routes: Vec<Arc<Route>>,
}

impl RouteTable {
    /// Compile all routes of `config`, binding breakers and fallbacks.
    ///
    /// `breakers` must already be synced with `config`.
    pub fn compile(
        config: &GatewayConfig,
        breakers: &BreakerRegistry,
        fallbacks: &FallbackRegistry,
    ) -> Result<Self, Vec<ValidationError>> {
        let mut routes = Vec::with_capacity(config.routes.len());
        let mut errors = Vec::new();
        let mut seen_patterns = HashSet::new();

        for route_config in &config.routes {
            match compile_route(route_config, breakers, fallbacks) {
                Ok(route) => {
                    if !seen_patterns.insert(route.pattern.as_str().to_string()) {
                        tracing::warn!(
                            route = %route.id,
                            path = %route.pattern,
                            "Route is shadowed by an earlier route with the same pattern"
                        );
                    }
                    routes.push(Arc::new(route));
                }
                Err(mut route_errors) => errors.append(&mut route_errors),
            }
        }

        if errors.is_empty() {
            Ok(Self { routes })
        } else {
            Err(errors)
        }
    }

    /// Find the first route matching `path`.
    pub fn match_path(&self, path: &str) -> Option<RouteMatch> {
        self.routes.iter().find_map(|route| {
            route.pattern.captures(path).map(|captures| RouteMatch {
                route: route.clone(),
                captures,
            })
        })
    }

    pub fn routes(&self) -> &[Arc<Route>] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

fn compile_route(
    config: &RouteConfig,
    breakers: &BreakerRegistry,
    fallbacks: &FallbackRegistry,
) -> Result<Route, Vec<ValidationError>> {
    let mut errors = Vec::new();
    let route_id = config.id.clone();

    let pattern = PathPattern::parse(&config.path)
        .map_err(|reason| {
            errors.push(ValidationError::InvalidPattern {
                route: route_id.clone(),
                reason,
            })
        })
        .ok();

    let target = match (&config.service, &config.uri) {
        (Some(service), None) => Some(RouteTarget::Service(service.clone())),
        (None, Some(uri)) => match Url::parse(uri) {
            Ok(url) => Some(RouteTarget::Static(url)),
            Err(_) => {
                errors.push(ValidationError::InvalidUri {
                    route: route_id.clone(),
                    uri: uri.clone(),
                });
                None
            }
        },
        (None, None) => {
            errors.push(ValidationError::MissingTarget(route_id.clone()));
            None
        }
        (Some(_), Some(_)) => {
            errors.push(ValidationError::ConflictingTarget(route_id.clone()));
            None
        }
    };

    let breaker = breakers.get(config.breaker_id());
    if breaker.is_none() {
        errors.push(ValidationError::UnknownBreaker {
            route: route_id.clone(),
            breaker: config.breaker_id().to_string(),
        });
    }

    let fallback = fallbacks.get(&config.fallback);
    if fallback.is_none() {
        errors.push(ValidationError::UnknownFallback {
            route: route_id.clone(),
            fallback: config.fallback.clone(),
        });
    }

    match (pattern, target, breaker, fallback) {
        (Some(pattern), Some(target), Some(breaker), Some(fallback)) if errors.is_empty() => Ok(Route {
            id: route_id,
            pattern,
            target,
            rewrite: config.rewrite_path.clone(),
            breaker,
            fallback,
        }),
        _ => Err(errors),
    }
}
