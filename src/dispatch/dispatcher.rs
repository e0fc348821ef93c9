//! The request dispatcher.
//!
//! # Responsibilities
//! - Match the request path against the current route table
//! - Gate the upstream call behind the route's circuit breaker
//! - Resolve service targets through the registry client
//! - Forward under a deadline and feed the outcome back to the breaker
//! - Serve the route's fallback whenever the upstream cannot answer
//!
//! # Design Decisions
//! - The route table sits behind `ArcSwap`; a reload never blocks requests
//! - Breaker state survives reloads when a breaker's settings are unchanged
//! - Discovery, forwarder and timeouts are fixed for the process lifetime

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    http::{header, HeaderValue, Request, Response, StatusCode, Uri},
};
use url::Url;

use crate::config::{validate_config, GatewayConfig, ValidationError};
use crate::discovery::ServiceRegistryClient;
use crate::dispatch::error::DispatchError;
use crate::dispatch::forward::Forwarder;
use crate::fallback::FallbackRegistry;
use crate::http::request::{prepare_upstream_request, RequestIdExt};
use crate::observability::metrics;
use crate::resilience::{with_timeout, BreakerRegistry, BreakerSnapshot};
use crate::routing::{Route, RouteMatch, RouteSummary, RouteTable, RouteTarget};

/// Placeholder replaced by the service name in the static default template.
const SERVICE_PLACEHOLDER: &str = "{service}";

/// Routes every inbound request to an upstream or a fallback.
#[derive(Debug)]
pub struct Dispatcher {
    routes: ArcSwap<RouteTable>,
    breakers: BreakerRegistry,
    registry: ServiceRegistryClient,
    forwarder: Arc<dyn Forwarder>,
    upstream_timeout: Duration,
    static_default: Option<String>,
}

impl Dispatcher {
    /// Validate `config` and compile its routes.
    pub fn new(
        config: &GatewayConfig,
        registry: ServiceRegistryClient,
        forwarder: Arc<dyn Forwarder>,
    ) -> Result<Self, Vec<ValidationError>> {
        validate_config(config)?;

        let breakers = BreakerRegistry::new();
        breakers.sync(config);
        let fallbacks = FallbackRegistry::from_config(&config.fallbacks);
        let routes = RouteTable::compile(config, &breakers, &fallbacks)?;

        tracing::info!(
            routes = routes.len(),
            breakers = breakers.len(),
            static_default = ?config.discovery.static_default,
            "Route table compiled"
        );
        if routes.is_empty() {
            tracing::warn!("No routes configured; every request will be answered with 404");
        }

        Ok(Self {
            routes: ArcSwap::from_pointee(routes),
            breakers,
            registry,
            forwarder,
            upstream_timeout: Duration::from_millis(config.timeouts.upstream_ms),
            static_default: config.discovery.static_default.clone(),
        })
    }

    /// Swap in the routes, breakers and fallbacks of a new configuration.
    ///
    /// On error the current table stays in place.
    pub fn reload(&self, config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
        validate_config(config)?;

        let fallbacks = FallbackRegistry::from_config(&config.fallbacks);
        self.breakers.sync(config);
        let routes = RouteTable::compile(config, &self.breakers, &fallbacks)?;

        tracing::info!(routes = routes.len(), breakers = self.breakers.len(), "Route table reloaded");
        self.routes.store(Arc::new(routes));
        Ok(())
    }

    pub fn route_summaries(&self) -> Vec<RouteSummary> {
        self.routes.load().routes().iter().map(|r| RouteSummary::from(r.as_ref())).collect()
    }

    pub fn breaker_snapshots(&self) -> Vec<BreakerSnapshot> {
        self.breakers.snapshots()
    }

    pub fn route_count(&self) -> usize {
        self.routes.load().len()
    }

    /// Handle one inbound request. Never fails: errors become a 404 or the
    /// route's fallback response.
    pub async fn dispatch(&self, request: Request<Body>, client_addr: Option<SocketAddr>) -> Response<Body> {
        let start = Instant::now();
        let method = request.method().to_string();
        let request_id = request.request_id().to_string();
        let path = request.uri().path().to_string();

        let matched = match self.routes.load().match_path(&path) {
            Some(matched) => matched,
            None => {
                let error = DispatchError::RouteNotFound(path);
                tracing::warn!(request_id = %request_id, error = %error, "No route matched");
                metrics::record_request("none", &method, StatusCode::NOT_FOUND.as_u16(), start);
                return not_found();
            }
        };
        let route = matched.route.clone();

        tracing::debug!(
            request_id = %request_id,
            route = %route.id,
            breaker = %route.breaker_id(),
            method = %method,
            path = %path,
            "Dispatching request"
        );

        let response = match self.forward(&matched, request, &request_id, client_addr).await {
            Ok(response) => response,
            Err(error) => {
                match &error {
                    DispatchError::CircuitOpen(_) => {
                        tracing::debug!(request_id = %request_id, route = %route.id, error = %error, "Short-circuited")
                    }
                    _ => tracing::warn!(request_id = %request_id, route = %route.id, error = %error, "Upstream failed"),
                }
                metrics::record_fallback(&route.id, error.reason());
                route.fallback.handle(&route.id)
            }
        };

        metrics::record_request(&route.id, &method, response.status().as_u16(), start);
        response
    }

    /// Permit, resolve, forward, record.
    async fn forward(
        &self,
        matched: &RouteMatch,
        request: Request<Body>,
        request_id: &str,
        client_addr: Option<SocketAddr>,
    ) -> Result<Response<Body>, DispatchError> {
        let route = &matched.route;
        let permit = route.breaker.allow()?;

        let result = self.call_upstream(matched, request, request_id, client_addr).await;
        let success = match &result {
            Ok(_) => true,
            Err(error) => !error.is_breaker_failure(),
        };
        route.breaker.record_outcome(permit, success);
        result
    }

    async fn call_upstream(
        &self,
        matched: &RouteMatch,
        request: Request<Body>,
        request_id: &str,
        client_addr: Option<SocketAddr>,
    ) -> Result<Response<Body>, DispatchError> {
        let route = &matched.route;
        let base = self.resolve_base(route).await?;

        let path = route.upstream_path(request.uri().path(), &matched.captures);
        let uri = upstream_uri(&base, &path, request.uri().query())?;
        tracing::debug!(request_id = %request_id, route = %route.id, upstream = %uri, "Forwarding");

        let upstream_request = prepare_upstream_request(request, uri, request_id, client_addr);
        let response = with_timeout(
            "upstream call",
            self.upstream_timeout,
            self.forwarder.forward(upstream_request),
        )
        .await??;

        let status = response.status();
        if route.breaker.is_failure_status(status) {
            return Err(DispatchError::UpstreamStatus(status));
        }
        Ok(response)
    }

    /// Base URL for the route's upstream.
    async fn resolve_base(&self, route: &Route) -> Result<Url, DispatchError> {
        let service = match &route.target {
            RouteTarget::Static(url) => return Ok(url.clone()),
            RouteTarget::Service(service) => service,
        };

        if let Some(instance) = self.registry.resolve(service).await {
            let raw = instance.to_string();
            return Url::parse(&raw).map_err(|_| DispatchError::InvalidUpstreamUri(raw));
        }

        match &self.static_default {
            Some(template) => {
                let raw = template.replace(SERVICE_PLACEHOLDER, service);
                tracing::debug!(service = %service, upstream = %raw, "Using static default address");
                Url::parse(&raw).map_err(|_| DispatchError::InvalidUpstreamUri(raw))
            }
            None => Err(DispatchError::ResolutionFailed {
                service: service.clone(),
            }),
        }
    }
}

/// Scheme, host and port come from `base`; path and query from the request.
///
/// Any path on `base` is ignored, so a static default such as
/// `http://localhost:8080/{service}` only picks the host.
fn upstream_uri(base: &Url, path: &str, query: Option<&str>) -> Result<Uri, DispatchError> {
    let host = base
        .host_str()
        .ok_or_else(|| DispatchError::InvalidUpstreamUri(base.to_string()))?;
    let authority = match base.port_or_known_default() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    };

    let mut target = format!("{}://{}", base.scheme(), authority);
    if !path.starts_with('/') {
        target.push('/');
    }
    target.push_str(path);
    if let Some(query) = query {
        target.push('?');
        target.push_str(query);
    }

    target
        .parse::<Uri>()
        .map_err(|_| DispatchError::InvalidUpstreamUri(target))
}

fn not_found() -> Response<Body> {
    let mut response = Response::new(Body::from("No matching route found"));
    *response.status_mut() = StatusCode::NOT_FOUND;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}
