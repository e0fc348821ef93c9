//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (routes reference existing breakers/fallbacks)
//! - Validate value ranges (thresholds > 0, timeouts > 0)
//! - Check path patterns and upstream URIs
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;

use thiserror::Error;
use url::Url;

use crate::config::schema::{BreakerSettings, GatewayConfig, RegistryKind, DEFAULT_FALLBACK_ID};
use crate::discovery::ServiceInstance;
use crate::routing::{PathPattern, PatternError};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("route #{0} has an empty id")]
    EmptyRouteId(usize),
    #[error("duplicate route id '{0}'")]
    DuplicateRoute(String),
    #[error("route '{route}': invalid path pattern: {reason}")]
    InvalidPattern { route: String, reason: PatternError },
    #[error("route '{0}' needs either `service` or `uri`")]
    MissingTarget(String),
    #[error("route '{0}' sets both `service` and `uri`")]
    ConflictingTarget(String),
    #[error("route '{route}': invalid upstream URI '{uri}'")]
    InvalidUri { route: String, uri: String },
    #[error("{origin}: upstream '{uri}' must use http")]
    UnsupportedScheme { origin: String, uri: String },
    #[error("route '{route}' references unknown breaker '{breaker}'")]
    UnknownBreaker { route: String, breaker: String },
    #[error("route '{route}' references unknown fallback '{fallback}'")]
    UnknownFallback { route: String, fallback: String },
    #[error("duplicate breaker id '{0}'")]
    DuplicateBreaker(String),
    #[error("breaker '{breaker}': {reason}")]
    InvalidBreaker { breaker: String, reason: &'static str },
    #[error("duplicate fallback id '{0}'")]
    DuplicateFallback(String),
    #[error("timeouts.{0} must be greater than zero")]
    ZeroTimeout(&'static str),
    #[error("discovery.eureka_url is required for the eureka registry")]
    MissingEurekaUrl,
    #[error("invalid discovery.eureka_url '{0}'")]
    InvalidEurekaUrl(String),
    #[error("discovery service '{service}': invalid instance '{address}'")]
    InvalidInstance { service: String, address: String },
    #[error("invalid discovery.static_default '{0}'")]
    InvalidStaticDefault(String),
}

/// Validate a parsed configuration.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    validate_timeouts(config, &mut errors);
    validate_discovery(config, &mut errors);

    let breaker_ids = validate_breakers(config, &mut errors);
    let fallback_ids = validate_fallbacks(config, &mut errors);
    validate_routes(config, &breaker_ids, &fallback_ids, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_timeouts(config: &GatewayConfig, errors: &mut Vec<ValidationError>) {
    let t = &config.timeouts;
    for (name, value) in [
        ("request_secs", t.request_secs),
        ("connect_ms", t.connect_ms),
        ("upstream_ms", t.upstream_ms),
        ("registry_ms", t.registry_ms),
    ] {
        if value == 0 {
            errors.push(ValidationError::ZeroTimeout(name));
        }
    }
}

fn validate_discovery(config: &GatewayConfig, errors: &mut Vec<ValidationError>) {
    let discovery = &config.discovery;
    if discovery.registry == RegistryKind::Eureka {
        match discovery.eureka_url.as_deref() {
            None => errors.push(ValidationError::MissingEurekaUrl),
            Some(raw) if Url::parse(raw).is_err() => {
                errors.push(ValidationError::InvalidEurekaUrl(raw.to_string()))
            }
            Some(_) => {}
        }
    }

    for service in &discovery.services {
        for address in &service.instances {
            match ServiceInstance::parse(address) {
                Ok(instance) => check_scheme(
                    &instance.scheme,
                    || format!("discovery service '{}'", service.name),
                    address,
                    errors,
                ),
                Err(_) => errors.push(ValidationError::InvalidInstance {
                    service: service.name.clone(),
                    address: address.clone(),
                }),
            }
        }
    }

    if let Some(template) = &discovery.static_default {
        match Url::parse(&template.replace("{service}", "service")) {
            Ok(url) if url.host_str().is_some() => {
                check_scheme(url.scheme(), || "discovery.static_default".to_string(), template, errors)
            }
            _ => errors.push(ValidationError::InvalidStaticDefault(template.clone())),
        }
    }
}

/// The upstream client speaks plain HTTP only.
fn check_scheme(
    scheme: &str,
    origin: impl FnOnce() -> String,
    uri: &str,
    errors: &mut Vec<ValidationError>,
) {
    if scheme != "http" {
        errors.push(ValidationError::UnsupportedScheme {
            origin: origin(),
            uri: uri.to_string(),
        });
    }
}

fn validate_breaker_settings(id: &str, settings: &BreakerSettings, errors: &mut Vec<ValidationError>) {
    let mut invalid = |reason| {
        errors.push(ValidationError::InvalidBreaker {
            breaker: id.to_string(),
            reason,
        })
    };
    if settings.failure_threshold == 0 {
        invalid("failure_threshold must be greater than zero");
    }
    if settings.open_duration_ms == 0 {
        invalid("open_duration_ms must be greater than zero");
    }
    if settings.half_open_trial_count == 0 {
        invalid("half_open_trial_count must be greater than zero");
    }
    if settings.window_ms == 0 {
        invalid("window_ms must be greater than zero");
    }
    if settings.failure_status_codes.iter().any(|c| !(100..=599).contains(c)) {
        invalid("failure_status_codes must be HTTP status codes");
    }
}

fn validate_breakers(config: &GatewayConfig, errors: &mut Vec<ValidationError>) -> HashSet<String> {
    validate_breaker_settings("breaker_defaults", &config.breaker_defaults, errors);

    let mut ids = HashSet::new();
    for breaker in &config.breakers {
        if !ids.insert(breaker.id.clone()) {
            errors.push(ValidationError::DuplicateBreaker(breaker.id.clone()));
        }
        validate_breaker_settings(&breaker.id, &breaker.settings, errors);
    }

    // Routes without `breaker` get one named after themselves.
    for route in config.routes.iter().filter(|r| r.breaker.is_none()) {
        if !ids.insert(route.id.clone()) {
            errors.push(ValidationError::DuplicateBreaker(route.id.clone()));
        }
    }
    ids
}

fn validate_fallbacks(config: &GatewayConfig, errors: &mut Vec<ValidationError>) -> HashSet<String> {
    let mut ids = HashSet::new();
    for fallback in &config.fallbacks {
        if !ids.insert(fallback.id.clone()) {
            errors.push(ValidationError::DuplicateFallback(fallback.id.clone()));
        }
    }
    ids.insert(DEFAULT_FALLBACK_ID.to_string());
    ids
}

fn validate_routes(
    config: &GatewayConfig,
    breaker_ids: &HashSet<String>,
    fallback_ids: &HashSet<String>,
    errors: &mut Vec<ValidationError>,
) {
    let mut route_ids = HashSet::new();
    for (index, route) in config.routes.iter().enumerate() {
        if route.id.trim().is_empty() {
            errors.push(ValidationError::EmptyRouteId(index));
        } else if !route_ids.insert(route.id.as_str()) {
            errors.push(ValidationError::DuplicateRoute(route.id.clone()));
        }

        if let Err(reason) = PathPattern::parse(&route.path) {
            errors.push(ValidationError::InvalidPattern {
                route: route.id.clone(),
                reason,
            });
        }

        match (&route.service, &route.uri) {
            (None, None) => errors.push(ValidationError::MissingTarget(route.id.clone())),
            (Some(_), Some(_)) => errors.push(ValidationError::ConflictingTarget(route.id.clone())),
            (None, Some(uri)) => match Url::parse(uri) {
                Ok(url) => check_scheme(url.scheme(), || format!("route '{}'", route.id), uri, errors),
                Err(_) => errors.push(ValidationError::InvalidUri {
                    route: route.id.clone(),
                    uri: uri.clone(),
                }),
            },
            (Some(_), None) => {}
        }

        if let Some(breaker) = &route.breaker {
            if !breaker_ids.contains(breaker) {
                errors.push(ValidationError::UnknownBreaker {
                    route: route.id.clone(),
                    breaker: breaker.clone(),
                });
            }
        }

        if !fallback_ids.contains(&route.fallback) {
            errors.push(ValidationError::UnknownFallback {
                route: route.id.clone(),
                fallback: route.fallback.clone(),
            });
        }
    }
}
