//! Breaker instances by id.
//!
//! # Responsibilities
//! - Create exactly one breaker per configured breaker id
//! - Keep breaker state across config reloads when the settings are unchanged
//! - Provide snapshots for the admin API

use std::sync::Arc;

use dashmap::DashMap;

use crate::config::GatewayConfig;
use crate::resilience::{BreakerSnapshot, CircuitBreaker, CircuitBreakerConfig};

/// Owns every circuit breaker in the process.
#[derive(Debug, Default)]
pub struct BreakerRegistry {
    breakers: DashMap<String, Arc<CircuitBreaker>>,
}

impl BreakerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reconcile with a configuration: declared breakers plus one per route
    /// without an explicit `breaker`. Unknown ids are removed.
    pub fn sync(&self, config: &GatewayConfig) {
        let mut wanted: Vec<(String, CircuitBreakerConfig)> = config
            .breakers
            .iter()
            .map(|b| (b.id.clone(), CircuitBreakerConfig::from(&b.settings)))
            .collect();
        for route in config.routes.iter().filter(|r| r.breaker.is_none()) {
            wanted.push((route.id.clone(), CircuitBreakerConfig::from(&config.breaker_defaults)));
        }

        self.breakers.retain(|id, _| wanted.iter().any(|(w, _)| w == id));
        for (id, breaker_config) in wanted {
            let unchanged = self
                .breakers
                .get(&id)
                .map(|existing| *existing.config() == breaker_config)
                .unwrap_or(false);
            if !unchanged {
                tracing::debug!(breaker = %id, "Creating circuit breaker");
                self.breakers
                    .insert(id.clone(), Arc::new(CircuitBreaker::new(id, breaker_config)));
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<Arc<CircuitBreaker>> {
        self.breakers.get(id).map(|b| b.value().clone())
    }

    pub(crate) fn len(&self) -> usize {
        self.breakers.len()
    }

    /// Snapshots sorted by id.
    pub fn snapshots(&self) -> Vec<BreakerSnapshot> {
        let mut snapshots: Vec<BreakerSnapshot> =
            self.breakers.iter().map(|b| b.value().snapshot()).collect();
        snapshots.sort_by(|a, b| a.id.cmp(&b.id));
        snapshots
    }
}
